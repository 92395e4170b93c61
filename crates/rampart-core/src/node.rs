//! Rampart Node - the process runtime.
//!
//! Architecture:
//! - One RocksDB instance shared by every entity kind
//! - A single interactive task owns the [`Rampart`] core and runs every
//!   operation in arrival order
//! - A sweep ticker and the Unix admin socket only send jobs to that task
//! - Storage writes run on the gateway's blocking workers

use crate::admin_socket::AdminSocket;
use crate::broadcast::{Broadcaster, LogBroadcaster};
use crate::clock::{Clock, SystemClock};
use crate::config::RampartConfig;
use crate::error::{Error, Result};
use crate::promise::{Outcome, Promise, Resolve};
use crate::rampart::Rampart;
use crate::state::Stores;
use crate::storage::Storage;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

type Job = Box<dyn FnOnce(&Rampart) + Send>;

enum Command {
    Run(Job),
    Shutdown,
}

/// Cheap handle for submitting work to a running node.
#[derive(Clone)]
pub struct NodeHandle {
    tx: mpsc::Sender<Command>,
}

impl NodeHandle {
    /// Run `f` on the interactive task and wait for its result.
    pub async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Rampart) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |core| {
            let _ = reply_tx.send(f(core));
        });
        self.tx
            .send(Command::Run(job))
            .await
            .map_err(|_| Error::ShuttingDown)?;
        reply_rx.await.map_err(|_| Error::ShuttingDown)
    }

    /// Run an operation on the interactive task and resolve `promise` with
    /// its outcome. Returns once the job is queued.
    pub async fn submit<T, F, P>(&self, f: F, promise: P) -> Result<()>
    where
        F: FnOnce(&Rampart) -> Outcome<T> + Send + 'static,
        P: Promise<T> + Send + 'static,
        T: 'static,
    {
        let job: Job = Box::new(move |core| f(core).resolve(promise));
        self.tx
            .send(Command::Run(job))
            .await
            .map_err(|_| Error::ShuttingDown)
    }

    /// Ask the node to save and stop.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| Error::ShuttingDown)
    }
}

/// A Rampart node instance.
pub struct RampartNode {
    core: Rampart,
    config: RampartConfig,
    rx: mpsc::Receiver<Command>,
    handle: NodeHandle,
}

impl RampartNode {
    /// Open storage under the configured data directory and load every
    /// entity.
    pub fn new(config: RampartConfig) -> Result<Self> {
        Self::with_collaborators(config, Arc::new(LogBroadcaster), Arc::new(SystemClock))
    }

    /// Like [`RampartNode::new`] with explicit notice delivery and clock.
    pub fn with_collaborators(
        config: RampartConfig,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let storage = Arc::new(Storage::open(config.data_dir.join("db"))?);

        let core = Rampart::new(
            config.clone(),
            Stores::shared(storage),
            Handle::current(),
            broadcaster,
            clock,
        )?;
        let loaded = core.load_all_blocking()?;
        tracing::info!(
            networks = loaded.networks,
            bastions = loaded.bastions,
            acid_blocks = loaded.acid_blocks,
            "State loaded"
        );

        let (tx, rx) = mpsc::channel(1024);
        Ok(Self {
            core,
            config,
            rx,
            handle: NodeHandle { tx },
        })
    }

    /// Handle for submitting work.
    pub fn handle(&self) -> NodeHandle {
        self.handle.clone()
    }

    /// Run until Ctrl-C or [`NodeHandle::shutdown`], then flush and save.
    pub async fn run(self) -> Result<()> {
        let RampartNode {
            core,
            config,
            mut rx,
            handle,
        } = self;

        tracing::info!("Rampart node starting");
        tracing::info!("  Admin: {:?}", config.admin_socket);
        tracing::info!("  Data: {:?}", config.data_dir);

        let admin_socket = AdminSocket::new(handle.clone(), &config.admin_socket);
        let admin_task = tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });
        drop(handle);

        let mut ticker = tokio::time::interval(config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Run(job)) => job(&core),
                    Some(Command::Shutdown) | None => break,
                },
                _ = ticker.tick() => {
                    core.sweep();
                }
                _ = &mut ctrl_c => {
                    tracing::info!("Interrupt received");
                    break;
                }
            }
        }

        tracing::info!("Rampart node stopping");
        admin_task.abort();
        let _ = std::fs::remove_file(&config.admin_socket);

        core.flush().await;
        core.save_all_blocking()?;
        tracing::info!("Rampart node stopped");
        Ok(())
    }
}
