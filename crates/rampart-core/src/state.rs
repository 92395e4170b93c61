//! Shared state - the repositories, their gateways and collaborators.
//!
//! One [`RampartState`] is built at startup and cloned into every service;
//! clones share the same repositories.

use crate::broadcast::{Broadcaster, Notice};
use crate::clock::Clock;
use crate::config::RampartConfig;
use crate::gateway::{PersistenceGateway, WorkerPool};
use crate::ids::NetworkId;
use crate::models::{AcidBlock, Bastion, Network};
use crate::promise::{Outcome, Rejection};
use crate::repository::Repository;
use crate::storage::EntityStore;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Durable stores for every entity kind.
pub struct Stores {
    pub networks: Arc<dyn EntityStore<Network>>,
    pub bastions: Arc<dyn EntityStore<Bastion>>,
    pub acid: Arc<dyn EntityStore<AcidBlock>>,
}

impl Stores {
    /// Use one backend for every kind.
    pub fn shared<S>(backend: Arc<S>) -> Self
    where
        S: EntityStore<Network> + EntityStore<Bastion> + EntityStore<AcidBlock> + 'static,
    {
        Self {
            networks: backend.clone(),
            bastions: backend.clone(),
            acid: backend,
        }
    }
}

/// Handles shared by every service.
#[derive(Clone)]
pub struct RampartState {
    pub config: Arc<RampartConfig>,
    pub clock: Arc<dyn Clock>,
    pub broadcaster: Arc<dyn Broadcaster>,

    pub networks: Arc<Repository<Network>>,
    pub bastions: Arc<Repository<Bastion>>,
    pub acid: Arc<Repository<AcidBlock>>,

    pub network_store: PersistenceGateway<Network>,
    pub bastion_store: PersistenceGateway<Bastion>,
    pub acid_store: PersistenceGateway<AcidBlock>,

    pub pool: WorkerPool,
}

impl RampartState {
    /// Build empty repositories writing through `stores` on `handle`.
    pub fn new(
        config: RampartConfig,
        stores: Stores,
        handle: Handle,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let pool = WorkerPool::new(handle, config.persistence_workers);
        Self {
            network_store: PersistenceGateway::new(stores.networks, pool.clone()),
            bastion_store: PersistenceGateway::new(stores.bastions, pool.clone()),
            acid_store: PersistenceGateway::new(stores.acid, pool.clone()),
            pool,
            config: Arc::new(config),
            clock,
            broadcaster,
            networks: Arc::new(Repository::new()),
            bastions: Arc::new(Repository::new()),
            acid: Arc::new(Repository::new()),
        }
    }

    /// Current unix millis.
    pub fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Network with this name, ignoring case.
    pub fn network_by_name(&self, name: &str) -> Option<Network> {
        self.networks.find_one(|n| n.name_matches(name))
    }

    /// Network with this name, or the standard rejection.
    pub fn find_network(&self, name: &str) -> Outcome<Network> {
        self.network_by_name(name)
            .ok_or_else(Rejection::network_not_found)
    }

    /// Network with this id.
    pub fn network(&self, id: &NetworkId) -> Option<Network> {
        self.networks.get(id)
    }

    /// Record claim activity on a network so the inactivity sweep spares
    /// it, and schedule its save.
    pub fn touch(&self, id: &NetworkId, now: u64) {
        let touched = self.networks.update(id, |n| {
            n.last_active = now;
            n.clone()
        });
        if let Some(network) = touched {
            self.network_store.save(network);
        }
    }

    /// Tell every member of the network.
    pub fn notify(&self, network: &Network, notice: Notice) {
        self.broadcaster.broadcast(&network.member_ids(), &notice);
    }
}
