//! Asynchronous persistence.
//!
//! In-memory state is authoritative. Every mutation schedules a durable
//! write on a bounded pool of blocking workers and returns immediately;
//! failures are logged and never rolled back. Bulk load and save also have
//! blocking forms for startup and shutdown.

use crate::error::Result;
use crate::repository::{Entity, Repository};
use crate::storage::EntityStore;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

type StorageJob = Box<dyn FnOnce() -> Result<()> + Send>;

struct Task {
    label: String,
    job: StorageJob,
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn end(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Pool of blocking storage workers shared by every gateway.
///
/// Each worker drains its own queue one job at a time. Jobs are routed by
/// entity key, so writes to one entity land in the order they were queued
/// while different entities are written in parallel.
#[derive(Clone)]
pub struct WorkerPool {
    lanes: Arc<[mpsc::UnboundedSender<Task>]>,
    in_flight: Arc<InFlight>,
}

impl WorkerPool {
    /// Start `workers` storage workers on `handle`.
    pub fn new(handle: Handle, workers: usize) -> Self {
        let in_flight = Arc::new(InFlight::default());
        let lanes = (0..workers.max(1))
            .map(|lane| {
                let (tx, rx) = mpsc::unbounded_channel();
                handle.spawn(drain(lane, rx, Arc::clone(&in_flight)));
                tx
            })
            .collect();
        Self { lanes, in_flight }
    }

    /// Worker that owns every job for `key`.
    pub fn lane<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.lanes.len() as u64) as usize
    }

    /// Queue a storage job behind every earlier job with the same `key`.
    /// Returns at once; the outcome is only logged.
    pub fn submit<K, F>(&self, key: &K, label: String, job: F)
    where
        K: Hash + ?Sized,
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.submit_to(self.lane(key), label, job);
    }

    /// Queue a storage job on a specific worker.
    pub fn submit_to<F>(&self, lane: usize, label: String, job: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.in_flight.begin();
        let task = Task {
            label,
            job: Box::new(job),
        };
        let sender = &self.lanes[lane % self.lanes.len()];
        if let Err(mpsc::error::SendError(task)) = sender.send(task) {
            error!(job = %task.label, "Storage worker gone; job dropped");
            self.in_flight.end();
        }
    }

    /// Jobs queued or running.
    pub fn pending(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait until every queued job has finished.
    pub async fn flush(&self) {
        loop {
            let idle = self.in_flight.idle.notified();
            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }
}

async fn drain(lane: usize, mut rx: mpsc::UnboundedReceiver<Task>, in_flight: Arc<InFlight>) {
    while let Some(Task { label, job }) = rx.recv().await {
        let outcome = tokio::task::spawn_blocking(job)
            .await
            .map_err(Into::into)
            .and_then(|r| r);
        match outcome {
            Ok(()) => debug!(lane, job = %label, "Storage job complete"),
            Err(e) => error!(lane, job = %label, error = %e, "Storage job failed"),
        }
        in_flight.end();
    }
}

/// Persistence for one entity kind.
pub struct PersistenceGateway<T: Entity> {
    store: Arc<dyn EntityStore<T>>,
    pool: WorkerPool,
}

impl<T: Entity> Clone for PersistenceGateway<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            pool: self.pool.clone(),
        }
    }
}

impl<T: Entity> PersistenceGateway<T> {
    /// Create a gateway writing to `store` through `pool`.
    pub fn new(store: Arc<dyn EntityStore<T>>, pool: WorkerPool) -> Self {
        Self { store, pool }
    }

    fn key(entity: &T) -> String {
        format!("{}:{}", T::KIND, entity.id())
    }

    /// Schedule a write of the entity's current state.
    pub fn save(&self, entity: T) {
        let store = Arc::clone(&self.store);
        let key = Self::key(&entity);
        self.pool.submit(&key, format!("save {key}"), move || store.save(&entity));
    }

    /// Schedule a durable delete.
    pub fn delete(&self, entity: T) {
        let store = Arc::clone(&self.store);
        let key = Self::key(&entity);
        self.pool.submit(&key, format!("delete {key}"), move || store.delete(&entity));
    }

    /// Schedule a bulk write of a repository snapshot, split per worker so
    /// each entity stays ordered with its single writes.
    pub fn save_all(&self, entities: Vec<T>) {
        let mut batches: BTreeMap<usize, Vec<T>> = BTreeMap::new();
        for entity in entities {
            let lane = self.pool.lane(&Self::key(&entity));
            batches.entry(lane).or_default().push(entity);
        }

        for (lane, batch) in batches {
            let store = Arc::clone(&self.store);
            let label = format!("save_all {} ({})", T::KIND, batch.len());
            self.pool.submit_to(lane, label, move || store.save_all(&batch));
        }
    }

    /// Write a snapshot on the calling thread.
    pub fn save_all_blocking(&self, entities: &[T]) -> Result<()> {
        warn!(kind = T::KIND, count = entities.len(), "Blocking while saving");
        self.store.save_all(entities)?;
        info!(kind = T::KIND, count = entities.len(), "Saved");
        Ok(())
    }

    /// Load everything into `repository` on the calling thread.
    pub fn load_all_blocking(&self, repository: &Repository<T>) -> Result<usize> {
        warn!(kind = T::KIND, "Blocking while loading");
        let entities = self.store.load_all()?;
        let count = entities.len();
        repository.extend(entities);
        info!(kind = T::KIND, count, "Loaded");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ids::{NetworkId, PlayerId};
    use crate::models::Network;
    use crate::storage::Storage;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tempfile::tempdir;

    struct FailingStore;

    impl EntityStore<Network> for FailingStore {
        fn load_all(&self) -> Result<Vec<Network>> {
            Err(Error::Storage("offline".into()))
        }

        fn save_all(&self, _: &[Network]) -> Result<()> {
            Err(Error::Storage("offline".into()))
        }

        fn save(&self, _: &Network) -> Result<()> {
            Err(Error::Storage("offline".into()))
        }

        fn delete(&self, _: &Network) -> Result<()> {
            Err(Error::Storage("offline".into()))
        }
    }

    /// In-memory store whose first write stalls, so a later job for the same
    /// entity would overtake it if nothing kept them ordered.
    #[derive(Default)]
    struct StallingStore {
        rows: Mutex<HashMap<NetworkId, Network>>,
        stalled: AtomicBool,
    }

    impl StallingStore {
        fn stall_once(&self) {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(50));
            }
        }

        fn rows(&self) -> Vec<Network> {
            self.rows.lock().values().cloned().collect()
        }
    }

    impl EntityStore<Network> for StallingStore {
        fn load_all(&self) -> Result<Vec<Network>> {
            Ok(self.rows())
        }

        fn save_all(&self, entities: &[Network]) -> Result<()> {
            self.stall_once();
            let mut rows = self.rows.lock();
            for network in entities {
                rows.insert(network.id, network.clone());
            }
            Ok(())
        }

        fn save(&self, entity: &Network) -> Result<()> {
            self.stall_once();
            self.rows.lock().insert(entity.id, entity.clone());
            Ok(())
        }

        fn delete(&self, entity: &Network) -> Result<()> {
            self.stall_once();
            self.rows.lock().remove(&entity.id);
            Ok(())
        }
    }

    fn gateway(
        store: Arc<dyn EntityStore<Network>>,
        workers: usize,
    ) -> PersistenceGateway<Network> {
        PersistenceGateway::new(store, WorkerPool::new(Handle::current(), workers))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn delete_after_slow_save_stays_deleted() {
        let store = Arc::new(StallingStore::default());
        let gateway = gateway(store.clone(), 4);

        let network = Network::new("Red", PlayerId::random(), 0);
        gateway.save(network.clone());
        gateway.delete(network);
        gateway.pool.flush().await;

        assert!(store.rows().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn later_save_wins_over_slow_earlier_save() {
        let store = Arc::new(StallingStore::default());
        let gateway = gateway(store.clone(), 4);

        let red = Network::new("Red", PlayerId::random(), 0);
        let mut blue = red.clone();
        blue.name = "Blue".into();
        gateway.save(red);
        gateway.save(blue.clone());
        gateway.pool.flush().await;

        assert_eq!(store.rows(), vec![blue]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn bulk_save_is_ordered_with_single_writes() {
        let store = Arc::new(StallingStore::default());
        let gateway = gateway(store.clone(), 4);

        let networks: Vec<Network> = (0..8)
            .map(|i| Network::new(format!("Net{i}"), PlayerId::random(), 0))
            .collect();
        gateway.save_all(networks.clone());
        for network in &networks[..4] {
            gateway.delete(network.clone());
        }
        gateway.pool.flush().await;

        let mut left: Vec<_> = store.rows().into_iter().map(|n| n.name).collect();
        left.sort();
        assert_eq!(left, vec!["Net4", "Net5", "Net6", "Net7"]);
    }

    #[tokio::test]
    async fn save_then_delete_reaches_storage() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        let gateway = gateway(storage.clone(), 2);

        let network = Network::new("Red", PlayerId::random(), 0);
        gateway.save(network.clone());
        gateway.pool.flush().await;

        let stored: Vec<Network> = storage.load_all().unwrap();
        assert_eq!(stored, vec![network.clone()]);

        gateway.delete(network);
        gateway.pool.flush().await;
        assert!(EntityStore::<Network>::load_all(&*storage).unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_are_contained() {
        let gateway = gateway(Arc::new(FailingStore), 1);

        for i in 0..5 {
            gateway.save(Network::new(format!("Net{i}"), PlayerId::random(), 0));
        }
        gateway.pool.flush().await;
        assert_eq!(gateway.pool.pending(), 0);

        let repo = Repository::new();
        assert!(gateway.load_all_blocking(&repo).is_err());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn bulk_paths_round_trip() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        let gateway = gateway(storage, 4);

        let networks: Vec<Network> = (0..10)
            .map(|i| Network::new(format!("Net{i}"), PlayerId::random(), 0))
            .collect();
        gateway.save_all(networks.clone());
        gateway.pool.flush().await;

        let repo = Repository::new();
        assert_eq!(gateway.load_all_blocking(&repo).unwrap(), 10);
        for network in &networks {
            assert_eq!(repo.get(&network.id).as_ref(), Some(network));
        }

        gateway.save_all_blocking(&repo.all()).unwrap();
    }

    #[tokio::test]
    async fn flush_with_nothing_queued_returns() {
        let pool = WorkerPool::new(Handle::current(), 1);
        pool.flush().await;
        assert_eq!(pool.pending(), 0);
    }
}
