//! In-memory entity repositories.
//!
//! A [`Repository`] is the single shared, mutable home of every live entity of
//! one kind. Insertions and removals are atomic per call and may come from
//! any thread; reads hand out owned snapshots, so a caller iterating the
//! result can never observe a concurrent mutation.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

/// Something a repository can hold.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifier type.
    type Id: Copy + Eq + Hash + Display + Send + Sync + 'static;

    /// Short kind name used in logs and storage keys.
    const KIND: &'static str;

    /// This entity's identifier.
    fn id(&self) -> Self::Id;
}

/// Concurrent, unordered collection of entities keyed by id.
pub struct Repository<T: Entity> {
    entries: RwLock<HashMap<T::Id, T>>,
}

impl<T: Entity> Default for Repository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Repository<T> {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a fully built entity.
    /// Returns false (and leaves the repository unchanged) if its id is
    /// already present.
    pub fn add(&self, entity: T) -> bool {
        let mut entries = self.entries.write();
        let id = entity.id();
        if entries.contains_key(&id) {
            return false;
        }
        entries.insert(id, entity);
        true
    }

    /// Insert many entities, replacing any with the same id (bulk load).
    pub fn extend(&self, entities: impl IntoIterator<Item = T>) {
        let mut entries = self.entries.write();
        for entity in entities {
            entries.insert(entity.id(), entity);
        }
    }

    /// Remove an entity. Returns the stored copy if it was present.
    pub fn remove(&self, entity: &T) -> Option<T> {
        self.remove_id(&entity.id())
    }

    /// Remove by id.
    pub fn remove_id(&self, id: &T::Id) -> Option<T> {
        self.entries.write().remove(id)
    }

    /// Atomically remove and return every entity matching the predicate.
    pub fn drain_where(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let mut entries = self.entries.write();
        let ids: Vec<T::Id> = entries
            .values()
            .filter(|e| predicate(e))
            .map(|e| e.id())
            .collect();
        ids.iter().filter_map(|id| entries.remove(id)).collect()
    }

    /// Mutate one entity in place under the write lock.
    /// Returns `None` if the id is not present.
    pub fn update<R>(&self, id: &T::Id, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.entries.write().get_mut(id).map(f)
    }

    /// Snapshot of one entity.
    pub fn get(&self, id: &T::Id) -> Option<T> {
        self.entries.read().get(id).cloned()
    }

    /// True if the id is present.
    pub fn contains(&self, id: &T::Id) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Snapshot of every entity.
    pub fn all(&self) -> Vec<T> {
        self.entries.read().values().cloned().collect()
    }

    /// First entity matching the predicate, in no particular order.
    pub fn find_one(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.entries.read().values().find(|e| predicate(e)).cloned()
    }

    /// Every entity matching the predicate.
    pub fn find_all(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.entries
            .read()
            .values()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    /// True if any entity matches, without cloning.
    pub fn any(&self, predicate: impl Fn(&T) -> bool) -> bool {
        self.entries.read().values().any(predicate)
    }

    /// Number of entities matching the predicate.
    pub fn count(&self, predicate: impl Fn(&T) -> bool) -> usize {
        self.entries.read().values().filter(|e| predicate(e)).count()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        value: u32,
    }

    impl Entity for Item {
        type Id = u32;
        const KIND: &'static str = "item";

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn item(id: u32, value: u32) -> Item {
        Item { id, value }
    }

    #[test]
    fn add_and_get() {
        let repo = Repository::new();
        assert!(repo.add(item(1, 10)));
        assert!(!repo.add(item(1, 99)));

        assert_eq!(repo.get(&1), Some(item(1, 10)));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn remove_returns_stored_copy() {
        let repo = Repository::new();
        repo.add(item(1, 10));

        assert_eq!(repo.remove(&item(1, 0)), Some(item(1, 10)));
        assert_eq!(repo.remove_id(&1), None);
        assert!(repo.is_empty());
    }

    #[test]
    fn find_by_predicate() {
        let repo = Repository::new();
        repo.extend((0..10).map(|i| item(i, i * 10)));

        assert_eq!(repo.find_one(|i| i.value == 30), Some(item(3, 30)));
        assert_eq!(repo.find_all(|i| i.value >= 50).len(), 5);
        assert!(repo.any(|i| i.id == 9));
        assert!(!repo.any(|i| i.id == 10));
    }

    #[test]
    fn update_in_place() {
        let repo = Repository::new();
        repo.add(item(1, 10));

        let updated = repo.update(&1, |i| {
            i.value += 5;
            i.value
        });
        assert_eq!(updated, Some(15));
        assert_eq!(repo.update(&2, |i| i.value), None);
        assert_eq!(repo.get(&1).unwrap().value, 15);
    }

    #[test]
    fn drain_where_removes_matches_once() {
        let repo = Repository::new();
        repo.extend((0..10).map(|i| item(i, i)));

        let drained = repo.drain_where(|i| i.value % 2 == 0);
        assert_eq!(drained.len(), 5);
        assert_eq!(repo.len(), 5);
        assert!(repo.drain_where(|i| i.value % 2 == 0).is_empty());
    }

    #[test]
    fn snapshot_survives_concurrent_mutation() {
        let repo = Arc::new(Repository::new());
        repo.extend((0..1_000).map(|i| item(i, i)));

        let writer = {
            let repo = Arc::clone(&repo);
            thread::spawn(move || {
                for i in 1_000..2_000 {
                    repo.add(item(i, i));
                    repo.remove_id(&(i - 1_000));
                }
            })
        };

        for _ in 0..50 {
            let snapshot = repo.all();
            // Every observed entity is whole
            assert!(snapshot.iter().all(|i| i.id == i.value));
        }

        writer.join().unwrap();
        assert_eq!(repo.len(), 1_000);
    }

    #[test]
    fn concurrent_drains_never_double_remove() {
        let repo = Arc::new(Repository::new());
        repo.extend((0..5_000).map(|i| item(i, i)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let repo = Arc::clone(&repo);
                thread::spawn(move || repo.drain_where(|i| i.value % 3 == 0).len())
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, (0..5_000).filter(|v| v % 3 == 0).count());
    }
}
