//! Persistent storage using RocksDB.
//!
//! Each entity kind lives under its own key prefix (`network:`, `bastion:`,
//! `acid:`) followed by the entity id. Values are whole entities as JSON;
//! there are no partial updates.

use crate::error::Result;
use crate::repository::Entity;
use rocksdb::{Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Durable storage for one entity kind, keyed by entity id.
pub trait EntityStore<T>: Send + Sync {
    /// Load every stored entity.
    fn load_all(&self) -> Result<Vec<T>>;

    /// Store many entities in one batch.
    fn save_all(&self, entities: &[T]) -> Result<()>;

    /// Store (insert or overwrite) one entity.
    fn save(&self, entity: &T) -> Result<()>;

    /// Delete one entity. Deleting a missing entity is not an error.
    fn delete(&self, entity: &T) -> Result<()>;
}

/// Storage backend for Rampart data.
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    fn key<T: Entity>(id: &T::Id) -> String {
        format!("{}:{}", T::KIND, id)
    }
}

impl<T> EntityStore<T> for Storage
where
    T: Entity + Serialize + DeserializeOwned,
{
    fn load_all(&self) -> Result<Vec<T>> {
        let prefix = format!("{}:", T::KIND);
        let mut entities = Vec::new();

        let iter = self.db.prefix_iterator(prefix.as_bytes());
        for item in iter {
            let (key, value) = item?;
            if key.starts_with(prefix.as_bytes()) {
                entities.push(serde_json::from_slice(&value)?);
            } else {
                break;
            }
        }

        Ok(entities)
    }

    fn save_all(&self, entities: &[T]) -> Result<()> {
        let mut batch = WriteBatch::default();
        for entity in entities {
            let key = Self::key::<T>(&entity.id());
            batch.put(key.as_bytes(), serde_json::to_vec(entity)?);
        }
        self.db.write(batch)?;
        Ok(())
    }

    fn save(&self, entity: &T) -> Result<()> {
        let key = Self::key::<T>(&entity.id());
        let value = serde_json::to_vec(entity)?;
        self.db.put(key.as_bytes(), value)?;
        Ok(())
    }

    fn delete(&self, entity: &T) -> Result<()> {
        let key = Self::key::<T>(&entity.id());
        self.db.delete(key.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{NetworkId, PlayerId};
    use crate::models::{AcidBlock, Bastion, Network};
    use rampart_geo::BlockLocation;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn storage_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let network = Network::new("Red", PlayerId::random(), 0);
        storage.save(&network).unwrap();

        let loaded: Vec<Network> = storage.load_all().unwrap();
        assert_eq!(loaded, vec![network]);
    }

    #[test]
    fn kinds_do_not_mix() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let owner = NetworkId::random();
        let here = BlockLocation::new("world", 0, 64, 0);

        storage
            .save(&Bastion::new(owner, here.clone(), 0, Duration::from_secs(1)))
            .unwrap();
        storage
            .save(&AcidBlock::new(owner, here, 0, Duration::from_secs(1), Duration::from_secs(2)))
            .unwrap();

        let bastions: Vec<Bastion> = storage.load_all().unwrap();
        let acids: Vec<AcidBlock> = storage.load_all().unwrap();
        let networks: Vec<Network> = storage.load_all().unwrap();
        assert_eq!(bastions.len(), 1);
        assert_eq!(acids.len(), 1);
        assert!(networks.is_empty());
    }

    #[test]
    fn save_all_and_delete() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let networks: Vec<Network> = (0..3)
            .map(|i| Network::new(format!("Net{i}"), PlayerId::random(), 0))
            .collect();
        storage.save_all(&networks).unwrap();
        assert_eq!(EntityStore::<Network>::load_all(&storage).unwrap().len(), 3);

        storage.delete(&networks[1]).unwrap();
        storage.delete(&networks[1]).unwrap();
        let remaining: Vec<Network> = storage.load_all().unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(!remaining.contains(&networks[1]));
    }

    #[test]
    fn save_overwrites() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let mut network = Network::new("Red", PlayerId::random(), 0);
        storage.save(&network).unwrap();
        network.name = "Blue".into();
        storage.save(&network).unwrap();

        let loaded: Vec<Network> = storage.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Blue");
    }
}
