pub mod disk;
pub mod memory;
pub mod saved_funds;
pub mod users;

use crate::core::cache::{KeyValueCollection, Store};
use anyhow::{Context, Result};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::debug;

pub use saved_funds::SavedFundsStore;
pub use users::{TokenIdentity, UserDirectory};

/// Partition holding one `UserRecord` per user id.
pub const USERS: &str = "users";
/// Partition mapping bearer tokens to user ids.
pub const CREDENTIALS: &str = "credentials";
/// Partition mapping usernames to user ids.
pub const USERNAMES: &str = "usernames";

/// A thread-safe key-value store that can hold multiple collections. With a
/// keyspace the collections live on disk, otherwise in memory.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Arc<Keyspace>>,
}

impl KeyValueStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path.join("db"))
            .open()
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        debug!("Opened keyspace at {}", path.display());

        Ok(Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: Some(Arc::new(keyspace)),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }

    fn create_collection(&self, name: &str) -> Result<Arc<dyn KeyValueCollection>> {
        match &self.keyspace {
            Some(ks) => {
                let partition = ks
                    .open_partition(name, PartitionCreateOptions::default())
                    .with_context(|| format!("Failed to open partition: {name}"))?;
                Ok(Arc::new(DiskCollection::new(Arc::clone(ks), partition)))
            }
            None => Ok(Arc::new(MemoryCollection::new())),
        }
    }
}

impl Store for KeyValueStore {
    fn get_collection(&self, name: &str) -> Result<Arc<dyn KeyValueCollection>> {
        if let Some(collection) = self
            .collections
            .read()
            .map_err(|_| anyhow::anyhow!("Collection registry poisoned"))?
            .get(name)
        {
            return Ok(Arc::clone(collection));
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| anyhow::anyhow!("Collection registry poisoned"))?;
        if let Some(collection) = collections.get(name) {
            return Ok(Arc::clone(collection));
        }
        let collection = self.create_collection(name)?;
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_same_name_returns_same_collection() {
        let store = KeyValueStore::in_memory();

        let first = store.get_collection(USERS).unwrap();
        first.put(b"u1", b"record").await.unwrap();

        let second = store.get_collection(USERS).unwrap();
        assert_eq!(second.get(b"u1").await.unwrap(), Some(b"record".to_vec()));

        let other = store.get_collection(CREDENTIALS).unwrap();
        assert!(other.get(b"u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path()).unwrap();

        let users = store.get_collection(USERS).unwrap();
        users.put(b"u1", b"record").await.unwrap();

        assert!(dir.path().join("db").exists());
        assert!(users.contains(b"u1").await.unwrap());
    }
}
