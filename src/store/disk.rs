use crate::core::cache::KeyValueCollection;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use std::sync::Arc;
use tracing::debug;

/// A collection backed by a fjall partition. Writes are flushed to the
/// journal before returning.
pub struct DiskCollection {
    keyspace: Arc<Keyspace>,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Arc<Keyspace>, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist keyspace")
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .partition
            .get(key)
            .context("Failed to read from partition")?;
        Ok(value.map(|v| v.to_vec()))
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.partition
            .insert(key, value)
            .context("Failed to write to partition")?;
        self.persist()?;
        debug!("DiskCollection PUT {} bytes", value.len());
        Ok(())
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.partition
            .remove(key)
            .context("Failed to remove from partition")?;
        self.persist()
    }

    async fn contains(&self, key: &[u8]) -> Result<bool> {
        self.partition
            .contains_key(key)
            .context("Failed to read from partition")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjall::PartitionCreateOptions;
    use tempfile::tempdir;

    fn open_collection(path: &std::path::Path) -> DiskCollection {
        let keyspace = Arc::new(fjall::Config::new(path).open().unwrap());
        let partition = keyspace
            .open_partition("test", PartitionCreateOptions::default())
            .unwrap();
        DiskCollection::new(keyspace, partition)
    }

    #[tokio::test]
    async fn test_disk_collection_get_put() {
        let dir = tempdir().unwrap();
        let collection = open_collection(dir.path());

        assert!(collection.get(b"key1").await.unwrap().is_none());

        collection.put(b"key1", b"value1").await.unwrap();

        assert_eq!(
            collection.get(b"key1").await.unwrap(),
            Some(b"value1".to_vec())
        );
        assert!(collection.contains(b"key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_disk_collection_remove() {
        let dir = tempdir().unwrap();
        let collection = open_collection(dir.path());

        collection.put(b"key1", b"value1").await.unwrap();
        collection.remove(b"key1").await.unwrap();

        assert!(collection.get(b"key1").await.unwrap().is_none());
        assert!(!collection.contains(b"key1").await.unwrap());
    }
}
