use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory collection, used when nothing needs to outlive the process.
#[derive(Default)]
pub struct MemoryCollection {
    inner: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let map = self.inner.lock().await;
        Ok(map.get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut map = self.inner.lock().await;
        map.insert(key.to_vec(), value.to_vec());
        debug!("MemoryCollection PUT {} bytes", value.len());
        Ok(())
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        let mut map = self.inner.lock().await;
        map.remove(key);
        Ok(())
    }
}
