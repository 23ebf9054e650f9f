//! In-memory object store for tests and dry runs

use super::ObjectStore;
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key currently stored, sorted
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> PipelineResult<()> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> PipelineResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> PipelineResult<Vec<String>> {
        Ok(self
            .objects
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn copy(&self, src: &str, dst: &str) -> PipelineResult<()> {
        let mut objects = self.objects.write().await;
        let bytes = objects
            .get(src)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(src.to_string()))?;
        objects.insert(dst.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> PipelineResult<()> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| PipelineError::NotFound(key.to_string()))
    }
}
