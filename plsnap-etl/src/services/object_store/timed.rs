//! Per-operation time bound for any object store

use super::ObjectStore;
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Wraps a store so every call fails with `StorageTimeout` once `timeout` elapses
#[derive(Debug, Clone)]
pub struct TimedObjectStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: ObjectStore> TimedObjectStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, operation: &'static str, key: &str, fut: F) -> PipelineResult<T>
    where
        F: Future<Output = PipelineResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::StorageTimeout {
                operation,
                key: key.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for TimedObjectStore<S> {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> PipelineResult<()> {
        self.bounded("put", key, self.inner.put(key, bytes)).await
    }

    async fn get(&self, key: &str) -> PipelineResult<Vec<u8>> {
        self.bounded("get", key, self.inner.get(key)).await
    }

    async fn list(&self, prefix: &str) -> PipelineResult<Vec<String>> {
        self.bounded("list", prefix, self.inner.list(prefix)).await
    }

    async fn copy(&self, src: &str, dst: &str) -> PipelineResult<()> {
        self.bounded("copy", src, self.inner.copy(src, dst)).await
    }

    async fn delete(&self, key: &str) -> PipelineResult<()> {
        self.bounded("delete", key, self.inner.delete(key)).await
    }
}
