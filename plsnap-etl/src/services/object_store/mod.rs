//! Object store abstraction
//!
//! Keys are plain strings; namespaces are key prefixes. The pending/processed split of
//! raw files and the published tables live entirely in key existence, so this trait is
//! the only persisted state the pipeline touches.

use crate::error::PipelineResult;
use async_trait::async_trait;
use std::sync::Arc;

pub mod local;
pub mod memory;
pub mod timed;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use timed::TimedObjectStore;

/// Durable key/bytes store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object
    async fn put(&self, key: &str, bytes: Vec<u8>) -> PipelineResult<()>;

    /// Read the object under `key`; `NotFound` if absent
    async fn get(&self, key: &str) -> PipelineResult<Vec<u8>>;

    /// All keys starting with `prefix`, sorted
    async fn list(&self, prefix: &str) -> PipelineResult<Vec<String>>;

    /// Copy `src` to `dst`; `NotFound` if `src` is absent
    async fn copy(&self, src: &str, dst: &str) -> PipelineResult<()>;

    /// Remove `key`; `NotFound` if absent
    async fn delete(&self, key: &str) -> PipelineResult<()>;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> PipelineResult<()> {
        (**self).put(key, bytes).await
    }

    async fn get(&self, key: &str) -> PipelineResult<Vec<u8>> {
        (**self).get(key).await
    }

    async fn list(&self, prefix: &str) -> PipelineResult<Vec<String>> {
        (**self).list(prefix).await
    }

    async fn copy(&self, src: &str, dst: &str) -> PipelineResult<()> {
        (**self).copy(src, dst).await
    }

    async fn delete(&self, key: &str) -> PipelineResult<()> {
        (**self).delete(key).await
    }
}
