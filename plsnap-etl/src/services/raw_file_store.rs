//! Raw file lifecycle: pending → processed
//!
//! A raw file's state is the namespace it lives in. Advancing is copy-to-processed then
//! delete-from-pending, never a rename. A crash between the two leaves the file in both
//! namespaces and the next run extracts it again; dedup is recomputed from scratch each
//! run, so the re-extraction produces the same tables.
//!
//! Call [`RawFileStore::advance`] only after every table that included the file has been
//! published.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{RawFileId, RawSnapshot, RAW_FILE_SUFFIX};
use crate::services::object_store::ObjectStore;
use crate::services::storage_retry::retry_retryable;
use plsnap_common::config::StorageConfig;
use std::sync::Arc;

/// Result of advancing one raw file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Copied to processed and removed from pending by this call
    Advanced,
    /// Pending copy was already gone; another run advanced it
    AlreadyAdvanced,
}

/// Raw file operations over an object store
#[derive(Clone)]
pub struct RawFileStore {
    store: Arc<dyn ObjectStore>,
    pending_prefix: String,
    processed_prefix: String,
    max_retry_wait_ms: u64,
}

impl RawFileStore {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            pending_prefix: config.pending_prefix.clone(),
            processed_prefix: config.processed_prefix.clone(),
            max_retry_wait_ms: config.max_retry_wait_ms,
        }
    }

    pub fn pending_key(&self, id: &RawFileId) -> String {
        format!("{}{}", self.pending_prefix, id)
    }

    pub fn processed_key(&self, id: &RawFileId) -> String {
        format!("{}{}", self.processed_prefix, id)
    }

    /// Pending raw files, sorted by name
    pub async fn list_pending(&self) -> PipelineResult<Vec<RawFileId>> {
        self.list_namespace(&self.pending_prefix).await
    }

    /// Raw files already advanced
    pub async fn list_processed(&self) -> PipelineResult<Vec<RawFileId>> {
        self.list_namespace(&self.processed_prefix).await
    }

    async fn list_namespace(&self, prefix: &str) -> PipelineResult<Vec<RawFileId>> {
        let keys = retry_retryable("list raw files", self.max_retry_wait_ms, || {
            self.store.list(prefix)
        })
        .await?;

        let mut ids: Vec<RawFileId> = keys
            .iter()
            .filter_map(|key| key.strip_prefix(prefix))
            .filter(|name| name.ends_with(RAW_FILE_SUFFIX))
            .map(RawFileId::new)
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Read one pending raw file
    ///
    /// `NotFound` when the file was advanced after it was listed.
    pub async fn read_pending(&self, id: &RawFileId) -> PipelineResult<RawSnapshot> {
        let key = self.pending_key(id);
        let bytes = retry_retryable("read raw file", self.max_retry_wait_ms, || {
            self.store.get(&key)
        })
        .await?;
        RawSnapshot::from_bytes(id.clone(), &bytes)
    }

    /// Write a freshly fetched snapshot into the pending namespace
    pub async fn publish_raw(&self, snapshot: &RawSnapshot) -> PipelineResult<String> {
        let key = self.pending_key(&snapshot.id);
        let bytes = snapshot.to_bytes()?;
        retry_retryable("publish raw file", self.max_retry_wait_ms, || {
            self.store.put(&key, bytes.clone())
        })
        .await?;

        tracing::info!(key = %key, bytes = bytes.len(), "Raw snapshot published");
        Ok(key)
    }

    /// Move one raw file from pending to processed
    pub async fn advance(&self, id: &RawFileId) -> PipelineResult<AdvanceOutcome> {
        let pending = self.pending_key(id);
        let processed = self.processed_key(id);

        let copied = retry_retryable("copy raw file", self.max_retry_wait_ms, || {
            self.store.copy(&pending, &processed)
        })
        .await;

        match copied {
            Ok(()) => {}
            Err(PipelineError::NotFound(_)) => {
                tracing::info!(file = %id, "Raw file already advanced");
                return Ok(AdvanceOutcome::AlreadyAdvanced);
            }
            Err(e) => return Err(e),
        }

        let deleted = retry_retryable("delete raw file", self.max_retry_wait_ms, || {
            self.store.delete(&pending)
        })
        .await;

        match deleted {
            Ok(()) | Err(PipelineError::NotFound(_)) => {
                tracing::debug!(file = %id, to = %processed, "Raw file advanced");
                Ok(AdvanceOutcome::Advanced)
            }
            Err(e) => Err(e),
        }
    }
}
