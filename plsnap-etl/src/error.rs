//! Error types for plsnap-etl
//!
//! Error severity categorization:
//! - **Fatal for the run:** `UpstreamUnavailable`, `Auth`, storage failures after retries
//! - **Retryable:** `StorageTimeout`, `UpstreamUnavailable`
//! - **Skipped locally:** `MalformedRecord` (per record), `NotFound` (per raw file)
//! - **Fatal for the batch:** `DateParse`, `MalformedSnapshot`
//!
//! Any error that reaches the orchestrator aborts the run before raw files advance.

use thiserror::Error;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream playlist API unreachable or failing (network, 429, 5xx)
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream rejected the credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A storage operation exceeded its time bound
    #[error("Storage timeout: {operation} {key} exceeded {timeout_ms} ms")]
    StorageTimeout {
        operation: &'static str,
        key: String,
        timeout_ms: u64,
    },

    /// Object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// One item of a snapshot is missing required nested fields
    #[error("Malformed record at item {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// A whole raw file is unreadable as a playlist snapshot
    #[error("Malformed snapshot {file}: {reason}")]
    MalformedSnapshot { file: String, reason: String },

    /// Album release date could not be normalized to a calendar date
    #[error("Invalid release date {value:?} for album {album_id}")]
    DateParse { album_id: String, value: String },

    /// Any other object store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Table encoding or decoding failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline branch task panicked or was aborted
    #[error("Task failed: {0}")]
    Task(String),

    /// plsnap-common error
    #[error("Common error: {0}")]
    Common(#[from] plsnap_common::Error),
}

impl PipelineError {
    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::StorageTimeout { .. } | PipelineError::UpstreamUnavailable(_)
        )
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Task(err.to_string())
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
