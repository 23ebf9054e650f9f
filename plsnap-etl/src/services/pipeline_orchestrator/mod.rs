//! Pipeline orchestrator
//!
//! # State Progression
//! FETCHING → PUBLISHING_RAW → READING → TRANSFORMING → ADVANCING → COMPLETED
//!
//! Each state is handled by a dedicated `phase_*` method, and every phase hands its
//! output to the next as a value:
//!
//! - **FETCHING**: pull one snapshot from the upstream source
//! - **PUBLISHING_RAW**: write it into the pending namespace
//! - **READING**: list and parse every pending raw file
//! - **TRANSFORMING**: album, song and artist branches run as separate tasks, each
//!   extracting, deduplicating and publishing one table
//! - **ADVANCING**: move the files read in this run to the processed namespace
//!
//! ADVANCING starts only after all three branches have published. A failed or cancelled
//! run leaves every raw file pending.
//!
//! Runs are not safe against each other on the same bucket; callers serialize them.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{PipelineRun, RunState};
use crate::services::object_store::ObjectStore;
use crate::services::raw_file_store::RawFileStore;
use crate::services::spotify_client::SnapshotSource;
use plsnap_common::config::StorageConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod phase_advancing;
mod phase_fetching;
mod phase_publishing_raw;
mod phase_reading;
mod phase_transforming;

pub use phase_transforming::TablePublisher;

/// Pipeline orchestrator service
pub struct PipelineOrchestrator {
    store: Arc<dyn ObjectStore>,
    raw_files: RawFileStore,
    source: Option<Arc<dyn SnapshotSource>>,
    published_prefix: String,
    max_retry_wait_ms: u64,
}

impl PipelineOrchestrator {
    /// Create an orchestrator over `store`
    ///
    /// Without a snapshot source only [`run_pending`](Self::run_pending) can succeed.
    pub fn new(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            raw_files: RawFileStore::new(store.clone(), config),
            store,
            source: None,
            published_prefix: config.published_prefix.clone(),
            max_retry_wait_ms: config.max_retry_wait_ms,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn SnapshotSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn raw_files(&self) -> &RawFileStore {
        &self.raw_files
    }

    /// Fetch a fresh snapshot, publish it, then process everything pending
    pub async fn run_full(
        &self,
        playlist_ref: &str,
        cancel_token: &CancellationToken,
    ) -> PipelineResult<PipelineRun> {
        let mut run = PipelineRun::new(RunState::Fetching);

        tracing::info!(
            run_id = %run.run_id,
            playlist = %playlist_ref,
            "Starting pipeline run"
        );

        let result = self.execute_full(&mut run, playlist_ref, cancel_token).await;
        Self::finish(run, result)
    }

    /// Process whatever is pending without fetching
    pub async fn run_pending(&self, cancel_token: &CancellationToken) -> PipelineResult<PipelineRun> {
        let mut run = PipelineRun::new(RunState::Reading);

        tracing::info!(run_id = %run.run_id, "Starting pending-only pipeline run");

        let result = self.execute_batch(&mut run, cancel_token).await;
        Self::finish(run, result)
    }

    async fn execute_full(
        &self,
        run: &mut PipelineRun,
        playlist_ref: &str,
        cancel_token: &CancellationToken,
    ) -> PipelineResult<()> {
        let snapshot = self.phase_fetching(run, playlist_ref).await?;
        if Self::cancelled(run, cancel_token) {
            return Ok(());
        }

        self.phase_publishing_raw(run, &snapshot).await?;

        self.execute_batch(run, cancel_token).await
    }

    async fn execute_batch(
        &self,
        run: &mut PipelineRun,
        cancel_token: &CancellationToken,
    ) -> PipelineResult<()> {
        if Self::cancelled(run, cancel_token) {
            return Ok(());
        }

        let snapshots = self.phase_reading(run).await?;
        if Self::cancelled(run, cancel_token) {
            return Ok(());
        }

        let read_files: Vec<_> = snapshots.iter().map(|s| s.source.clone()).collect();

        self.phase_transforming(run, snapshots).await?;
        if Self::cancelled(run, cancel_token) {
            return Ok(());
        }

        self.phase_advancing(run, &read_files).await?;

        run.transition_to(RunState::Completed);
        Ok(())
    }

    /// Move to CANCELLED if the token fired
    fn cancelled(run: &mut PipelineRun, cancel_token: &CancellationToken) -> bool {
        if !cancel_token.is_cancelled() {
            return false;
        }
        tracing::warn!(
            run_id = %run.run_id,
            state = ?run.state,
            "Pipeline run cancelled; raw files stay pending"
        );
        run.transition_to(RunState::Cancelled);
        true
    }

    fn finish(mut run: PipelineRun, result: PipelineResult<()>) -> PipelineResult<PipelineRun> {
        match result {
            Ok(()) => {
                tracing::info!(
                    run_id = %run.run_id,
                    state = ?run.state,
                    elapsed_ms = run.elapsed().num_milliseconds(),
                    files_read = run.report.files_read.len(),
                    files_advanced = run.report.files_advanced.len(),
                    "Pipeline run finished"
                );
                Ok(run)
            }
            Err(e) => {
                let failed_in = run.state;
                run.fail(e.to_string());
                tracing::error!(
                    run_id = %run.run_id,
                    phase = ?failed_in,
                    error = %e,
                    "Pipeline run failed"
                );
                Err(e)
            }
        }
    }

    fn missing_source() -> PipelineError {
        PipelineError::Auth("no snapshot source configured (missing client credentials?)".to_string())
    }
}
