//! Phase: READING
//!
//! Lists the pending namespace once and parses every listed file. A file that
//! disappears between listing and reading was advanced by another run after capturing
//! its data, so it is skipped. A file that is not a playlist snapshot fails the batch.

use super::PipelineOrchestrator;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{PipelineRun, PlaylistSnapshot, RunState};
use crate::services::record_extractor;

impl PipelineOrchestrator {
    pub(super) async fn phase_reading(
        &self,
        run: &mut PipelineRun,
    ) -> PipelineResult<Vec<PlaylistSnapshot>> {
        run.transition_to(RunState::Reading);

        let pending = self.raw_files.list_pending().await?;

        tracing::info!(
            run_id = %run.run_id,
            pending = pending.len(),
            "Phase: READING"
        );

        let mut snapshots = Vec::with_capacity(pending.len());

        for id in pending {
            let raw = match self.raw_files.read_pending(&id).await {
                Ok(raw) => raw,
                Err(PipelineError::NotFound(_)) => {
                    tracing::warn!(
                        run_id = %run.run_id,
                        file = %id,
                        "Raw file vanished after listing, skipping"
                    );
                    run.report.files_skipped.push(id.to_string());
                    continue;
                }
                Err(e) => return Err(e),
            };

            let snapshot = record_extractor::parse_snapshot(raw)?;

            tracing::debug!(
                run_id = %run.run_id,
                file = %id,
                fetched_at = ?id.fetched_at(),
                tracks = snapshot.track_count(),
                malformed = snapshot.malformed_count(),
                "Raw file read"
            );

            run.report.files_read.push(id.to_string());
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }
}
