//! Phase: ADVANCING
//!
//! Only reached after all tables are published. Advances exactly the files read in
//! this run; anything that landed in pending since then waits for the next run.

use super::PipelineOrchestrator;
use crate::error::PipelineResult;
use crate::models::{PipelineRun, RawFileId, RunState};
use crate::services::raw_file_store::AdvanceOutcome;

impl PipelineOrchestrator {
    pub(super) async fn phase_advancing(
        &self,
        run: &mut PipelineRun,
        files: &[RawFileId],
    ) -> PipelineResult<()> {
        run.transition_to(RunState::Advancing);
        tracing::info!(run_id = %run.run_id, files = files.len(), "Phase: ADVANCING");

        for id in files {
            match self.raw_files.advance(id).await? {
                AdvanceOutcome::Advanced => run.report.files_advanced.push(id.to_string()),
                AdvanceOutcome::AlreadyAdvanced => {
                    tracing::warn!(
                        run_id = %run.run_id,
                        file = %id,
                        "Raw file advanced by another run"
                    );
                }
            }
        }

        Ok(())
    }
}
