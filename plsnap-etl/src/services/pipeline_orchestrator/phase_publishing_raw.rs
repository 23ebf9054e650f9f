//! Phase: PUBLISHING_RAW

use super::PipelineOrchestrator;
use crate::error::PipelineResult;
use crate::models::{PipelineRun, RawSnapshot, RunState};

impl PipelineOrchestrator {
    /// Write the fetched snapshot into the pending namespace
    pub(super) async fn phase_publishing_raw(
        &self,
        run: &mut PipelineRun,
        snapshot: &RawSnapshot,
    ) -> PipelineResult<()> {
        run.transition_to(RunState::PublishingRaw);
        tracing::info!(run_id = %run.run_id, file = %snapshot.id, "Phase: PUBLISHING_RAW");

        let key = self.raw_files.publish_raw(snapshot).await?;
        run.report.raw_published = Some(key);
        Ok(())
    }
}
