//! Phase: FETCHING
//!
//! One upstream call. Upstream and auth failures end the run; the whole run is
//! retried later rather than the fetch in place.

use super::PipelineOrchestrator;
use crate::error::PipelineResult;
use crate::models::{PipelineRun, RawSnapshot};

impl PipelineOrchestrator {
    pub(super) async fn phase_fetching(
        &self,
        run: &mut PipelineRun,
        playlist_ref: &str,
    ) -> PipelineResult<RawSnapshot> {
        tracing::info!(run_id = %run.run_id, "Phase: FETCHING");

        let source = self.source.as_ref().ok_or_else(Self::missing_source)?;
        let snapshot = source.fetch(playlist_ref).await?;

        tracing::info!(
            run_id = %run.run_id,
            file = %snapshot.id,
            "Snapshot fetched"
        );

        Ok(snapshot)
    }
}
