//! Pipeline run state machine
//!
//! A run progresses through ordered states:
//! FETCHING → PUBLISHING_RAW → READING → TRANSFORMING → ADVANCING → COMPLETED
//!
//! `process` runs start at READING. Any state may end in CANCELLED or FAILED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::records::EntityKind;

/// Pipeline run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Fetching a snapshot from upstream
    Fetching,
    /// Writing the fetched snapshot into the pending namespace
    PublishingRaw,
    /// Listing and reading pending raw files
    Reading,
    /// Extract, dedup and publish per entity kind
    Transforming,
    /// Moving read raw files to the processed namespace
    Advancing,
    /// Run finished successfully
    Completed,
    /// Run cancelled before advancing
    Cancelled,
    /// Run failed; no raw file was advanced
    Failed,
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: RunState,
    pub new_state: RunState,
    pub transitioned_at: DateTime<Utc>,
}

/// Per-table outcome of the transform stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    /// Rows after dedup
    pub rows: usize,
    /// Candidates before dedup
    pub candidates: usize,
    /// Records skipped as malformed
    pub malformed_skipped: usize,
    /// Object key the table was published under
    pub key: String,
}

/// Outcome of a run, returned to the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Raw file written by the fetch stage, if the run fetched
    pub raw_published: Option<String>,
    /// Raw files read and transformed
    pub files_read: Vec<String>,
    /// Raw files that vanished between listing and reading
    pub files_skipped: Vec<String>,
    /// Per-entity table outcomes
    pub tables: BTreeMap<String, TableSummary>,
    /// Raw files moved to the processed namespace
    pub files_advanced: Vec<String>,
}

impl RunReport {
    pub fn table(&self, entity: EntityKind) -> Option<&TableSummary> {
        self.tables.get(entity.name())
    }
}

/// One pipeline run (in-memory state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Unique run identifier
    pub run_id: Uuid,

    /// Current state
    pub state: RunState,

    /// Stamp embedded in published table names (`YYYYMMDDTHHMMSS`)
    pub run_stamp: String,

    /// Accumulated report
    pub report: RunReport,

    /// Error message if the run failed
    pub failure: Option<String>,

    /// Run start time
    pub started_at: DateTime<Utc>,

    /// Run end time (if completed/cancelled/failed)
    pub ended_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Create a run starting in `initial` state
    pub fn new(initial: RunState) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            state: initial,
            run_stamp: plsnap_common::time::run_stamp(started_at),
            report: RunReport::default(),
            failure: None,
            started_at,
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: RunState) -> StateTransition {
        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if self.is_terminal() {
            self.ended_at = Some(transition.transitioned_at);
        }

        tracing::debug!(
            run_id = %self.run_id,
            from = ?transition.old_state,
            to = ?transition.new_state,
            "Run state transition"
        );

        transition
    }

    /// Mark the run failed with a reason
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
        self.transition_to(RunState::Failed);
    }

    /// Check if run is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            RunState::Completed | RunState::Cancelled | RunState::Failed
        )
    }

    /// Elapsed wall time, up to the end time when terminal
    pub fn elapsed(&self) -> chrono::Duration {
        self.ended_at.unwrap_or_else(Utc::now) - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_has_stamp_and_no_end() {
        let run = PipelineRun::new(RunState::Fetching);
        assert_eq!(run.state, RunState::Fetching);
        assert_eq!(run.run_stamp.len(), "20230512T101500".len());
        assert!(run.ended_at.is_none());
        assert!(!run.is_terminal());
    }

    #[test]
    fn test_transition_records_old_and_new() {
        let mut run = PipelineRun::new(RunState::Reading);
        let transition = run.transition_to(RunState::Transforming);
        assert_eq!(transition.old_state, RunState::Reading);
        assert_eq!(transition.new_state, RunState::Transforming);
        assert_eq!(run.state, RunState::Transforming);
        assert!(run.ended_at.is_none());
    }

    #[test]
    fn test_terminal_states_set_end_time() {
        for terminal in [RunState::Completed, RunState::Cancelled, RunState::Failed] {
            let mut run = PipelineRun::new(RunState::Advancing);
            run.transition_to(terminal);
            assert!(run.is_terminal());
            assert!(run.ended_at.is_some());
        }
    }

    #[test]
    fn test_fail_keeps_reason() {
        let mut run = PipelineRun::new(RunState::Transforming);
        run.fail("storage timeout");
        assert_eq!(run.state, RunState::Failed);
        assert_eq!(run.failure.as_deref(), Some("storage timeout"));
    }

    #[test]
    fn test_state_serializes_screaming_snake() {
        let json = serde_json::to_string(&RunState::PublishingRaw).unwrap();
        assert_eq!(json, "\"PUBLISHING_RAW\"");
    }
}
