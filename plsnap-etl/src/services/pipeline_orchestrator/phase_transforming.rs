//! Phase: TRANSFORMING
//!
//! Fan-out into three tasks, one per entity kind. Each task reads the shared snapshots,
//! skips malformed records, deduplicates and publishes its table. Fan-in waits for all
//! three; if any fails the phase fails and nothing is advanced.

use super::PipelineOrchestrator;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    ArtistRecord, EntityKind, PipelineRun, PlaylistSnapshot, RawFileId, RunState, SongRecord,
    TableRecord, TableSummary,
};
use crate::services::deduplicator::{self, Table};
use crate::services::object_store::ObjectStore;
use crate::services::storage_retry::retry_retryable;
use crate::services::{record_extractor, table_serializer};
use std::sync::Arc;
use uuid::Uuid;

/// Writes finished tables under `<published_prefix><entity namespace>`
#[derive(Clone)]
pub struct TablePublisher {
    store: Arc<dyn ObjectStore>,
    published_prefix: String,
    run_stamp: String,
    max_retry_wait_ms: u64,
}

impl TablePublisher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        published_prefix: impl Into<String>,
        run_stamp: impl Into<String>,
        max_retry_wait_ms: u64,
    ) -> Self {
        Self {
            store,
            published_prefix: published_prefix.into(),
            run_stamp: run_stamp.into(),
            max_retry_wait_ms,
        }
    }

    /// Object key a table of `entity` is published under for this run
    pub fn key_for(&self, entity: EntityKind) -> String {
        format!(
            "{}{}{}",
            self.published_prefix,
            entity.namespace(),
            entity.table_file_name(&self.run_stamp)
        )
    }

    /// Serialize and write one complete table; returns its key
    pub async fn publish<T: TableRecord>(&self, table: &Table<T>) -> PipelineResult<String> {
        let key = self.key_for(T::ENTITY);
        let bytes = table_serializer::serialize_table(table)?;

        retry_retryable("publish table", self.max_retry_wait_ms, || {
            self.store.put(&key, bytes.clone())
        })
        .await?;

        Ok(key)
    }
}

impl PipelineOrchestrator {
    pub(super) async fn phase_transforming(
        &self,
        run: &mut PipelineRun,
        snapshots: Vec<PlaylistSnapshot>,
    ) -> PipelineResult<()> {
        run.transition_to(RunState::Transforming);
        tracing::info!(
            run_id = %run.run_id,
            snapshots = snapshots.len(),
            "Phase: TRANSFORMING"
        );

        let snapshots = Arc::new(snapshots);
        let publisher = TablePublisher::new(
            self.store.clone(),
            self.published_prefix.clone(),
            run.run_stamp.clone(),
            self.max_retry_wait_ms,
        );
        let run_id = run.run_id;

        let albums = tokio::spawn(album_branch(run_id, publisher.clone(), snapshots.clone()));
        let songs = tokio::spawn(record_branch::<SongRecord, _>(
            run_id,
            publisher.clone(),
            snapshots.clone(),
            |snapshot| record_extractor::song_candidates(snapshot).collect(),
        ));
        let artists = tokio::spawn(record_branch::<ArtistRecord, _>(
            run_id,
            publisher,
            snapshots,
            |snapshot| record_extractor::artist_candidates(snapshot).collect(),
        ));

        // fan-in barrier
        let (albums, songs, artists) = tokio::join!(albums, songs, artists);

        let mut first_error: Option<PipelineError> = None;
        for (entity, joined) in [
            (EntityKind::Album, albums),
            (EntityKind::Song, songs),
            (EntityKind::Artist, artists),
        ] {
            match joined.map_err(PipelineError::from).and_then(|r| r) {
                Ok(summary) => {
                    run.report.tables.insert(entity.name().to_string(), summary);
                }
                Err(e) => {
                    tracing::error!(
                        run_id = %run_id,
                        entity = %entity,
                        error = %e,
                        "Branch failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Collect the valid candidates of one snapshot, logging and counting malformed ones
fn gather<T>(
    run_id: Uuid,
    entity: EntityKind,
    source: &RawFileId,
    candidates: Vec<PipelineResult<T>>,
    out: &mut Vec<T>,
) -> PipelineResult<usize> {
    let mut malformed = 0;
    for candidate in candidates {
        match candidate {
            Ok(record) => out.push(record),
            Err(PipelineError::MalformedRecord { index, reason }) => {
                tracing::warn!(
                    run_id = %run_id,
                    entity = %entity,
                    file = %source,
                    index,
                    reason = %reason,
                    "Skipping malformed record"
                );
                malformed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(malformed)
}

async fn album_branch(
    run_id: Uuid,
    publisher: TablePublisher,
    snapshots: Arc<Vec<PlaylistSnapshot>>,
) -> PipelineResult<TableSummary> {
    let mut candidates = Vec::new();
    let mut malformed = 0;
    for snapshot in snapshots.iter() {
        malformed += gather(
            run_id,
            EntityKind::Album,
            &snapshot.source,
            record_extractor::album_candidates(snapshot).collect(),
            &mut candidates,
        )?;
    }

    let candidate_count = candidates.len();
    let table = deduplicator::build_album_table(candidates)?;
    publish_branch(run_id, &publisher, &table, candidate_count, malformed).await
}

async fn record_branch<T, F>(
    run_id: Uuid,
    publisher: TablePublisher,
    snapshots: Arc<Vec<PlaylistSnapshot>>,
    extract: F,
) -> PipelineResult<TableSummary>
where
    T: TableRecord,
    F: Fn(&PlaylistSnapshot) -> Vec<PipelineResult<T>> + Send + 'static,
{
    let mut candidates = Vec::new();
    let mut malformed = 0;
    for snapshot in snapshots.iter() {
        malformed += gather(
            run_id,
            T::ENTITY,
            &snapshot.source,
            extract(snapshot),
            &mut candidates,
        )?;
    }

    let candidate_count = candidates.len();
    let table = deduplicator::dedup(candidates);
    publish_branch(run_id, &publisher, &table, candidate_count, malformed).await
}

async fn publish_branch<T: TableRecord>(
    run_id: Uuid,
    publisher: &TablePublisher,
    table: &Table<T>,
    candidates: usize,
    malformed_skipped: usize,
) -> PipelineResult<TableSummary> {
    let key = publisher.publish(table).await?;
    let entity = T::ENTITY;

    tracing::info!(
        run_id = %run_id,
        entity = %entity,
        key = %key,
        rows = table.len(),
        candidates,
        malformed_skipped,
        "Table published"
    );

    Ok(TableSummary {
        rows: table.len(),
        candidates,
        malformed_skipped,
        key,
    })
}
