//! Test Helper Utilities
//!
//! Playlist payload fixtures, a scripted snapshot source, and a fault-injecting
//! object store.

#![allow(dead_code)]

pub mod log_capture;

pub use log_capture::{capture_logs, LogCapture};

use async_trait::async_trait;
use plsnap_common::config::StorageConfig;
use plsnap_etl::models::{EntityKind, PipelineRun, RawFileId, RawSnapshot, TableRecord};
use plsnap_etl::services::table_serializer::parse_table;
use plsnap_etl::services::{MemoryObjectStore, ObjectStore, SnapshotSource};
use plsnap_etl::{PipelineError, PipelineResult};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Payload fixtures
// ============================================================================

pub fn artist_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Artist {}", id),
        "href": format!("https://api.spotify.com/v1/artists/{}", id),
        "uri": format!("spotify:artist:{}", id),
    })
}

/// Playlist item with a full track
pub fn track_item(
    song_id: &str,
    album_id: &str,
    album_name: &str,
    release_date: &str,
    artists: &[&str],
) -> Value {
    json!({
        "added_at": "2023-06-01T08:30:00Z",
        "track": {
            "id": song_id,
            "name": format!("Song {}", song_id),
            "duration_ms": 215_000,
            "popularity": 71,
            "external_urls": {"spotify": format!("https://open.spotify.com/track/{}", song_id)},
            "album": {
                "id": album_id,
                "name": album_name,
                "release_date": release_date,
                "total_tracks": 12,
                "uri": format!("spotify:album:{}", album_id),
            },
            "artists": artists.iter().map(|a| artist_json(a)).collect::<Vec<_>>(),
        }
    })
}

/// Playlist item whose track is null (removed or unavailable)
pub fn null_track_item() -> Value {
    json!({"added_at": "2023-06-01T08:30:00Z", "track": null})
}

pub fn playlist_payload(items: Vec<Value>) -> Value {
    let total = items.len();
    json!({
        "href": "https://api.spotify.com/v1/playlists/abc/tracks",
        "items": items,
        "limit": 100,
        "next": null,
        "offset": 0,
        "total": total,
    })
}

/// Raw file name for the n-th fetch of a test
pub fn raw_name(n: u32) -> String {
    format!("spotify_pk_raw_202306010000{:02}.json", n)
}

// ============================================================================
// Store helpers
// ============================================================================

/// Storage layout with a short retry budget
pub fn test_storage_config() -> StorageConfig {
    StorageConfig {
        max_retry_wait_ms: 50,
        ..StorageConfig::default()
    }
}

pub async fn seed_pending(store: &dyn ObjectStore, name: &str, payload: &Value) {
    store
        .put(
            &format!("raw/pending/{}", name),
            serde_json::to_vec(payload).unwrap(),
        )
        .await
        .unwrap();
}

pub async fn keys_under(store: &dyn ObjectStore, prefix: &str) -> Vec<String> {
    store.list(prefix).await.unwrap()
}

/// Rows of the table a run published for `T`
pub async fn published_rows<T: TableRecord>(store: &dyn ObjectStore, run: &PipelineRun) -> Vec<T> {
    let summary = run
        .report
        .table(T::ENTITY)
        .unwrap_or_else(|| panic!("no {} table in report", T::ENTITY));
    let bytes = store.get(&summary.key).await.unwrap();
    parse_table(&bytes).unwrap()
}

pub fn table_key(run: &PipelineRun, entity: EntityKind) -> String {
    run.report.table(entity).unwrap().key.clone()
}

// ============================================================================
// Scripted snapshot source
// ============================================================================

/// Returns queued payloads in order, then fails as upstream unavailable
#[derive(Default)]
pub struct StubSource {
    payloads: Mutex<VecDeque<Value>>,
    fetches: AtomicUsize,
    auth_failure: AtomicBool,
}

impl StubSource {
    pub fn with_payloads(payloads: Vec<Value>) -> Self {
        Self {
            payloads: Mutex::new(payloads.into()),
            ..Self::default()
        }
    }

    pub fn rejecting_credentials() -> Self {
        let source = Self::default();
        source.auth_failure.store(true, Ordering::SeqCst);
        source
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for StubSource {
    async fn fetch(&self, _playlist_ref: &str) -> PipelineResult<RawSnapshot> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) as u32;
        if self.auth_failure.load(Ordering::SeqCst) {
            return Err(PipelineError::Auth("401 Unauthorized".to_string()));
        }
        let payload = self
            .payloads
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PipelineError::UpstreamUnavailable("503 Service Unavailable".to_string()))?;
        Ok(RawSnapshot::new(RawFileId::new(raw_name(50 + n)), payload))
    }
}

// ============================================================================
// Fault-injecting store
// ============================================================================

/// Memory store with switchable failures
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryObjectStore,
    fail_deletes: AtomicBool,
    fail_puts_under: Mutex<Option<String>>,
    get_delay: Mutex<Option<Duration>>,
    vanish_on_get: Mutex<Option<String>>,
    arrive_after_list: Mutex<Option<(String, Vec<u8>)>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a crash between copy and delete
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_puts_under(&self, prefix: &str) {
        *self.fail_puts_under.lock().unwrap() = Some(prefix.to_string());
    }

    pub fn delay_gets(&self, delay: Duration) {
        *self.get_delay.lock().unwrap() = Some(delay);
    }

    /// Remove `key` right before it is read, as if another run advanced it
    pub fn vanish_on_get(&self, key: &str) {
        *self.vanish_on_get.lock().unwrap() = Some(key.to_string());
    }

    /// Write an object right after the next listing
    pub fn arrive_after_list(&self, key: &str, bytes: Vec<u8>) {
        *self.arrive_after_list.lock().unwrap() = Some((key.to_string(), bytes));
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> PipelineResult<()> {
        let blocked = self
            .fail_puts_under
            .lock()
            .unwrap()
            .as_deref()
            .map_or(false, |prefix| key.starts_with(prefix));
        if blocked {
            return Err(PipelineError::Storage(format!("injected put failure: {}", key)));
        }
        self.inner.put(key, bytes).await
    }

    async fn get(&self, key: &str) -> PipelineResult<Vec<u8>> {
        let delay = *self.get_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let vanish = self.vanish_on_get.lock().unwrap().as_deref() == Some(key);
        if vanish {
            let _ = self.inner.delete(key).await;
        }
        self.inner.get(key).await
    }

    async fn list(&self, prefix: &str) -> PipelineResult<Vec<String>> {
        let keys = self.inner.list(prefix).await?;
        let arrival = self.arrive_after_list.lock().unwrap().take();
        if let Some((key, bytes)) = arrival {
            self.inner.put(&key, bytes).await?;
        }
        Ok(keys)
    }

    async fn copy(&self, src: &str, dst: &str) -> PipelineResult<()> {
        self.inner.copy(src, dst).await
    }

    async fn delete(&self, key: &str) -> PipelineResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PipelineError::Storage(format!("injected delete failure: {}", key)));
        }
        self.inner.delete(key).await
    }
}
