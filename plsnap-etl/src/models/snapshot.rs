//! Raw snapshots and their schema-checked representation
//!
//! A [`RawSnapshot`] is the opaque JSON payload exactly as fetched and stored.
//! A [`PlaylistSnapshot`] is the same payload after one validation pass: every item is
//! classified as a track, an empty slot (null track) or a malformed entry, so later
//! stages never reach into untyped JSON.

use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// File name prefix of every fetched snapshot
pub const RAW_FILE_PREFIX: &str = "spotify_pk_raw_";

/// Suffix identifying raw snapshot files inside the pending namespace
pub const RAW_FILE_SUFFIX: &str = ".json";

/// Raw file identifier: the object key relative to its namespace prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawFileId(String);

impl RawFileId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name for a snapshot fetched at `at`: `spotify_pk_raw_<YYYYMMDDHHMMSS>.json`
    pub fn for_fetch(at: DateTime<Utc>) -> Self {
        Self(format!(
            "{}{}{}",
            RAW_FILE_PREFIX,
            plsnap_common::time::raw_stamp(at),
            RAW_FILE_SUFFIX
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fetch time encoded in the name, if the name follows the fetch convention
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        let stamp = self
            .0
            .strip_prefix(RAW_FILE_PREFIX)?
            .strip_suffix(RAW_FILE_SUFFIX)?;
        plsnap_common::time::parse_raw_stamp(stamp)
    }
}

impl std::fmt::Display for RawFileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fetched playlist payload, immutable once written
#[derive(Debug, Clone, PartialEq)]
pub struct RawSnapshot {
    pub id: RawFileId,
    pub payload: serde_json::Value,
}

impl RawSnapshot {
    pub fn new(id: RawFileId, payload: serde_json::Value) -> Self {
        Self { id, payload }
    }

    pub fn filename(&self) -> &str {
        self.id.as_str()
    }

    /// Encode the payload for storage
    pub fn to_bytes(&self) -> PipelineResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.payload)?)
    }

    /// Decode a stored payload
    ///
    /// Bytes that are not JSON make the whole file a `MalformedSnapshot`.
    pub fn from_bytes(id: RawFileId, bytes: &[u8]) -> PipelineResult<Self> {
        let payload =
            serde_json::from_slice(bytes).map_err(|e| PipelineError::MalformedSnapshot {
                file: id.to_string(),
                reason: format!("invalid JSON: {}", e),
            })?;
        Ok(Self { id, payload })
    }
}

/// Nested `track` object of a playlist item
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackPayload {
    pub id: String,
    pub name: String,
    pub duration_ms: u64,
    pub popularity: u8,
    pub external_urls: ExternalUrls,
    pub album: AlbumPayload,
    pub artists: Vec<ArtistPayload>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExternalUrls {
    pub spotify: String,
}

/// Nested `track.album` object
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlbumPayload {
    pub id: String,
    pub name: String,
    pub release_date: String,
    pub total_tracks: u32,
    pub uri: String,
}

/// One entry of `track.artists`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArtistPayload {
    pub id: String,
    pub name: String,
    pub href: String,
    pub uri: String,
}

/// Classified playlist item
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistItem {
    /// Item whose `track` is null or absent
    Empty,
    /// Schema-checked track; `added_at` stays raw until a song record needs it
    Track {
        added_at: Option<String>,
        track: TrackPayload,
    },
    /// Item whose nesting does not match the track schema
    Malformed { reason: String },
}

/// Snapshot after validation at extraction entry
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSnapshot {
    pub source: RawFileId,
    pub items: Vec<PlaylistItem>,
}

impl PlaylistSnapshot {
    /// Items that carry a track
    pub fn track_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, PlaylistItem::Track { .. }))
            .count()
    }

    /// Items rejected by the schema check
    pub fn malformed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, PlaylistItem::Malformed { .. }))
            .count()
    }
}
