//! Record extraction from raw playlist snapshots
//!
//! Extraction happens in two steps:
//! 1. [`parse_snapshot`] validates the payload once and classifies every item as a
//!    track, an empty slot (null `track`) or a malformed entry.
//! 2. [`album_candidates`], [`song_candidates`] and [`artist_candidates`] each make
//!    one lazy pass over the classified items.
//!
//! Empty slots produce nothing in any pass. Malformed items produce one
//! `MalformedRecord` error per pass so each branch can log and skip on its own.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    AlbumCandidate, ArtistPayload, ArtistRecord, PlaylistItem, PlaylistSnapshot, RawFileId,
    RawSnapshot, SongRecord, TrackPayload,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Validate a raw snapshot into a [`PlaylistSnapshot`]
///
/// The payload must be an object with an `items` array; anything else is a
/// `MalformedSnapshot`. Problems inside a single item never fail the snapshot.
pub fn parse_snapshot(raw: RawSnapshot) -> PipelineResult<PlaylistSnapshot> {
    let RawSnapshot { id, payload } = raw;

    let items = match payload {
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(malformed_snapshot(&id, "`items` is not an array")),
            None => return Err(malformed_snapshot(&id, "missing `items`")),
        },
        _ => return Err(malformed_snapshot(&id, "payload is not an object")),
    };

    let items: Vec<PlaylistItem> = items.into_iter().map(classify_item).collect();

    tracing::debug!(
        file = %id,
        items = items.len(),
        "Snapshot parsed"
    );

    Ok(PlaylistSnapshot { source: id, items })
}

fn malformed_snapshot(id: &RawFileId, reason: &str) -> PipelineError {
    PipelineError::MalformedSnapshot {
        file: id.to_string(),
        reason: reason.to_string(),
    }
}

fn classify_item(value: Value) -> PlaylistItem {
    let Value::Object(mut item) = value else {
        return PlaylistItem::Malformed {
            reason: "item is not an object".to_string(),
        };
    };

    let track = match item.remove("track") {
        None | Some(Value::Null) => return PlaylistItem::Empty,
        Some(track) => track,
    };

    let added_at = match item.remove("added_at") {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };

    match serde_json::from_value::<TrackPayload>(track) {
        Ok(track) if track.popularity > 100 => PlaylistItem::Malformed {
            reason: format!("track.popularity {} outside 0-100", track.popularity),
        },
        Ok(track) => PlaylistItem::Track { added_at, track },
        Err(e) => PlaylistItem::Malformed {
            reason: format!("track: {}", e),
        },
    }
}

fn malformed_record(index: usize, reason: impl Into<String>) -> PipelineError {
    PipelineError::MalformedRecord {
        index,
        reason: reason.into(),
    }
}

/// Album candidates, one per track
pub fn album_candidates(
    snapshot: &PlaylistSnapshot,
) -> impl Iterator<Item = PipelineResult<AlbumCandidate>> + '_ {
    snapshot
        .items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match item {
            PlaylistItem::Empty => None,
            PlaylistItem::Malformed { reason } => Some(Err(malformed_record(index, reason))),
            PlaylistItem::Track { track, .. } => Some(Ok(AlbumCandidate {
                album_id: track.album.id.clone(),
                album_name: track.album.name.clone(),
                release_date: track.album.release_date.clone(),
                total_tracks: track.album.total_tracks,
                uri: track.album.uri.clone(),
            })),
        })
}

/// Song candidates, one per track
///
/// A track without artists or without a valid `added_at` is a `MalformedRecord`.
pub fn song_candidates(
    snapshot: &PlaylistSnapshot,
) -> impl Iterator<Item = PipelineResult<SongRecord>> + '_ {
    snapshot
        .items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match item {
            PlaylistItem::Empty => None,
            PlaylistItem::Malformed { reason } => Some(Err(malformed_record(index, reason))),
            PlaylistItem::Track { added_at, track } => Some(song_record(index, added_at, track)),
        })
}

fn song_record(
    index: usize,
    added_at: &Option<String>,
    track: &TrackPayload,
) -> PipelineResult<SongRecord> {
    let first_artist = track
        .artists
        .first()
        .ok_or_else(|| malformed_record(index, format!("track {} has no artists", track.id)))?;

    let added_at = added_at
        .as_deref()
        .ok_or_else(|| malformed_record(index, "missing added_at"))?;
    let added_at = DateTime::parse_from_rfc3339(added_at)
        .map_err(|e| malformed_record(index, format!("added_at {:?}: {}", added_at, e)))?
        .with_timezone(&Utc);

    Ok(SongRecord {
        song_id: track.id.clone(),
        song_name: track.name.clone(),
        duration_ms: track.duration_ms,
        popularity: track.popularity,
        added_at,
        external_url: track.external_urls.spotify.clone(),
        album_id: track.album.id.clone(),
        artist_id: first_artist.id.clone(),
    })
}

/// Artist candidates, one per listed artist of every track
pub fn artist_candidates(
    snapshot: &PlaylistSnapshot,
) -> impl Iterator<Item = PipelineResult<ArtistRecord>> + '_ {
    snapshot
        .items
        .iter()
        .enumerate()
        .flat_map(|(index, item)| {
            let candidates: Vec<PipelineResult<ArtistRecord>> = match item {
                PlaylistItem::Empty => Vec::new(),
                PlaylistItem::Malformed { reason } => vec![Err(malformed_record(index, reason))],
                PlaylistItem::Track { track, .. } => {
                    track.artists.iter().map(|a| Ok(artist_record(a))).collect()
                }
            };
            candidates
        })
}

fn artist_record(artist: &ArtistPayload) -> ArtistRecord {
    ArtistRecord {
        artist_id: artist.id.clone(),
        artist_name: artist.name.clone(),
        href: artist.href.clone(),
        uri: artist.uri.clone(),
    }
}
