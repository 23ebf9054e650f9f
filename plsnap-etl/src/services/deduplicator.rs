//! Per-entity deduplication
//!
//! Dedup keeps the last candidate seen for each key and places it at the position
//! where that key first appeared. Album release dates are normalized before dedup,
//! so a bad date on an early duplicate still fails the batch.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{AlbumCandidate, AlbumRecord, TableRecord};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Deduplicated table: unique keys, first-appearance order
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T> {
    rows: Vec<T>,
}

impl<T: TableRecord> Table<T> {
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

/// Collapse candidates to one row per key
pub fn dedup<T, I>(candidates: I) -> Table<T>
where
    T: TableRecord,
    I: IntoIterator<Item = T>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<T> = Vec::new();

    for candidate in candidates {
        match positions.get(candidate.key()) {
            Some(&at) => rows[at] = candidate,
            None => {
                positions.insert(candidate.key().to_string(), rows.len());
                rows.push(candidate);
            }
        }
    }

    Table { rows }
}

/// Normalize a release date at year, month or day precision
///
/// `YYYY` maps to January 1 and `YYYY-MM` to the first of the month.
pub fn normalize_release_date(value: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = value.trim().split('-').collect();
    let number = |s: &str, width: usize| -> Option<u32> {
        if s.len() == width && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse().ok()
        } else {
            None
        }
    };

    match parts.as_slice() {
        [y] => NaiveDate::from_ymd_opt(number(y, 4)? as i32, 1, 1),
        [y, m] => NaiveDate::from_ymd_opt(number(y, 4)? as i32, number(m, 2)?, 1),
        [y, m, d] => NaiveDate::from_ymd_opt(number(y, 4)? as i32, number(m, 2)?, number(d, 2)?),
        _ => None,
    }
}

/// Normalize every album candidate, then dedup by `album_id`
///
/// Any unparseable date fails the whole table with `DateParse`.
pub fn build_album_table<I>(candidates: I) -> PipelineResult<Table<AlbumRecord>>
where
    I: IntoIterator<Item = AlbumCandidate>,
{
    let records = candidates
        .into_iter()
        .map(|candidate| {
            let release_date = normalize_release_date(&candidate.release_date).ok_or_else(|| {
                PipelineError::DateParse {
                    album_id: candidate.album_id.clone(),
                    value: candidate.release_date.clone(),
                }
            })?;
            Ok(AlbumRecord {
                album_id: candidate.album_id,
                album_name: candidate.album_name,
                release_date,
                total_tracks: candidate.total_tracks,
                uri: candidate.uri,
            })
        })
        .collect::<PipelineResult<Vec<_>>>()?;

    Ok(dedup(records))
}
