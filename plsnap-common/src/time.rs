//! Timestamp utilities
//!
//! Raw snapshot names and published table names both embed a timestamp. The two
//! formats differ: raw files use a compact `YYYYMMDDHHMMSS` stamp, published tables
//! use the `YYYYMMDDTHHMMSS` run stamp.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format of the stamp embedded in raw snapshot file names
pub const RAW_STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Format of the run stamp embedded in published table names
pub const RUN_STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Stamp used in raw snapshot file names, e.g. `20230512101500`
pub fn raw_stamp(at: DateTime<Utc>) -> String {
    at.format(RAW_STAMP_FORMAT).to_string()
}

/// Stamp used in published table names, e.g. `20230512T101500`
pub fn run_stamp(at: DateTime<Utc>) -> String {
    at.format(RUN_STAMP_FORMAT).to_string()
}

/// Parse a raw file stamp back into a UTC timestamp
///
/// Returns None when the stamp does not match [`RAW_STAMP_FORMAT`].
pub fn parse_raw_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(stamp, RAW_STAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
