//! plsnap-etl library interface
//!
//! Playlist snapshot ETL: fetch a playlist snapshot, keep it as a raw file in the
//! pending namespace, turn every pending snapshot into deduplicated album, song and
//! artist tables, publish them, and advance the raw files to processed.

pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{PipelineError, PipelineResult};
