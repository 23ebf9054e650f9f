//! # plsnap Common Library
//!
//! Shared code for the playlist snapshot ETL workspace:
//! - Error type shared by every crate
//! - TOML configuration loading and config file resolution
//! - Logging initialization
//! - Timestamp and object naming utilities

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
