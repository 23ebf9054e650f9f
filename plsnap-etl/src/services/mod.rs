//! Pipeline services

pub mod deduplicator;
pub mod object_store;
pub mod pipeline_orchestrator;
pub mod raw_file_store;
pub mod record_extractor;
pub mod spotify_client;
pub mod storage_retry;
pub mod table_serializer;

pub use deduplicator::Table;
pub use object_store::{LocalObjectStore, MemoryObjectStore, ObjectStore, TimedObjectStore};
pub use pipeline_orchestrator::{PipelineOrchestrator, TablePublisher};
pub use raw_file_store::{AdvanceOutcome, RawFileStore};
pub use spotify_client::{SnapshotSource, SpotifyClient};
