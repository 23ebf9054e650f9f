//! Data models for plsnap-etl

pub mod pipeline_run;
pub mod records;
pub mod snapshot;

pub use pipeline_run::{PipelineRun, RunReport, RunState, StateTransition, TableSummary};
pub use records::{
    AlbumCandidate, AlbumRecord, ArtistRecord, EntityKind, SongRecord, TableRecord,
};
pub use snapshot::{
    AlbumPayload, ArtistPayload, ExternalUrls, PlaylistItem, PlaylistSnapshot, RawFileId,
    RawSnapshot, TrackPayload, RAW_FILE_PREFIX, RAW_FILE_SUFFIX,
};
