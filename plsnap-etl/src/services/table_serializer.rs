//! CSV encoding of deduplicated tables
//!
//! Output is UTF-8 with a header row of the record's declared field names, `\n`
//! line endings, and quoting only where a field needs it. An empty table still
//! encodes to the header row.

use crate::error::{PipelineError, PipelineResult};
use crate::services::deduplicator::Table;
use crate::models::TableRecord;

/// Encode a table as CSV bytes
pub fn serialize_table<T: TableRecord>(table: &Table<T>) -> PipelineResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(T::FIELDS)?;
    for row in table.rows() {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(std::io::Error::new(e.error().kind(), e.to_string())))
}

/// Decode CSV bytes produced by [`serialize_table`]
///
/// The header must match the record's declared fields exactly.
pub fn parse_table<T: TableRecord>(bytes: &[u8]) -> PipelineResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader.headers()?;
    if !headers.iter().eq(T::FIELDS.iter().copied()) {
        return Err(PipelineError::Storage(format!(
            "{} table header mismatch: {:?}",
            T::ENTITY,
            headers
        )));
    }

    reader
        .deserialize()
        .map(|row| row.map_err(PipelineError::from))
        .collect()
}
