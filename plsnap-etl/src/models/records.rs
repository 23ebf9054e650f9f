//! Normalized entity records
//!
//! Three tables come out of every batch: albums, songs and artists. Each record type
//! declares its key and its column order through [`TableRecord`]; the serde field
//! order of every struct matches `FIELDS`, which is what the serializer writes as the
//! header row.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Entity kinds produced by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Album,
    Song,
    Artist,
}

impl EntityKind {
    /// All kinds, in publish order
    pub const ALL: [EntityKind; 3] = [EntityKind::Album, EntityKind::Song, EntityKind::Artist];

    /// Singular name used in published file names
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Album => "album",
            EntityKind::Song => "song",
            EntityKind::Artist => "artist",
        }
    }

    /// Namespace segment under the published prefix
    pub fn namespace(self) -> &'static str {
        match self {
            EntityKind::Album => "albums/",
            EntityKind::Song => "songs/",
            EntityKind::Artist => "artists/",
        }
    }

    /// `<entity>_pk_transformed_<runTimestamp>.csv`
    pub fn table_file_name(self, run_stamp: &str) -> String {
        format!("{}_pk_transformed_{}.csv", self.name(), run_stamp)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A row type of one published table
pub trait TableRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Which table this record belongs to
    const ENTITY: EntityKind;

    /// Column names in declared order
    const FIELDS: &'static [&'static str];

    /// Value of the unique key column
    fn key(&self) -> &str;
}

/// Album as extracted, before its release date is normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumCandidate {
    pub album_id: String,
    pub album_name: String,
    pub release_date: String,
    pub total_tracks: u32,
    pub uri: String,
}

/// Album table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub album_id: String,
    pub album_name: String,
    pub release_date: NaiveDate,
    pub total_tracks: u32,
    pub uri: String,
}

impl TableRecord for AlbumRecord {
    const ENTITY: EntityKind = EntityKind::Album;
    const FIELDS: &'static [&'static str] =
        &["album_id", "album_name", "release_date", "total_tracks", "uri"];

    fn key(&self) -> &str {
        &self.album_id
    }
}

/// Song table row
///
/// `artist_id` is the first artist listed on the track. Other artists only appear in
/// the artist table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub song_name: String,
    pub duration_ms: u64,
    pub popularity: u8,
    pub added_at: DateTime<Utc>,
    pub external_url: String,
    pub album_id: String,
    pub artist_id: String,
}

impl TableRecord for SongRecord {
    const ENTITY: EntityKind = EntityKind::Song;
    const FIELDS: &'static [&'static str] = &[
        "song_id",
        "song_name",
        "duration_ms",
        "popularity",
        "added_at",
        "external_url",
        "album_id",
        "artist_id",
    ];

    fn key(&self) -> &str {
        &self.song_id
    }
}

/// Artist table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRecord {
    pub artist_id: String,
    pub artist_name: String,
    pub href: String,
    pub uri: String,
}

impl TableRecord for ArtistRecord {
    const ENTITY: EntityKind = EntityKind::Artist;
    const FIELDS: &'static [&'static str] = &["artist_id", "artist_name", "href", "uri"];

    fn key(&self) -> &str {
        &self.artist_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Header serde would emit for a record, compared against FIELDS
    fn serde_header<T: TableRecord>(record: &T) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(record).unwrap();
        let bytes = writer.into_inner().unwrap();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .next()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_fields_match_serde_order() {
        let album = AlbumRecord {
            album_id: "al".to_string(),
            album_name: "n".to_string(),
            release_date: NaiveDate::from_ymd_opt(2023, 5, 12).unwrap(),
            total_tracks: 1,
            uri: "u".to_string(),
        };
        let song = SongRecord {
            song_id: "s".to_string(),
            song_name: "n".to_string(),
            duration_ms: 1,
            popularity: 2,
            added_at: Utc.with_ymd_and_hms(2023, 5, 12, 0, 0, 0).unwrap(),
            external_url: "e".to_string(),
            album_id: "al".to_string(),
            artist_id: "ar".to_string(),
        };
        let artist = ArtistRecord {
            artist_id: "ar".to_string(),
            artist_name: "n".to_string(),
            href: "h".to_string(),
            uri: "u".to_string(),
        };

        assert_eq!(serde_header(&album), AlbumRecord::FIELDS.join(","));
        assert_eq!(serde_header(&song), SongRecord::FIELDS.join(","));
        assert_eq!(serde_header(&artist), ArtistRecord::FIELDS.join(","));
    }

    #[test]
    fn test_table_file_names() {
        assert_eq!(
            EntityKind::Album.table_file_name("20230512T101500"),
            "album_pk_transformed_20230512T101500.csv"
        );
        assert_eq!(EntityKind::Song.namespace(), "songs/");
        assert_eq!(EntityKind::Artist.to_string(), "artist");
    }
}
