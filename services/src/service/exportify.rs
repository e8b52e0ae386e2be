//! Playlist CSV exports made with [exportify](https://github.com/watsonbox/exportify)

use std::io::Read;

use lb_importer_core::ListenData;
use lb_importer_derive::IntoListen;
use serde::{
    Deserialize,
    Serialize,
};
use time::OffsetDateTime;
use tracing::warn;

pub type ExportifyListenVec = super::ListenVec<ExportifyListen>;

/// One playlist row. The time the track was added to the playlist stands in for when it was played.
#[cfg_attr(test, derive(PartialEq, Eq))]
#[derive(Debug, Deserialize, IntoListen)]
pub struct ExportifyListen {
    #[serde(rename = "Added At", deserialize_with = "crate::de::datetime")]
    added_at: OffsetDateTime,

    #[serde(rename = "Track Name")]
    pub track: String,

    #[serde(rename = "Album Artist Name(s)")]
    pub artist: String,

    #[serde(rename = "Album Name", default)]
    pub release: Option<String>,

    #[serde(rename = "Track Duration (ms)", default)]
    pub duration_ms: Option<u64>,

    #[serde(rename = "Track URI", default)]
    pub track_uri: Option<String>,
}

/// Reads every row of an exportify CSV, logging and skipping rows that can't be parsed
///
/// # Errors
///
/// Fails if the header row can't be read.
pub fn read(rdr: impl Read) -> csv::Result<ExportifyListenVec> {
    let mut reader = csv::Reader::from_reader(rdr);
    reader.headers()?;
    Ok(reader
        .deserialize::<ExportifyListen>()
        .enumerate()
        .filter_map(|(row, r)| r.map_err(|e| warn!("Skipping row {}: {e}", row + 1)).ok())
        .collect())
}

impl ListenData for ExportifyListen {
    type MetaType<'m> = Info;

    fn listened_at(&self) -> i64 { self.added_at.unix_timestamp() }

    fn track_name(&self) -> &str { &self.track }

    fn artist_name(&self) -> &str { &self.artist }

    fn release_name(&self) -> Option<&str> { self.release.as_deref() }

    fn track_metadata(&self) -> Option<Info> {
        Some(Info {
            duration_ms: self.duration_ms,
            music_service: "spotify.com",
            origin_url: self
                .track_uri
                .as_deref()
                .and_then(|uri| uri.rsplit(':').next())
                .filter(|id| !id.is_empty())
                .map(|id| format!("https://open.spotify.com/track/{id}")),
        })
    }
}

#[derive(Serialize)]
pub struct Info {
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
    music_service: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin_url: Option<String>,
}
