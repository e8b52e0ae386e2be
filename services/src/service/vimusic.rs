//! Database backups of the ViMusic android app

use lb_importer_core::ListenData;
use lb_importer_derive::IntoListen;
use rusqlite::{
    Connection,
    Row,
};
use serde::Serialize;
use tracing::warn;

pub type VimusicListenVec = super::ListenVec<VimusicListen>;

const QUERY: &str = r"
    SELECT Event.songId, Event.timestamp, Song.title, Song.artistsText, Song.durationText
    FROM Event JOIN Song ON Song.id = Event.songId";


#[cfg_attr(test, derive(PartialEq, Eq))]
#[derive(Debug, IntoListen)]
pub struct VimusicListen {
    pub song_id: String,
    /// Milliseconds since the epoch
    pub timestamp: i64,
    pub track: String,
    pub artist: String,
    pub duration: Option<String>,
}

impl VimusicListen {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            song_id: row.get(0)?,
            timestamp: row.get(1)?,
            track: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            artist: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            duration: row.get(4)?,
        })
    }
}

/// Reads every play event that refers to a known song
///
/// # Errors
///
/// Fails if the backup doesn't have the expected `Event` and `Song` tables.
pub fn read(db: &Connection) -> rusqlite::Result<VimusicListenVec> {
    let mut stmt = db.prepare(QUERY)?;
    let rows = stmt.query_map([], VimusicListen::from_row)?;
    rows.collect()
}

/// Converts `H:M:S`, `M:S` or `S` into seconds; anything unparsable is `0`
pub fn parse_duration(duration: &str) -> u64 {
    const MULTIPLIERS: [u64; 3] = [1, 60, 3600];

    let duration = duration.trim();
    if duration.is_empty() {
        return 0;
    }
    let parts: Vec<_> = duration.rsplit(':').collect();
    if parts.len() > MULTIPLIERS.len() {
        warn!("Issue while parsing duration `{duration}`, skipping it: too many components");
        return 0;
    }
    parts
        .iter()
        .zip(MULTIPLIERS)
        .try_fold(0u64, |total, (part, mul)| {
            let value = part.parse::<u64>().map_err(|e| e.to_string())?;
            value
                .checked_mul(mul)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(|| "value too large".to_owned())
        })
        .unwrap_or_else(|e| {
            warn!("Issue while parsing duration `{duration}`, skipping it: {e}");
            0
        })
}

impl ListenData for VimusicListen {
    type MetaType<'m> = Info<'m>;

    fn listened_at(&self) -> i64 { self.timestamp / 1000 }

    fn track_name(&self) -> &str { &self.track }

    fn artist_name(&self) -> &str { &self.artist }

    fn track_metadata(&self) -> Option<Info<'_>> {
        Some(Info {
            duration: self.duration.as_deref().map_or(0, parse_duration),
            music_service: "youtube.com",
            origin_url: format!("https://www.youtube.com/watch?v={}", self.song_id),
            youtube_id: &self.song_id,
        })
    }
}

#[derive(Serialize)]
pub struct Info<'l> {
    duration: u64,
    music_service: &'static str,
    origin_url: String,
    youtube_id: &'l str,
}
