use lb_importer_core::ListenData;
use lb_importer_derive::IntoListen;
use serde::{
    ser::SerializeStruct,
    Deserialize,
};
use serde_with::{
    serde_as,
    TimestampMilliSeconds,
};
use time::OffsetDateTime;

pub type SpotifyListenVec = super::ListenVec<SpotifyListen>;


/// Represents a single entry from a spotify history dump
#[serde_as]
#[cfg_attr(test, derive(PartialEq, Eq))]
#[derive(Debug, Deserialize, IntoListen)]
pub struct SpotifyListen {
    #[serde(alias = "endTime", alias = "ts", deserialize_with = "crate::de::datetime")]
    time: OffsetDateTime,

    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    #[serde(alias = "offline_timestamp", default)]
    offline_time: Option<OffsetDateTime>,

    #[serde(alias = "trackName", alias = "master_metadata_track_name")]
    pub track: String,

    #[serde(alias = "artistName", alias = "master_metadata_album_artist_name")]
    pub artist: String,

    #[release]
    #[serde(alias = "master_metadata_album_album_name")]
    pub album: Option<String>,

    pub spotify_track_uri: Option<String>,

    #[serde(alias = "msPlayed", alias = "ms_played")]
    pub ms_played: u32,
}

impl ListenData for SpotifyListen {
    type MetaType<'m> = Info;

    /// Offline plays are stamped with when they happened rather than when they synced
    #[inline]
    fn listened_at(&self) -> i64 {
        self.offline_time
            .map(OffsetDateTime::unix_timestamp)
            .filter(|&ts| ts > 100)
            .unwrap_or_else(|| self.time.unix_timestamp())
    }

    #[inline]
    fn track_name(&self) -> &str { &self.track }

    #[inline]
    fn artist_name(&self) -> &str { &self.artist }

    #[inline]
    fn release_name(&self) -> Option<&str> { self.album.as_deref() }

    #[inline]
    fn track_metadata(&self) -> Option<Info> {
        Some(Info {
            duration_ms: self.ms_played,
            spotify_id: self
                .spotify_track_uri
                .as_ref()
                .and_then(|uri| uri.rsplit_once(':'))
                .map(|(_, id)| format!("https://open.spotify.com/track/{id}")),
        })
    }
}

pub struct Info {
    duration_ms: u32,
    spotify_id: Option<String>,
}

impl serde::Serialize for Info {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("additional_info", 4)?;
        state.serialize_field("duration_ms", &self.duration_ms)?;
        state.serialize_field("music_service", "spotify.com")?;
        if let Some(ref id) = self.spotify_id {
            state.serialize_field("spotify_id", id.as_str())?;
            state.serialize_field("origin_url", id.as_str())?;
        } else {
            state.skip_field("spotify_id")?;
            state.skip_field("origin_url")?;
        }
        state.end()
    }
}
