use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{
    Map,
    Value,
};

/// Free-form, service specific metadata attached to a track
pub type AdditionalInfo = Map<String, Value>;


#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field `artist_name`")]
    MissingArtist,
    #[error("missing required field `track_name`")]
    MissingTrack,
}


/// Service agnostic representation of a played track
///
/// Immutable once built. Use [`CanonicalTrack::from_source_fields`] to construct one.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTrack {
    artist_name: String,
    track_name: String,
    release_name: Option<String>,
    additional_info: Option<AdditionalInfo>,
}

impl CanonicalTrack {
    /// Builds a track from the fields an import source was able to extract
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the artist or track name is empty or blank.
    pub fn from_source_fields(
        artist_name: impl Into<String>,
        track_name: impl Into<String>,
        release_name: Option<impl Into<String>>,
        additional_info: Option<AdditionalInfo>,
    ) -> Result<Self, ValidationError> {
        let artist_name = artist_name.into();
        let track_name = track_name.into();
        if artist_name.trim().is_empty() {
            return Err(ValidationError::MissingArtist);
        }
        if track_name.trim().is_empty() {
            return Err(ValidationError::MissingTrack);
        }

        Ok(Self {
            artist_name,
            track_name,
            release_name: release_name.map(Into::<String>::into).filter(|r| !r.is_empty()),
            additional_info,
        })
    }

    pub fn artist_name(&self) -> &str { &self.artist_name }

    pub fn track_name(&self) -> &str { &self.track_name }

    pub fn release_name(&self) -> Option<&str> { self.release_name.as_deref() }

    pub fn additional_info(&self) -> Option<&AdditionalInfo> { self.additional_info.as_ref() }

    /// The identifier feedback can be submitted against, preferring the MusicBrainz id
    pub fn recording_id(&self) -> Option<RecordingId<'_>> {
        let info = self.additional_info.as_ref()?;
        let get = |key| info.get(key).and_then(Value::as_str).filter(|id| !id.is_empty());
        get("recording_mbid")
            .map(RecordingId::Mbid)
            .or_else(|| get("recording_msid").map(RecordingId::Msid))
    }

    /// The `track_metadata` object sent to the service
    ///
    /// Entries of `additional_info` holding an empty or falsy value are left out,
    /// as is `additional_info` itself when nothing remains.
    pub fn to_wire_payload(&self) -> TrackPayload<'_> {
        let additional_info = self
            .additional_info
            .iter()
            .flatten()
            .filter(|(_, v)| is_truthy(v))
            .map(|(k, v)| (k.as_str(), v))
            .collect::<BTreeMap<_, _>>();

        TrackPayload {
            artist_name: &self.artist_name,
            track_name: &self.track_name,
            release_name: self.release_name.as_deref(),
            additional_info: Some(additional_info).filter(|m| !m.is_empty()),
        }
    }
}

impl std::fmt::Display for CanonicalTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{} - {}", self.artist_name, self.track_name) }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordingId<'a> {
    #[serde(rename = "recording_mbid")]
    Mbid(&'a str),
    #[serde(rename = "recording_msid")]
    Msid(&'a str),
}

impl RecordingId<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mbid(id) | Self::Msid(id) => id,
        }
    }
}


#[derive(Debug, Serialize)]
pub struct TrackPayload<'t> {
    pub artist_name: &'t str,
    pub track_name: &'t str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_name: Option<&'t str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<BTreeMap<&'t str, &'t Value>>,
}


fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
