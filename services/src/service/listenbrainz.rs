use lb_importer_core::ListenData;
use lb_importer_derive::IntoListen;
use serde::{
    ser::SerializeMap,
    Deserialize,
    Serialize,
};
use serde_json::{
    Map,
    Value,
};

pub type LBListenVec = super::ListenVec<LBListen>;

/// A listen from a ListenBrainz export, for moving history between instances
#[cfg_attr(test, derive(PartialEq, Eq))]
#[derive(Debug, Deserialize, IntoListen)]
#[listen(track = track_metadata.data.track_name)]
#[listen(artist = track_metadata.data.artist_name, release = track_metadata.data.release_name)]
pub struct LBListen {
    track_metadata: TrackMetadata,
    listened_at: i64,
    recording_msid: Option<String>,
}

#[cfg_attr(test, derive(PartialEq, Eq))]
#[derive(Debug, Deserialize)]
struct TrackMetadata {
    #[serde(flatten)]
    data: ExportedTrack,
    #[serde(default)]
    mbid_mapping: Option<MbidMapping>,
}

#[cfg_attr(test, derive(PartialEq, Eq))]
#[derive(Debug, Deserialize)]
struct ExportedTrack {
    artist_name: String,
    track_name: String,
    release_name: Option<String>,
    #[serde(default)]
    additional_info: Map<String, Value>,
}

#[cfg_attr(test, derive(PartialEq, Eq))]
#[derive(Debug, Deserialize)]
struct MbidMapping {
    recording_mbid: Option<String>,
    release_mbid: Option<String>,
    #[serde(default)]
    artist_mbids: Vec<String>,
}


/// The exported `additional_info` merged with the ids ListenBrainz mapped the listen to
pub struct ExportInfo<'l> {
    listen: &'l LBListen,
}

impl Serialize for ExportInfo<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let metadata = &self.listen.track_metadata;
        let mut info = serializer.serialize_map(Some(metadata.data.additional_info.len() + 4))?;
        metadata
            .data
            .additional_info
            .iter()
            .filter(|(k, _)| match k.as_str() {
                "recording_msid" => self.listen.recording_msid.is_none(),
                "recording_mbid" | "release_mbid" | "artist_mbids" => metadata.mbid_mapping.is_none(),
                _ => true,
            })
            .try_for_each(|(k, v)| info.serialize_entry(k, v))?;
        if let Some(ref msid) = self.listen.recording_msid {
            info.serialize_entry("recording_msid", msid)?;
        }
        if let Some(ref mapping) = metadata.mbid_mapping {
            info.serialize_entry("recording_mbid", &mapping.recording_mbid)?;
            info.serialize_entry("release_mbid", &mapping.release_mbid)?;
            info.serialize_entry("artist_mbids", mapping.artist_mbids.as_slice())?;
        }
        info.end()
    }
}

impl ListenData for LBListen {
    type MetaType<'m> = ExportInfo<'m>;

    fn listened_at(&self) -> i64 { self.listened_at }

    fn track_name(&self) -> &str { &self.track_metadata.data.track_name }

    fn artist_name(&self) -> &str { &self.track_metadata.data.artist_name }

    fn release_name(&self) -> Option<&str> { self.track_metadata.data.release_name.as_deref() }

    fn track_metadata(&self) -> Option<ExportInfo<'_>> { Some(ExportInfo { listen: self }) }
}
