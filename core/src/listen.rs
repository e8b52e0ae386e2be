use serde::Serialize;

use crate::{
    CanonicalTrack,
    TrackPayload,
};

/// One recorded play of a track
#[derive(Debug, Clone, PartialEq)]
pub struct Listen {
    listened_at: i64,
    track: CanonicalTrack,
}

impl Listen {
    pub fn new(listened_at: i64, track: CanonicalTrack) -> Self { Self { listened_at, track } }

    /// Unix timestamp, in seconds, of when the play happened
    pub fn listened_at(&self) -> i64 { self.listened_at }

    pub fn track(&self) -> &CanonicalTrack { &self.track }

    pub fn to_wire_payload(&self) -> ListenPayload<'_> {
        ListenPayload {
            listened_at: self.listened_at,
            track_metadata: self.track.to_wire_payload(),
        }
    }
}


#[derive(Debug, Serialize)]
pub struct ListenPayload<'l> {
    pub listened_at: i64,
    pub track_metadata: TrackPayload<'l>,
}


/// A single entry read from some history dump
///
/// Implemented by every import source; `#[derive(IntoListen)]` builds the conversion into a [`Listen`] on top of it.
pub trait ListenData {
    type MetaType<'m>: Serialize
    where
        Self: 'm;

    fn listened_at(&self) -> i64;

    fn track_name(&self) -> &str;
    fn artist_name(&self) -> &str;

    fn release_name(&self) -> Option<&str> { None }

    fn track_metadata(&self) -> Option<Self::MetaType<'_>> { None }
}

pub trait IntoListenDerive: ListenData {}
