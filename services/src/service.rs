use lb_importer_core::{
    AdditionalInfo,
    Listen,
    ListenData,
    ValidationError,
};
use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};
use serde_json::Value;
use tracing::warn;

pub mod exportify;
pub mod listenbrainz;
pub mod spotify;
pub mod vimusic;


/// Listens read from a single dump. Malformed entries are dropped while reading.
#[derive(Debug, Deserialize)]
#[serde(transparent, bound(deserialize = "T: DeserializeOwned"))]
pub struct ListenVec<T>(#[serde(deserialize_with = "crate::de::vec_skip_errors")] Vec<T>);

impl<T> ListenVec<T> {
    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, T> { self.0.iter() }
}

impl<T> ListenVec<T>
where
    T: ListenData,
    Listen: TryFrom<T, Error = ValidationError>,
{
    /// Converts every entry into a [`Listen`], skipping those missing a track or artist
    pub fn into_listens(self) -> impl Iterator<Item = Listen> { into_listens(self) }
}

impl<T> FromIterator<T> for ListenVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self { Self(iter.into_iter().collect()) }
}

impl<T> IntoIterator for ListenVec<T> {
    type IntoIter = std::vec::IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}


/// Converts entries into [`Listen`]s, logging and skipping the ones that fail validation
pub fn into_listens<T>(entries: impl IntoIterator<Item = T>) -> impl Iterator<Item = Listen>
where
    T: ListenData,
    Listen: TryFrom<T, Error = ValidationError>,
{
    entries.into_iter().filter_map(|entry| {
        let listened_at = entry.listened_at();
        Listen::try_from(entry)
            .map_err(|e| warn!("Skipping listen at {listened_at}: {e}"))
            .ok()
    })
}


fn additional_info<T: Serialize>(data: &T) -> Option<AdditionalInfo> {
    serde_json::to_value(data).ok().and_then(|v| match v {
        Value::Object(mut m) => {
            m.insert("submission_client".to_owned(), "lb-history-importer".into());
            m.insert("submission_client_version".to_owned(), env!("CARGO_PKG_VERSION").into());
            Some(m)
        },
        _ => None,
    })
}
