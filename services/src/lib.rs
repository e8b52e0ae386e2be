use std::{
    ffi::OsStr,
    fmt::Display,
    fs::File,
    io::BufReader,
    path::Path,
    sync::LazyLock,
};

use anyhow::{
    anyhow,
    Context,
    Result,
};
pub use lb_importer_core::*;
use regex::Regex;
use rusqlite::{
    Connection,
    OpenFlags,
};
use tracing::debug;

use crate::service::{
    exportify::ExportifyListenVec,
    listenbrainz::LBListenVec,
    spotify::SpotifyListenVec,
    vimusic::VimusicListenVec,
};

mod de;
pub mod service;


/// The kind of dump a file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Spotify streaming history, JSON
    Spotify,
    /// ListenBrainz listen export, JSON
    ListenBrainz,
    /// Exportify playlist export, CSV
    Exportify,
    /// ViMusic database backup, SQLite
    ViMusic,
}

impl Source {
    /// Guesses the source from the file name
    pub fn detect(path: &Path) -> Option<Self> {
        static SPOTIFY_REGEX: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^(endsong_\d+|StreamingHistory\d+|Streaming_History_Audio_.+)$").unwrap());
        static LB_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+_lb-\d{4}-\d{2}-\d{2}\b").unwrap());

        let name = path.file_stem().and_then(OsStr::to_str)?;
        match path.extension().and_then(OsStr::to_str).map(str::to_ascii_lowercase).as_deref() {
            Some("json") if SPOTIFY_REGEX.is_match(name) => Some(Self::Spotify),
            Some("json") if LB_REGEX.is_match(name) => Some(Self::ListenBrainz),
            Some("csv") => Some(Self::Exportify),
            Some("db" | "sqlite" | "sqlite3") => Some(Self::ViMusic),
            _ => None,
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Spotify => "Spotify",
            Self::ListenBrainz => "ListenBrainz",
            Self::Exportify => "Exportify",
            Self::ViMusic => "ViMusic",
        })
    }
}


pub enum ImportData {
    Spotify(SpotifyListenVec),
    ListenBrainz(LBListenVec),
    Exportify(ExportifyListenVec),
    ViMusic(VimusicListenVec),
}

impl ImportData {
    pub fn len(&self) -> usize {
        match self {
            Self::Spotify(v) => v.len(),
            Self::ListenBrainz(v) => v.len(),
            Self::Exportify(v) => v.len(),
            Self::ViMusic(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Every entry that converts into a valid [`Listen`]
    pub fn into_listens(self) -> Box<dyn Iterator<Item = Listen>> {
        match self {
            Self::Spotify(v) => Box::new(v.into_listens()),
            Self::ListenBrainz(v) => Box::new(v.into_listens()),
            Self::Exportify(v) => Box::new(v.into_listens()),
            Self::ViMusic(v) => Box::new(v.into_listens()),
        }
    }
}

/// Reads the file at `path` as a dump from `source`, or from whatever source its name suggests
///
/// # Errors
///
/// This function will return an error if the file can't be read or parsed,
/// or no source was given and the file name is not a recognized pattern.
pub fn load_listens(path: &Path, source: Option<Source>) -> Result<ImportData> {
    let source = source
        .or_else(|| Source::detect(path))
        .ok_or(anyhow!("Unrecognized file name"))?;
    debug!("Reading {} as {source}", path.display());

    #[rustfmt::skip]
    macro_rules! parse_json {
        ($ty:path) => { serde_json::from_reader(BufReader::new(File::open(path)?)).map($ty).map_err(Into::into) };
    }

    match source {
        Source::Spotify => parse_json!(ImportData::Spotify),
        Source::ListenBrainz => parse_json!(ImportData::ListenBrainz),
        Source::Exportify => service::exportify::read(File::open(path)?)
            .map(ImportData::Exportify)
            .context("Invalid exportify CSV"),
        Source::ViMusic => {
            let db = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            service::vimusic::read(&db).map(ImportData::ViMusic).context("Invalid ViMusic backup")
        },
    }
}
