use std::path::PathBuf;

use anyhow::{
    anyhow,
    bail,
    Result,
};
use clap::{
    arg,
    ArgGroup,
    Command,
    Parser,
};
use clap_verbosity_flag::{
    InfoLevel,
    Verbosity,
};
use lb_importer_core::MAX_BATCH_SIZE;
use lb_importer_services::Source;
use time::{
    format_description::{
        well_known::Rfc3339,
        FormatItem,
    },
    macros::format_description,
    Date,
    OffsetDateTime,
    PrimitiveDateTime,
    UtcOffset,
};
use uuid::Uuid;

/// Import play history from a history dump into a `ListenBrainz` instance
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Args {
    /// ListenBrainz API token
    #[arg(short, long, env = "LISTENBRAINZ_TOKEN", required_unless_present = "dry_run")]
    pub token: Option<Uuid>,

    /// Url of the listenbrainz compatible API to import into
    #[arg(short, long)]
    pub url: Option<String>,

    /// Only import tracks played before this date/time
    #[arg(short, long, value_parser = parse_datetime)]
    pub before: Option<OffsetDateTime>,

    /// Only import tracks played after this date/time
    #[arg(short, long, value_parser = parse_datetime)]
    pub after: Option<OffsetDateTime>,

    /// How many listens to import per request
    #[arg(long, default_value_t = MAX_BATCH_SIZE, value_parser = parse_batch_size)]
    pub batch_size: usize,

    /// The service where the dump came from
    #[command(flatten)]
    pub service: Service,

    /// Love every imported recording that has a MusicBrainz or ListenBrainz recording id
    #[arg(long)]
    pub love: bool,

    /// Read and batch the files without submitting anything
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// One or more files containing play history
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Which source to read the files as; guessed from each file name when not given
#[derive(Debug)]
pub(crate) struct Service {
    pub source: Option<Source>,
    pub spotify: SpotifyArgs,
}

impl clap::Args for Service {
    fn augment_args(cmd: clap::Command) -> clap::Command {
        const HEADING: &str = "Services";
        cmd.group(ArgGroup::new("service").args(["spotify", "listenbrainz", "exportify", "vimusic"]))
            .arg(
                arg!(--spotify)
                    .help_heading(HEADING)
                    .help("Import files from a spotify dump")
                    .long_help(r"endsong_\d+.json | StreamingHistory\d+.json | Streaming_History_Audio_*.json"),
            )
            .arg(
                arg!(--listenbrainz)
                    .help_heading(HEADING)
                    .help("Import files from a listenbrainz dump")
                    .long_help(r"\w+_lb-\d{4}-\d{2}-\d{2}.json"),
            )
            .arg(
                arg!(--exportify)
                    .help_heading(HEADING)
                    .help("Import playlist CSV files made with exportify")
                    .long_help("*.csv; the time a track was added to the playlist is used as its listen time"),
            )
            .arg(
                arg!(--vimusic)
                    .help_heading(HEADING)
                    .help("Import a ViMusic database backup")
                    .long_help("*.db | *.sqlite"),
            )
            .args(
                SpotifyArgs::augment_args(Command::new(""))
                    .get_arguments()
                    .cloned()
                    .map(|sa| sa.help_heading("Spotify Options")),
            )
    }

    fn augment_args_for_update(cmd: clap::Command) -> clap::Command { Self::augment_args(cmd) }

    fn group_id() -> Option<clap::Id> { Some("service".into()) }
}

impl clap::FromArgMatches for Service {
    fn from_arg_matches(matches: &clap::ArgMatches) -> std::result::Result<Self, clap::Error> {
        let source = [
            ("spotify", Source::Spotify),
            ("listenbrainz", Source::ListenBrainz),
            ("exportify", Source::Exportify),
            ("vimusic", Source::ViMusic),
        ]
        .into_iter()
        .find_map(|(flag, source)| matches.get_flag(flag).then_some(source));

        Ok(Self {
            source,
            spotify: SpotifyArgs::from_arg_matches(matches)?,
        })
    }

    fn update_from_arg_matches(&mut self, matches: &clap::ArgMatches) -> std::result::Result<(), clap::Error> {
        *self = Self::from_arg_matches(matches)?;
        Ok(())
    }
}

#[derive(clap::Args, Debug)]
pub(crate) struct SpotifyArgs {
    /// Minimum play time in seconds for a track to be imported
    #[arg(long, default_value_t = 30)]
    pub min_play_time: u16,
}


fn parse_batch_size(size: &str) -> Result<usize> {
    let size = size.parse()?;
    if !(1..=MAX_BATCH_SIZE).contains(&size) {
        bail!("must be between 1 and {MAX_BATCH_SIZE}");
    }
    Ok(size)
}

fn parse_datetime(dt: &str) -> Result<OffsetDateTime> {
    const FMTS_DT: &[&[FormatItem]] = &[
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]"),
    ];
    const FMTS_DATE: &[&[FormatItem]] = &[format_description!("[year]-[month]-[day]")];

    if let Ok(parsed) = OffsetDateTime::parse(dt, &Rfc3339) {
        return Ok(parsed);
    }
    let pdt = FMTS_DT
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(dt, fmt).ok())
        .or_else(|| {
            FMTS_DATE
                .iter()
                .find_map(|fmt| Date::parse(dt, fmt).ok())
                .map(|d| d.midnight())
        })
        .ok_or_else(|| anyhow!("unrecognized date/time: {dt}"))?;
    Ok(pdt.assume_offset(UtcOffset::current_local_offset()?))
}
