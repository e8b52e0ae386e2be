use std::{
    collections::HashSet,
    convert::Infallible,
    fmt::Display,
    process::ExitCode,
};

use anyhow::{
    bail,
    Context,
    Result,
};
use clap::Parser;
use lb_importer_client::{
    Client,
    Response,
    TokenValidity,
};
use lb_importer_core::{
    batch::{
        submit_all,
        Progress,
        Summary,
    },
    CanonicalTrack,
    Listen,
};
use lb_importer_services::{
    load_listens,
    service::into_listens,
    ImportData,
};
use tracing::{
    error,
    info,
    warn,
};
use tracing_subscriber::EnvFilter;

use crate::args::Args;

mod args;


/// Prints submission progress to stdout
struct Console;

impl Progress for Console {
    fn batch_done(&mut self, submitted: usize, total: usize) { println!("Submitted {submitted}/{total} listens") }

    fn done(&mut self, summary: &Summary) {
        if summary.is_complete() {
            println!("Submitted all listens");
        } else {
            println!(
                "Imported {}/{} listens; {} of {} batches failed",
                summary.accepted(),
                summary.total,
                summary.failed_batches,
                summary.batches
            );
        }
    }
}


fn print_err<E: Display>(e: E) {
    error!("{e:#}");
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(args.verbose.tracing_level_filter().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads every file, skipping the ones that fail, and applies the time and play length filters
fn read_listens(args: &Args) -> Result<Vec<Listen>> {
    let loaded: Vec<ImportData> = args
        .files
        .iter()
        .filter_map(|p| {
            let data = load_listens(p, args.service.source)
                .with_context(|| p.display().to_string())
                .map_err(print_err)
                .ok()?;
            if data.is_empty() {
                warn!("{}: no entries found", p.display());
            }
            Some(data)
        })
        .collect();
    if loaded.is_empty() {
        bail!("None of the given files could be read");
    }

    let before = args.before.map(|dt| dt.unix_timestamp());
    let after = args.after.map(|dt| dt.unix_timestamp());
    let min_play_ms = u32::from(args.service.spotify.min_play_time) * 1000;

    Ok(loaded
        .into_iter()
        .flat_map(|data| -> Box<dyn Iterator<Item = Listen>> {
            match data {
                ImportData::Spotify(sv) => Box::new(into_listens(sv.into_iter().filter(move |h| h.ms_played >= min_play_ms))),
                data => data.into_listens(),
            }
        })
        .filter(|l| before.map_or(true, |ts| l.listened_at() < ts))
        .filter(|l| after.map_or(true, |ts| ts < l.listened_at()))
        .collect())
}

/// One track per distinct recording id, in the order first seen
fn lovable_tracks(listens: &[Listen]) -> Vec<CanonicalTrack> {
    let mut seen = HashSet::new();
    listens
        .iter()
        .map(Listen::track)
        .filter(|track| track.recording_id().is_some_and(|id| seen.insert(id.as_str().to_owned())))
        .cloned()
        .collect()
}

fn run(args: Args) -> Result<ExitCode> {
    let client = match (&args.token, args.dry_run) {
        (_, true) => None,
        (None, false) => bail!("A token is required unless --dry-run is given"),
        (Some(token), false) => {
            let token = token.as_hyphenated();
            let mut client = match &args.url {
                Some(url) => Client::with_url(url.as_str(), token),
                None => Client::new(token),
            }?;
            match client.validate_token().context("Token validation failed")? {
                TokenValidity::Valid { user_name } => info!("Importing as {user_name}"),
                TokenValidity::Invalid => bail!("Invalid token"),
            }
            Some(client)
        },
    };

    let listens = read_listens(&args)?;
    println!("Read {} listens", listens.len());

    let Some(mut client) = client else {
        let summary = submit_all(listens, args.batch_size, |_| Ok::<_, Infallible>(()), &mut ());
        println!("Dry run: {} listens in {} batches", summary.total, summary.batches);
        return Ok(ExitCode::SUCCESS);
    };

    let loved = if args.love { lovable_tracks(&listens) } else { Vec::new() };

    let summary = submit_all(
        listens,
        args.batch_size,
        |batch| client.import_listens(batch).and_then(Response::error_for_status).map(drop),
        &mut Console,
    );

    if !loved.is_empty() {
        let mut count = 0usize;
        for track in &loved {
            match client.submit_feedback(track, 1).and_then(Response::error_for_status) {
                Ok(_) => count += 1,
                Err(e) => warn!("Failed to love {track}: {e}"),
            }
        }
        println!("Loved {count}/{} recordings", loved.len());
    }

    Ok(if summary.is_complete() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn main() -> ExitCode {
    let args = Args::parse_from(wild::args_os());
    init_logging(&args);

    run(args).unwrap_or_else(|e| {
        print_err(e);
        ExitCode::FAILURE
    })
}
