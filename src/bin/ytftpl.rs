#![forbid(unsafe_code)]

//! Command-line entry point: transfers a YouTube playlist into FreeTube.
//!
//! Flow: resolve settings, make sure the database exists, stream the playlist
//! through yt-dlp, retry age-restricted videos, then append one line to
//! `playlists.db`. Any fatal condition exits with status 1 and leaves the
//! database untouched.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ytftpl::config::{RuntimeOverrides, resolve_runtime_settings};
use ytftpl::database::{append_playlist, resolve_database_path};
use ytftpl::error::ImportError;
use ytftpl::extractor::{ExtractorOptions, YtDlp};
use ytftpl::pipeline::{ImportConfig, run_import};
use ytftpl::record::RecordMapper;
use ytftpl::report::{Console, Verbosity};
use ytftpl::security::ensure_not_root;

const LOG_ENV: &str = "YTFTPL_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "ytftpl",
    version,
    about = "Transfers YouTube playlists to FreeTube."
)]
struct Cli {
    /// Full URL of the playlist you want to transfer
    playlist_url: String,

    /// Only output JSON at the end, don't show each video as it is being extracted
    #[arg(short, long)]
    quiet: bool,

    /// Only output ytftpl's error or success messages
    #[arg(short = 'i', long)]
    silent: bool,

    /// Use cookies from the specified browser for private playlists or age-restricted videos
    #[arg(short = 'c', long = "browser-cookies", value_name = "NAME OF BROWSER")]
    browser_cookies: Option<String>,

    /// Seconds to sleep between requests, e.g. 5 for long playlists that hit rate limits
    #[arg(short, long, value_name = "SLEEP SECONDS")]
    sleep: Option<u64>,

    /// Path to playlists.db (or its directory) if it is not in the usual location
    #[arg(short, long, value_name = "DB PATH")]
    path: Option<PathBuf>,

    /// Name for the new playlist instead of the one on YouTube
    #[arg(short, long, value_name = "NAME")]
    name: Option<String>,

    /// yt-dlp executable to run
    #[arg(long, value_name = "PATH")]
    yt_dlp: Option<PathBuf>,

    /// Read defaults from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Print the playlist but don't touch playlists.db
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    let mut console = Console::new(Verbosity::from_flags(cli.quiet, cli.silent));

    let result = ensure_not_root("ytftpl").and_then(|()| run(cli, &mut console));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ImportError>() {
                Some(import_error) => console.fatal(import_error),
                None => console.warning(&format!("{err:#}")),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli, console: &mut Console) -> Result<()> {
    let settings = resolve_runtime_settings(RuntimeOverrides {
        database_path: cli.path.clone(),
        yt_dlp: cli.yt_dlp.clone(),
        browser: cli.browser_cookies.clone(),
        sleep_seconds: cli.sleep,
        env_path: cli.env_file.clone(),
    })?;

    let database_path = resolve_database_path(settings.database_path.as_deref())
        .context("could not determine FreeTube's data directory; pass --path")?;
    // Fail before a long extraction rather than after it.
    if !cli.dry_run && !database_path.is_file() {
        return Err(ImportError::DatabaseNotFound(database_path).into());
    }

    let extractor = YtDlp::new(ExtractorOptions {
        program: settings.yt_dlp.clone(),
        browser: settings.browser.clone(),
        sleep_seconds: settings.sleep_seconds,
    });
    extractor.ensure_available()?;

    let config = ImportConfig {
        playlist_url: cli.playlist_url,
        cookies_supplied: settings.browser.is_some(),
        delay: settings.sleep_seconds.map(Duration::from_secs),
        playlist_name: cli.name,
    };
    info!(url = %config.playlist_url, cookies = config.cookies_supplied, "importing playlist");

    let mut mapper = RecordMapper::new();
    let outcome = run_import(&config, &extractor, &mut mapper, console)?;
    if outcome.fallback_name {
        console.warning("yt-dlp did not report a playlist title; use --name to pick one");
    }

    let playlist = outcome.playlist;
    let json = serde_json::to_string_pretty(&playlist).context("serializing playlist")?;
    console.playlist_json(&json);

    if cli.dry_run {
        console.dry_run(&playlist.playlist_name);
        return Ok(());
    }

    append_playlist(&database_path, &playlist)?;
    console.success(&playlist.playlist_name, playlist.videos.len());
    Ok(())
}
