//! civico-dl CLI
//!
//! Downloads the audio and/or video of a civico.net meeting stream.
//! Interrupted downloads resume from where they stopped on the next run.

mod commands;
mod output;
mod progress;

use anyhow::{bail, Context, Result};
use civico_core::CoreError;
use civico_types::{MediaSelection, Settings};
use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Conventional exit status after SIGINT
pub(crate) const EXIT_INTERRUPTED: u8 = 130;

/// Download audio/video from civico.net stream pages
#[derive(Parser)]
#[command(name = "civico-dl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Civico.net stream page URL
    url: String,

    /// Download audio (MP3) only
    #[arg(long, conflicts_with = "video_only")]
    audio_only: bool,

    /// Download video (MP4) only
    #[arg(long)]
    video_only: bool,

    /// Directory to save files (default: current directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Always start from scratch instead of resuming partial files
    #[arg(long)]
    no_resume: bool,

    /// Summary format
    #[arg(long, default_value = "human")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Settings file (JSON)
    #[arg(long, env = "CIVICO_DL_CONFIG")]
    config: Option<PathBuf>,

    /// Override the stream metadata API base URL
    #[arg(long, env = "CIVICO_API_BASE")]
    api_base: Option<String>,

    /// Override the VOD host base URL
    #[arg(long, env = "CIVICO_VOD_BASE")]
    vod_base: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

impl Cli {
    fn selection(&self) -> MediaSelection {
        match (self.audio_only, self.video_only) {
            (true, _) => MediaSelection::AudioOnly,
            (_, true) => MediaSelection::VideoOnly,
            _ => MediaSelection::Both,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| settings.default_output_dir.clone());

    let downloader =
        civico_core::StreamDownloader::new(settings).context("failed to create HTTP client")?;

    commands::download_stream(
        &downloader,
        commands::DownloadArgs {
            url: cli.url.clone(),
            selection: cli.selection(),
            output_dir,
            resume: !cli.no_resume,
            format: cli.output,
        },
    )
    .await
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "civico_core=debug,civico_dl=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Settings file first, then flag/env overrides
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("settings file {} does not exist", path.display());
            }
            civico_core::load_settings(path)?
        }
        None => match civico_core::default_settings_path(dirs::config_dir()) {
            Some(path) => civico_core::load_settings(&path)?,
            None => Settings::default(),
        },
    };

    if let Some(api_base) = &cli.api_base {
        settings.api_base = api_base.clone();
    }
    if let Some(vod_base) = &cli.vod_base {
        settings.vod_base = vod_base.clone();
    }
    Ok(settings)
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    let (code, message) = describe_error(err);
    eprintln!("{}", message);
    code
}

/// Exit code and user-facing text for a failed run
fn describe_error(err: &anyhow::Error) -> (ExitCode, String) {
    match err.downcast_ref::<CoreError>() {
        Some(CoreError::Cancelled) => (
            ExitCode::from(EXIT_INTERRUPTED),
            format!(
                "\n{} Download cancelled. Partial files were kept; run again to resume.",
                style("○").dim()
            ),
        ),
        Some(CoreError::Unpublished { status }) => (
            ExitCode::FAILURE,
            format!(
                "\n{} Stream is not yet published (status: {}).\n\
                 Only published streams have downloadable audio/video.",
                style("Error:").red().bold(),
                status
            ),
        ),
        _ => (
            ExitCode::FAILURE,
            format!("{} {:#}", style("Error:").red().bold(), err),
        ),
    }
}
