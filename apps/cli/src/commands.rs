//! The download command

use crate::output::{self, say, Summary};
use crate::progress::FileProgress;
use crate::{OutputFormat, EXIT_INTERRUPTED};
use anyhow::{Context, Result};
use civico_core::{CancelFlag, StreamDownloader};
use civico_types::{MediaSelection, TransferOutcome};
use console::style;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use tracing::debug;

pub struct DownloadArgs {
    pub url: String,
    pub selection: MediaSelection,
    pub output_dir: PathBuf,
    pub resume: bool,
    pub format: OutputFormat,
}

/// Resolve the page, then fetch each selected file in turn
pub async fn download_stream(downloader: &StreamDownloader, args: DownloadArgs) -> Result<()> {
    let format = args.format;

    say(format, "Fetching stream metadata...");
    let (stream_id, metadata) = downloader.lookup(&args.url).await?;
    say(format, format!("Stream ID: {}", stream_id));
    say(format, format!("Title: {}", metadata.title_or_default(stream_id)));
    say(format, format!("Status: {}", metadata.status_label()));

    let stream = downloader.resolve_metadata(stream_id, &metadata).await?;
    debug!("VOD base: {}", stream.vod_base);

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;

    let cancel = CancelFlag::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let interrupts = futures::stream::unfold((), |()| async {
                tokio::signal::ctrl_c().await.ok().map(|_| ((), ()))
            });
            if watch_interrupts(Box::pin(interrupts), &cancel).await {
                eprintln!("\n{} Interrupted again, exiting.", style("✗").red().bold());
                std::process::exit(EXIT_INTERRUPTED.into());
            }
        })
    };

    let targets = downloader.targets(&stream, args.selection, &args.output_dir);
    let mut summary = Summary::new(&stream);

    for target in &targets {
        say(
            format,
            format!(
                "\n{} {}: {}",
                style("Downloading").cyan().bold(),
                target.kind,
                target.url
            ),
        );

        let mut progress = FileProgress::new(format == OutputFormat::Human);
        let result = downloader
            .download_target(target, args.resume, Some(&mut progress), Some(&cancel))
            .await;

        match result {
            Ok((TransferOutcome::AlreadyComplete, file)) => {
                progress.already_complete(&file.path.display().to_string());
                summary.push(&file, true);
            }
            Ok((TransferOutcome::Completed { resumed_from, .. }, file)) => {
                progress.complete();
                if resumed_from > 0 {
                    say(
                        format,
                        format!(
                            "  Resumed after {} already on disk",
                            output::format_bytes(resumed_from)
                        ),
                    );
                }
                summary.push(&file, false);
            }
            Err(err) => {
                progress.abandon(if err.is_cancelled() {
                    "Cancelled"
                } else {
                    "Failed"
                });
                watcher.abort();
                return Err(err.into());
            }
        }
    }

    watcher.abort();
    output::print_summary(&summary, format)
}

/// First interrupt raises `cancel` so the transfer stops at the next chunk
/// and keeps its partial file. Returns `true` on a second interrupt, which
/// means the user wants out even if the transfer is stalled.
async fn watch_interrupts<S>(mut interrupts: S, cancel: &CancelFlag) -> bool
where
    S: Stream<Item = ()> + Unpin,
{
    if interrupts.next().await.is_none() {
        return false;
    }
    cancel.cancel();
    eprintln!(
        "\n{} Cancelling after the current chunk... (Ctrl-C again to quit now)",
        style("○").dim()
    );
    interrupts.next().await.is_some()
}
