//! Output formatting utilities

use crate::OutputFormat;
use civico_types::{DownloadedFile, MediaKind, ResolvedStream};
use console::style;
use serde::Serialize;
use std::path::PathBuf;

/// What a finished run produced
#[derive(Debug, Serialize)]
pub struct Summary {
    pub stream_id: u64,
    pub title: String,
    pub files: Vec<SummaryFile>,
}

#[derive(Debug, Serialize)]
pub struct SummaryFile {
    pub kind: MediaKind,
    pub path: PathBuf,
    pub size: u64,
    pub already_complete: bool,
}

impl Summary {
    pub fn new(stream: &ResolvedStream) -> Self {
        Self {
            stream_id: stream.id,
            title: stream.title.clone(),
            files: Vec::new(),
        }
    }

    pub fn push(&mut self, file: &DownloadedFile, already_complete: bool) {
        self.files.push(SummaryFile {
            kind: file.kind,
            path: file.path.clone(),
            size: file.size,
            already_complete,
        });
    }
}

/// Print the final summary in the requested format
pub fn print_summary(summary: &Summary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Human => {
            println!("\n{} Done! Files saved:", style("✓").green().bold());
            for file in &summary.files {
                println!("  {} ({})", file.path.display(), format_mb(file.size));
            }
        }
    }
    Ok(())
}

/// Print a progress line only for human output
pub fn say(format: OutputFormat, line: impl AsRef<str>) {
    if format == OutputFormat::Human {
        println!("{}", line.as_ref());
    }
}

/// Shown when the server reports the file is already fully downloaded
pub fn already_complete_line(name: &str) -> String {
    format!("  {} Already complete: {}", style("✓").green(), name)
}

/// Sizes in the summary are always megabytes with one decimal
pub fn format_mb(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Format bytes as human-readable
pub fn format_bytes(bytes: u64) -> String {
    human_bytes::human_bytes(bytes as f64)
}
