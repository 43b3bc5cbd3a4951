//! Shared types for civico-dl
//!
//! This crate contains the data structures exchanged between the core
//! library, the CLI, and any interactive front end.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Remote API Types
// ============================================================================

/// Stream metadata as returned by `GET {api_base}/streams/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMetadata {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub client: SlugRef,
    #[serde(default)]
    pub subclient: SlugRef,
}

impl StreamMetadata {
    /// Only published streams have downloadable media
    pub fn is_published(&self) -> bool {
        self.status.as_deref() == Some("published")
    }

    /// Status for display, `unknown` when the field is missing
    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("unknown")
    }

    /// Title, falling back to `stream_{id}` when the API omits it
    pub fn title_or_default(&self, stream_id: u64) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("stream_{}", stream_id))
    }
}

/// A nested `{ "slug": ... }` object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlugRef {
    #[serde(default)]
    pub slug: String,
}

/// VOD manifest; only the base path is needed to build media URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub vod_base: String,
}

// ============================================================================
// Media Types
// ============================================================================

/// The two media renditions a published stream offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// File name of the rendition under the manifest's `vod_base`
    pub fn remote_name(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio.mp3",
            MediaKind::Video => "progressive.mp4",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Which renditions to download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSelection {
    #[default]
    Both,
    AudioOnly,
    VideoOnly,
}

impl MediaSelection {
    /// Selected kinds in download order (audio first)
    pub fn kinds(self) -> Vec<MediaKind> {
        match self {
            MediaSelection::Both => vec![MediaKind::Audio, MediaKind::Video],
            MediaSelection::AudioOnly => vec![MediaKind::Audio],
            MediaSelection::VideoOnly => vec![MediaKind::Video],
        }
    }
}

/// A published stream ready for download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedStream {
    pub id: u64,
    pub title: String,
    /// Title after filename sanitization
    pub safe_title: String,
    /// Path fragment under the VOD host, from the manifest
    pub vod_base: String,
}

/// A single file to fetch: where it lives remotely and where it goes locally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaTarget {
    pub kind: MediaKind,
    pub url: String,
    pub path: PathBuf,
}

/// A file that finished downloading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub kind: MediaKind,
    pub path: PathBuf,
    pub size: u64,
}

impl DownloadedFile {
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

// ============================================================================
// Transfer Types
// ============================================================================

/// One transfer call's input. Immutable once issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub url: String,
    pub destination: PathBuf,
    pub resume: bool,
}

impl TransferRequest {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>, resume: bool) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            resume,
        }
    }
}

/// Progress snapshot: bytes on disk so far (including pre-existing bytes)
/// and the total size when the server told us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl ProgressEvent {
    pub fn new(downloaded: u64, total: Option<u64>) -> Self {
        Self { downloaded, total }
    }

    /// Percentage complete, 0 when the total is unknown
    pub fn percent(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => (self.downloaded as f64 / total as f64) * 100.0,
            _ => 0.0,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self.total, Some(total) if self.downloaded >= total)
    }
}

/// How a successful transfer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// The body was streamed to disk
    Completed {
        bytes_written: u64,
        total: Option<u64>,
        resumed_from: u64,
    },
    /// The server answered 416; the file was left untouched
    AlreadyComplete,
}

// ============================================================================
// Job Types
// ============================================================================

/// State of a background download job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Resolving,
    Downloading,
    Done,
    Cancelled,
    Failed,
}

/// Events emitted by a background job to its observers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum JobEvent {
    StatusChanged {
        status: JobStatus,
        message: String,
    },
    Progress {
        kind: MediaKind,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        files: Vec<DownloadedFile>,
    },
    Failed {
        kind: String,
        error: String,
    },
    Cancelled,
}

// ============================================================================
// Settings Types
// ============================================================================

/// Runtime settings. Every field has a default so partial config files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    pub vod_base: String,
    pub user_agent: String,
    /// Connect + response-headers timeout for every request
    pub request_timeout_secs: u64,
    /// Fixed size of each body chunk written to disk
    pub chunk_size: usize,
    /// Minimum byte delta between throttled progress reports
    pub progress_threshold: u64,
    pub default_output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: "https://admin.civico.net/api".to_string(),
            vod_base: "https://vod.civico.net".to_string(),
            user_agent: concat!("civico-dl/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
            chunk_size: 8192,
            progress_threshold: 50 * 1024,
            default_output_dir: PathBuf::from("."),
        }
    }
}
