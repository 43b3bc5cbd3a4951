//! Resumable transfer engine
//!
//! One call turns one HTTP GET into one file on disk:
//! - Resume is opt-in per call and starts from the existing file size
//! - 416 means the file is already complete and is left untouched
//! - 206 appends, 200 truncates (a server that ignores `Range` restarts us)
//! - The body is written in fixed-size chunks; cancellation is polled
//!   once per chunk and leaves the partial file in place for a later resume

use crate::cancel::CancelFlag;
use crate::error::CoreError;
use crate::progress::ProgressSink;
use civico_types::{ProgressEvent, Settings, TransferOutcome, TransferRequest};
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};
use std::io;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

/// Size of each body chunk written to disk
pub const CHUNK_SIZE: usize = 8192;

/// Time allowed to connect and receive response headers
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for the engine
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    pub chunk_size: usize,
    pub response_timeout: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            response_timeout: RESPONSE_TIMEOUT,
        }
    }
}

impl From<&Settings> for TransferOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            chunk_size: settings.chunk_size.max(1),
            response_timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }
}

/// The resumable download engine. Cheap to clone; the HTTP client is shared.
#[derive(Debug, Clone)]
pub struct Transfer {
    client: Client,
    options: TransferOptions,
}

impl Transfer {
    /// Build an engine with its own HTTP client from settings
    pub fn new(settings: &Settings) -> Result<Self, CoreError> {
        let client = crate::build_http_client(settings)?;
        Ok(Self::with_client(client, TransferOptions::from(settings)))
    }

    pub fn with_client(client: Client, options: TransferOptions) -> Self {
        Self { client, options }
    }

    /// Download `request.url` into `request.destination`.
    ///
    /// Returns [`CoreError::Cancelled`] when `cancel` is raised; the partial
    /// file stays on disk so a later call with `resume` can continue it.
    pub async fn run<'s>(
        &self,
        request: &TransferRequest,
        sink: Option<&mut (dyn ProgressSink + 's)>,
        cancel: Option<&CancelFlag>,
    ) -> Result<TransferOutcome, CoreError> {
        let mut sink = sink;
        let url = request.url.as_str();
        let dest = request.destination.as_path();

        if is_cancelled(cancel) {
            info!("Transfer of {} cancelled before start", url);
            return Err(CoreError::Cancelled);
        }

        // Starting offset from whatever is already on disk
        let existing = if request.resume {
            existing_len(dest).await?
        } else {
            None
        };
        let already_on_disk = existing.unwrap_or(0);

        let mut builder = self.client.get(url);
        if existing.is_some() {
            info!("Transfer {}: resuming with range bytes={}-", url, already_on_disk);
            builder = builder.header(RANGE, format!("bytes={}-", already_on_disk));
        } else {
            info!("Transfer {}: starting fresh download", url);
        }

        let response = tokio::time::timeout(self.options.response_timeout, builder.send())
            .await
            .map_err(|_| CoreError::Timeout)??;

        let status = response.status();

        // Must be checked before generic status handling
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            info!("Transfer {}: already complete ({} bytes)", url, already_on_disk);
            if let Some(sink) = sink.as_deref_mut() {
                let done = ProgressEvent::new(already_on_disk, Some(already_on_disk));
                sink.begin(done);
                sink.finish(done);
            }
            return Ok(TransferOutcome::AlreadyComplete);
        }

        if !status.is_success() {
            return Err(CoreError::ServerError {
                status: status.as_u16(),
                message: format!("GET {} failed", url),
            });
        }

        let partial = status == StatusCode::PARTIAL_CONTENT && existing.is_some();
        let (resumed_from, total) = if partial {
            (already_on_disk, content_range_total(response.headers()))
        } else {
            if already_on_disk > 0 {
                info!(
                    "Transfer {}: server ignored range, discarding {} existing bytes",
                    url, already_on_disk
                );
            }
            (0, response.content_length().filter(|len| *len > 0))
        };
        debug!(
            "Transfer {}: status={}, resumed_from={}, total={:?}",
            url, status, resumed_from, total
        );

        let mut file = if partial {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dest)
                .await?
        } else {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(dest)
                .await?
        };

        let body = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(Box::pin(body));
        let mut buf = vec![0u8; self.options.chunk_size];
        let mut written: u64 = 0;

        if let Some(sink) = sink.as_deref_mut() {
            sink.begin(ProgressEvent::new(resumed_from, total));
        }

        loop {
            let n = match read_chunk(&mut reader, &mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    // Leave the on-disk length accurate for the next resume
                    let _ = file.flush().await;
                    warn!(
                        "Transfer {} interrupted after {} bytes: {}",
                        url,
                        resumed_from + written,
                        e
                    );
                    return Err(body_error(e));
                }
            };
            if n == 0 {
                break;
            }

            if is_cancelled(cancel) {
                file.flush().await?;
                info!(
                    "Transfer {} cancelled after {} bytes ({} on disk)",
                    url,
                    written,
                    resumed_from + written
                );
                return Err(CoreError::Cancelled);
            }

            if let Err(e) = file.write_all(&buf[..n]).await {
                let _ = file.flush().await;
                return Err(e.into());
            }
            written += n as u64;

            if let Some(sink) = sink.as_deref_mut() {
                sink.report(ProgressEvent::new(resumed_from + written, total));
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Some(sink) = sink.as_deref_mut() {
            sink.finish(ProgressEvent::new(resumed_from + written, total));
        }

        info!(
            "Transfer {} completed: {} bytes written, {} on disk",
            url,
            written,
            resumed_from + written
        );

        Ok(TransferOutcome::Completed {
            bytes_written: written,
            total,
            resumed_from,
        })
    }
}

fn is_cancelled(cancel: Option<&CancelFlag>) -> bool {
    cancel.is_some_and(|flag| flag.is_cancelled())
}

/// Size of the destination if it exists
async fn existing_len(path: &std::path::Path) -> Result<Option<u64>, CoreError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Fill `buf` completely unless the stream ends first
async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Recover the network error hidden inside the body reader's io::Error
fn body_error(err: io::Error) -> CoreError {
    if !err
        .get_ref()
        .is_some_and(|inner| inner.is::<reqwest::Error>())
    {
        return CoreError::Io(err);
    }
    match err.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(source)) => CoreError::Network(*source),
        _ => CoreError::Io(io::Error::new(
            io::ErrorKind::Other,
            "failed to read response body",
        )),
    }
}

/// Total size from `Content-Range: bytes start-end/total`
fn content_range_total(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range_total)
}

pub(crate) fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    let total = total.trim();
    if total == "*" {
        return None;
    }
    total.parse().ok()
}
