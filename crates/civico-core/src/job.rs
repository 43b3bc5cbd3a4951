//! Background download job for interactive front ends
//!
//! The transfer engine blocks the task that awaits it, so a UI runs the
//! whole resolve-and-download flow here instead. Observers receive
//! [`JobEvent`]s over a broadcast channel; progress is throttled so a UI
//! thread is not flooded, and each file starts with fresh throttle state.

use crate::cancel::CancelFlag;
use crate::error::CoreError;
use crate::progress::{ProgressSink, Throttled};
use crate::stream::StreamDownloader;
use civico_types::{
    DownloadedFile, JobEvent, JobStatus, MediaSelection, MediaTarget, ProgressEvent,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// What a job should fetch
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub page_url: String,
    pub selection: MediaSelection,
    pub output_dir: PathBuf,
    pub resume: bool,
}

/// Handle to a running job
pub struct JobHandle {
    cancel: CancelFlag,
    status: Arc<Mutex<JobStatus>>,
    event_tx: broadcast::Sender<JobEvent>,
    events: broadcast::Receiver<JobEvent>,
    task: JoinHandle<Result<Vec<DownloadedFile>, CoreError>>,
}

impl JobHandle {
    /// Ask the job to stop at the next chunk boundary
    pub fn cancel(&self) {
        info!("Job cancellation requested");
        self.cancel.cancel();
    }

    pub fn status(&self) -> JobStatus {
        *self.status.lock()
    }

    /// Receiver subscribed before the job started; sees every event
    pub fn events(&mut self) -> &mut broadcast::Receiver<JobEvent> {
        &mut self.events
    }

    /// Extra receiver; only sees events sent after this call
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Wait for the job and return the files it downloaded
    pub async fn join(self) -> Result<Vec<DownloadedFile>, CoreError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                e,
            ))),
        }
    }
}

/// Spawns resolve-and-download jobs on the tokio runtime
pub struct DownloadJob;

impl DownloadJob {
    pub fn spawn(downloader: StreamDownloader, request: JobRequest) -> JobHandle {
        let (event_tx, events) = broadcast::channel(1000);
        let cancel = CancelFlag::new();
        let status = Arc::new(Mutex::new(JobStatus::Idle));

        let task = tokio::spawn(run_job(
            downloader,
            request,
            cancel.clone(),
            Arc::clone(&status),
            event_tx.clone(),
        ));

        JobHandle {
            cancel,
            status,
            event_tx,
            events,
            task,
        }
    }
}

struct Reporter {
    status: Arc<Mutex<JobStatus>>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl Reporter {
    fn set_status(&self, status: JobStatus, message: impl Into<String>) {
        *self.status.lock() = status;
        let _ = self.event_tx.send(JobEvent::StatusChanged {
            status,
            message: message.into(),
        });
    }

    fn emit(&self, event: JobEvent) {
        let _ = self.event_tx.send(event);
    }
}

async fn run_job(
    downloader: StreamDownloader,
    request: JobRequest,
    cancel: CancelFlag,
    status: Arc<Mutex<JobStatus>>,
    event_tx: broadcast::Sender<JobEvent>,
) -> Result<Vec<DownloadedFile>, CoreError> {
    let reporter = Reporter { status, event_tx };
    let result = fetch(&downloader, &request, &cancel, &reporter).await;

    match &result {
        Ok(files) => {
            let summary = files
                .iter()
                .map(|f| {
                    let name = f
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    format!("{} ({:.1} MB)", name, f.size_mb())
                })
                .collect::<Vec<_>>()
                .join(", ");
            info!("Job finished: {}", summary);
            reporter.set_status(JobStatus::Done, format!("Done! {}", summary));
            reporter.emit(JobEvent::Finished {
                files: files.clone(),
            });
        }
        Err(e) if e.is_cancelled() => {
            info!("Job cancelled");
            reporter.set_status(JobStatus::Cancelled, "Download cancelled");
            reporter.emit(JobEvent::Cancelled);
        }
        Err(e) => {
            error!("Job failed: {}", e);
            reporter.set_status(JobStatus::Failed, e.to_string());
            reporter.emit(JobEvent::Failed {
                kind: e.kind().to_string(),
                error: e.to_string(),
            });
        }
    }

    result
}

async fn fetch(
    downloader: &StreamDownloader,
    request: &JobRequest,
    cancel: &CancelFlag,
    reporter: &Reporter,
) -> Result<Vec<DownloadedFile>, CoreError> {
    reporter.set_status(JobStatus::Resolving, "Fetching stream info...");
    let stream = downloader.resolve(&request.page_url).await?;
    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled);
    }

    let targets = downloader.targets(&stream, request.selection, &request.output_dir);
    let threshold = downloader.settings().progress_threshold;

    downloader
        .download_all(
            &targets,
            request.resume,
            |target: &MediaTarget| {
                reporter.set_status(
                    JobStatus::Downloading,
                    format!("Downloading {}...", target.kind),
                );
                let kind = target.kind;
                let tx = reporter.event_tx.clone();
                let sink = Throttled::new(threshold, move |e: ProgressEvent| {
                    let _ = tx.send(JobEvent::Progress {
                        kind,
                        downloaded: e.downloaded,
                        total: e.total,
                    });
                });
                Some(Box::new(sink) as Box<dyn ProgressSink>)
            },
            Some(cancel),
        )
        .await
}
