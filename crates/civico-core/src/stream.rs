//! Stream resolution and the per-file download sequence
//!
//! A page URL becomes a [`ResolvedStream`] through three lookups:
//! stream ID, metadata (must be `published`), then the VOD manifest.
//! Each selected rendition is then fetched with the transfer engine,
//! audio before video, stopping at the first error or cancellation.

use crate::api::CivicoApi;
use crate::cancel::CancelFlag;
use crate::error::CoreError;
use crate::naming::{extract_stream_id, media_file_name, sanitize_filename};
use crate::progress::ProgressSink;
use crate::transfer::Transfer;
use civico_types::{
    DownloadedFile, MediaSelection, MediaTarget, ResolvedStream, Settings, StreamMetadata,
    TransferOutcome, TransferRequest,
};
use std::path::Path;
use tracing::{info, warn};

/// Resolves stream pages and downloads their media
#[derive(Debug, Clone)]
pub struct StreamDownloader {
    settings: Settings,
    api: CivicoApi,
    transfer: Transfer,
}

impl StreamDownloader {
    pub fn new(settings: Settings) -> Result<Self, CoreError> {
        let client = crate::build_http_client(&settings)?;
        let api = CivicoApi::new(client.clone(), &settings);
        let transfer = Transfer::with_client(client, (&settings).into());
        Ok(Self {
            settings,
            api,
            transfer,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Extract the stream ID and fetch its metadata
    pub async fn lookup(&self, page_url: &str) -> Result<(u64, StreamMetadata), CoreError> {
        let stream_id = extract_stream_id(page_url)?;
        info!("Stream ID: {}", stream_id);
        let metadata = self.api.fetch_metadata(stream_id).await?;
        Ok((stream_id, metadata))
    }

    /// Check the stream is published and fetch its manifest
    pub async fn resolve_metadata(
        &self,
        stream_id: u64,
        metadata: &StreamMetadata,
    ) -> Result<ResolvedStream, CoreError> {
        if !metadata.is_published() {
            warn!(
                "Stream {} is not published (status: {})",
                stream_id,
                metadata.status_label()
            );
            return Err(CoreError::Unpublished {
                status: metadata.status_label().to_string(),
            });
        }

        // Only published streams are guaranteed to carry the manifest path
        if metadata.slug.is_empty()
            || metadata.client.slug.is_empty()
            || metadata.subclient.slug.is_empty()
        {
            return Err(CoreError::MetadataFetch(format!(
                "stream {} metadata is missing its slugs",
                stream_id
            )));
        }

        let manifest = self
            .api
            .fetch_manifest(
                &metadata.client.slug,
                &metadata.subclient.slug,
                &metadata.slug,
            )
            .await?;

        let title = metadata.title_or_default(stream_id);
        Ok(ResolvedStream {
            id: stream_id,
            safe_title: sanitize_filename(&title),
            title,
            vod_base: manifest.vod_base,
        })
    }

    /// Page URL to a published, downloadable stream
    pub async fn resolve(&self, page_url: &str) -> Result<ResolvedStream, CoreError> {
        let (stream_id, metadata) = self.lookup(page_url).await?;
        self.resolve_metadata(stream_id, &metadata).await
    }

    /// Files to fetch for `selection`, audio first
    pub fn targets(
        &self,
        stream: &ResolvedStream,
        selection: MediaSelection,
        output_dir: &Path,
    ) -> Vec<MediaTarget> {
        selection
            .kinds()
            .into_iter()
            .map(|kind| MediaTarget {
                kind,
                url: self.api.media_url(&stream.vod_base, kind),
                path: output_dir.join(media_file_name(stream.id, &stream.safe_title, kind)),
            })
            .collect()
    }

    /// Fetch one target and report what ended up on disk
    pub async fn download_target<'s>(
        &self,
        target: &MediaTarget,
        resume: bool,
        sink: Option<&mut (dyn ProgressSink + 's)>,
        cancel: Option<&CancelFlag>,
    ) -> Result<(TransferOutcome, DownloadedFile), CoreError> {
        info!("Downloading {}: {}", target.kind, target.url);
        let request = TransferRequest::new(target.url.clone(), target.path.clone(), resume);
        let outcome = self.transfer.run(&request, sink, cancel).await?;
        let size = tokio::fs::metadata(&target.path).await?.len();
        Ok((
            outcome,
            DownloadedFile {
                kind: target.kind,
                path: target.path.clone(),
                size,
            },
        ))
    }

    /// Fetch every target in order. `make_sink` is called once per target so
    /// each file gets fresh progress state.
    pub async fn download_all<F>(
        &self,
        targets: &[MediaTarget],
        resume: bool,
        mut make_sink: F,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<DownloadedFile>, CoreError>
    where
        F: FnMut(&MediaTarget) -> Option<Box<dyn ProgressSink>>,
    {
        let mut files = Vec::with_capacity(targets.len());
        for target in targets {
            if let Some(parent) = target.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }

            let mut sink = make_sink(target);
            let (_, file) = self
                .download_target(target, resume, sink.as_deref_mut(), cancel)
                .await?;
            files.push(file);
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civico_types::MediaKind;

    fn resolved() -> ResolvedStream {
        ResolvedStream {
            id: 23298,
            title: "Safer Streets: Part 1?".to_string(),
            safe_title: "Safer_Streets_Part_1".to_string(),
            vod_base: "sandwell/council/safer-streets".to_string(),
        }
    }

    #[test]
    fn targets_follow_selection_and_naming() {
        let downloader = StreamDownloader::new(Settings::default()).unwrap();
        let targets = downloader.targets(&resolved(), MediaSelection::Both, Path::new("out"));

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].kind, MediaKind::Audio);
        assert_eq!(
            targets[0].url,
            "https://vod.civico.net/sandwell/council/safer-streets/audio.mp3"
        );
        assert_eq!(
            targets[0].path,
            Path::new("out").join("23298_Safer_Streets_Part_1.mp3")
        );
        assert_eq!(targets[1].kind, MediaKind::Video);
        assert_eq!(
            targets[1].path,
            Path::new("out").join("23298_Safer_Streets_Part_1.mp4")
        );

        let video = downloader.targets(&resolved(), MediaSelection::VideoOnly, Path::new("."));
        assert_eq!(video.len(), 1);
        assert!(video[0].url.ends_with("/progressive.mp4"));
    }
}
