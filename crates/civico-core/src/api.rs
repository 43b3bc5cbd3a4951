//! Client for the civico.net stream API and VOD host

use crate::error::CoreError;
use civico_types::{Manifest, MediaKind, Settings, StreamMetadata};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Talks to the metadata API and the VOD manifest host
#[derive(Debug, Clone)]
pub struct CivicoApi {
    client: Client,
    api_base: String,
    vod_base: String,
    timeout: Duration,
}

impl CivicoApi {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            vod_base: settings.vod_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }

    /// `GET {api_base}/streams/{id}`
    pub async fn fetch_metadata(&self, stream_id: u64) -> Result<StreamMetadata, CoreError> {
        let url = format!("{}/streams/{}", self.api_base, stream_id);
        info!("Fetching stream metadata: {}", url);
        self.get_json(&url).await.map_err(CoreError::MetadataFetch)
    }

    /// `GET {vod_base}/{client}/{subclient}/{slug}/manifest.json`
    pub async fn fetch_manifest(
        &self,
        client_slug: &str,
        subclient_slug: &str,
        slug: &str,
    ) -> Result<Manifest, CoreError> {
        let url = format!(
            "{}/{}/{}/{}/manifest.json",
            self.vod_base, client_slug, subclient_slug, slug
        );
        info!("Fetching manifest: {}", url);
        self.get_json(&url).await.map_err(CoreError::ManifestFetch)
    }

    /// `{vod_base}/{fragment}/audio.mp3` or `.../progressive.mp4`
    pub fn media_url(&self, vod_fragment: &str, kind: MediaKind) -> String {
        format!(
            "{}/{}/{}",
            self.vod_base,
            vod_fragment.trim_matches('/'),
            kind.remote_name()
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, String> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| format!("request to {} timed out", url))?
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("GET {} returned HTTP {}", url, status));
        }

        let body = response.bytes().await.map_err(|e| e.to_string())?;
        debug!("GET {}: {} bytes of JSON", url, body.len());
        serde_json::from_slice(&body).map_err(|e| format!("malformed JSON from {}: {}", url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(vod_base: &str) -> CivicoApi {
        let settings = Settings {
            vod_base: vod_base.to_string(),
            ..Settings::default()
        };
        CivicoApi::new(Client::new(), &settings)
    }

    #[test]
    fn media_urls_join_cleanly() {
        let api = api("https://vod.civico.net/");
        assert_eq!(
            api.media_url("/sandwell/council/abc/", MediaKind::Audio),
            "https://vod.civico.net/sandwell/council/abc/audio.mp3"
        );
        assert_eq!(
            api.media_url("sandwell/council/abc", MediaKind::Video),
            "https://vod.civico.net/sandwell/council/abc/progressive.mp4"
        );
    }
}
