//! civico-dl core
//!
//! This crate turns a civico.net stream page into media files on disk.
//! The heart of it is the resumable transfer engine in [`transfer`];
//! the rest resolves a page URL to media URLs and drives the engine
//! from a blocking CLI or a background job.

mod api;
mod cancel;
mod config;
mod error;
mod job;
mod naming;
mod progress;
mod stream;
pub mod transfer;

pub use api::*;
pub use cancel::*;
pub use config::*;
pub use error::*;
pub use job::*;
pub use naming::*;
pub use progress::*;
pub use stream::*;
pub use transfer::{Transfer, TransferOptions, CHUNK_SIZE, RESPONSE_TIMEOUT};

pub use civico_types as types;

use civico_types::Settings;
use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client for API lookups and media transfers
pub fn build_http_client(settings: &Settings) -> Result<Client, CoreError> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .connect_timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .map_err(CoreError::Network)
}
