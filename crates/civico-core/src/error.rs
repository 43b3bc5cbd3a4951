//! Error types for civico-dl core

use thiserror::Error;

/// Errors that can occur in civico-dl core
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Could not extract stream ID from URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch stream metadata: {0}")]
    MetadataFetch(String),

    #[error("Stream is not yet published (status: {status})")]
    Unpublished { status: String },

    #[error("Failed to fetch manifest: {0}")]
    ManifestFetch(String),

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Download was cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    /// Short, stable label for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidUrl(_) => "invalid-url",
            CoreError::MetadataFetch(_) => "metadata",
            CoreError::Unpublished { .. } => "unpublished",
            CoreError::ManifestFetch(_) => "manifest",
            CoreError::ServerError { .. } | CoreError::Network(_) | CoreError::Timeout => {
                "transport"
            }
            CoreError::Io(_) => "io",
            CoreError::Cancelled => "cancelled",
            CoreError::Config(_) => "config",
        }
    }

    /// Cancellation is a deliberate stop, not a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }
}

// Allow converting to String for UI layers that only display messages
impl From<CoreError> for String {
    fn from(error: CoreError) -> Self {
        error.to_string()
    }
}
