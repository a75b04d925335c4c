//! Error handling for meteor-fetch

use crate::http::ResultEnvelope;
use thiserror::Error;

/// Main error type for meteor-fetch operations
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Proxy error: {0}")]
    Proxy(String),

    /// Connectivity failure raised by `fetch_body` so callers can
    /// distinguish "no network" from protocol-level failures.
    #[error("Offline: {0}")]
    Offline(#[source] reqwest::Error),

    /// A 4xx/5xx response raised by `fetch_body`. Carries the full
    /// envelope so the caller can inspect status, headers and body.
    #[error("Server returned status {}", .0.status)]
    Server(Box<ResultEnvelope>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for meteor-fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;
