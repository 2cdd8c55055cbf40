//! Error types for the civcal crate

use thiserror::Error;

/// Result type for civcal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for civcal operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error while reading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Page fetch error
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Listing or detail extraction error
    #[error("Extraction error: {0}")]
    Extract(String),

    /// Source configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline run error
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}
