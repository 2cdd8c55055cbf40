//! Error types for the pipeline module

use crate::error::Error as CrateError;
use crate::fetcher::FetchError;
use thiserror::Error;

/// Why a source produced no items in a run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The listing page could not be fetched
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The source points at a domain that may not be scraped
    #[error("Blocked domain: {url}")]
    Blocked { url: String },
}

impl From<PipelineError> for CrateError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Fetch(e) => e.into(),
            _ => CrateError::Pipeline(err.to_string()),
        }
    }
}
