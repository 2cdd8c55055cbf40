//! Error types for the extraction module

use crate::error::Error as CrateError;
use rig::completion::CompletionError;
use thiserror::Error;

/// Error type for extraction operations
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The completion request to the model failed
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    /// The model answered, but not with usable records
    #[error("Malformed extraction response: {0}")]
    Malformed(String),

    /// A configured site selector does not parse
    #[error("Invalid site selector '{selector}'")]
    InvalidSelector { selector: String },

    /// Nothing on the detail page matched the requested title
    #[error("No record matching '{title}'")]
    NoMatch { title: String },

    /// No structured extractor is configured
    #[error("Structured extraction unavailable")]
    Unavailable,
}

impl From<ExtractError> for CrateError {
    fn from(err: ExtractError) -> Self {
        CrateError::Extract(err.to_string())
    }
}
