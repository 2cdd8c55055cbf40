//! # civcal - Civic Calendar Scraping for Rust
//!
//! This crate turns the event, class and meeting pages of local organizations
//! into clean, deduplicated calendar feeds. Pages are read by a structured
//! model extractor when one is configured and by markup heuristics otherwise.
//!
//! ## Features
//!
//! - Browser-like page fetching with bounded timeouts
//! - Two-stage extraction: listing pages, then each item's own detail page
//! - Category-tuned prompts for events, classes and meetings
//! - Recurrence expansion ("first friday", "every monday") over a fixed horizon
//! - Category-specific title cleanup, date floors and deduplication
//! - Streaming progress events for each refresh
//! - Rate-limited model access through `rig`
//!
//! ## Example
//!
//! ```rust,no_run
//! use civcal::calendar::{Category, SourcesFile};
//! use civcal::fetcher::{Fetcher, FetcherConfig};
//! use civcal::model::Client;
//! use civcal::pipeline::{Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sources = SourcesFile::load("sources.json")?;
//!     let client = Client::new_gemini_from_env()?;
//!     let pipeline = Pipeline::with_extractor(
//!         Fetcher::new(FetcherConfig::default())?,
//!         client.extractor(),
//!         PipelineConfig::default(),
//!     );
//!
//!     let summary = pipeline.refresh(Category::Events, &sources.sources).await;
//!     println!("{}", serde_json::to_string_pretty(&summary.items)?);
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod dedup;
pub mod enrich;
mod error;
pub mod extract;
pub mod fetcher;
pub mod model;
pub mod pipeline;
pub mod postprocess;
pub mod recurrence;

pub use error::Error;

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::calendar::{CalendarItem, Category, ScrapingMethod, SourceConfig, SourcesFile};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::extract::{LlmExtractor, StructuredExtractor};
    pub use crate::pipeline::{Pipeline, PipelineConfig, ProgressEvent};
}
