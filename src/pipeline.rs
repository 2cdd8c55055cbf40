//! # Pipeline Module
//!
//! Orchestrates a refresh of one category: every matching source is fetched,
//! extracted and enriched in turn, then the combined items are expanded,
//! cleaned and deduplicated.
//!
//! ## Key Components
//!
//! - `Pipeline`: holds the fetcher, the optional extractor and configuration
//! - `PipelineConfig`: run tunables with a builder
//! - `ProgressEvent`: the messages a run emits
//!
//! ## Behavior
//!
//! - Sources run sequentially within a category; categories run concurrently
//! - Sources of another category are skipped before any network call
//! - A failing source is reported and the run continues
//! - `Complete` is always the last event
//!
//! ## Example
//!
//! ```rust,no_run
//! use civcal::calendar::{Category, SourcesFile};
//! use civcal::fetcher::{Fetcher, FetcherConfig};
//! use civcal::pipeline::{Pipeline, PipelineConfig, ProgressEvent};
//! use futures::StreamExt;
//!
//! # async fn example() -> civcal::prelude::Result<()> {
//! let sources = SourcesFile::load("sources.json")?;
//! let fetcher = Fetcher::new(FetcherConfig::default())?;
//! let pipeline = Pipeline::without_extractor(fetcher, PipelineConfig::default());
//!
//! let run = pipeline.run(Category::Events, &sources.sources);
//! futures::pin_mut!(run);
//! while let Some(event) = run.next().await {
//!     if let ProgressEvent::Items { items, .. } = event {
//!         println!("{} events", items.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod events;
mod run;

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::PipelineError;
pub use events::ProgressEvent;

use futures::StreamExt;
use futures::future::join_all;
use futures::stream::Stream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::calendar::{CalendarItem, Category, SourceConfig};
use crate::extract::{NoExtractor, StructuredExtractor};
use crate::fetcher::Fetcher;

/// The outcome of one category run, collected from its event stream
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSummary {
    pub category: Category,
    /// Sources attempted
    pub total: usize,
    /// `(source, detail)` for each failed source
    pub errors: Vec<(String, String)>,
    pub items: Vec<CalendarItem>,
}

/// Refresh pipeline
pub struct Pipeline<E = NoExtractor> {
    fetcher: Fetcher,
    extractor: Option<E>,
    config: PipelineConfig,
}

impl Pipeline<NoExtractor> {
    /// A pipeline that only uses markup heuristics
    pub fn without_extractor(fetcher: Fetcher, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            extractor: None,
            config,
        }
    }
}

/// Sources of `category` that are enabled, in input order
fn select_sources(category: Category, sources: &[SourceConfig]) -> Vec<SourceConfig> {
    sources
        .iter()
        .filter(|source| {
            if source.category != category {
                warn!(
                    source = %source.name,
                    expected = %category,
                    found = %source.category,
                    "Skipping source from another category"
                );
                return false;
            }
            if !source.enabled {
                debug!(source = %source.name, "Skipping disabled source");
                return false;
            }
            true
        })
        .cloned()
        .collect()
}

impl<E: StructuredExtractor> Pipeline<E> {
    /// Create a pipeline
    ///
    /// # Arguments
    ///
    /// * `fetcher` - HTTP client for listing and detail pages
    /// * `extractor` - Structured extractor for AI sources; heuristics only when `None`
    /// * `config` - Run tunables
    pub fn new(fetcher: Fetcher, extractor: Option<E>, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            extractor,
            config,
        }
    }

    /// A pipeline with a structured extractor
    pub fn with_extractor(fetcher: Fetcher, extractor: E, config: PipelineConfig) -> Self {
        Self::new(fetcher, Some(extractor), config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Refresh one category
    ///
    /// # Arguments
    ///
    /// * `category` - The category to refresh
    /// * `sources` - Candidate sources; those of other categories or disabled
    ///   are skipped before any network call and do not count towards `total`
    ///
    /// # Returns
    ///
    /// A stream of `ProgressEvent`s ending with `Items` and `Complete`.
    /// Dropping the stream stops the run.
    pub fn run(
        &self,
        category: Category,
        sources: &[SourceConfig],
    ) -> impl Stream<Item = ProgressEvent> + Send + '_ {
        let selected = select_sources(category, sources);
        run::run(self, category, selected)
    }

    /// Forward a run into a channel
    ///
    /// Stops as soon as the receiver is closed.
    pub async fn run_into(
        &self,
        category: Category,
        sources: &[SourceConfig],
        sender: mpsc::Sender<ProgressEvent>,
    ) {
        let events = self.run(category, sources);
        futures::pin_mut!(events);

        loop {
            tokio::select! {
                _ = sender.closed() => {
                    info!(category = %category, "Progress receiver closed, stopping run");
                    return;
                }
                event = events.next() => {
                    let Some(event) = event else {
                        return;
                    };
                    if sender.send(event).await.is_err() {
                        info!(category = %category, "Progress receiver closed, stopping run");
                        return;
                    }
                }
            }
        }
    }

    /// Run one category to completion and collect the outcome
    pub async fn refresh(&self, category: Category, sources: &[SourceConfig]) -> RefreshSummary {
        let mut summary = RefreshSummary {
            category,
            total: 0,
            errors: Vec::new(),
            items: Vec::new(),
        };

        let events = self.run(category, sources);
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            match event {
                ProgressEvent::Init { total } => summary.total = total,
                ProgressEvent::Error { source, detail } => summary.errors.push((source, detail)),
                ProgressEvent::Items { items, .. } => summary.items = items,
                ProgressEvent::Progress { .. } | ProgressEvent::Complete => {}
            }
        }
        summary
    }

    /// Refresh every category concurrently
    ///
    /// Each category runs over its own sources with its own accumulator.
    pub async fn refresh_all(&self, sources: &[SourceConfig]) -> Vec<RefreshSummary> {
        join_all(
            Category::ALL
                .into_iter()
                .map(|category| self.refresh(category, sources)),
        )
        .await
    }
}
