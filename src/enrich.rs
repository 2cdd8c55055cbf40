//! # Detail Enrichment Module
//!
//! Stage 2 of extraction: visits a candidate's own detail page and fills in
//! the date, time, location and description found there. A detail page often
//! lists sibling items too, so the target is isolated by title both in the
//! prompt and in the records accepted back.
//!
//! Enrichment never loses a candidate. Any failure returns the Stage-1
//! candidate unchanged.

use chrono::NaiveDate;
use tracing::{debug, instrument, warn};

use crate::calendar::{Category, SourceConfig};
use crate::extract::{Candidate, StructuredExtractor, extract_detail_records, heuristic};
use crate::fetcher::Fetcher;

fn same_page(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/') == b.trim().trim_end_matches('/')
}

/// Per-run handle for visiting detail pages
pub struct Enricher<'a, E> {
    fetcher: &'a Fetcher,
    extractor: Option<&'a E>,
    today: NaiveDate,
}

impl<'a, E: StructuredExtractor> Enricher<'a, E> {
    pub fn new(fetcher: &'a Fetcher, extractor: Option<&'a E>, today: NaiveDate) -> Self {
        Self {
            fetcher,
            extractor,
            today,
        }
    }

    /// Enrich one candidate from its detail page
    ///
    /// # Arguments
    ///
    /// * `candidate` - The Stage-1 candidate
    /// * `category` - The category being refreshed
    /// * `source` - The source the candidate came from
    ///
    /// # Returns
    ///
    /// The merged candidates. Usually one; more when the detail page lists
    /// several dates for the item. The Stage-1 candidate alone when there is
    /// no detail page or enrichment fails.
    #[instrument(skip_all, fields(title = %candidate.title, source = %source.name))]
    pub async fn enrich(
        &self,
        candidate: Candidate,
        category: Category,
        source: &SourceConfig,
    ) -> Vec<Candidate> {
        let Some(detail_url) = candidate.detail_url.clone() else {
            return vec![candidate];
        };
        if same_page(&detail_url, &source.url) {
            debug!("Detail link points back at the listing, skipping");
            return vec![candidate];
        }

        let html = match self.fetcher.fetch(&detail_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %detail_url, "Detail fetch failed, keeping listing data: {}", e);
                return vec![candidate];
            }
        };

        let details = match self.extractor {
            Some(extractor) if source.scraping_method.uses_ai() => {
                let cleaned = self.fetcher.clean(&html);
                match extract_detail_records(
                    extractor,
                    &cleaned,
                    &candidate.title,
                    category,
                    &detail_url,
                    self.today,
                )
                .await
                {
                    Ok(details) => details,
                    Err(e) => {
                        warn!(url = %detail_url, "Detail extraction failed, keeping listing data: {}", e);
                        return vec![candidate];
                    }
                }
            }
            _ => match heuristic::extract_detail(&html, &candidate.title, category) {
                Some(detail) => vec![detail],
                None => {
                    warn!(url = %detail_url, "No section about this item on its detail page");
                    return vec![candidate];
                }
            },
        };

        debug!(records = details.len(), "Enriched from detail page");
        details
            .into_iter()
            .map(|detail| candidate.merged_with(detail))
            .collect()
    }
}
