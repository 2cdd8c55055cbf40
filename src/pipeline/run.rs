//! Private implementation details for running a refresh.

use std::collections::HashSet;

use async_stream::stream;
use chrono::NaiveDate;
use futures::stream::Stream;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use super::Pipeline;
use super::error::PipelineError;
use super::events::ProgressEvent;
use crate::calendar::{CalendarItem, Category, SourceConfig};
use crate::dedup::deduplicate;
use crate::enrich::Enricher;
use crate::extract::{Candidate, StructuredExtractor, extract_candidates};
use crate::fetcher::{has_calendar_table, month_page_urls};
use crate::postprocess::postprocess;
use crate::recurrence::expand_all;

/// Runs one category over already-filtered sources.
///
/// Everything the stream logs or awaits happens inside a `pipeline_run` span.
pub(super) fn run<E>(
    pipeline: &Pipeline<E>,
    category: Category,
    sources: Vec<SourceConfig>,
) -> impl Stream<Item = ProgressEvent> + Send + '_
where
    E: StructuredExtractor,
{
    let today = pipeline.config.today();
    let span = info_span!("pipeline_run", category = %category, sources = sources.len());

    stream! {
        let total = sources.len();
        span.in_scope(|| info!(total, %today, "Starting refresh"));
        yield ProgressEvent::Init { total };

        let mut items = Vec::new();
        let mut failed = 0;
        for (index, source) in sources.iter().enumerate() {
            let scraped = scrape_source(pipeline, category, source, today)
                .instrument(span.clone())
                .await;
            match scraped {
                Ok(found) => {
                    span.in_scope(|| {
                        info!(source = %source.name, items = found.len(), "Source finished")
                    });
                    items.extend(found);
                }
                Err(e) => {
                    span.in_scope(|| warn!(source = %source.name, error = %e, "Source failed"));
                    failed += 1;
                    yield ProgressEvent::Error {
                        source: source.name.clone(),
                        detail: e.to_string(),
                    };
                }
            }
            yield ProgressEvent::Progress {
                current: index + 1,
                total,
                source: source.name.clone(),
            };
        }

        let items = span.in_scope(|| {
            let items = finalize(pipeline, category, items, today);
            info!(items = items.len(), failed, "Refresh complete");
            items
        });
        yield ProgressEvent::Items { category, items };
        yield ProgressEvent::Complete;
    }
}

/// Expand, clean and deduplicate the accumulated items of one run
fn finalize<E>(
    pipeline: &Pipeline<E>,
    category: Category,
    items: Vec<CalendarItem>,
    today: NaiveDate,
) -> Vec<CalendarItem> {
    let config = &pipeline.config;
    let expanded = expand_all(items, today, config.recurrence_horizon_months);
    debug!(count = expanded.len(), "Expanded recurring items");
    let processed = postprocess(expanded, category, today, config.class_lookback_days);
    deduplicate(category, processed)
}

/// Fetch, extract and enrich a single source
#[instrument(skip_all, fields(source = %source.name, url = %source.url))]
async fn scrape_source<E>(
    pipeline: &Pipeline<E>,
    category: Category,
    source: &SourceConfig,
    today: NaiveDate,
) -> Result<Vec<CalendarItem>, PipelineError>
where
    E: StructuredExtractor,
{
    if source.is_blocked() {
        return Err(PipelineError::Blocked {
            url: source.url.clone(),
        });
    }

    let fetcher = &pipeline.fetcher;
    let extractor = pipeline.extractor.as_ref();
    let config = &pipeline.config;

    let html = fetcher.fetch(&source.url).await?;
    let cleaned = fetcher.clean(&html);
    let mut candidates =
        extract_candidates(extractor, &html, &cleaned, category, source, today).await;

    if config.fetch_month_pages && category == Category::Events && has_calendar_table(&html) {
        for url in month_page_urls(&source.url, today, config.recurrence_horizon_months) {
            match fetcher.fetch(&url).await {
                Ok(page) => {
                    let cleaned = fetcher.clean(&page);
                    let found =
                        extract_candidates(extractor, &page, &cleaned, category, source, today)
                            .await;
                    debug!(%url, count = found.len(), "Month page extracted");
                    candidates.extend(found);
                }
                Err(e) => warn!(%url, "Skipping month page: {}", e),
            }
        }
        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert((c.title.clone(), c.date_text.clone())));
    }

    if candidates.len() > config.max_candidates_per_source {
        warn!(
            found = candidates.len(),
            max = config.max_candidates_per_source,
            "Truncating candidates"
        );
        candidates.truncate(config.max_candidates_per_source);
    }
    info!(count = candidates.len(), "Extracted candidates");

    let candidates: Vec<Candidate> = if config.enrich_details {
        let enricher = Enricher::new(fetcher, extractor, today);
        let mut enriched = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            enriched.extend(enricher.enrich(candidate, category, source).await);
        }
        enriched
    } else {
        candidates
    };

    let items: Vec<CalendarItem> = candidates
        .iter()
        .filter_map(|candidate| {
            let item = candidate.to_item(category, source, today);
            if item.is_none() {
                debug!(title = %candidate.title, "Dropping candidate without a usable date");
            }
            item
        })
        .collect();
    Ok(items)
}
