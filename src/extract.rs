//! # Extraction Module
//!
//! Turns listing and detail pages into candidates. Two paths exist for every
//! page: a model-backed structured extractor driven by category-tuned prompts,
//! and markup heuristics that work without any model.
//!
//! ## Key Components
//!
//! - `StructuredExtractor`: prompt in, records out; the seam to the model
//! - `LlmExtractor`: the rig-backed implementation
//! - `Candidate`: an item found on a page, before dates are resolved
//! - `heuristic`: calendar grids, listing containers and heading sections
//! - `dates`: date and time parsing with year inference
//! - `prompts`: listing and detail prompts per category
//!
//! ## Fallback
//!
//! Sources configured for AI extraction fall back to the heuristics when no
//! extractor is configured or the model call fails. A model answer that is
//! not usable JSON yields no candidates.

mod candidate;
pub mod dates;
mod error;
pub mod heuristic;
mod llm;
pub mod prompts;

pub use candidate::{Candidate, ExtractedRecord, normalize_title, title_similarity, titles_match};
pub use error::ExtractError;
pub use heuristic::is_junk_title;
pub use llm::{LlmExtractor, NoExtractor, StructuredExtractor, parse_records};

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::calendar::{Category, ScrapingMethod, SourceConfig};

/// Records from the model, flattened into candidates with junk and repeats removed
fn candidates_from_records(records: Vec<ExtractedRecord>, base_url: &str) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .flat_map(|record| Candidate::from_record(record, base_url))
        .filter(|c| !is_junk_title(&c.title))
        .filter(|c| seen.insert((c.title.clone(), c.date_text.clone())))
        .collect()
}

/// Stage-1 extraction for one listing page
///
/// # Arguments
///
/// * `extractor` - The structured extractor, if one is configured
/// * `html` - The raw listing markup, read by the heuristics
/// * `cleaned` - The narrowed markup sent to the model
/// * `category` - The category being refreshed
/// * `source` - The source the page belongs to
/// * `today` - Reference date for prompts
///
/// # Returns
///
/// Candidates in page order
#[instrument(skip_all, fields(source = %source.name, category = %category))]
pub async fn extract_candidates<E: StructuredExtractor>(
    extractor: Option<&E>,
    html: &str,
    cleaned: &str,
    category: Category,
    source: &SourceConfig,
    today: NaiveDate,
) -> Vec<Candidate> {
    match extractor {
        Some(extractor) if source.scraping_method.uses_ai() => {
            let prompt = prompts::listing_prompt(category, today, cleaned);
            match extractor.extract(&prompt).await {
                Ok(records) => {
                    let candidates = candidates_from_records(records, &source.url);
                    info!(count = candidates.len(), "Structured extraction finished");
                    return candidates;
                }
                Err(ExtractError::Malformed(detail)) => {
                    warn!(%detail, "Unusable extraction response, no candidates");
                    return Vec::new();
                }
                Err(e) => warn!("Structured extraction failed, using heuristics: {}", e),
            }
        }
        None if source.scraping_method.uses_ai() => {
            debug!("No structured extractor configured, using heuristics");
        }
        _ => {}
    }

    if source.scraping_method == ScrapingMethod::Custom {
        if let Some(selectors) = source.site_selectors() {
            match heuristic::extract_with_selectors(html, &selectors, &source.url) {
                Ok(candidates) if !candidates.is_empty() => {
                    info!(count = candidates.len(), "Site selector extraction finished");
                    return candidates;
                }
                Ok(_) => debug!("Site selectors matched nothing, using generic heuristics"),
                Err(e) => warn!("Site selectors unusable, using generic heuristics: {}", e),
            }
        }
    }

    heuristic::extract_listing(html, category, &source.url)
}

/// Stage-2 structured extraction for one detail page
///
/// Only records whose title matches `title` are considered; the closest match
/// wins.
///
/// # Returns
///
/// The matching candidates (several when the item lists several dates), or
/// `ExtractError::NoMatch` when the page yields nothing about `title`
pub async fn extract_detail_records<E: StructuredExtractor>(
    extractor: &E,
    cleaned: &str,
    title: &str,
    category: Category,
    page_url: &str,
    today: NaiveDate,
) -> Result<Vec<Candidate>, ExtractError> {
    let prompt = prompts::detail_prompt(category, title, today, cleaned);
    let records = extractor.extract(&prompt).await?;
    let returned = records.len();

    let best = records
        .into_iter()
        .filter(|record| {
            record
                .title
                .as_deref()
                .is_some_and(|t| titles_match(t, title))
        })
        .fold(None::<(f64, ExtractedRecord)>, |best, record| {
            let score = title_similarity(record.title.as_deref().unwrap_or_default(), title);
            match best {
                Some((best_score, _)) if best_score >= score => best,
                _ => Some((score, record)),
            }
        })
        .map(|(_, record)| record);

    let Some(record) = best else {
        debug!(returned, "No returned record matches the target title");
        return Err(ExtractError::NoMatch {
            title: title.to_string(),
        });
    };

    let candidates = Candidate::from_record(record, page_url);
    if candidates.is_empty() {
        return Err(ExtractError::NoMatch {
            title: title.to_string(),
        });
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::SiteSelectors;

    /// Replays a fixed answer for every prompt
    struct Scripted(Result<&'static str, ()>);

    impl StructuredExtractor for Scripted {
        async fn extract(&self, _prompt: &str) -> Result<Vec<ExtractedRecord>, ExtractError> {
            match self.0 {
                Ok(raw) => parse_records(raw),
                Err(()) => Err(ExtractError::Unavailable),
            }
        }
    }

    const LISTING: &str = r#"<div class="event-card"><h3>Heuristic Fair</h3><span>March 5</span></div>"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    fn source(method: ScrapingMethod) -> SourceConfig {
        SourceConfig::new("City", "https://city.gov/events", Category::Events, method)
    }

    #[tokio::test]
    async fn test_ai_path_uses_records() {
        let extractor = Scripted(Ok(
            r#"[{"title": "Jazz Night", "date": "2026-03-15"}, {"title": "Read More"}, {"title": "Jazz Night", "date": "2026-03-15"}]"#,
        ));
        let candidates = extract_candidates(
            Some(&extractor),
            LISTING,
            LISTING,
            Category::Events,
            &source(ScrapingMethod::Ai),
            today(),
        )
        .await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Jazz Night");
    }

    #[tokio::test]
    async fn test_auto_method_uses_heuristics_even_with_extractor() {
        let extractor = Scripted(Ok(r#"[{"title": "Jazz Night"}]"#));
        let candidates = extract_candidates(
            Some(&extractor),
            LISTING,
            LISTING,
            Category::Events,
            &source(ScrapingMethod::Auto),
            today(),
        )
        .await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Heuristic Fair");
    }

    #[tokio::test]
    async fn test_failed_extraction_falls_back_to_heuristics() {
        let extractor = Scripted(Err(()));
        let candidates = extract_candidates(
            Some(&extractor),
            LISTING,
            LISTING,
            Category::Events,
            &source(ScrapingMethod::AiTwostage),
            today(),
        )
        .await;
        assert_eq!(candidates[0].title, "Heuristic Fair");
    }

    #[tokio::test]
    async fn test_malformed_response_yields_nothing() {
        let extractor = Scripted(Ok("Sorry, I cannot help with that."));
        let candidates = extract_candidates(
            Some(&extractor),
            LISTING,
            LISTING,
            Category::Events,
            &source(ScrapingMethod::Ai),
            today(),
        )
        .await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_custom_source_uses_site_selectors() {
        let html = r#"<div class="row"><strong>Budget Workshop</strong><em>March 9, 2026</em></div>
            <div class="event-card"><h3>Heuristic Fair</h3><span>March 5</span></div>"#;
        let mut selectors = SiteSelectors::new("div.row");
        selectors.title = "strong".to_string();
        selectors.date = Some("em".to_string());
        let custom = source(ScrapingMethod::Custom).with_selectors(selectors);

        let candidates =
            extract_candidates(None::<&NoExtractor>, html, html, Category::Events, &custom, today())
                .await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Budget Workshop");
        assert_eq!(candidates[0].date_text.as_deref(), Some("March 9, 2026"));

        // Selectors that match nothing fall back to the generic heuristics
        let empty = source(ScrapingMethod::Custom).with_selectors(SiteSelectors::new("table.none"));
        let candidates =
            extract_candidates(None::<&NoExtractor>, html, html, Category::Events, &empty, today())
                .await;
        assert_eq!(candidates[0].title, "Heuristic Fair");
    }

    #[tokio::test]
    async fn test_bracketed_prose_yields_nothing() {
        let extractor = Scripted(Ok("No events listed [see the page] for details."));
        let candidates = extract_candidates(
            Some(&extractor),
            LISTING,
            LISTING,
            Category::Events,
            &source(ScrapingMethod::Ai),
            today(),
        )
        .await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_detail_records_filtered_by_title() {
        let extractor = Scripted(Ok(
            r#"[{"title": "Blues Brunch", "date": "2026-03-22"}, {"title": "Jazz Night Live", "date": "2026-03-15"}, {"title": "Jazz Night", "date": "2026-03-16"}]"#,
        ));
        let candidates = extract_detail_records(
            &extractor,
            "<main></main>",
            "Jazz Night",
            Category::Events,
            "https://city.gov/events/jazz",
            today(),
        )
        .await
        .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].date_text.as_deref(), Some("2026-03-16"));

        let result = extract_detail_records(
            &extractor,
            "<main></main>",
            "Poetry Slam",
            Category::Events,
            "https://city.gov/events/poetry",
            today(),
        )
        .await;
        assert!(matches!(result, Err(ExtractError::NoMatch { .. })));
    }
}
