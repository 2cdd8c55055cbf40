//! Content narrowing helpers for fetched pages

use std::sync::LazyLock;

use chrono::{Months, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Class names that mark an individual listing entry
static LISTING_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)event|card|item|entry|post|listing|view").expect("valid listing class regex")
});

static MAIN_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)main|content|body").expect("valid main class regex"));

/// Main containers smaller than this are usually empty JS-rendered shells
const MIN_MAIN_CONTAINER_CHARS: usize = 1000;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

/// Elements whose class attribute looks like a listing entry, in document order
pub fn listing_containers(document: &Html) -> Vec<ElementRef<'_>> {
    let candidates = selector("article, div, li, section");
    document
        .select(&candidates)
        .filter(|el| {
            el.value()
                .attr("class")
                .is_some_and(|class| LISTING_CLASS.is_match(class))
        })
        .collect()
}

/// Whether the page carries a calendar grid
pub fn has_calendar_table(html: &str) -> bool {
    let document = Html::parse_document(html);
    document.select(&selector("table")).next().is_some()
}

/// Clean HTML down to the part worth sending to the extractor
///
/// # Arguments
///
/// * `html` - The full page markup
/// * `exclude_selectors` - CSS selectors for elements to strip
/// * `max_chars` - Cap on the returned markup
///
/// # Returns
///
/// The narrowed markup
pub fn clean_html(html: &str, exclude_selectors: &[String], max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let main = document
        .select(&selector("main, article"))
        .next()
        .or_else(|| {
            document.select(&selector("div")).find(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|class| MAIN_CLASS.is_match(class))
            })
        })
        .map(|el| el.html())
        .filter(|main| main.chars().count() >= MIN_MAIN_CONTAINER_CHARS);

    let mut region = match main {
        Some(main) => {
            debug!("Using main container ({} chars)", main.chars().count());
            main
        }
        None => {
            let containers = listing_containers(&document);
            if !containers.is_empty() {
                debug!("Using {} listing containers", containers.len());
                containers
                    .iter()
                    .map(|el| el.html())
                    .collect::<Vec<_>>()
                    .join("\n")
            } else if let Some(table) = document.select(&selector("table")).next() {
                debug!("Using calendar table with context");
                table
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .find(|el| matches!(el.value().name(), "div" | "section" | "main"))
                    .unwrap_or(table)
                    .html()
            } else {
                document
                    .select(&selector("body"))
                    .next()
                    .map(|body| body.html())
                    .unwrap_or_else(|| html.to_string())
            }
        }
    };

    for selector_str in exclude_selectors {
        match Selector::parse(selector_str) {
            Ok(selector) => {
                let fragment = Html::parse_fragment(&region);
                let to_remove: Vec<String> = fragment.select(&selector).map(|el| el.html()).collect();
                for element_html in to_remove {
                    // Serialization is stable between the two parses, so the
                    // fragment's markup appears verbatim in the region.
                    if let Some(pos) = region.find(&element_html) {
                        region.replace_range(pos..pos + element_html.len(), "");
                    }
                }
            }
            Err(e) => warn!("Failed to parse selector '{}': {}", selector_str, e),
        }
    }

    truncate_chars(&region, max_chars).to_string()
}

/// Longest prefix of `s` with at most `max` characters
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Resolve a possibly-relative link against the page it was found on
pub fn resolve_url(base: &str, href: &str) -> String {
    let href = href.trim();
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// `?month=YYYY-MM` variants of a calendar URL for the months after `today`
pub fn month_page_urls(url: &str, today: NaiveDate, months: u32) -> Vec<String> {
    let base = url.split('?').next().unwrap_or(url);
    (1..months)
        .filter_map(|offset| today.checked_add_months(Months::new(offset)))
        .map(|month| format!("{}?month={}", base, month.format("%Y-%m")))
        .collect()
}
