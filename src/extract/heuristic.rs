//! Markup heuristics used when structured extraction is unavailable
//!
//! Listing pages are read in three passes, stopping at the first that yields
//! anything: calendar grid cells, listing containers, then heading sections.
//! Detail pages are split into heading sections and only the section about the
//! target title is read. Sources with their own `SiteSelectors` are read with
//! those first.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::candidate::{Candidate, title_similarity, titles_match};
use super::dates::{date_snippet, time_snippet};
use super::error::ExtractError;
use crate::calendar::{Category, SiteSelectors};
use crate::fetcher::content::{listing_containers, truncate_chars};
use crate::fetcher::resolve_url;
use crate::recurrence::RecurrencePattern;

const MAX_DESCRIPTION_CHARS: usize = 200;

/// Navigation and interface labels that are never items
const JUNK_TITLES: &[&str] = &[
    "log in",
    "login",
    "sign in",
    "sign up",
    "register",
    "read more",
    "learn more",
    "more info",
    "more details",
    "view details",
    "view all",
    "see all",
    "menu",
    "search",
    "home",
    "about",
    "about us",
    "contact",
    "contact us",
    "subscribe",
    "share",
    "calendar",
    "events",
    "classes",
    "meetings",
    "next",
    "previous",
    "back",
];

static DATE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)date|time").expect("valid date class regex"));

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[Ll]ocation|[Ww]here|[Vv]enue)\s*:\s*([^\n|]+)").expect("valid location regex")
});

static INSTRUCTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[Ii]nstructor|[Tt]aught by|with)\s*:?\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})")
        .expect("valid instructor regex")
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: &ElementRef<'_>) -> String {
    collapse(&el.text().collect::<Vec<_>>().join(" "))
}

/// Whether a title is navigation chrome or too short to be an item
pub fn is_junk_title(title: &str) -> bool {
    let normalized = collapse(title).to_lowercase();
    let trimmed = normalized.trim_matches(|c: char| !c.is_alphanumeric());
    trimmed.chars().count() < 3 || JUNK_TITLES.contains(&trimmed)
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4")
}

/// A heading and the content that follows it up to the next heading
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingSection {
    pub heading: String,
    /// Text of each following sibling, in order
    pub lines: Vec<String>,
    pub text: String,
    pub first_paragraph: Option<String>,
    pub link: Option<String>,
}

/// Split a document into heading sections, in document order
pub fn heading_sections(document: &Html) -> Vec<HeadingSection> {
    let headings = selector("h1, h2, h3, h4");
    let paragraph = selector("p");
    let anchor = selector("a[href]");

    document
        .select(&headings)
        .filter_map(|heading| {
            let title = element_text(&heading);
            if title.is_empty() {
                return None;
            }

            let mut parts = Vec::new();
            let mut first_paragraph = None;
            let mut link = heading
                .select(&anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string);

            for node in heading.next_siblings() {
                match node.value() {
                    Node::Element(el) if is_heading(el.name()) => break,
                    Node::Element(_) => {
                        let Some(el) = ElementRef::wrap(node) else {
                            continue;
                        };
                        if el.select(&headings).next().is_some() {
                            break;
                        }
                        if first_paragraph.is_none() {
                            first_paragraph = if el.value().name() == "p" {
                                Some(element_text(&el))
                            } else {
                                el.select(&paragraph).next().map(|p| element_text(&p))
                            }
                            .filter(|p| !p.is_empty());
                        }
                        if link.is_none() {
                            link = el
                                .select(&anchor)
                                .next()
                                .or_else(|| (el.value().name() == "a").then_some(el))
                                .and_then(|a| a.value().attr("href"))
                                .map(str::to_string);
                        }
                        parts.push(element_text(&el));
                    }
                    Node::Text(text) => parts.push(collapse(text)),
                    _ => {}
                }
            }
            parts.retain(|part| !part.is_empty());

            Some(HeadingSection {
                heading: title,
                text: parts.join(" "),
                lines: parts,
                first_paragraph,
                link,
            })
        })
        .collect()
}

fn description_from(text: Option<String>) -> Option<String> {
    text.map(|t| truncate_chars(&t, MAX_DESCRIPTION_CHARS).to_string())
        .filter(|t| !t.is_empty())
}

/// A title may carry any recurrence shape; surrounding text only explicit phrases
fn recurrence_in(title: &str, body: &str) -> Option<String> {
    RecurrencePattern::parse(title)
        .or_else(|| RecurrencePattern::parse_phrase(body))
        .map(|pattern| pattern.to_string())
}

fn first_text(el: &ElementRef, selector: &Selector) -> Option<String> {
    el.select(selector)
        .map(|found| element_text(&found))
        .find(|text| !text.is_empty())
}

fn calendar_cells(document: &Html, base_url: &str) -> Vec<Candidate> {
    let cells = selector("td[data-date]");
    let links = selector("a");

    let mut candidates = Vec::new();
    for cell in document.select(&cells) {
        let Some(date) = cell.value().attr("data-date") else {
            continue;
        };
        let cell_text = element_text(&cell);
        for link in cell.select(&links) {
            let title = element_text(&link);
            if title.chars().count() <= 3 {
                continue;
            }
            candidates.push(Candidate {
                date_text: Some(date.to_string()),
                time_text: time_snippet(&cell_text).map(str::to_string),
                detail_url: link.value().attr("href").map(|href| resolve_url(base_url, href)),
                recurrence_hint: recurrence_in(&title, ""),
                ..Candidate::new(title)
            });
        }
    }
    candidates
}

fn container_candidates(document: &Html, base_url: &str) -> Vec<Candidate> {
    let title_selector = selector("h2, h3, h4, a");
    let time_selector = selector("time");
    let any = selector("*");
    let anchor = selector("a[href]");
    let paragraph = selector("p");

    let containers = listing_containers(document);
    let titled: HashSet<_> = containers
        .iter()
        .filter(|el| first_text(el, &title_selector).is_some())
        .map(|el| el.id())
        .collect();

    containers
        .iter()
        // Wrappers around titled entries would repeat their first child;
        // untitled inner parts such as `event-date` do not make a wrapper
        .filter(|el| {
            !el.descendants()
                .skip(1)
                .any(|node| titled.contains(&node.id()))
        })
        .filter_map(|el| {
            let Some(title) = first_text(el, &title_selector) else {
                debug!("Skipping listing container without a title");
                return None;
            };

            let text = element_text(el);
            let dated = el
                .select(&time_selector)
                .next()
                .map(|t| {
                    t.value()
                        .attr("datetime")
                        .map(str::to_string)
                        .unwrap_or_else(|| element_text(&t))
                })
                .or_else(|| {
                    el.select(&any)
                        .find(|d| d.value().attr("class").is_some_and(|c| DATE_CLASS.is_match(c)))
                        .map(|d| element_text(&d))
                })
                .filter(|t| !t.is_empty());
            let date_text = dated
                .clone()
                .or_else(|| date_snippet(&text).map(str::to_string));
            let time_text = dated
                .as_deref()
                .and_then(time_snippet)
                .or_else(|| time_snippet(&text))
                .map(str::to_string);

            Some(Candidate {
                date_text,
                time_text,
                detail_url: el
                    .select(&anchor)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| resolve_url(base_url, href)),
                recurrence_hint: recurrence_in(&title, &text),
                description: description_from(el.select(&paragraph).next().map(|p| element_text(&p))),
                ..Candidate::new(title)
            })
        })
        .collect()
}

fn section_candidates(document: &Html, base_url: &str) -> Vec<Candidate> {
    heading_sections(document)
        .into_iter()
        .filter_map(|section| {
            let date_text = date_snippet(&section.text)?.to_string();
            Some(Candidate {
                date_text: Some(date_text),
                time_text: time_snippet(&section.text).map(str::to_string),
                detail_url: section.link.as_deref().map(|href| resolve_url(base_url, href)),
                recurrence_hint: recurrence_in(&section.heading, &section.text),
                description: description_from(section.first_paragraph),
                ..Candidate::new(section.heading)
            })
        })
        .collect()
}

fn without_junk_and_repeats(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| {
            if is_junk_title(&c.title) {
                debug!(title = %c.title, "Dropping junk title");
                return false;
            }
            seen.insert((c.title.clone(), c.date_text.clone()))
        })
        .collect()
}

/// Extract candidates from a listing page without a model
///
/// # Arguments
///
/// * `html` - The listing page markup
/// * `category` - The category being extracted
/// * `base_url` - The listing URL, for resolving relative links
///
/// # Returns
///
/// Candidates in page order, with junk titles and repeated
/// `(title, date)` pairs removed
pub fn extract_listing(html: &str, category: Category, base_url: &str) -> Vec<Candidate> {
    let document = Html::parse_document(html);

    let mut candidates = calendar_cells(&document, base_url);
    let mut strategy = "calendar table";
    if candidates.is_empty() {
        candidates = container_candidates(&document, base_url);
        strategy = "listing containers";
    }
    if candidates.is_empty() {
        candidates = section_candidates(&document, base_url);
        strategy = "heading sections";
    }

    let candidates = without_junk_and_repeats(candidates);

    debug!(
        category = %category,
        strategy,
        count = candidates.len(),
        "Heuristic listing extraction"
    );
    candidates
}

/// Extract candidates from a listing page with a site's own selectors
///
/// # Arguments
///
/// * `html` - The listing page markup
/// * `selectors` - The site's selectors
/// * `base_url` - The listing URL, for resolving relative links
///
/// # Returns
///
/// Candidates in page order, or `ExtractError::InvalidSelector` when a
/// selector does not parse
pub fn extract_with_selectors(
    html: &str,
    selectors: &SiteSelectors,
    base_url: &str,
) -> Result<Vec<Candidate>, ExtractError> {
    let parse = |css: &str| {
        Selector::parse(css).map_err(|_| ExtractError::InvalidSelector {
            selector: css.to_string(),
        })
    };
    let item = parse(&selectors.item)?;
    let title_selector = parse(&selectors.title)?;
    let link = parse(&selectors.link)?;
    let description = parse(&selectors.description)?;
    let day = selectors.date.as_deref().map(parse).transpose()?;
    let month = selectors.month.as_deref().map(parse).transpose()?;
    let time = selectors.time.as_deref().map(parse).transpose()?;

    let document = Html::parse_document(html);
    let candidates = document
        .select(&item)
        .filter_map(|el| {
            let Some(title) = first_text(&el, &title_selector) else {
                debug!("Skipping site item without a title");
                return None;
            };

            let text = element_text(&el);
            let day_text = day.as_ref().and_then(|sel| first_text(&el, sel));
            let month_text = month.as_ref().and_then(|sel| first_text(&el, sel));
            let date_text = match (month_text, day_text.clone()) {
                (Some(month), Some(day)) => Some(format!("{} {}", month, day)),
                (None, Some(day)) => Some(day),
                _ => date_snippet(&text).map(str::to_string),
            };
            let time_text = time
                .as_ref()
                .and_then(|sel| first_text(&el, sel))
                .or_else(|| day_text.as_deref().and_then(time_snippet).map(str::to_string))
                .or_else(|| time_snippet(&text).map(str::to_string));

            Some(Candidate {
                date_text,
                time_text,
                detail_url: el
                    .select(&link)
                    .next()
                    .or_else(|| (el.value().name() == "a").then_some(el))
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| resolve_url(base_url, href)),
                recurrence_hint: recurrence_in(&title, &text),
                description: description_from(first_text(&el, &description)),
                ..Candidate::new(title)
            })
        })
        .collect();

    let candidates = without_junk_and_repeats(candidates);
    debug!(count = candidates.len(), "Site selector extraction");
    Ok(candidates)
}

/// Extract the details of one item from its detail page
///
/// Only the heading section whose heading matches `title` is read, so
/// sibling items on the same page never leak into the result.
///
/// # Returns
///
/// A candidate holding what the section provides, or `None` when no
/// section matches the title
pub fn extract_detail(html: &str, title: &str, category: Category) -> Option<Candidate> {
    let document = Html::parse_document(html);

    let section = heading_sections(&document)
        .into_iter()
        .filter(|section| titles_match(&section.heading, title))
        .fold(None::<(f64, HeadingSection)>, |best, section| {
            let score = title_similarity(&section.heading, title);
            match best {
                Some((best_score, _)) if best_score >= score => best,
                _ => Some((score, section)),
            }
        })
        .map(|(_, section)| section)?;

    let text = &section.text;
    let capture_line = |re: &Regex| {
        section
            .lines
            .iter()
            .find_map(|line| re.captures(line).map(|c| c[1].trim().to_string()))
            .filter(|value| !value.is_empty())
    };
    let instructor = match category {
        Category::Classes => capture_line(&INSTRUCTOR),
        _ => None,
    };

    Some(Candidate {
        title: section.heading.clone(),
        date_text: date_snippet(text).map(str::to_string),
        time_text: time_snippet(text).map(str::to_string),
        detail_url: None,
        recurrence_hint: recurrence_in(&section.heading, text),
        description: description_from(section.first_paragraph.clone()),
        location: capture_line(&LOCATION),
        instructor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://valdostacity.com/events";

    #[test]
    fn test_junk_titles() {
        assert!(is_junk_title("Read More"));
        assert!(is_junk_title("  LOG IN "));
        assert!(is_junk_title("Go"));
        assert!(!is_junk_title("Jazz Night"));
    }

    #[test]
    fn test_calendar_table_cells() {
        let html = r#"<table>
            <tr><td data-date="2026-03-06"><a href="/event/art-walk">First Friday Art Walk</a> 5:00 PM</td>
                <td data-date="2026-03-07"><a href="/event/x">Go</a></td></tr>
        </table>"#;
        let candidates = extract_listing(html, Category::Events, BASE);

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.title, "First Friday Art Walk");
        assert_eq!(c.date_text.as_deref(), Some("2026-03-06"));
        assert_eq!(c.time_text.as_deref(), Some("5:00 PM"));
        assert_eq!(c.detail_url.as_deref(), Some("https://valdostacity.com/event/art-walk"));
        assert_eq!(c.recurrence_hint.as_deref(), Some("first friday"));
    }

    #[test]
    fn test_listing_containers() {
        let html = r#"<div class="events-list">
            <div class="event-card">
                <h3><a href="/events/jazz">Jazz Night</a></h3>
                <time datetime="2026-03-15T19:30">Mar 15</time>
                <p>Live jazz downtown.</p>
            </div>
            <div class="event-card">
                <h3>Spring Festival</h3>
                <span>Saturday, April 18 from 10am</span>
            </div>
            <div class="event-card"><a href="/login">Log In</a></div>
        </div>"#;
        let candidates = extract_listing(html, Category::Events, BASE);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Jazz Night");
        assert_eq!(candidates[0].date_text.as_deref(), Some("2026-03-15T19:30"));
        assert_eq!(candidates[0].description.as_deref(), Some("Live jazz downtown."));
        assert_eq!(
            candidates[0].detail_url.as_deref(),
            Some("https://valdostacity.com/events/jazz")
        );
        assert_eq!(candidates[1].title, "Spring Festival");
        assert_eq!(candidates[1].date_text.as_deref(), Some("April 18"));
        assert_eq!(candidates[1].time_text.as_deref(), Some("10am"));
    }

    #[test]
    fn test_opening_hours_in_description_are_not_a_schedule() {
        let html = r#"<div class="event-card">
            <h3>Wine Tasting Gala</h3>
            <span class="date">March 15, 2026</span>
            <p>The gallery is open Tuesdays through Saturdays.</p>
        </div>"#;
        let candidates = extract_listing(html, Category::Events, BASE);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].recurrence_hint, None);

        let today = chrono::NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let source = crate::calendar::SourceConfig::new(
            "Gallery",
            BASE,
            Category::Events,
            crate::calendar::ScrapingMethod::Auto,
        );
        let item = candidates[0].to_item(Category::Events, &source, today).unwrap();
        let expanded = crate::recurrence::expand(&item, today, 6);
        assert_eq!(expanded, vec![item]);
    }

    #[test]
    fn test_containers_with_classed_parts_are_kept() {
        let html = r#"<ul class="events-list">
            <li class="event-item"><a href="/events/jazz">Jazz Night</a><div class="event-date">March 15, 2026</div></li>
            <li class="event-item"><a href="/events/walk">Art Walk</a><div class="event-date">March 20, 2026</div></li>
        </ul>"#;
        let candidates = extract_listing(html, Category::Events, BASE);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Jazz Night");
        assert_eq!(candidates[0].date_text.as_deref(), Some("March 15, 2026"));
        assert_eq!(
            candidates[0].detail_url.as_deref(),
            Some("https://valdostacity.com/events/jazz")
        );
        assert_eq!(candidates[1].title, "Art Walk");
    }

    #[test]
    fn test_site_selectors_join_split_day_and_month() {
        let html = r#"<section>
            <article class="event-item">
                <a href="/event/blues-fest/">
                    <div class="date"><span>18</span></div>
                    <div class="txt"><span>Apr</span></div>
                    <h3>Blues Fest</h3>
                </a>
                <p>Music all day in Drexel Park.</p>
            </article>
            <article class="event-item">
                <div class="date"><span>2</span></div>
                <div class="txt"><span>May</span></div>
                <h3>Read More</h3>
            </article>
        </section>"#;
        let selectors = SiteSelectors::preset("visitvaldosta_events").unwrap();
        let candidates =
            extract_with_selectors(html, &selectors, "https://visitvaldosta.org/events/").unwrap();

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.title, "Blues Fest");
        assert_eq!(c.date_text.as_deref(), Some("Apr 18"));
        assert_eq!(c.detail_url.as_deref(), Some("https://visitvaldosta.org/event/blues-fest/"));
        assert_eq!(c.description.as_deref(), Some("Music all day in Drexel Park."));
    }

    #[test]
    fn test_invalid_site_selector_is_reported() {
        let selectors = SiteSelectors::new("div[[");
        let result = extract_with_selectors("<div></div>", &selectors, BASE);
        assert!(matches!(result, Err(ExtractError::InvalidSelector { .. })));
    }

    #[test]
    fn test_heading_sections_fallback_skips_undated() {
        let html = r#"<body>
            <h2>Planning Commission</h2><p>March 18, 2026 at 5:30 PM, City Hall</p>
            <h2>Public Notices</h2><p>Read our latest notices.</p>
        </body>"#;
        let candidates = extract_listing(html, Category::Meetings, BASE);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Planning Commission");
        assert_eq!(candidates[0].date_text.as_deref(), Some("March 18, 2026"));
        assert_eq!(candidates[0].time_text.as_deref(), Some("5:30 PM"));
    }

    #[test]
    fn test_detail_isolates_target_section() {
        let html = r#"<main>
            <h2>Jazz Night</h2>
            <p>An evening of live jazz.</p>
            <div>March 15, 2026 at 7:30 PM</div>
            <div>Location: Turner Center Main Hall</div>
            <h2>Blues Brunch</h2>
            <p>Sunday brunch with blues.</p>
            <div>March 22, 2026 at 11:00 AM</div>
            <div>Location: Annex Cafe</div>
        </main>"#;

        let jazz = extract_detail(html, "Jazz Night", Category::Events).unwrap();
        assert_eq!(jazz.date_text.as_deref(), Some("March 15, 2026"));
        assert_eq!(jazz.time_text.as_deref(), Some("7:30 PM"));
        assert_eq!(jazz.location.as_deref(), Some("Turner Center Main Hall"));
        assert_eq!(jazz.description.as_deref(), Some("An evening of live jazz."));

        let brunch = extract_detail(html, "Blues Brunch", Category::Events).unwrap();
        assert_eq!(brunch.date_text.as_deref(), Some("March 22, 2026"));
        assert_eq!(brunch.location.as_deref(), Some("Annex Cafe"));

        assert!(extract_detail(html, "Poetry Slam", Category::Events).is_none());
    }

    #[test]
    fn test_detail_reads_instructor_for_classes() {
        let html = r#"<article>
            <h1>Wheel Throwing Basics</h1>
            <p>Learn to center clay.</p>
            <div>Instructor: Jane Smith</div>
            <div>Every Tuesday, March 10 at 6pm</div>
        </article>"#;
        let class = extract_detail(html, "Wheel Throwing Basics", Category::Classes).unwrap();
        assert_eq!(class.instructor.as_deref(), Some("Jane Smith"));
        assert_eq!(class.recurrence_hint.as_deref(), Some("every tuesday"));
    }
}
