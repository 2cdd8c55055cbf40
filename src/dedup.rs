//! # Deduplication Module
//!
//! Collapses items that describe the same occurrence. Each category has its
//! own notion of sameness:
//!
//! - events: same date and same normalized title; the longer title wins
//! - classes: same date, instructor and title; sessions on other dates are distinct
//! - meetings: same date, location and exact title
//!
//! All functions are pure and idempotent. Output keeps first-seen order.

use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, warn};

use crate::calendar::{CalendarItem, Category};

static LEADING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:19|20)\d{2}\b").expect("valid year regex"));

static ORDINALS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:\d+(?:st|nd|rd|th)|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|annual)\b",
    )
    .expect("valid ordinal regex")
});

/// Title key for event matching
///
/// Lowercases, drops a leading year, punctuation, ordinals and "annual", and
/// collapses whitespace, so "2026 Annual Spring Festival!" and
/// "Spring Festival" share a key.
pub fn normalize_event_title(title: &str) -> String {
    let lower = title.to_lowercase();
    let without_year = LEADING_YEAR.replace(&lower, "");
    let without_punctuation: String = without_year
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    let without_ordinals = ORDINALS.replace_all(&without_punctuation, " ");
    without_ordinals.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fill_missing(winner: &mut CalendarItem, loser: CalendarItem) {
    if winner.description.is_none() {
        winner.description = loser.description;
    }
    if winner.location.is_none() {
        winner.location = loser.location;
    }
}

/// First-seen dedup under `key`
fn dedup_first_seen<K, F>(items: Vec<CalendarItem>, key: F) -> Vec<CalendarItem>
where
    K: Eq + Hash,
    F: Fn(&CalendarItem) -> K,
{
    let before = items.len();
    let mut seen = HashSet::new();
    let kept: Vec<CalendarItem> = items.into_iter().filter(|item| seen.insert(key(item))).collect();
    debug!(before, after = kept.len(), "Deduplicated");
    kept
}

/// Merge events sharing a date and normalized title
pub fn dedup_events(items: Vec<CalendarItem>) -> Vec<CalendarItem> {
    let before = items.len();
    let mut index: HashMap<(NaiveDate, String), usize> = HashMap::new();
    let mut kept: Vec<CalendarItem> = Vec::with_capacity(items.len());

    for item in items {
        match index.entry((item.date(), normalize_event_title(&item.title))) {
            Entry::Occupied(entry) => {
                let existing = &mut kept[*entry.get()];
                if item.title.chars().count() > existing.title.chars().count() {
                    let loser = std::mem::replace(existing, item);
                    fill_missing(existing, loser);
                } else {
                    fill_missing(existing, item);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(kept.len());
                kept.push(item);
            }
        }
    }

    debug!(before, after = kept.len(), "Deduplicated events");
    kept
}

/// Drop repeated class sessions; same title on other dates stays
pub fn dedup_classes(items: Vec<CalendarItem>) -> Vec<CalendarItem> {
    dedup_first_seen(items, |item| {
        (
            item.date(),
            item.instructor.clone().unwrap_or_default(),
            item.title
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        )
    })
}

/// Drop repeated meetings; titles must match exactly
pub fn dedup_meetings(items: Vec<CalendarItem>) -> Vec<CalendarItem> {
    dedup_first_seen(items, |item| {
        (
            item.date(),
            item.location.clone().unwrap_or_default(),
            item.title.clone(),
        )
    })
}

/// Deduplicate items of one category
///
/// Items belonging to another category are dropped with a warning.
pub fn deduplicate(category: Category, items: Vec<CalendarItem>) -> Vec<CalendarItem> {
    let items: Vec<CalendarItem> = items
        .into_iter()
        .filter(|item| {
            let matches = item.category() == category;
            if !matches {
                warn!(
                    title = %item.title,
                    expected = %category,
                    found = %item.category(),
                    "Dropping item from another category"
                );
            }
            matches
        })
        .collect();

    match category {
        Category::Events => dedup_events(items),
        Category::Classes => dedup_classes(items),
        Category::Meetings => dedup_meetings(items),
    }
}
