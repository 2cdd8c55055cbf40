//! Candidates produced by listing and detail extraction

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dates::{infer_time, parse_date, parse_time};
use crate::calendar::{CalendarItem, Category, SourceConfig};
use crate::fetcher::resolve_url;
use crate::recurrence::{RecurrencePattern, normalize_hint};

/// One record as returned by the structured-extraction collaborator.
///
/// Every field is optional on the wire; models routinely omit or null them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedRecord {
    pub title: Option<String>,
    pub date: Option<String>,
    /// Additional dates for items that run on several days
    pub dates: Vec<String>,
    pub time: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub location: Option<String>,
    pub instructor: Option<String>,
    #[serde(alias = "recurrence", alias = "recurring")]
    pub recurring_pattern: Option<String>,
}

/// An item discovered on a listing page, before dates are resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub date_text: Option<String>,
    pub time_text: Option<String>,
    pub detail_url: Option<String>,
    pub recurrence_hint: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub instructor: Option<String>,
}

/// Lowercase alphanumeric words of a title, single-spaced
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether either normalized title contains the other
pub fn titles_match(a: &str, b: &str) -> bool {
    let (a, b) = (normalize_title(a), normalize_title(b));
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

/// Word-set overlap between two titles, from 0.0 to 1.0
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_title(a);
    let b = normalize_title(b);
    let a: HashSet<&str> = a.split(' ').filter(|w| !w.is_empty()).collect();
    let b: HashSet<&str> = b.split(' ').filter(|w| !w.is_empty()).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty())
}

impl Candidate {
    /// Create a candidate with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Build candidates from an extracted record, one per listed date.
    ///
    /// Relative URLs are resolved against `base_url`. Records without a title
    /// yield nothing.
    pub fn from_record(record: ExtractedRecord, base_url: &str) -> Vec<Candidate> {
        let Some(title) = non_empty(record.title) else {
            debug!("Skipping record without title");
            return Vec::new();
        };

        let base = Candidate {
            title,
            date_text: None,
            time_text: non_empty(record.time),
            detail_url: non_empty(record.url).map(|url| resolve_url(base_url, &url)),
            recurrence_hint: non_empty(record.recurring_pattern),
            description: non_empty(record.description),
            location: non_empty(record.location),
            instructor: non_empty(record.instructor),
        };

        let mut dates: Vec<String> = non_empty(record.date).into_iter().collect();
        for date in record.dates {
            if let Some(date) = non_empty(Some(date)) {
                if !dates.contains(&date) {
                    dates.push(date);
                }
            }
        }

        if dates.is_empty() {
            return vec![base];
        }
        dates
            .into_iter()
            .map(|date| Candidate {
                date_text: Some(date),
                ..base.clone()
            })
            .collect()
    }

    /// Overlay fields found on a detail page onto this candidate.
    ///
    /// Only fields the detail page actually provides replace existing values,
    /// so a recurrence hint found on the listing page survives a detail page
    /// that reports none.
    pub fn merged_with(&self, detail: Candidate) -> Candidate {
        Candidate {
            title: if detail.title.trim().is_empty() {
                self.title.clone()
            } else {
                detail.title
            },
            date_text: detail.date_text.or_else(|| self.date_text.clone()),
            time_text: detail.time_text.or_else(|| self.time_text.clone()),
            detail_url: self.detail_url.clone().or(detail.detail_url),
            recurrence_hint: detail
                .recurrence_hint
                .and_then(|hint| normalize_hint(&hint))
                .or_else(|| self.recurrence_hint.clone()),
            description: detail.description.or_else(|| self.description.clone()),
            location: detail.location.or_else(|| self.location.clone()),
            instructor: detail.instructor.or_else(|| self.instructor.clone()),
        }
    }

    /// Resolve this candidate into a calendar item.
    ///
    /// Returns `None` when no date can be parsed, unless the candidate recurs,
    /// in which case expansion anchors on `today`.
    pub fn to_item(
        &self,
        category: Category,
        source: &SourceConfig,
        today: NaiveDate,
    ) -> Option<CalendarItem> {
        let recurrence = self.recurrence_hint.as_deref().and_then(normalize_hint);
        let recurs = RecurrencePattern::detect(&self.title, recurrence.as_deref()).is_some();

        let date = self
            .date_text
            .as_deref()
            .and_then(|text| parse_date(text, today))
            .or(recurs.then_some(today))?;

        let time = self
            .time_text
            .as_deref()
            .and_then(parse_time)
            .or_else(|| self.date_text.as_deref().and_then(parse_time))
            .unwrap_or_else(|| {
                let context = format!(
                    "{} {}",
                    self.title,
                    self.description.as_deref().unwrap_or_default()
                );
                infer_time(&context, category)
            });

        let url = self.detail_url.clone().unwrap_or_else(|| source.url.clone());
        let mut item = CalendarItem::new(
            self.title.clone(),
            category,
            date.and_time(time),
            url,
            source.name.clone(),
        );
        item.description = self.description.clone();
        item.location = self.location.clone();
        item.instructor = self.instructor.clone();
        item.recurring_pattern = recurrence;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::ScrapingMethod;

    fn source() -> SourceConfig {
        SourceConfig::new(
            "Turner Center",
            "https://turnercenter.org/events/",
            Category::Events,
            ScrapingMethod::Ai,
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    #[test]
    fn test_from_record_resolves_url_and_splits_dates() {
        let record = ExtractedRecord {
            title: Some("  Winter   Showcase ".to_string()),
            date: Some("2026-02-20".to_string()),
            dates: vec!["2026-02-21".to_string(), "2026-02-20".to_string()],
            url: Some("/event/42".to_string()),
            ..Default::default()
        };
        let candidates = Candidate::from_record(record, "https://turnercenter.org/events/");

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Winter Showcase");
        assert_eq!(candidates[0].date_text.as_deref(), Some("2026-02-20"));
        assert_eq!(candidates[1].date_text.as_deref(), Some("2026-02-21"));
        assert_eq!(
            candidates[0].detail_url.as_deref(),
            Some("https://turnercenter.org/event/42")
        );
    }

    #[test]
    fn test_title_matching() {
        assert!(titles_match("Jazz Night", "Jazz Night: Live at the Turner!"));
        assert!(titles_match("JAZZ  night", "jazz-night"));
        assert!(!titles_match("Jazz Night", "Blues Brunch"));
        assert!(!titles_match("", "Jazz Night"));
        assert!(title_similarity("Jazz Night", "Jazz Night") > title_similarity("Jazz Night", "Jazz Night Encore"));
    }

    #[test]
    fn test_from_record_without_title() {
        let record = ExtractedRecord {
            title: Some("   ".to_string()),
            date: Some("2026-02-20".to_string()),
            ..Default::default()
        };
        assert!(Candidate::from_record(record, "https://x.org").is_empty());
    }

    #[test]
    fn test_merge_keeps_listing_recurrence_when_detail_has_none() {
        let listing = Candidate {
            recurrence_hint: Some("first friday".to_string()),
            date_text: Some("Feb 6".to_string()),
            ..Candidate::new("First Friday Art Walk")
        };
        let detail = Candidate {
            date_text: Some("February 6, 2026".to_string()),
            time_text: Some("5:00 PM".to_string()),
            recurrence_hint: Some("unknown".to_string()),
            ..Candidate::new("First Friday Art Walk")
        };
        let merged = listing.merged_with(detail);

        assert_eq!(merged.recurrence_hint.as_deref(), Some("first friday"));
        assert_eq!(merged.date_text.as_deref(), Some("February 6, 2026"));
        assert_eq!(merged.time_text.as_deref(), Some("5:00 PM"));
    }

    #[test]
    fn test_to_item_parses_date_and_time() {
        let candidate = Candidate {
            date_text: Some("March 15, 2026".to_string()),
            time_text: Some("7:30 PM".to_string()),
            ..Candidate::new("Jazz Night")
        };
        let item = candidate.to_item(Category::Events, &source(), today()).unwrap();

        assert_eq!(item.start.to_string(), "2026-03-15 19:30:00");
        assert_eq!(item.url, "https://turnercenter.org/events/");
        assert_eq!(item.source_name, "Turner Center");
    }

    #[test]
    fn test_to_item_without_date_is_dropped_unless_recurring() {
        let plain = Candidate::new("Mystery Event");
        assert!(plain.to_item(Category::Events, &source(), today()).is_none());

        let recurring = Candidate {
            recurrence_hint: Some("Every Monday".to_string()),
            ..Candidate::new("Open Studio")
        };
        let item = recurring
            .to_item(Category::Classes, &source(), today())
            .unwrap();
        assert_eq!(item.date(), today());
        assert_eq!(item.recurring_pattern.as_deref(), Some("every monday"));
        assert_eq!(item.start.time().to_string(), "10:00:00");
    }
}
