//! Normalized calendar entries

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Category;

/// A calendar entry as delivered to the feed consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarItem {
    /// Human-readable name
    pub title: String,

    /// Feed this item belongs to
    category: Category,

    /// Scheduling anchor; the time is always resolved
    pub start: NaiveDateTime,

    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Venue or room
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Instructor for classes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,

    /// Click-through link (detail page or listing page)
    pub url: String,

    /// Normalized recurrence phrase, e.g. "first friday"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_pattern: Option<String>,

    /// Name of the source this item was scraped from
    pub source_name: String,

    /// Always false; kept for calendar widgets that expect the flag
    #[serde(default, rename = "allDay")]
    pub all_day: bool,
}

impl CalendarItem {
    /// Create an item with the required fields
    pub fn new(
        title: impl Into<String>,
        category: Category,
        start: NaiveDateTime,
        url: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category,
            start,
            description: None,
            location: None,
            instructor: None,
            url: url.into(),
            recurring_pattern: None,
            source_name: source_name.into(),
            all_day: false,
        }
    }

    /// The category this item was created under
    pub fn category(&self) -> Category {
        self.category
    }

    /// Calendar date of `start`
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the instructor
    pub fn with_instructor(mut self, instructor: impl Into<String>) -> Self {
        self.instructor = Some(instructor.into());
        self
    }

    /// Set the recurrence phrase
    pub fn with_recurring_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.recurring_pattern = Some(pattern.into());
        self
    }

    /// Copy of this item rescheduled to `start`
    pub fn rescheduled(&self, start: NaiveDateTime) -> Self {
        Self {
            start,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 15)
            .unwrap()
            .and_hms_opt(19, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_serializes_iso_start() {
        let item = CalendarItem::new(
            "Spring Festival",
            Category::Events,
            start(),
            "https://example.com/spring",
            "Visit Valdosta",
        )
        .with_location("Downtown");

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["start"], "2026-03-15T19:00:00");
        assert_eq!(json["category"], "events");
        assert_eq!(json["location"], "Downtown");
        assert_eq!(json["allDay"], false);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_rescheduled_keeps_everything_but_start() {
        let item = CalendarItem::new("Art Walk", Category::Events, start(), "u", "s")
            .with_recurring_pattern("first friday");
        let later = start() + chrono::Duration::days(28);
        let moved = item.rescheduled(later);

        assert_eq!(moved.start, later);
        assert_eq!(moved.title, "Art Walk");
        assert_eq!(moved.category(), Category::Events);
        assert_eq!(moved.recurring_pattern.as_deref(), Some("first friday"));
    }
}
