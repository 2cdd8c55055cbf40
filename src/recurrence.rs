//! # Recurrence Expansion Module
//!
//! Detects recurring schedules ("first friday", "2nd saturday", "every monday")
//! in an item's title or recurrence phrase and materializes one calendar item
//! per future occurrence over a fixed forward horizon.
//!
//! ## Behavior
//!
//! - Monthly ordinal patterns yield one occurrence per month
//! - Weekly patterns yield every matching weekday in the window
//! - The window starts at the later of the item's date and today, covers that
//!   month plus the following `horizon_months - 1` months, and drops anything
//!   before today
//! - Phrases that match neither shape pass through unexpanded; nothing is guessed

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use regex::Regex;
use tracing::debug;

use crate::calendar::CalendarItem;

/// Months covered by expansion, counting the anchor month
pub const DEFAULT_RECURRENCE_HORIZON_MONTHS: u32 = 6;

const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";

static ORDINAL_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(first|second|third|fourth|1st|2nd|3rd|4th)\s+({})s?\b",
        WEEKDAYS
    ))
    .expect("valid ordinal weekday regex")
});

static WEEKLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:every|each|weekly\s+on)\s+({})s?\b",
        WEEKDAYS
    ))
    .expect("valid weekly regex")
});

/// A bare plural weekday ("Mondays"); trusted in titles only
static PLURAL_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({})s\b", WEEKDAYS)).expect("valid plural weekday regex")
});

/// Placeholder answers the extractor gives for one-off items
const NOT_RECURRING: &[&str] = &[
    "", "none", "null", "unknown", "n/a", "na", "no", "false", "one-time", "once",
];

/// A repeating schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrencePattern {
    /// The nth weekday of every month (n in 1..=4)
    MonthlyOrdinal { ordinal: u8, weekday: Weekday },
    /// Every occurrence of a weekday
    Weekly { weekday: Weekday },
}

fn ordinal_number(word: &str) -> Option<u8> {
    match word.to_ascii_lowercase().as_str() {
        "first" | "1st" => Some(1),
        "second" | "2nd" => Some(2),
        "third" | "3rd" => Some(3),
        "fourth" | "4th" => Some(4),
        _ => None,
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Normalize a recurrence phrase from an extractor.
///
/// Returns `None` for placeholder answers such as "unknown" or "none".
pub fn normalize_hint(hint: &str) -> Option<String> {
    let normalized = hint
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if NOT_RECURRING.contains(&normalized.as_str()) {
        None
    } else {
        Some(normalized)
    }
}

impl RecurrencePattern {
    /// Find an explicit recurrence phrase: "<ordinal> <weekday>" or
    /// "every|each|weekly on <weekday>"
    ///
    /// Safe on free text such as descriptions, where "open Tuesdays through
    /// Saturdays" describes opening hours rather than a schedule.
    pub fn parse_phrase(text: &str) -> Option<Self> {
        if let Some(caps) = ORDINAL_WEEKDAY.captures(text) {
            let ordinal = ordinal_number(&caps[1])?;
            let weekday = caps[2].parse::<Weekday>().ok()?;
            return Some(RecurrencePattern::MonthlyOrdinal { ordinal, weekday });
        }

        let caps = WEEKLY.captures(text)?;
        let weekday = caps[1].parse::<Weekday>().ok()?;
        Some(RecurrencePattern::Weekly { weekday })
    }

    /// Find a pattern in a title or a recurrence field
    ///
    /// Accepts everything `parse_phrase` does plus a bare plural weekday
    /// ("Open Studio Mondays").
    pub fn parse(text: &str) -> Option<Self> {
        Self::parse_phrase(text).or_else(|| {
            let caps = PLURAL_WEEKDAY.captures(text)?;
            let weekday = caps[1].parse::<Weekday>().ok()?;
            Some(RecurrencePattern::Weekly { weekday })
        })
    }

    /// Scan the title, then the recurrence phrase
    pub fn detect(title: &str, recurring_pattern: Option<&str>) -> Option<Self> {
        Self::parse(title).or_else(|| recurring_pattern.and_then(Self::parse))
    }

    /// The weekday this pattern lands on
    pub fn weekday(&self) -> Weekday {
        match self {
            RecurrencePattern::MonthlyOrdinal { weekday, .. } => *weekday,
            RecurrencePattern::Weekly { weekday } => *weekday,
        }
    }

    /// Occurrences from the month of `anchor` through `months` months, inclusive
    /// of the anchor month, in ascending order.
    pub fn occurrences(&self, anchor: NaiveDate, months: u32) -> Vec<NaiveDate> {
        let Some(window_start) = anchor.with_day(1) else {
            return Vec::new();
        };

        match *self {
            RecurrencePattern::MonthlyOrdinal { ordinal, weekday } => (0..months)
                .filter_map(|offset| window_start.checked_add_months(Months::new(offset)))
                .filter_map(|month_start| nth_weekday(month_start, weekday, ordinal))
                .collect(),
            RecurrencePattern::Weekly { weekday } => {
                let Some(window_end) = window_start.checked_add_months(Months::new(months)) else {
                    return Vec::new();
                };
                let mut day = first_on_or_after(window_start, weekday);
                let mut dates = Vec::new();
                while day < window_end {
                    dates.push(day);
                    day += Duration::days(7);
                }
                dates
            }
        }
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrencePattern::MonthlyOrdinal { ordinal, weekday } => {
                let ordinal = match ordinal {
                    1 => "first",
                    2 => "second",
                    3 => "third",
                    _ => "fourth",
                };
                write!(f, "{} {}", ordinal, weekday_name(*weekday))
            }
            RecurrencePattern::Weekly { weekday } => write!(f, "every {}", weekday_name(*weekday)),
        }
    }
}

fn first_on_or_after(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let delta = (7 + weekday.num_days_from_monday() - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(delta as i64)
}

/// The `ordinal`-th `weekday` of the month starting at `month_start`
fn nth_weekday(month_start: NaiveDate, weekday: Weekday, ordinal: u8) -> Option<NaiveDate> {
    let first = first_on_or_after(month_start, weekday);
    let date = first + Duration::weeks(ordinal.saturating_sub(1) as i64);
    (date.month() == month_start.month()).then_some(date)
}

/// Expand one item into its future occurrences.
///
/// Items without a recognizable pattern come back unchanged as a single item.
pub fn expand(item: &CalendarItem, today: NaiveDate, horizon_months: u32) -> Vec<CalendarItem> {
    let Some(pattern) = RecurrencePattern::detect(&item.title, item.recurring_pattern.as_deref())
    else {
        return vec![item.clone()];
    };

    let anchor = item.date().max(today);
    let time = item.start.time();
    let label = pattern.to_string();

    let expanded: Vec<CalendarItem> = pattern
        .occurrences(anchor, horizon_months)
        .into_iter()
        .filter(|date| *date >= today)
        .map(|date| {
            let mut occurrence = item.rescheduled(date.and_time(time));
            occurrence.recurring_pattern = Some(label.clone());
            occurrence
        })
        .collect();

    debug!(
        title = %item.title,
        pattern = %label,
        occurrences = expanded.len(),
        "Expanded recurring item"
    );
    expanded
}

/// Expand every item, preserving input order
pub fn expand_all(items: Vec<CalendarItem>, today: NaiveDate, horizon_months: u32) -> Vec<CalendarItem> {
    items
        .iter()
        .flat_map(|item| expand(item, today, horizon_months))
        .collect()
}
