//! Category-specific title cleanup and date filtering

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use tracing::debug;

use crate::calendar::{CalendarItem, Category};
use crate::extract::is_junk_title;

/// How far back class sessions are kept, so a running series stays visible
pub const DEFAULT_CLASS_LOOKBACK_DAYS: i64 = 30;

const MONTH_PREFIX: &str = r"(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*";

static LEADING_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:19|20)\d{2}\b[\s:\-|]*").expect("valid leading year regex")
});

static ORDINAL_ANNUAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:\d+(?:st|nd|rd|th)|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)?\s*annual\b\s*",
    )
    .expect("valid annual regex")
});

static GLUED_DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\d{{1,2}}{}\b[\s:\-|,]*", MONTH_PREFIX)).expect("valid glued date regex")
});

static MONTH_DAY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^{}\.?\s+\d{{1,2}}(?:st|nd|rd|th)?\b[\s:\-|,]*",
        MONTH_PREFIX
    ))
    .expect("valid month day prefix regex")
});

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[\s:\-|.)]+").expect("valid leading digits regex"));

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip date noise that listing pages glue onto event titles
///
/// Handles leading years, "annual" prefixes with or without an ordinal,
/// glued day-month tokens ("13November"), leading month-day text and stray
/// leading digits.
pub fn clean_event_title(title: &str) -> String {
    let mut title = collapse(title);
    for re in [
        &*LEADING_YEAR,
        &*ORDINAL_ANNUAL,
        &*GLUED_DAY_MONTH,
        &*MONTH_DAY_PREFIX,
        &*LEADING_DIGITS,
    ] {
        if let Some(m) = re.find(&title) {
            // Never strip a title down to nothing
            if m.end() < title.len() {
                title = title[m.end()..].to_string();
            }
        }
    }
    title.trim().to_string()
}

/// Clean titles and drop past items for one category
///
/// # Arguments
///
/// * `items` - Items of `category`
/// * `category` - Selects the cleanup and date floor rules
/// * `today` - Reference date for the floor
/// * `class_lookback_days` - Days before `today` that class sessions are kept
///
/// # Returns
///
/// Surviving items in input order
pub fn postprocess(
    items: Vec<CalendarItem>,
    category: Category,
    today: NaiveDate,
    class_lookback_days: i64,
) -> Vec<CalendarItem> {
    let floor = match category {
        Category::Classes => today - Duration::days(class_lookback_days),
        Category::Events | Category::Meetings => today,
    };

    let before = items.len();
    let kept: Vec<CalendarItem> = items
        .into_iter()
        .filter_map(|mut item| {
            item.title = match category {
                Category::Events => clean_event_title(&item.title),
                Category::Classes | Category::Meetings => collapse(&item.title),
            };
            if is_junk_title(&item.title) {
                debug!(title = %item.title, "Dropping junk title");
                return None;
            }
            if item.date() < floor {
                debug!(title = %item.title, date = %item.date(), "Dropping past item");
                return None;
            }
            Some(item)
        })
        .collect();

    debug!(
        category = %category,
        before,
        after = kept.len(),
        "Post-processed items"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn item(title: &str, category: Category, date: NaiveDate) -> CalendarItem {
        CalendarItem::new(
            title,
            category,
            date.and_hms_opt(10, 0, 0).unwrap(),
            "https://example.com",
            "Example",
        )
    }

    #[test]
    fn test_clean_event_titles() {
        assert_eq!(clean_event_title("2026 Annual Spring Festival"), "Spring Festival");
        assert_eq!(clean_event_title("2nd Annual Chili Cook-Off"), "Chili Cook-Off");
        assert_eq!(clean_event_title("Annual  Holiday Parade"), "Holiday Parade");
        assert_eq!(clean_event_title("13November Jazz Night"), "Jazz Night");
        assert_eq!(clean_event_title("March 7 - Art Walk"), "Art Walk");
        assert_eq!(clean_event_title("12 | Farmers Market"), "Farmers Market");
        assert_eq!(clean_event_title("May Day Parade"), "May Day Parade");
        assert_eq!(clean_event_title("Marching Band Showcase"), "Marching Band Showcase");
    }

    #[test]
    fn test_events_drop_past_and_junk() {
        let today = d(2026, 2, 10);
        let items = vec![
            item("2026 Annual Spring Festival", Category::Events, d(2026, 4, 18)),
            item("Old Concert", Category::Events, d(2026, 2, 9)),
            item("Today Show", Category::Events, today),
            item("Read More", Category::Events, d(2026, 3, 1)),
        ];
        let kept = postprocess(items, Category::Events, today, DEFAULT_CLASS_LOOKBACK_DAYS);

        let titles: Vec<&str> = kept.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Spring Festival", "Today Show"]);
    }

    #[test]
    fn test_classes_keep_recent_past_and_ordinals() {
        let today = d(2026, 2, 10);
        let items = vec![
            item("Pottery  Week 2", Category::Classes, d(2026, 1, 20)),
            item("Ancient Class", Category::Classes, d(2025, 12, 1)),
            item("2nd Annual Workshop", Category::Classes, d(2026, 3, 1)),
        ];
        let kept = postprocess(items, Category::Classes, today, DEFAULT_CLASS_LOOKBACK_DAYS);

        let titles: Vec<&str> = kept.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Pottery Week 2", "2nd Annual Workshop"]);
    }

    #[test]
    fn test_meetings_keep_year_prefix() {
        let today = d(2026, 2, 10);
        let items = vec![
            item("2026 Budget Hearing", Category::Meetings, d(2026, 3, 3)),
            item("2025 Budget Hearing", Category::Meetings, d(2026, 2, 1)),
        ];
        let kept = postprocess(items, Category::Meetings, today, DEFAULT_CLASS_LOOKBACK_DAYS);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "2026 Budget Hearing");
    }
}
