//! Date and time parsing for scraped text
//!
//! Listing pages express dates in every format imaginable. These helpers find
//! the first recognizable date or time inside free text and resolve year-less
//! dates relative to `today`.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;

use crate::calendar::Category;

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})").expect("valid iso date regex")
});

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b").expect("valid numeric date regex")
});

const MONTH_PATTERN: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}}))?",
        MONTH_PATTERN
    ))
    .expect("valid month day regex")
});

static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{}\b\.?(?:,?\s+(\d{{4}}))?",
        MONTH_PATTERN
    ))
    .expect("valid day month regex")
});

static TIME_MERIDIEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\b\.?").expect("valid meridiem regex")
});

static TIME_24H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("valid 24h regex"));

static NOON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnoon\b").expect("valid noon regex"));

/// Month number for a (possibly abbreviated) English month name
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    let month = match name.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Year for a date that was written without one.
///
/// Listing pages show the current and upcoming months; a month more than two
/// months behind `today` belongs to next year.
pub fn infer_year(month: u32, today: NaiveDate) -> i32 {
    let months_behind = today.month() as i32 - month as i32;
    if months_behind > 2 {
        today.year() + 1
    } else {
        today.year()
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn explicit_or_inferred(year: Option<&str>, month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    let year = match year.and_then(|y| y.parse::<i32>().ok()) {
        Some(y) if y < 100 => 2000 + y,
        Some(y) => y,
        None => infer_year(month, today),
    };
    ymd(year, month, day)
}

/// Find the first date in `text`
///
/// Recognizes ISO dates, `Month D[, YYYY]`, `D Month [YYYY]` and `M/D[/YYYY]`.
/// Weekday prefixes and ordinal suffixes are tolerated.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        if let Some(date) = ymd(year, month, day) {
            return Some(date);
        }
    }

    let month_day = MONTH_DAY.captures(text).map(|caps| {
        let start = caps.get(0).map_or(usize::MAX, |m| m.start());
        let date = month_number(&caps[1]).and_then(|month| {
            let day = caps[2].parse().ok()?;
            explicit_or_inferred(caps.get(3).map(|m| m.as_str()), month, day, today)
        });
        (start, date)
    });
    let day_month = DAY_MONTH.captures(text).map(|caps| {
        let start = caps.get(0).map_or(usize::MAX, |m| m.start());
        let date = month_number(&caps[2]).and_then(|month| {
            let day = caps[1].parse().ok()?;
            explicit_or_inferred(caps.get(3).map(|m| m.as_str()), month, day, today)
        });
        (start, date)
    });

    // Whichever written-out form appears first in the text wins
    let written = [month_day, day_month]
        .into_iter()
        .flatten()
        .filter(|(_, date)| date.is_some())
        .min_by_key(|(start, _)| *start)
        .and_then(|(_, date)| date);
    if written.is_some() {
        return written;
    }

    let caps = NUMERIC_DATE.captures(text)?;
    let month = caps[1].parse().ok()?;
    let day = caps[2].parse().ok()?;
    explicit_or_inferred(caps.get(3).map(|m| m.as_str()), month, day, today)
}

/// The earliest date-looking fragment of `text`, for carrying into a candidate
pub fn date_snippet(text: &str) -> Option<&str> {
    [&*ISO_DATE, &*MONTH_DAY, &*DAY_MONTH, &*NUMERIC_DATE]
        .into_iter()
        .filter_map(|re| re.find(text))
        .min_by_key(|m| m.start())
        .map(|m| m.as_str())
}

/// The first time-of-day fragment of `text`
pub fn time_snippet(text: &str) -> Option<&str> {
    TIME_MERIDIEM
        .find(text)
        .or_else(|| NOON.find(text))
        .or_else(|| TIME_24H.find(text))
        .map(|m| m.as_str())
}

/// Find the first time of day in `text`
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = TIME_MERIDIEM.captures(text) {
        let mut hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        let pm = caps[3].eq_ignore_ascii_case("p");
        if hour > 12 {
            return None;
        }
        if pm && hour != 12 {
            hour += 12;
        } else if !pm && hour == 12 {
            hour = 0;
        }
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    if NOON.is_match(text) {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }

    let caps = TIME_24H.captures(text)?;
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0)
}

/// Start time to use when the page gives none.
///
/// | keywords | time |
/// |---|---|
/// | morning, breakfast, brunch | 09:00 |
/// | festival, fair, market, parade, lunch, noon, afternoon | 12:00 |
/// | evening, dinner, night, concert | 19:00 |
/// | anything else | the category default |
pub fn infer_time(text: &str, category: Category) -> NaiveTime {
    const TABLE: &[(&[&str], u32)] = &[
        (&["morning", "breakfast", "brunch"], 9),
        (
            &["festival", "fair", "market", "parade", "lunch", "noon", "afternoon"],
            12,
        ),
        (&["evening", "dinner", "night", "concert"], 19),
    ];

    let text = text.to_lowercase();
    TABLE
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .and_then(|(_, hour)| NaiveTime::from_hms_opt(*hour, 0, 0))
        .unwrap_or_else(|| category.default_time())
}
