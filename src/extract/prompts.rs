//! Category-tuned prompts for listing and detail extraction

use chrono::{Datelike, NaiveDate};

use crate::calendar::Category;

const SHARED_RULES: &str = "\
- Dates use YYYY-MM-DD. For dates written without a year, use the current year unless \
the month is more than two months in the past, in which case use next year.
- Times use HH:MM in 24-hour format. Leave time null when the page shows none; do not guess.
- Return relative URLs exactly as they appear in href attributes.
- Skip navigation and interface text such as \"Log In\", \"Sign Up\", \"Read More\", \
\"Menu\", \"Search\", \"Home\", \"About\" and \"Contact\".
- Keep descriptions under 200 characters.
- recurring_pattern is a short phrase such as \"first friday\" or \"every monday\" \
when the item repeats on a schedule, otherwise null.";

fn header(today: NaiveDate) -> String {
    format!(
        "TODAY'S DATE: {}\nCURRENT YEAR: {}",
        today.format("%Y-%m-%d"),
        today.year()
    )
}

fn events_listing(today: NaiveDate, content: &str) -> String {
    format!(
        r#"You are an expert web scraper. Extract every EVENT from the following HTML content.

{header}

Focus on one-off public events: performances, festivals, markets, exhibits, parades.
Capture the exact date and start time of each occurrence. When an event repeats
("First Friday Art Walk", "every Saturday"), record the schedule in recurring_pattern.

RULES:
{rules}

Return ONLY a JSON array, no markdown and no commentary:
[
  {{"title": "Event Name", "date": "{year}-03-15", "time": "19:00", "description": "Brief description", "url": "/event/123", "location": "Venue", "recurring_pattern": null}}
]

If there are no events, return [].

HTML content:
{content}
"#,
        header = header(today),
        rules = SHARED_RULES,
        year = today.year(),
        content = content,
    )
}

fn classes_listing(today: NaiveDate, content: &str) -> String {
    format!(
        r#"You are an expert web scraper. Extract every CLASS or WORKSHOP from the following HTML content.

{header}

Focus on instruction: courses, workshops, lessons and multi-week series. Capture the
instructor, the skill level and the session schedule. Keep week numbers and session
ordinals in titles ("Week 2", "Session 3") because they distinguish sessions.
A series meeting on several dates should list every date in "dates".

RULES:
{rules}

Return ONLY a JSON array, no markdown and no commentary:
[
  {{"title": "Wheel Throwing Basics", "date": "{year}-03-10", "dates": ["{year}-03-10", "{year}-03-17"], "time": "18:00", "instructor": "Jane Smith", "description": "Beginner level", "url": "/classes/wheel", "recurring_pattern": "every tuesday"}}
]

If there are no classes, return [].

HTML content:
{content}
"#,
        header = header(today),
        rules = SHARED_RULES,
        year = today.year(),
        content = content,
    )
}

fn meetings_listing(today: NaiveDate, content: &str) -> String {
    format!(
        r#"You are an expert web scraper. Extract every public MEETING from the following HTML content.

{header}

Focus on government and civic meetings: commissions, councils, boards, hearings.
Capture the body that meets, the meeting location and the agenda summary. Keep the
full official title including any year or body name.

RULES:
{rules}

Return ONLY a JSON array, no markdown and no commentary:
[
  {{"title": "Planning Commission Regular Meeting", "date": "{year}-03-18", "time": "17:30", "location": "City Hall, Council Chambers", "description": "Agenda: rezoning requests", "url": "/meetings/42", "recurring_pattern": "third tuesday"}}
]

If there are no meetings, return [].

HTML content:
{content}
"#,
        header = header(today),
        rules = SHARED_RULES,
        year = today.year(),
        content = content,
    )
}

/// Stage-1 prompt for a listing page
///
/// # Arguments
///
/// * `category` - The kind of items to extract
/// * `today` - Reference date for year inference
/// * `content` - Cleaned listing markup
pub fn listing_prompt(category: Category, today: NaiveDate, content: &str) -> String {
    match category {
        Category::Events => events_listing(today, content),
        Category::Classes => classes_listing(today, content),
        Category::Meetings => meetings_listing(today, content),
    }
}

fn isolation_rules(title: &str) -> String {
    format!(
        r#"ISOLATION RULES:
- Extract details ONLY for "{title}".
- The page may describe other events, classes or meetings. Ignore them completely.
- Take the date, time, location and description from the section about "{title}" only.
- If the page does not describe "{title}", return []."#
    )
}

fn detail_focus(category: Category) -> &'static str {
    match category {
        Category::Events => {
            "Capture the exact date and start time, the venue, and whether the event repeats."
        }
        Category::Classes => {
            "Capture the instructor, the skill level, every session date and the start time."
        }
        Category::Meetings => {
            "Capture the meeting date and time, the location and a short agenda summary."
        }
    }
}

/// Stage-2 prompt for a detail page about one item
///
/// # Arguments
///
/// * `category` - The kind of item
/// * `title` - Title of the target item found on the listing page
/// * `today` - Reference date for year inference
/// * `content` - Cleaned detail page markup
pub fn detail_prompt(category: Category, title: &str, today: NaiveDate, content: &str) -> String {
    format!(
        r#"You are an expert web scraper. This page is the detail page for the {noun} titled "{title}".

{header}

{isolation}

{focus}

RULES:
{rules}

Return ONLY a JSON object for "{title}" (or an array with exactly one object), no markdown:
{{"title": "{title}", "date": "YYYY-MM-DD", "dates": [], "time": "HH:MM", "description": "...", "location": "...", "instructor": null, "recurring_pattern": null}}

HTML content:
{content}
"#,
        noun = category.singular(),
        title = title,
        header = header(today),
        isolation = isolation_rules(title),
        focus = detail_focus(category),
        rules = SHARED_RULES,
        content = content,
    )
}
