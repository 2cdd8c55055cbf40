//! Feed categories

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The feed an item belongs to. Fixed when an item is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// One-off public events (festivals, concerts, exhibitions)
    Events,
    /// Classes and workshops, often running as a series
    Classes,
    /// Public meetings (councils, boards, commissions)
    Meetings,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 3] = [Category::Events, Category::Classes, Category::Meetings];

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Events => "events",
            Category::Classes => "classes",
            Category::Meetings => "meetings",
        }
    }

    /// Singular noun for prompts and messages
    pub fn singular(&self) -> &'static str {
        match self {
            Category::Events => "event",
            Category::Classes => "class",
            Category::Meetings => "meeting",
        }
    }

    /// Start time used when neither the page nor keyword inference yields one
    pub fn default_time(&self) -> NaiveTime {
        let (hour, minute) = match self {
            Category::Events => (19, 0),
            Category::Classes => (10, 0),
            Category::Meetings => (18, 0),
        };
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "events" | "event" => Ok(Category::Events),
            "classes" | "class" => Ok(Category::Classes),
            "meetings" | "meeting" => Ok(Category::Meetings),
            other => Err(Error::Config(format!("unknown category '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        assert_eq!("Events".parse::<Category>().unwrap(), Category::Events);
        assert_eq!(" classes ".parse::<Category>().unwrap(), Category::Classes);
        assert_eq!("meeting".parse::<Category>().unwrap(), Category::Meetings);
        assert!("attractions".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&Category::Meetings).unwrap();
        assert_eq!(json, "\"meetings\"");
        let parsed: Category = serde_json::from_str("\"classes\"").unwrap();
        assert_eq!(parsed, Category::Classes);
    }

    #[test]
    fn test_default_times() {
        assert_eq!(Category::Events.default_time().to_string(), "19:00:00");
        assert_eq!(Category::Classes.default_time().to_string(), "10:00:00");
        assert_eq!(Category::Meetings.default_time().to_string(), "18:00:00");
    }
}
