//! Source configuration (read-only)

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Category;
use crate::error::Result;

/// Domains whose terms or bot protection make them unscrapable
const BLOCKED_DOMAINS: &[&str] = &["tripadvisor."];

/// How a source's listing page should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapingMethod {
    /// DOM heuristics
    #[default]
    Auto,
    /// AI extraction of the listing page only
    Ai,
    /// AI extraction of the listing page, then of each detail page
    #[serde(alias = "ai-twostage", alias = "twostage")]
    AiTwostage,
    /// Site-specific selectors (`SiteSelectors`), falling back to DOM heuristics
    #[serde(alias = "custom-selectors", alias = "custom_selectors")]
    Custom,
}

impl ScrapingMethod {
    /// Whether this method asks for the structured-extraction collaborator
    pub fn uses_ai(&self) -> bool {
        matches!(self, ScrapingMethod::Ai | ScrapingMethod::AiTwostage)
    }
}

/// One configured website
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Display name, used in progress reports
    pub name: String,

    /// Listing page URL
    pub url: String,

    /// Feed the source belongs to
    #[serde(alias = "type")]
    pub category: Category,

    /// Disabled sources are never fetched
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Extraction strategy
    #[serde(default)]
    pub scraping_method: ScrapingMethod,

    /// Named built-in selector set for `custom` sources
    #[serde(default, alias = "scraper", skip_serializing_if = "Option::is_none")]
    pub site_scraper: Option<String>,

    /// Explicit selectors for `custom` sources; take precedence over `site_scraper`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<SiteSelectors>,
}

fn default_enabled() -> bool {
    true
}

fn default_title_selector() -> String {
    "h2, h3, h4".to_string()
}

fn default_link_selector() -> String {
    "a[href]".to_string()
}

fn default_description_selector() -> String {
    "p".to_string()
}

/// CSS selectors describing one site's listing markup
///
/// `item` selects each entry; the other selectors are applied inside it.
/// When `month` is set, the date is read as "<month> <date>", for sites that
/// print the day and the month in separate elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSelectors {
    pub item: String,
    #[serde(default = "default_title_selector")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default = "default_link_selector")]
    pub link: String,
    #[serde(default = "default_description_selector")]
    pub description: String,
}

impl SiteSelectors {
    /// Selectors for `item` with default title, link and description selectors
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            title: default_title_selector(),
            date: None,
            month: None,
            time: None,
            link: default_link_selector(),
            description: default_description_selector(),
        }
    }

    /// Built-in selector sets, by scraper name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            // Day in `div.date span`, month abbreviation in `div.txt span`
            "visitvaldosta_events" => Some(Self {
                date: Some("div.date span".to_string()),
                month: Some("div.txt span".to_string()),
                ..Self::new(r#"article[class*="event"], article[class*="Event"]"#)
            }),
            _ => None,
        }
    }
}

impl SourceConfig {
    /// Create an enabled source
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        category: Category,
        scraping_method: ScrapingMethod,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category,
            enabled: true,
            scraping_method,
            site_scraper: None,
            selectors: None,
        }
    }

    /// Attach explicit site selectors
    pub fn with_selectors(mut self, selectors: SiteSelectors) -> Self {
        self.selectors = Some(selectors);
        self
    }

    /// The selectors a `custom` source is read with, if any
    ///
    /// Explicit selectors win over a named `site_scraper`. An unknown scraper
    /// name yields `None` and is logged.
    pub fn site_selectors(&self) -> Option<SiteSelectors> {
        if let Some(selectors) = &self.selectors {
            return Some(selectors.clone());
        }
        let name = self.site_scraper.as_deref()?;
        let preset = SiteSelectors::preset(name);
        if preset.is_none() {
            warn!(source = %self.name, scraper = name, "Unknown site scraper");
        }
        preset
    }

    /// Whether the URL points at a domain we refuse to scrape
    pub fn is_blocked(&self) -> bool {
        let url = self.url.to_lowercase();
        BLOCKED_DOMAINS.iter().any(|domain| url.contains(domain))
    }
}

/// The sources document: `{ "sources": [...] }`. Other top-level keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesFile {
    /// All configured sources
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl SourcesFile {
    /// Load the document from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let file: SourcesFile = serde_json::from_str(&content)?;
        debug!(path = %path.display(), count = file.sources.len(), "Loaded sources");
        Ok(file)
    }

    /// Enabled sources of one category, in file order
    pub fn for_category(&self, category: Category) -> Vec<SourceConfig> {
        self.sources
            .iter()
            .filter(|s| s.enabled && s.category == category)
            .cloned()
            .collect()
    }
}
