//! # Pipeline Configuration Module
//!
//! Tunables for a refresh run. Defaults match the production schedule: six
//! months of recurrence expansion and a thirty-day window for class sessions.

use chrono::{Local, NaiveDate};

use crate::postprocess::DEFAULT_CLASS_LOOKBACK_DAYS;
use crate::recurrence::DEFAULT_RECURRENCE_HORIZON_MONTHS;

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Months covered by recurrence expansion and calendar month pages
    pub recurrence_horizon_months: u32,

    /// Days before today that class sessions are kept
    pub class_lookback_days: i64,

    /// Whether candidates with a detail link get a Stage-2 visit
    pub enrich_details: bool,

    /// Cap on candidates taken from one source
    pub max_candidates_per_source: usize,

    /// Fixed reference date; the local date when unset
    pub today: Option<NaiveDate>,

    /// Whether calendar sources also get their `?month=` pages fetched
    pub fetch_month_pages: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            recurrence_horizon_months: DEFAULT_RECURRENCE_HORIZON_MONTHS,
            class_lookback_days: DEFAULT_CLASS_LOOKBACK_DAYS,
            enrich_details: true,
            max_candidates_per_source: 100,
            today: None,
            fetch_month_pages: true,
        }
    }
}

/// Builder for PipelineConfig
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Set the recurrence horizon in months
    pub fn recurrence_horizon_months(mut self, months: u32) -> Self {
        self.config.recurrence_horizon_months = months;
        self
    }

    /// Set the class lookback window in days
    pub fn class_lookback_days(mut self, days: i64) -> Self {
        self.config.class_lookback_days = days;
        self
    }

    /// Enable or disable detail page enrichment
    pub fn enrich_details(mut self, enrich: bool) -> Self {
        self.config.enrich_details = enrich;
        self
    }

    /// Set the per-source candidate cap
    pub fn max_candidates_per_source(mut self, max: usize) -> Self {
        self.config.max_candidates_per_source = max;
        self
    }

    /// Pin the reference date
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.config.today = Some(today);
        self
    }

    /// Enable or disable calendar month page fetches
    pub fn fetch_month_pages(mut self, fetch: bool) -> Self {
        self.config.fetch_month_pages = fetch;
        self
    }

    /// Build the configuration
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl PipelineConfig {
    /// Create a new builder
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// The reference date for this run
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.recurrence_horizon_months, 6);
        assert_eq!(config.class_lookback_days, 30);
        assert!(config.enrich_details);
        assert!(config.fetch_month_pages);
        assert_eq!(config.max_candidates_per_source, 100);
    }

    #[test]
    fn test_today_override() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let config = PipelineConfig::builder()
            .today(today)
            .enrich_details(false)
            .build();
        assert_eq!(config.today(), today);
        assert!(!config.enrich_details);
    }
}
