//! # Calendar Data Model
//!
//! Types shared by every stage of the scraping pipeline.
//!
//! ## Key Components
//!
//! - `Category`: the closed set of feeds (events, classes, meetings) that drives
//!   every policy branch downstream
//! - `CalendarItem`: a normalized calendar entry as delivered to consumers
//! - `SourceConfig`: a read-only description of one scraped website
//! - `SiteSelectors`: per-site CSS selectors for `custom` sources
//! - `SourcesFile`: loader for the JSON sources document

mod category;
mod item;
mod source;

pub use category::Category;
pub use item::CalendarItem;
pub use source::{ScrapingMethod, SiteSelectors, SourceConfig, SourcesFile};
