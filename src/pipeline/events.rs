//! Progress events emitted by a pipeline run.

use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarItem, Category};

/// One message on a run's progress stream.
///
/// A run emits exactly one `Init`, then a `Progress` per source (preceded by
/// an `Error` when that source failed), then one `Items` and one `Complete`.
/// Serializes with a `type` tag so it can be forwarded to a browser as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// The run has started; `total` sources will be attempted.
    Init { total: usize },

    /// A source has been attempted.
    Progress {
        current: usize,
        total: usize,
        /// Name of the source just attempted
        source: String,
    },

    /// A source failed; the run continues with the next one.
    Error { source: String, detail: String },

    /// The final, deduplicated item list.
    Items {
        category: Category,
        items: Vec<CalendarItem>,
    },

    /// The run has finished.
    Complete,
}
