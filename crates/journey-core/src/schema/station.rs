//! Journey station record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A station on a journey, with the estimated time the train is there.
///
/// Stations are immutable once attached to an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyStation {
    /// Display name (e.g., "Taipei")
    pub name: String,
    /// Stable station code used for matching (e.g., "1000")
    pub code: String,
    /// Estimated departure (origin) or arrival (destination) time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<DateTime<Utc>>,
}

impl JourneyStation {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            estimated_time: None,
        }
    }

    pub fn with_estimated_time(mut self, time: DateTime<Utc>) -> Self {
        self.estimated_time = Some(time);
        self
    }

    /// Returns `true` when the estimated time is known and not after `now`.
    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.estimated_time.is_some_and(|t| t <= now)
    }
}
