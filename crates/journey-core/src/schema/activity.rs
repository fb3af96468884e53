//! Activity identity, attributes and the journey state machine

use super::station::JourneyStation;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host-assigned identifier of a live activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(String);

impl ActivityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActivityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ActivityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where the rider is relative to their journey.
///
/// ```text
/// BeforeBoarding ──(departure)──▶ OnBoard ──(alarm / arrival)──▶ PrepareToDropOff
/// ```
///
/// Transitions only move forward; ending the activity is a separate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JourneyState {
    #[default]
    BeforeBoarding,
    OnBoard,
    PrepareToDropOff,
}

impl JourneyState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeBoarding => "beforeBoarding",
            Self::OnBoard => "onBoard",
            Self::PrepareToDropOff => "prepareToDropOff",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::BeforeBoarding => 0,
            Self::OnBoard => 1,
            Self::PrepareToDropOff => 2,
        }
    }

    /// Returns `true` if moving from `self` to `next` would go backwards.
    pub fn would_regress_to(self, next: JourneyState) -> bool {
        next.rank() < self.rank()
    }
}

impl fmt::Display for JourneyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable attributes fixed when the activity is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityAttributes {
    pub train_name: String,
    pub origin: JourneyStation,
    pub destination: JourneyStation,
}

impl ActivityAttributes {
    pub fn new(
        train_name: impl Into<String>,
        origin: JourneyStation,
        destination: JourneyStation,
    ) -> Self {
        Self {
            train_name: train_name.into(),
            origin,
            destination,
        }
    }

    pub fn departure_time(&self) -> Option<DateTime<Utc>> {
        self.origin.estimated_time
    }

    pub fn arrival_time(&self) -> Option<DateTime<Utc>> {
        self.destination.estimated_time
    }

    /// Point past which the host should render the activity as stale:
    /// destination time plus `stale_after_minutes`.
    pub fn stale_after(&self, stale_after_minutes: u32) -> Option<DateTime<Utc>> {
        self.arrival_time()
            .map(|arrival| arrival + Duration::minutes(i64::from(stale_after_minutes)))
    }

    /// Whether this activity tracks the same ride (train + both station codes).
    pub fn describes_same_journey(&self, other: &ActivityAttributes) -> bool {
        self.train_name == other.train_name
            && self.origin.code == other.origin.code
            && self.destination.code == other.destination.code
    }
}

/// Mutable, host-versioned part of the activity display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityContentState {
    pub journey_state: JourneyState,
}

impl ActivityContentState {
    pub fn new(journey_state: JourneyState) -> Self {
        Self { journey_state }
    }
}

/// How the host should remove an ended activity from view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DismissalPolicy {
    /// Remove right away.
    Immediate,
    /// Let the host keep the final state on screen for its default period.
    Default,
}

/// Snapshot of an activity currently known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveActivity {
    pub id: ActivityId,
    pub attributes: ActivityAttributes,
    pub content_state: ActivityContentState,
}

impl LiveActivity {
    pub fn journey_state(&self) -> JourneyState {
        self.content_state.journey_state
    }
}
