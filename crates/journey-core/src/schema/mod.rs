//! Schema types for the journey live activity engine
//!
//! Everything here is plain immutable data passed by value between the
//! engine and its host collaborators. Serialized forms use camelCase so they
//! line up with what mobile hosts and the coordination service exchange.

mod activity;
mod alarm;
mod journey;
mod station;

pub use activity::{
    ActivityAttributes, ActivityContentState, ActivityId, DismissalPolicy, JourneyState,
    LiveActivity,
};
pub use alarm::{
    AlarmCancelReason, AlarmId, AlarmMetadata, AlarmSnapshot, AlarmState, AlarmStatus, alarm_time,
};
pub use journey::{JourneyData, Train};
pub use station::JourneyStation;
