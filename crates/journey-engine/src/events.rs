//! Analytics event names and property helpers

use serde_json::{Map, Value};

pub const ACTIVITY_STARTED: &str = "live_activity_started";
pub const ACTIVITY_STATE_CHANGED: &str = "live_activity_state_changed";
pub const ACTIVITY_ENDED: &str = "live_activity_ended";
pub const ACTIVITY_RECOVERED: &str = "live_activity_recovered";
pub const ALARM_SCHEDULED: &str = "arrival_alarm_scheduled";
pub const ALARM_FIRED: &str = "arrival_alarm_fired";
pub const ALARM_RESCHEDULED: &str = "arrival_alarm_rescheduled";
pub const ALARM_PREFERENCE_CHANGED: &str = "alarm_preference_changed";

/// Build an event property map from key/value pairs, keeping their order.
pub fn properties<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
