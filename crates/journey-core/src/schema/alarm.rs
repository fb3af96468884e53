//! Wake-up alarm types shared by the engine and alarm platforms

use super::activity::ActivityId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time at which an alarm for `arrival_time` fires with the given lead time.
pub fn alarm_time(arrival_time: DateTime<Utc>, offset_minutes: u32) -> DateTime<Utc> {
    arrival_time - Duration::minutes(i64::from(offset_minutes))
}

/// Parameters under which an alarm was last scheduled.
///
/// Used only for deduplication: two snapshots are equal iff all three fields
/// match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmSnapshot {
    pub arrival_time: DateTime<Utc>,
    pub offset_minutes: u32,
    pub enabled: bool,
}

impl AlarmSnapshot {
    pub fn alarm_time(&self) -> DateTime<Utc> {
        alarm_time(self.arrival_time, self.offset_minutes)
    }
}

/// Platform-assigned alarm identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(String);

impl AlarmId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State reported by the alarm platform for one alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlarmState {
    Scheduled,
    Countdown,
    Paused,
    /// The alarm is ringing right now.
    Alerting,
}

/// One entry of an alarm-platform update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmStatus {
    pub id: AlarmId,
    pub state: AlarmState,
}

/// Why an alarm is being canceled; forwarded to the platform for its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlarmCancelReason {
    ActivityEnded,
    PreferenceChanged,
    BulkTeardown,
    ActivityGone,
}

impl AlarmCancelReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActivityEnded => "activity_ended",
            Self::PreferenceChanged => "preference_changed",
            Self::BulkTeardown => "bulk_teardown",
            Self::ActivityGone => "activity_gone",
        }
    }
}

impl fmt::Display for AlarmCancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the alarm platform shows when the alarm rings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmMetadata {
    pub activity_id: ActivityId,
    pub train_name: String,
    pub destination_name: String,
    pub destination_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_alarm_time_subtracts_offset() {
        let arrival = Utc.with_ymd_and_hms(2026, 3, 1, 9, 10, 0).unwrap();
        assert_eq!(
            alarm_time(arrival, 10),
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(alarm_time(arrival, 0), arrival);
    }

    #[test]
    fn test_snapshot_equality_covers_all_fields() {
        let arrival = Utc.with_ymd_and_hms(2026, 3, 1, 9, 10, 0).unwrap();
        let base = AlarmSnapshot {
            arrival_time: arrival,
            offset_minutes: 10,
            enabled: true,
        };
        assert_eq!(base, base);
        assert_ne!(base, AlarmSnapshot { offset_minutes: 5, ..base });
        assert_ne!(base, AlarmSnapshot { enabled: false, ..base });
        assert_ne!(
            base,
            AlarmSnapshot {
                arrival_time: arrival + Duration::minutes(1),
                ..base
            }
        );
    }

    #[test]
    fn test_alarm_status_deserialization() {
        let status: AlarmStatus =
            serde_json::from_str(r#"{"id":"alarm-1","state":"alerting"}"#).unwrap();
        assert_eq!(status.id.as_str(), "alarm-1");
        assert_eq!(status.state, AlarmState::Alerting);
    }
}
