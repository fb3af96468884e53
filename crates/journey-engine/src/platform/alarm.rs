//! Host surface that rings wake-up alarms

use crate::error::EngineError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use journey_live_core::{ActivityId, AlarmCancelReason, AlarmId, AlarmMetadata, AlarmStatus};

/// Snapshots of every alarm the platform knows about.
pub type AlarmStream = BoxStream<'static, Vec<AlarmStatus>>;

#[async_trait]
pub trait AlarmPlatform: Send + Sync {
    /// Schedule (or replace) the alarm for `activity_id`, ringing
    /// `offset_minutes` before `arrival_time`.
    async fn schedule_arrival_alarm(
        &self,
        activity_id: &ActivityId,
        arrival_time: DateTime<Utc>,
        offset_minutes: u32,
        metadata: &AlarmMetadata,
    ) -> Result<AlarmId, EngineError>;

    /// Cancel the alarm for `activity_id`, if any.
    async fn cancel_arrival_alarm(
        &self,
        activity_id: &ActivityId,
        reason: AlarmCancelReason,
        was_triggered: bool,
    );

    async fn cancel_all_alarms(&self, reason: AlarmCancelReason);

    async fn has_scheduled_alarm(&self, activity_id: &ActivityId) -> bool;

    /// Resolve the activity an alarm was scheduled for.
    async fn activity_id(&self, alarm_id: &AlarmId) -> Option<ActivityId>;

    /// Every item is the full list of alarms currently known to the platform.
    fn alarm_updates(&self) -> AlarmStream;
}
