//! Wake-up alarm scheduling and preference-driven rescheduling

use super::Orchestrator;
use crate::events;
use chrono::{DateTime, Utc};
use journey_live_core::schema::alarm_time;
use journey_live_core::{
    ActivityId, AlarmCancelReason, AlarmMetadata, JourneyState, LiveActivity,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything needed to decide on and schedule one wake-up alarm.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmRequest {
    pub activity_id: ActivityId,
    pub arrival_time: Option<DateTime<Utc>>,
    pub offset_minutes: u32,
    pub enabled: bool,
    /// Schedule even if an identical alarm was scheduled before
    pub force: bool,
    pub metadata: AlarmMetadata,
}

impl AlarmRequest {
    pub fn for_activity(activity: &LiveActivity, enabled: bool, offset_minutes: u32) -> Self {
        Self {
            activity_id: activity.id.clone(),
            arrival_time: activity.attributes.arrival_time(),
            offset_minutes,
            enabled,
            force: false,
            metadata: AlarmMetadata {
                activity_id: activity.id.clone(),
                train_name: activity.attributes.train_name.clone(),
                destination_name: activity.attributes.destination.name.clone(),
                destination_code: activity.attributes.destination.code.clone(),
            },
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

impl Orchestrator {
    /// Schedule the wake-up alarm described by `request` unless it is disabled,
    /// has no arrival time or is identical to the last one scheduled.
    ///
    /// Returns `true` when the platform accepted a new alarm.
    pub async fn schedule_alarm_if_enabled(
        &self,
        request: &AlarmRequest,
        cancel: &CancellationToken,
    ) -> bool {
        let id = &request.activity_id;
        if cancel.is_cancelled() {
            debug!(activity_id = %id, "Alarm scheduling cancelled");
            return false;
        }
        if !request.enabled {
            debug!(activity_id = %id, "Alarms disabled, clearing snapshot");
            self.registry().clear_alarm_snapshot(id);
            return false;
        }
        let Some(arrival_time) = request.arrival_time else {
            debug!(activity_id = %id, "No arrival time, clearing snapshot");
            self.registry().clear_alarm_snapshot(id);
            return false;
        };
        if !self.registry().should_schedule_alarm(
            id,
            arrival_time,
            request.offset_minutes,
            request.enabled,
            request.force,
        ) {
            debug!(activity_id = %id, "Identical alarm already scheduled");
            return false;
        }

        let fires_at = alarm_time(arrival_time, request.offset_minutes);
        let scheduled = self
            .deps()
            .alarms
            .schedule_arrival_alarm(id, arrival_time, request.offset_minutes, &request.metadata)
            .await;
        let alarm_id = match scheduled {
            Ok(alarm_id) => alarm_id,
            Err(e) => {
                warn!(activity_id = %id, operation = "schedule_alarm", "Failed to schedule alarm: {e}");
                self.registry().clear_alarm_snapshot(id);
                return false;
            }
        };

        if !self.is_live(id).await {
            debug!(activity_id = %id, "Activity ended while scheduling, withdrawing alarm");
            self.deps()
                .alarms
                .cancel_arrival_alarm(id, AlarmCancelReason::ActivityGone, false)
                .await;
            self.registry().clear_alarm_snapshot(id);
            return false;
        }

        let minutes_until_alarm = (fires_at - self.now()).num_minutes();
        info!(
            activity_id = %id,
            alarm_id = %alarm_id,
            alarm_time = %fires_at,
            offset_minutes = request.offset_minutes,
            "Wake-up alarm scheduled"
        );
        self.track(
            events::ALARM_SCHEDULED,
            events::properties([
                ("activity_id", json!(id.as_str())),
                ("train_name", json!(request.metadata.train_name)),
                ("arrival_time", json!(arrival_time.to_rfc3339())),
                ("alarm_time", json!(fires_at.to_rfc3339())),
                ("offset_minutes", json!(request.offset_minutes)),
                ("minutes_until_alarm", json!(minutes_until_alarm)),
                ("forced", json!(request.force)),
            ]),
        );
        true
    }

    /// Make sure a live activity that should have an alarm has one on the
    /// platform.
    ///
    /// Used on cold start and foreground refresh, where the registry may
    /// remember an alarm the platform no longer has.
    pub(super) async fn ensure_alarm(&self, activity: &LiveActivity, cancel: &CancellationToken) {
        let prefs = &self.deps().preferences;
        if !prefs.alarm_enabled() {
            return;
        }
        if activity.attributes.arrival_time().is_none()
            || activity.journey_state() == JourneyState::PrepareToDropOff
        {
            return;
        }

        let offset_minutes = self
            .registry()
            .alarm_snapshot(&activity.id)
            .map(|s| s.offset_minutes)
            .unwrap_or_else(|| prefs.alarm_offset_minutes());
        let request = AlarmRequest::for_activity(activity, true, offset_minutes).forced();
        let passed = request
            .arrival_time
            .is_some_and(|arrival| alarm_time(arrival, offset_minutes) <= self.now());
        if passed {
            debug!(activity_id = %activity.id, "Alarm time already passed, not scheduling");
            return;
        }

        if self.deps().alarms.has_scheduled_alarm(&activity.id).await {
            return;
        }
        debug!(activity_id = %activity.id, "No alarm on platform, scheduling one");
        self.schedule_alarm_if_enabled(&request, cancel).await;
    }

    /// Apply a new alarm lead time to every live activity.
    pub async fn refresh_alarm_configuration(&self, new_offset_minutes: u32) {
        let prefs = &self.deps().preferences;
        let old_offset_minutes = prefs.alarm_offset_minutes();
        prefs.set_alarm_offset_minutes(new_offset_minutes);
        self.reconfigure_alarms(old_offset_minutes, new_offset_minutes)
            .await;
    }

    /// Turn wake-up alarms on or off for every live activity.
    pub async fn set_alarms_enabled(&self, enabled: bool) {
        let prefs = &self.deps().preferences;
        prefs.set_alarm_enabled(enabled);
        let offset_minutes = prefs.alarm_offset_minutes();
        self.reconfigure_alarms(offset_minutes, offset_minutes)
            .await;
    }

    async fn reconfigure_alarms(&self, old_offset_minutes: u32, new_offset_minutes: u32) {
        let enabled = self.deps().preferences.alarm_enabled();
        let live = self.deps().activities.live_activities().await;

        for activity in &live {
            let previous_offset = self
                .registry()
                .alarm_snapshot(&activity.id)
                .map(|s| s.offset_minutes)
                .unwrap_or(old_offset_minutes);
            self.deps()
                .alarms
                .cancel_arrival_alarm(&activity.id, AlarmCancelReason::PreferenceChanged, false)
                .await;
            self.registry().clear_alarm_snapshot(&activity.id);

            if let Some(arrival) = activity.attributes.arrival_time() {
                self.track(
                    events::ALARM_RESCHEDULED,
                    events::properties([
                        ("activity_id", json!(activity.id.as_str())),
                        (
                            "old_alarm_time",
                            json!(alarm_time(arrival, previous_offset).to_rfc3339()),
                        ),
                        (
                            "new_alarm_time",
                            json!(alarm_time(arrival, new_offset_minutes).to_rfc3339()),
                        ),
                        ("enabled", json!(enabled)),
                    ]),
                );
            }
        }

        if !enabled {
            info!(count = live.len(), "Wake-up alarms disabled, alarms canceled");
            return;
        }

        let cancel = self.child_token();
        let now = self.now();
        for activity in &live {
            self.reregister_activity_token(activity, &cancel);

            let due = activity
                .attributes
                .arrival_time()
                .map(|arrival| alarm_time(arrival, new_offset_minutes));
            if due.is_some_and(|t| t <= now) {
                debug!(activity_id = %activity.id, "New alarm time already passed, not rescheduling");
            } else {
                let request =
                    AlarmRequest::for_activity(activity, true, new_offset_minutes).forced();
                self.schedule_alarm_if_enabled(&request, &cancel).await;
            }
            self.notify_state_update_windows(activity, new_offset_minutes, &cancel)
                .await;
        }
        info!(
            count = live.len(),
            offset_minutes = new_offset_minutes,
            "Wake-up alarms rescheduled"
        );
    }
}
