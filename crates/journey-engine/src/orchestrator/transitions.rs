//! Journey state transitions and the automatic departure timer

use super::Orchestrator;
use crate::events;
use crate::timer::TimerHandle;
use journey_live_core::{ActivityContentState, ActivityId, JourneyState, LiveActivity};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

impl Orchestrator {
    /// BeforeBoarding → OnBoard.
    pub async fn transition_to_on_board(&self, id: &ActivityId) -> bool {
        self.apply_transition(id, JourneyState::OnBoard, "manual")
            .await
    }

    /// OnBoard → PrepareToDropOff.
    pub async fn transition_to_prepare_drop_off(&self, id: &ActivityId) -> bool {
        self.apply_transition(id, JourneyState::PrepareToDropOff, "manual")
            .await
    }

    /// Push `target` to the host if it does not move the journey backwards.
    ///
    /// The current state is read from the host, never from a cached copy, and
    /// the read, the check and the write all happen under the activity lane.
    pub(super) async fn apply_transition(
        &self,
        id: &ActivityId,
        target: JourneyState,
        trigger: &'static str,
    ) -> bool {
        let lane = self.inner.activity_lane.lock().await;
        let Some(activity) = self.live_activity(id).await else {
            debug!(activity_id = %id, target = %target, trigger, "Activity not live, skipping transition");
            return false;
        };

        let current = activity.journey_state();
        if current.would_regress_to(target) {
            debug!(
                activity_id = %id,
                current = %current,
                target = %target,
                trigger,
                "Refusing backwards transition"
            );
            return false;
        }

        let stale_after = activity
            .attributes
            .stale_after(self.config().stale_after_minutes);
        let result = self
            .deps()
            .activities
            .update(id, &ActivityContentState::new(target), stale_after)
            .await;
        drop(lane);
        if let Err(e) = result {
            warn!(activity_id = %id, target = %target, trigger, "Failed to update live activity: {e}");
            return false;
        }

        // Past boarding the departure timer has nothing left to do.
        if target != JourneyState::BeforeBoarding {
            if let Some(timer) = self.registry().remove_timer(id) {
                timer.cancel();
            }
        }

        info!(activity_id = %id, from = %current, to = %target, trigger, "Journey state changed");
        self.track(
            events::ACTIVITY_STATE_CHANGED,
            events::properties([
                ("activity_id", json!(id.as_str())),
                ("state", json!(target.as_str())),
                ("train_name", json!(activity.attributes.train_name)),
                ("trigger", json!(trigger)),
            ]),
        );
        true
    }

    /// Arm the departure → OnBoard timer for `activity`, replacing any
    /// previous timer. A departure already in the past transitions right away.
    pub(super) async fn schedule_departure_timer(&self, activity: &LiveActivity) {
        let Some(departure) = activity.attributes.departure_time() else {
            debug!(activity_id = %activity.id, "No departure time, not arming timer");
            return;
        };

        let delay = (departure - self.now()).to_std().unwrap_or(Duration::ZERO);
        if delay.is_zero() {
            self.apply_transition(&activity.id, JourneyState::OnBoard, "departure_timer")
                .await;
            return;
        }

        let token = self.child_token();
        let handle = TimerHandle::new(token.clone());
        let generation = handle.generation();
        if let Some(previous) = self.registry().store_timer(&activity.id, handle) {
            debug!(activity_id = %activity.id, "Replacing departure timer");
            previous.cancel();
        }
        debug!(
            activity_id = %activity.id,
            delay_secs = delay.as_secs(),
            "Departure timer armed"
        );

        let this = self.clone();
        let id = activity.id.clone();
        self.spawn_background(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(activity_id = %id, "Departure timer cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            if token.is_cancelled() {
                return;
            }
            this.registry().remove_timer_if_current(&id, generation);
            this.apply_transition(&id, JourneyState::OnBoard, "departure_timer")
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use crate::memory::{
        MemoryActivityPlatform, MemoryAlarmPlatform, MemoryCoordinationClient, MemoryJourneyCache,
        MemoryPreferences, RecordingAnalytics, StaticPushSupplier,
    };
    use crate::orchestrator::{Dependencies, EngineConfig};
    use chrono::{DateTime, TimeZone, Utc};
    use journey_live_core::{ActivityAttributes, JourneyStation};
    use std::sync::Arc;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn orchestrator(activities: &MemoryActivityPlatform) -> Orchestrator {
        let deps = Dependencies {
            activities: Arc::new(activities.clone()),
            alarms: Arc::new(MemoryAlarmPlatform::new()),
            remote: Arc::new(MemoryCoordinationClient::new()),
            push: Arc::new(StaticPushSupplier::new(None)),
            analytics: Arc::new(RecordingAnalytics::new()),
            cache: Arc::new(MemoryJourneyCache::new()),
            preferences: Arc::new(MemoryPreferences::new(true, 10)),
            clock: Arc::new(TokioClock::new(anchor())),
        };
        Orchestrator::new(deps, EngineConfig::default())
    }

    fn activity(depart_in_minutes: i64) -> LiveActivity {
        let minutes = |m| anchor() + chrono::Duration::minutes(m);
        LiveActivity {
            id: ActivityId::from("timer-1"),
            attributes: ActivityAttributes::new(
                "Express 101",
                JourneyStation::new("Taipei", "1000")
                    .with_estimated_time(minutes(depart_in_minutes)),
                JourneyStation::new("Hsinchu", "1210").with_estimated_time(minutes(60)),
            ),
            content_state: ActivityContentState::new(JourneyState::BeforeBoarding),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_departure_timer_cancels_previous_handle() {
        let activities = MemoryActivityPlatform::new();
        let orchestrator = orchestrator(&activities);
        let first = activity(2);
        let id = first.id.clone();
        activities.seed(first.clone());

        orchestrator.schedule_departure_timer(&first).await;
        let first_handle = orchestrator.registry().timer(&id).unwrap();
        assert!(!first_handle.is_cancelled());

        // Departure pushed back to five minutes out
        orchestrator.schedule_departure_timer(&activity(5)).await;
        assert!(first_handle.is_cancelled());
        let second_handle = orchestrator.registry().timer(&id).unwrap();
        assert_ne!(second_handle.generation(), first_handle.generation());
        assert!(!second_handle.is_cancelled());
        assert_eq!(orchestrator.registry().timer_count(), 1);

        tokio::time::sleep(Duration::from_secs(121)).await;
        assert_eq!(activities.state_of(&id), Some(JourneyState::BeforeBoarding));
        assert!(activities.state_history(&id).is_empty());

        tokio::time::sleep(Duration::from_secs(180)).await;
        assert_eq!(activities.state_of(&id), Some(JourneyState::OnBoard));
        assert_eq!(activities.state_history(&id), vec![JourneyState::OnBoard]);
        assert!(!orchestrator.registry().has_timer(&id));
    }
}
