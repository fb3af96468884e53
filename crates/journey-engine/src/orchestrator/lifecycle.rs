use super::Orchestrator;
use super::alarm::AlarmRequest;
use crate::error::EngineError;
use crate::events;
use journey_live_core::{
    ActivityAttributes, ActivityContentState, ActivityId, AlarmCancelReason, DismissalPolicy,
    JourneyState, JourneyStation, LiveActivity,
};
use serde_json::json;
use tracing::{debug, error, info, warn};

/// Parameters for [`Orchestrator::start`].
#[derive(Debug, Clone, PartialEq)]
pub struct StartRequest {
    pub train_name: String,
    pub origin: JourneyStation,
    pub destination: JourneyStation,
    /// Defaults to [`JourneyState::BeforeBoarding`]
    pub initial_state: Option<JourneyState>,
    /// Defaults to the stored preference
    pub alarm_offset_minutes: Option<u32>,
}

impl StartRequest {
    pub fn new(
        train_name: impl Into<String>,
        origin: JourneyStation,
        destination: JourneyStation,
    ) -> Self {
        Self {
            train_name: train_name.into(),
            origin,
            destination,
            initial_state: None,
            alarm_offset_minutes: None,
        }
    }

    pub fn with_initial_state(mut self, state: JourneyState) -> Self {
        self.initial_state = Some(state);
        self
    }

    pub fn with_alarm_offset(mut self, minutes: u32) -> Self {
        self.alarm_offset_minutes = Some(minutes);
        self
    }
}

impl Orchestrator {
    /// Create a live activity and kick off its timers and background jobs.
    ///
    /// Creation failures are returned and never retried. Everything after
    /// creation is best effort.
    pub async fn start(&self, request: StartRequest) -> Result<ActivityId, EngineError> {
        let offset_minutes = request
            .alarm_offset_minutes
            .unwrap_or_else(|| self.deps().preferences.alarm_offset_minutes());
        let attributes =
            ActivityAttributes::new(request.train_name, request.origin, request.destination);
        let content_state = ActivityContentState::new(request.initial_state.unwrap_or_default());
        let stale_after = attributes.stale_after(self.config().stale_after_minutes);

        let id = {
            let _lane = self.inner.activity_lane.lock().await;
            self.deps()
                .activities
                .request(&attributes, &content_state, stale_after)
                .await
        }
        .map_err(|e| {
            error!(train = %attributes.train_name, "Failed to create live activity: {e}");
            EngineError::creation_failed(e)
        })?;

        info!(
            activity_id = %id,
            train = %attributes.train_name,
            state = %content_state.journey_state,
            "Live activity started"
        );
        self.track(
            events::ACTIVITY_STARTED,
            events::properties([
                ("activity_id", json!(id.as_str())),
                ("train_name", json!(attributes.train_name)),
                ("state", json!(content_state.journey_state.as_str())),
                ("offset_minutes", json!(offset_minutes)),
            ]),
        );

        self.setup(
            LiveActivity {
                id: id.clone(),
                attributes,
                content_state,
            },
            offset_minutes,
        )
        .await;
        Ok(id)
    }

    async fn setup(&self, mut activity: LiveActivity, offset_minutes: u32) {
        let now = self.now();
        if activity.journey_state() == JourneyState::BeforeBoarding
            && activity.attributes.origin.has_elapsed(now)
            && self
                .apply_transition(&activity.id, JourneyState::OnBoard, "late_start")
                .await
        {
            activity.content_state.journey_state = JourneyState::OnBoard;
        }

        if activity.journey_state() == JourneyState::BeforeBoarding {
            self.schedule_departure_timer(&activity).await;
        }

        let enabled = self.deps().preferences.alarm_enabled();
        let alarm_request = AlarmRequest::for_activity(&activity, enabled, offset_minutes);
        let cancel = self.child_token();

        let this = self.clone();
        let token = cancel.clone();
        self.spawn_job(async move {
            this.schedule_alarm_if_enabled(&alarm_request, &token).await;
        });

        let this = self.clone();
        let token = cancel.clone();
        let snapshot = activity.clone();
        self.spawn_job(async move {
            this.notify_expected_arrival(&snapshot, offset_minutes, &token)
                .await;
        });

        let this = self.clone();
        let snapshot = activity.clone();
        self.spawn_job(async move {
            this.notify_state_update_windows(&snapshot, offset_minutes, &cancel)
                .await;
        });

        if self.registry().is_monitoring_started() {
            self.monitor_activity_tokens(&activity);
        }
    }

    /// Move `id` to `state`. Requests that would go backwards are ignored.
    ///
    /// Returns `true` when the host was updated.
    pub async fn update(&self, id: &ActivityId, state: JourneyState) -> bool {
        self.apply_transition(id, state, "manual").await
    }

    /// End one activity and release everything held for it.
    ///
    /// Ending an unknown or already ended activity is a no-op apart from the
    /// host call.
    pub async fn end(&self, id: &ActivityId) {
        if let Some(timer) = self.registry().release_activity(id) {
            timer.cancel();
        }

        let live = self.live_activity(id).await;
        let was_triggered = live
            .as_ref()
            .is_some_and(|a| a.journey_state() == JourneyState::PrepareToDropOff);
        self.deps()
            .alarms
            .cancel_arrival_alarm(id, AlarmCancelReason::ActivityEnded, was_triggered)
            .await;

        let result = {
            let _lane = self.inner.activity_lane.lock().await;
            self.deps()
                .activities
                .end(id, DismissalPolicy::Default)
                .await
        };
        if let Err(e) = result {
            warn!(activity_id = %id, "Failed to end live activity: {e}");
            return;
        }

        match live {
            Some(activity) => {
                info!(activity_id = %id, state = %activity.journey_state(), "Live activity ended");
                self.track(
                    events::ACTIVITY_ENDED,
                    events::properties([
                        ("activity_id", json!(id.as_str())),
                        ("train_name", json!(activity.attributes.train_name)),
                        ("state", json!(activity.journey_state().as_str())),
                        ("alarm_triggered", json!(was_triggered)),
                    ]),
                );
            }
            None => debug!(activity_id = %id, "End requested for activity that is not live"),
        }
    }

    /// Tear down every activity at once (sign-out, reset).
    pub async fn end_all_immediately(&self) {
        let timers = self.registry().drain_timers();
        let timer_count = timers.len();
        for timer in timers {
            timer.cancel();
        }

        self.deps()
            .alarms
            .cancel_all_alarms(AlarmCancelReason::BulkTeardown)
            .await;

        let live = self.deps().activities.live_activities().await;
        let mut ended = 0usize;
        for activity in &live {
            self.registry().clear_alarm_snapshot(&activity.id);
            let result = {
                let _lane = self.inner.activity_lane.lock().await;
                self.deps()
                    .activities
                    .end(&activity.id, DismissalPolicy::Immediate)
                    .await
            };
            match result {
                Ok(()) => ended += 1,
                Err(e) => warn!(activity_id = %activity.id, "Failed to end live activity: {e}"),
            }
        }

        info!(
            "Ended {ended}/{} live activities, canceled {timer_count} timer(s)",
            live.len()
        );
    }
}
