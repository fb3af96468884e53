//! Foreground catch-up and recovery from the journey cache

use super::Orchestrator;
use super::lifecycle::StartRequest;
use crate::events;
use journey_live_core::schema::alarm_time;
use journey_live_core::{ActivityAttributes, ActivityId, JourneyState};
use serde_json::json;
use tracing::{debug, info, warn};

impl Orchestrator {
    /// Catch up on everything that should have happened while the app was in
    /// the background.
    ///
    /// Applies the departure/arrival transitions that timers or alarms may
    /// have missed, re-arms lost timers and alarms, and recreates the activity
    /// from the journey cache when none is live.
    pub async fn refresh_in_foreground(&self) {
        let live = self.deps().activities.live_activities().await;
        if live.is_empty() {
            self.recover_from_cache().await;
            return;
        }

        let cancel = self.child_token();
        let now = self.now();
        for mut activity in live {
            let id = activity.id.clone();
            if activity.journey_state() == JourneyState::BeforeBoarding
                && activity.attributes.origin.has_elapsed(now)
                && self
                    .apply_transition(&id, JourneyState::OnBoard, "foreground_refresh")
                    .await
            {
                activity.content_state.journey_state = JourneyState::OnBoard;
            }
            if activity.journey_state() != JourneyState::PrepareToDropOff
                && activity.attributes.destination.has_elapsed(now)
                && self
                    .apply_transition(&id, JourneyState::PrepareToDropOff, "foreground_refresh")
                    .await
            {
                activity.content_state.journey_state = JourneyState::PrepareToDropOff;
            }

            if activity.journey_state() == JourneyState::BeforeBoarding
                && !self.registry().has_timer(&id)
            {
                self.schedule_departure_timer(&activity).await;
            }
            self.ensure_alarm(&activity, &cancel).await;
        }
    }

    /// Recreate the activity of a journey that is under way according to the
    /// cache. Returns the new activity id, if one was started.
    async fn recover_from_cache(&self) -> Option<ActivityId> {
        let cache = &self.deps().cache;
        let train = match cache.load_selected_train() {
            Ok(Some(train)) => train,
            Ok(None) => {
                debug!("No selected train cached, nothing to recover");
                return None;
            }
            Err(e) => {
                warn!(operation = "recover", "Failed to load selected train: {e}");
                return None;
            }
        };
        let journey = match cache.load_journey_data() {
            Ok(Some(journey)) => journey,
            Ok(None) => {
                debug!(train = %train.name, "No journey data cached, nothing to recover");
                return None;
            }
            Err(e) => {
                warn!(operation = "recover", "Failed to load journey data: {e}");
                return None;
            }
        };

        let (Some(origin), Some(destination)) =
            (journey.departure_station(), journey.arrival_station())
        else {
            debug!(train = %train.name, "Cached journey lacks the selected stations");
            return None;
        };
        let (Some(departure), Some(arrival)) = (origin.estimated_time, destination.estimated_time)
        else {
            debug!(train = %train.name, "Cached journey lacks station times");
            return None;
        };

        let now = self.now();
        if now < departure || now >= arrival {
            debug!(train = %train.name, "Cached journey is not under way");
            return None;
        }

        let candidate = ActivityAttributes::new(train.name.clone(), origin.clone(), destination.clone());
        let live = self.deps().activities.live_activities().await;
        if live
            .iter()
            .any(|a| a.attributes.describes_same_journey(&candidate))
        {
            debug!(train = %train.name, "Equivalent activity already live");
            return None;
        }

        let prefs = &self.deps().preferences;
        let offset_minutes = prefs.alarm_offset_minutes();
        let initial_state = if prefs.alarm_enabled() && now >= alarm_time(arrival, offset_minutes) {
            JourneyState::PrepareToDropOff
        } else {
            JourneyState::OnBoard
        };

        let request = StartRequest::new(candidate.train_name, candidate.origin, candidate.destination)
            .with_initial_state(initial_state)
            .with_alarm_offset(offset_minutes);
        match self.start(request).await {
            Ok(id) => {
                info!(activity_id = %id, train = %train.name, state = %initial_state, "Recovered live activity from cache");
                self.track(
                    events::ACTIVITY_RECOVERED,
                    events::properties([
                        ("activity_id", json!(id.as_str())),
                        ("train_name", json!(train.name)),
                        ("state", json!(initial_state.as_str())),
                    ]),
                );
                Some(id)
            }
            Err(e) => {
                warn!(train = %train.name, operation = "recover", "Failed to recover live activity: {e}");
                None
            }
        }
    }
}
