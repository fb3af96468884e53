//! Long-lived loops over platform event streams
//!
//! Every loop owns a child of the orchestrator's root token and exits when it
//! is cancelled or its stream ends. Effects already in flight finish; nothing
//! new starts after cancellation is observed.

use super::Orchestrator;
use crate::events;
use futures_util::StreamExt;
use journey_live_core::{
    ActivityId, AlarmId, AlarmState, AlarmStatus, JourneyState, LiveActivity,
};
use serde_json::json;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Alerting alarms in `statuses` not handled yet, marking them handled.
///
/// Each update is the full alarm list, so ids missing from it are gone for
/// good and are forgotten.
fn newly_alerting(handled: &mut HashSet<AlarmId>, statuses: &[AlarmStatus]) -> Vec<AlarmId> {
    handled.retain(|id| statuses.iter().any(|status| &status.id == id));
    statuses
        .iter()
        .filter(|status| status.state == AlarmState::Alerting)
        .filter(|status| handled.insert(status.id.clone()))
        .map(|status| status.id.clone())
        .collect()
}

impl Orchestrator {
    /// Start the process-wide monitors. Only the first call has any effect.
    pub fn start_monitoring(&self) -> bool {
        if !self.registry().start_monitoring_if_needed() {
            debug!("Monitoring already started");
            return false;
        }
        info!("Starting live activity monitors");

        let this = self.clone();
        let cancel = self.child_token();
        self.spawn_background(async move { this.monitor_existing_activities(&cancel).await });

        let this = self.clone();
        let cancel = self.child_token();
        self.spawn_background(async move { this.monitor_push_to_start_token(cancel).await });

        let this = self.clone();
        let cancel = self.child_token();
        self.spawn_background(async move { this.monitor_alarm_firings(cancel).await });
        true
    }

    /// Pick up activities that outlived the previous process.
    async fn monitor_existing_activities(&self, cancel: &CancellationToken) {
        let live = self.deps().activities.live_activities().await;
        debug!(count = live.len(), "Resuming monitoring of live activities");
        for activity in live {
            if cancel.is_cancelled() {
                return;
            }
            self.monitor_activity_tokens(&activity);
            if activity.journey_state() == JourneyState::BeforeBoarding
                && !self.registry().has_timer(&activity.id)
            {
                self.schedule_departure_timer(&activity).await;
            }
            self.ensure_alarm(&activity, cancel).await;
        }
    }

    /// Spawn the push-token loop of one activity unless one is already
    /// running for it.
    pub(super) fn monitor_activity_tokens(&self, activity: &LiveActivity) {
        if !self.registry().claim_token_monitor(&activity.id) {
            debug!(activity_id = %activity.id, "Push token monitor already running");
            return;
        }
        let this = self.clone();
        let id = activity.id.clone();
        let train_name = activity.attributes.train_name.clone();
        let cancel = self.child_token();
        self.spawn_background(async move {
            this.monitor_push_tokens(&id, train_name, cancel).await;
            this.registry().release_token_monitor(&id);
        });
    }

    async fn monitor_push_tokens(
        &self,
        id: &ActivityId,
        train_name: String,
        cancel: CancellationToken,
    ) {
        // Subscribe before reading the current token so no rotation slips
        // through in between.
        let mut updates = self.deps().activities.push_token_updates(id);
        if let Some(token) = self.deps().activities.current_push_token(id).await {
            self.register_activity_token(id, &train_name, &token, &cancel)
                .await;
        }

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = updates.next() => next,
            };
            let Some(token) = next else {
                debug!(activity_id = %id, "Push token stream ended");
                break;
            };
            if cancel.is_cancelled() {
                break;
            }
            debug!(activity_id = %id, "Push token rotated");
            self.register_activity_token(id, &train_name, &token, &cancel)
                .await;
        }
        debug!(activity_id = %id, "Push token monitor stopped");
    }

    async fn monitor_push_to_start_token(&self, cancel: CancellationToken) {
        let mut updates = self.deps().activities.push_to_start_token_updates();
        if let Some(token) = self.deps().activities.push_to_start_token().await {
            self.register_start_token(&token, &cancel).await;
        }

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = updates.next() => next,
            };
            let Some(token) = next else {
                break;
            };
            if cancel.is_cancelled() {
                break;
            }
            self.register_start_token(&token, &cancel).await;
        }
        debug!("Push-to-start token monitor stopped");
    }

    async fn monitor_alarm_firings(&self, cancel: CancellationToken) {
        let mut updates = self.deps().alarms.alarm_updates();
        let mut handled: HashSet<AlarmId> = HashSet::new();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = updates.next() => next,
            };
            let Some(statuses) = next else {
                debug!("Alarm update stream ended");
                break;
            };

            for alarm_id in newly_alerting(&mut handled, &statuses) {
                if cancel.is_cancelled() {
                    return;
                }
                match self.deps().alarms.activity_id(&alarm_id).await {
                    Some(activity_id) => self.handle_alarm_fired(&activity_id).await,
                    None => debug!(alarm_id = %alarm_id, "Alerting alarm has no activity"),
                }
            }
        }
        debug!("Alarm monitor stopped");
    }

    async fn handle_alarm_fired(&self, id: &ActivityId) {
        let Some(activity) = self.live_activity(id).await else {
            debug!(activity_id = %id, "Alarm fired for activity that is not live");
            return;
        };
        info!(activity_id = %id, "Wake-up alarm fired");
        self.apply_transition(id, JourneyState::PrepareToDropOff, "alarm_fired")
            .await;

        let expected_minutes = self
            .registry()
            .alarm_snapshot(id)
            .map(|s| s.offset_minutes)
            .unwrap_or_else(|| self.deps().preferences.alarm_offset_minutes());
        let actual_minutes = activity
            .attributes
            .arrival_time()
            .map(|arrival| (arrival - self.now()).num_minutes());
        self.track(
            events::ALARM_FIRED,
            events::properties([
                ("activity_id", json!(id.as_str())),
                ("train_name", json!(activity.attributes.train_name)),
                ("actual_minutes_to_arrival", json!(actual_minutes)),
                ("expected_minutes", json!(expected_minutes)),
            ]),
        );
    }
}
