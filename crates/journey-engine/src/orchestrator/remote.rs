//! Calls to the remote coordination service

use super::Orchestrator;
use crate::platform::{RemoteOperation, RemoteParams};
use crate::retry::perform_with_retry;
use journey_live_core::schema::alarm_time;
use journey_live_core::{ActivityId, JourneyState, LiveActivity};
use serde_json::{Value, json};
use std::fmt::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lowercase hex rendering of raw token bytes.
pub(super) fn hex_token(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn params<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> RemoteParams {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

impl Orchestrator {
    /// Send one remote call. Idempotent operations go through the retry
    /// policy; everything else gets a single attempt.
    async fn send(
        &self,
        op: RemoteOperation,
        body: RemoteParams,
        cancel: &CancellationToken,
    ) -> Option<Value> {
        let remote = &self.deps().remote;
        if op.is_idempotent() {
            return perform_with_retry(op.as_str(), &self.config().retry, cancel, || {
                remote.call(op, body.clone())
            })
            .await;
        }
        if cancel.is_cancelled() {
            return None;
        }
        match remote.call(op, body).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(operation = %op, "Remote call failed: {e}");
                None
            }
        }
    }

    /// Ask the server to push the wake-up alert as a fallback for the device
    /// alarm. Single attempt.
    pub(super) async fn notify_expected_arrival(
        &self,
        activity: &LiveActivity,
        offset_minutes: u32,
        cancel: &CancellationToken,
    ) {
        let op = RemoteOperation::ScheduleArrivalAlert;
        if cancel.is_cancelled() {
            return;
        }
        if !self.deps().preferences.alarm_enabled() {
            debug!(activity_id = %activity.id, operation = %op, "Alarms disabled, skipping");
            return;
        }
        let Some(device_token) = self.deps().push.current_token() else {
            debug!(activity_id = %activity.id, operation = %op, "No device token yet, skipping");
            return;
        };
        let Some(arrival) = activity.attributes.arrival_time() else {
            debug!(activity_id = %activity.id, operation = %op, "No arrival time, skipping");
            return;
        };

        let body = params([
            ("activityId", json!(activity.id.as_str())),
            ("deviceToken", json!(device_token)),
            ("trainName", json!(activity.attributes.train_name)),
            ("destinationName", json!(activity.attributes.destination.name)),
            ("destinationCode", json!(activity.attributes.destination.code)),
            ("arrivalTime", json!(arrival.to_rfc3339())),
            ("offsetMinutes", json!(offset_minutes)),
            (
                "alertTime",
                json!(alarm_time(arrival, offset_minutes).to_rfc3339()),
            ),
        ]);
        if self.send(op, body, cancel).await.is_some() {
            debug!(activity_id = %activity.id, operation = %op, "Expected arrival sent");
        }
    }

    /// Tell the server when the activity is expected to change state so it can
    /// push updates while the app is suspended. Single attempt.
    pub(super) async fn notify_state_update_windows(
        &self,
        activity: &LiveActivity,
        offset_minutes: u32,
        cancel: &CancellationToken,
    ) {
        let op = RemoteOperation::ScheduleStateUpdates;
        if cancel.is_cancelled() {
            return;
        }

        let mut windows = Vec::new();
        if activity.journey_state() == JourneyState::BeforeBoarding {
            if let Some(departure) = activity.attributes.departure_time() {
                windows.push(json!({
                    "state": JourneyState::OnBoard.as_str(),
                    "at": departure.to_rfc3339(),
                }));
            }
        }
        if activity.journey_state() != JourneyState::PrepareToDropOff {
            if let Some(arrival) = activity.attributes.arrival_time() {
                windows.push(json!({
                    "state": JourneyState::PrepareToDropOff.as_str(),
                    "at": alarm_time(arrival, offset_minutes).to_rfc3339(),
                }));
            }
        }
        if windows.is_empty() {
            debug!(activity_id = %activity.id, operation = %op, "No upcoming state changes, skipping");
            return;
        }

        let stale_after = activity
            .attributes
            .stale_after(self.config().stale_after_minutes)
            .map(|t| t.to_rfc3339());
        let mut body = params([
            ("activityId", json!(activity.id.as_str())),
            ("trainName", json!(activity.attributes.train_name)),
            ("updates", Value::Array(windows)),
            ("staleAfter", json!(stale_after)),
        ]);
        if let Some(device_token) = self.deps().push.current_token() {
            body.insert("deviceToken".to_string(), json!(device_token));
        }

        if self.send(op, body, cancel).await.is_some() {
            debug!(activity_id = %activity.id, operation = %op, "State update windows sent");
        }
    }

    /// Register an activity push token, retrying on failure.
    pub(super) async fn register_activity_token(
        &self,
        id: &ActivityId,
        train_name: &str,
        token: &[u8],
        cancel: &CancellationToken,
    ) -> bool {
        let op = RemoteOperation::RegisterLiveActivityToken;
        let mut body = params([
            ("activityId", json!(id.as_str())),
            ("pushToken", json!(hex_token(token))),
            ("trainName", json!(train_name)),
        ]);
        if let Some(device_token) = self.deps().push.current_token() {
            body.insert("deviceToken".to_string(), json!(device_token));
        }

        let registered = self.send(op, body, cancel).await.is_some();
        if registered {
            info!(activity_id = %id, operation = %op, "Activity push token registered");
        }
        registered
    }

    /// Register the process-wide push-to-start token, retrying on failure.
    pub(super) async fn register_start_token(&self, token: &[u8], cancel: &CancellationToken) -> bool {
        let op = RemoteOperation::RegisterLiveActivityStartToken;
        let mut body = params([("pushToStartToken", json!(hex_token(token)))]);
        if let Some(device_token) = self.deps().push.current_token() {
            body.insert("deviceToken".to_string(), json!(device_token));
        }

        let registered = self.send(op, body, cancel).await.is_some();
        if registered {
            info!(operation = %op, "Push-to-start token registered");
        }
        registered
    }

    /// Register the current token of `activity` again in the background.
    pub(super) fn reregister_activity_token(
        &self,
        activity: &LiveActivity,
        cancel: &CancellationToken,
    ) {
        let this = self.clone();
        let id = activity.id.clone();
        let train_name = activity.attributes.train_name.clone();
        let cancel = cancel.clone();
        self.spawn_job(async move {
            match this.deps().activities.current_push_token(&id).await {
                Some(token) => {
                    this.register_activity_token(&id, &train_name, &token, &cancel)
                        .await;
                }
                None => debug!(activity_id = %id, "No push token to re-register"),
            }
        });
    }
}
