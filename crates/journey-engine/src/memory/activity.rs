use super::{broadcast, lock, receiver_stream};
use crate::error::EngineError;
use crate::platform::{ActivityPlatform, TokenStream};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use futures_util::stream;
use journey_live_core::{
    ActivityAttributes, ActivityContentState, ActivityId, DismissalPolicy, JourneyState,
    LiveActivity,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Record of activity platform calls for test assertions
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityCall {
    /// `id` is `None` when the request was refused.
    Request {
        id: Option<ActivityId>,
        train_name: String,
        state: JourneyState,
        stale_after: Option<DateTime<Utc>>,
    },
    Update {
        id: ActivityId,
        state: JourneyState,
        stale_after: Option<DateTime<Utc>>,
    },
    End {
        id: ActivityId,
        dismissal: DismissalPolicy,
    },
}

struct ActivityEntry {
    activity: LiveActivity,
    push_token: Option<Vec<u8>>,
    subscribers: Vec<mpsc::UnboundedSender<Vec<u8>>>,
}

#[derive(Default)]
struct PlatformState {
    activities: Vec<ActivityEntry>,
    push_to_start_token: Option<Vec<u8>>,
    start_token_subscribers: Vec<mpsc::UnboundedSender<Vec<u8>>>,
    refuse_requests: Option<String>,
    call_log: Vec<ActivityCall>,
}

impl PlatformState {
    fn entry(&self, id: &ActivityId) -> Option<&ActivityEntry> {
        self.activities.iter().find(|e| &e.activity.id == id)
    }

    fn entry_mut(&mut self, id: &ActivityId) -> Option<&mut ActivityEntry> {
        self.activities.iter_mut().find(|e| &e.activity.id == id)
    }
}

/// Activity platform keeping activities in memory.
///
/// New activities get a push token derived from their id right away, the way
/// hosts usually hand one out shortly after creation.
#[derive(Clone, Default)]
pub struct MemoryActivityPlatform {
    state: Arc<Mutex<PlatformState>>,
}

impl MemoryActivityPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an activity that already exists on the host (cold start).
    pub fn seed(&self, activity: LiveActivity) {
        let token = initial_token(&activity.id);
        lock(&self.state).activities.push(ActivityEntry {
            activity,
            push_token: Some(token),
            subscribers: Vec::new(),
        });
    }

    /// Make every following `request` fail with `message`.
    pub fn refuse_requests(&self, message: impl Into<String>) {
        lock(&self.state).refuse_requests = Some(message.into());
    }

    /// Replace the push token of `id` and notify subscribers.
    pub fn rotate_push_token(&self, id: &ActivityId, token: Vec<u8>) -> bool {
        let mut state = lock(&self.state);
        let Some(entry) = state.entry_mut(id) else {
            return false;
        };
        entry.push_token = Some(token.clone());
        broadcast(&mut entry.subscribers, &token);
        true
    }

    pub fn rotate_push_to_start_token(&self, token: Vec<u8>) {
        let mut state = lock(&self.state);
        state.push_to_start_token = Some(token.clone());
        broadcast(&mut state.start_token_subscribers, &token);
    }

    pub fn state_of(&self, id: &ActivityId) -> Option<JourneyState> {
        lock(&self.state)
            .entry(id)
            .map(|e| e.activity.journey_state())
    }

    /// Every state the host was asked to show for `id`, in order.
    pub fn state_history(&self, id: &ActivityId) -> Vec<JourneyState> {
        lock(&self.state)
            .call_log
            .iter()
            .filter_map(|call| match call {
                ActivityCall::Request {
                    id: Some(created),
                    state,
                    ..
                } if created == id => Some(*state),
                ActivityCall::Update {
                    id: updated, state, ..
                } if updated == id => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn live_count(&self) -> usize {
        lock(&self.state).activities.len()
    }

    pub fn update_count(&self, id: &ActivityId) -> usize {
        lock(&self.state)
            .call_log
            .iter()
            .filter(|c| matches!(c, ActivityCall::Update { id: updated, .. } if updated == id))
            .count()
    }

    /// Get a copy of the call log for assertions
    pub fn get_calls(&self) -> Vec<ActivityCall> {
        lock(&self.state).call_log.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).call_log.clear();
    }
}

fn initial_token(id: &ActivityId) -> Vec<u8> {
    id.as_str().bytes().take(16).collect()
}

#[async_trait]
impl ActivityPlatform for MemoryActivityPlatform {
    async fn request(
        &self,
        attributes: &ActivityAttributes,
        state: &ActivityContentState,
        stale_after: Option<DateTime<Utc>>,
    ) -> Result<ActivityId, EngineError> {
        let mut platform = lock(&self.state);
        if let Some(message) = platform.refuse_requests.clone() {
            platform.call_log.push(ActivityCall::Request {
                id: None,
                train_name: attributes.train_name.clone(),
                state: state.journey_state,
                stale_after,
            });
            return Err(EngineError::ActivityCreation {
                message,
                source: None,
            });
        }

        let id = ActivityId::new(uuid::Uuid::new_v4().to_string());
        platform.call_log.push(ActivityCall::Request {
            id: Some(id.clone()),
            train_name: attributes.train_name.clone(),
            state: state.journey_state,
            stale_after,
        });
        platform.activities.push(ActivityEntry {
            activity: LiveActivity {
                id: id.clone(),
                attributes: attributes.clone(),
                content_state: *state,
            },
            push_token: Some(initial_token(&id)),
            subscribers: Vec::new(),
        });
        Ok(id)
    }

    async fn update(
        &self,
        id: &ActivityId,
        state: &ActivityContentState,
        stale_after: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError> {
        let mut platform = lock(&self.state);
        platform.call_log.push(ActivityCall::Update {
            id: id.clone(),
            state: state.journey_state,
            stale_after,
        });
        let entry = platform
            .entry_mut(id)
            .ok_or_else(|| EngineError::platform(format!("activity {id} is not live")))?;
        entry.activity.content_state = *state;
        Ok(())
    }

    async fn end(&self, id: &ActivityId, dismissal: DismissalPolicy) -> Result<(), EngineError> {
        let mut platform = lock(&self.state);
        platform.call_log.push(ActivityCall::End {
            id: id.clone(),
            dismissal,
        });
        // Dropping the entry drops its senders, which ends the token streams.
        platform.activities.retain(|e| &e.activity.id != id);
        Ok(())
    }

    async fn live_activities(&self) -> Vec<LiveActivity> {
        lock(&self.state)
            .activities
            .iter()
            .map(|e| e.activity.clone())
            .collect()
    }

    async fn current_push_token(&self, id: &ActivityId) -> Option<Vec<u8>> {
        lock(&self.state).entry(id).and_then(|e| e.push_token.clone())
    }

    fn push_token_updates(&self, id: &ActivityId) -> TokenStream {
        let mut platform = lock(&self.state);
        let Some(entry) = platform.entry_mut(id) else {
            return stream::empty().boxed();
        };
        let (tx, rx) = mpsc::unbounded_channel();
        entry.subscribers.push(tx);
        receiver_stream(rx)
    }

    async fn push_to_start_token(&self) -> Option<Vec<u8>> {
        lock(&self.state).push_to_start_token.clone()
    }

    fn push_to_start_token_updates(&self) -> TokenStream {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.state).start_token_subscribers.push(tx);
        receiver_stream(rx)
    }
}
