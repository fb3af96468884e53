//! Host surface that renders live activities

use crate::error::EngineError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use journey_live_core::{
    ActivityAttributes, ActivityContentState, ActivityId, DismissalPolicy, LiveActivity,
};

/// Stream of raw push-token bytes; ends when the token owner goes away.
pub type TokenStream = BoxStream<'static, Vec<u8>>;

/// Host live-activity framework.
///
/// Mutating calls (`request`, `update`, `end`) are serialized by the
/// orchestrator; implementations do not need to guard against concurrent
/// mutation of the same activity.
#[async_trait]
pub trait ActivityPlatform: Send + Sync {
    /// Create an activity and return its host-assigned id.
    async fn request(
        &self,
        attributes: &ActivityAttributes,
        state: &ActivityContentState,
        stale_after: Option<DateTime<Utc>>,
    ) -> Result<ActivityId, EngineError>;

    async fn update(
        &self,
        id: &ActivityId,
        state: &ActivityContentState,
        stale_after: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError>;

    /// End an activity. Ending an unknown id succeeds.
    async fn end(&self, id: &ActivityId, dismissal: DismissalPolicy) -> Result<(), EngineError>;

    /// Activities currently displayed, in creation order.
    async fn live_activities(&self) -> Vec<LiveActivity>;

    async fn current_push_token(&self, id: &ActivityId) -> Option<Vec<u8>>;

    /// Token rotations for one activity. The stream ends when the activity ends.
    fn push_token_updates(&self, id: &ActivityId) -> TokenStream;

    async fn push_to_start_token(&self) -> Option<Vec<u8>>;

    fn push_to_start_token_updates(&self) -> TokenStream;
}
