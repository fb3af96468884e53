//! Shared harness for orchestrator integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use journey_live_core::{
    ActivityAttributes, ActivityContentState, ActivityId, DismissalPolicy, JourneyState,
    JourneyStation, LiveActivity,
};
use journey_live_engine::EngineError;
use journey_live_engine::platform::{ActivityPlatform, TokenStream};
use journey_live_engine::memory::{
    MemoryActivityPlatform, MemoryAlarmPlatform, MemoryCoordinationClient, MemoryJourneyCache,
    MemoryPreferences, RecordingAnalytics, StaticPushSupplier,
};
use journey_live_engine::{Clock, Dependencies, EngineConfig, Orchestrator, StartRequest, TokioClock};
use std::sync::Arc;
use std::time::Duration;

pub const TRAIN: &str = "Express 101";

/// 2026-03-01 08:00:00 UTC, the wall-clock start of every scenario.
pub fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub activities: MemoryActivityPlatform,
    pub alarms: MemoryAlarmPlatform,
    pub remote: MemoryCoordinationClient,
    pub analytics: RecordingAnalytics,
    pub cache: MemoryJourneyCache,
    pub preferences: MemoryPreferences,
    pub push: StaticPushSupplier,
    pub clock: TokioClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(MemoryJourneyCache::new(), true, None)
    }

    pub fn with_alarms_disabled() -> Self {
        Self::build(MemoryJourneyCache::new(), false, None)
    }

    pub fn with_cache(cache: MemoryJourneyCache) -> Self {
        Self::build(cache, true, None)
    }

    /// Host whose `update` calls take `delay` to complete.
    pub fn with_slow_updates(delay: Duration) -> Self {
        Self::build(MemoryJourneyCache::new(), true, Some(delay))
    }

    fn build(cache: MemoryJourneyCache, alarm_enabled: bool, update_delay: Option<Duration>) -> Self {
        let activities = MemoryActivityPlatform::new();
        let alarms = MemoryAlarmPlatform::new();
        let remote = MemoryCoordinationClient::new();
        let analytics = RecordingAnalytics::new();
        let preferences =
            MemoryPreferences::new(alarm_enabled, 10).with_analytics(Arc::new(analytics.clone()));
        let push = StaticPushSupplier::new(Some("device-token".to_string()));
        let clock = TokioClock::new(anchor());

        let host: Arc<dyn ActivityPlatform> = match update_delay {
            Some(delay) => Arc::new(SlowUpdates {
                inner: activities.clone(),
                delay,
            }),
            None => Arc::new(activities.clone()),
        };
        let deps = Dependencies {
            activities: host,
            alarms: Arc::new(alarms.clone()),
            remote: Arc::new(remote.clone()),
            push: Arc::new(push.clone()),
            analytics: Arc::new(analytics.clone()),
            cache: Arc::new(cache.clone()),
            preferences: Arc::new(preferences.clone()),
            clock: Arc::new(clock),
        };

        Self {
            orchestrator: Orchestrator::new(deps, EngineConfig::default()),
            activities,
            alarms,
            remote,
            analytics,
            cache,
            preferences,
            push,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn at(&self, minutes_from_now: i64) -> DateTime<Utc> {
        self.now() + ChronoDuration::minutes(minutes_from_now)
    }

    pub fn origin(&self, depart_in_minutes: i64) -> JourneyStation {
        JourneyStation::new("Taipei", "1000").with_estimated_time(self.at(depart_in_minutes))
    }

    pub fn destination(&self, arrive_in_minutes: i64) -> JourneyStation {
        JourneyStation::new("Hsinchu", "1210").with_estimated_time(self.at(arrive_in_minutes))
    }

    /// Start request for a journey departing and arriving relative to now.
    pub fn journey(&self, depart_in_minutes: i64, arrive_in_minutes: i64) -> StartRequest {
        StartRequest::new(
            TRAIN,
            self.origin(depart_in_minutes),
            self.destination(arrive_in_minutes),
        )
    }

    /// Put an activity on the host as if a previous process created it.
    pub fn seed(
        &self,
        id: &str,
        state: JourneyState,
        depart_in_minutes: i64,
        arrive_in_minutes: i64,
    ) -> ActivityId {
        let id = ActivityId::from(id);
        self.activities.seed(LiveActivity {
            id: id.clone(),
            attributes: ActivityAttributes::new(
                TRAIN,
                self.origin(depart_in_minutes),
                self.destination(arrive_in_minutes),
            ),
            content_state: ActivityContentState::new(state),
        });
        id
    }

    /// Start an activity and wait for its setup jobs.
    pub async fn start(&self, request: StartRequest) -> ActivityId {
        let id = self.orchestrator.start(request).await.unwrap();
        self.orchestrator.settle().await;
        id
    }

    pub async fn live(&self, id: &ActivityId) -> LiveActivity {
        self.activities
            .live_activities()
            .await
            .into_iter()
            .find(|a| &a.id == id)
            .unwrap()
    }
}

/// Let every ready task run, then advance paused time slightly.
pub async fn let_tasks_run() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Advance paused time by `duration` and let woken tasks run.
pub async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    let_tasks_run().await;
}

/// Delegates to the in-memory host but sleeps before every update.
struct SlowUpdates {
    inner: MemoryActivityPlatform,
    delay: Duration,
}

#[async_trait]
impl ActivityPlatform for SlowUpdates {
    async fn request(
        &self,
        attributes: &ActivityAttributes,
        state: &ActivityContentState,
        stale_after: Option<DateTime<Utc>>,
    ) -> Result<ActivityId, EngineError> {
        self.inner.request(attributes, state, stale_after).await
    }

    async fn update(
        &self,
        id: &ActivityId,
        state: &ActivityContentState,
        stale_after: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError> {
        tokio::time::sleep(self.delay).await;
        self.inner.update(id, state, stale_after).await
    }

    async fn end(&self, id: &ActivityId, dismissal: DismissalPolicy) -> Result<(), EngineError> {
        self.inner.end(id, dismissal).await
    }

    async fn live_activities(&self) -> Vec<LiveActivity> {
        self.inner.live_activities().await
    }

    async fn current_push_token(&self, id: &ActivityId) -> Option<Vec<u8>> {
        self.inner.current_push_token(id).await
    }

    fn push_token_updates(&self, id: &ActivityId) -> TokenStream {
        self.inner.push_token_updates(id)
    }

    async fn push_to_start_token(&self) -> Option<Vec<u8>> {
        self.inner.push_to_start_token().await
    }

    fn push_to_start_token_updates(&self) -> TokenStream {
        self.inner.push_to_start_token_updates()
    }
}
