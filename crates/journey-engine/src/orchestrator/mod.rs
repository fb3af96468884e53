//! Live activity lifecycle orchestrator
//!
//! The orchestrator owns every decision about an activity's life:
//!
//! ```text
//!  start ──▶ setup ──┬─▶ departure timer ──▶ OnBoard
//!                    ├─▶ schedule wake-up alarm
//!                    ├─▶ notify expected arrival        (best effort)
//!                    └─▶ notify state-update windows    (best effort)
//!
//!  alarm fired ─────────────────────────────▶ PrepareToDropOff
//!  foreground refresh ──▶ safety-net transitions + ensure alarm
//!  end / end_all_immediately ──▶ release timers, snapshots, alarms
//! ```
//!
//! Only [`Orchestrator::start`] reports failure to the caller. Background jobs
//! log what goes wrong and move on.

mod alarm;
mod lifecycle;
mod monitor;
mod refresh;
mod remote;
mod transitions;

pub use alarm::AlarmRequest;
pub use lifecycle::StartRequest;

use crate::clock::Clock;
use crate::platform::{
    ActivityPlatform, AlarmPlatform, AnalyticsSink, CoordinationClient, JourneyCache,
    PreferenceStore, PushTokenSupplier,
};
use crate::registry::StateRegistry;
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use journey_live_core::config::Config;
use journey_live_core::{ActivityId, LiveActivity};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// External collaborators, injected at construction.
#[derive(Clone)]
pub struct Dependencies {
    pub activities: Arc<dyn ActivityPlatform>,
    pub alarms: Arc<dyn AlarmPlatform>,
    pub remote: Arc<dyn CoordinationClient>,
    pub push: Arc<dyn PushTokenSupplier>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub cache: Arc<dyn JourneyCache>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub clock: Arc<dyn Clock>,
}

/// Tunables derived from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Minutes past the destination time after which an activity is stale
    pub stale_after_minutes: u32,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            stale_after_minutes: config.activity.stale_after_minutes,
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

struct Inner {
    deps: Dependencies,
    config: EngineConfig,
    registry: StateRegistry,
    /// Serializes host activity mutations (create/update/end).
    activity_lane: tokio::sync::Mutex<()>,
    /// Root of every monitoring loop, timer and job token.
    shutdown: CancellationToken,
    /// Short-lived best-effort jobs.
    jobs: TaskTracker,
    /// Monitoring loops and departure timers.
    background: TaskTracker,
}

/// Cheaply cloneable handle to the engine.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(deps: Dependencies, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                deps,
                config,
                registry: StateRegistry::new(),
                activity_lane: tokio::sync::Mutex::new(()),
                shutdown: CancellationToken::new(),
                jobs: TaskTracker::new(),
                background: TaskTracker::new(),
            }),
        }
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Wait until every best-effort job spawned so far has finished.
    ///
    /// Monitoring loops and timers are not waited for.
    pub async fn settle(&self) {
        self.inner.jobs.close();
        self.inner.jobs.wait().await;
        self.inner.jobs.reopen();
    }

    /// Stop every monitoring loop, timer and job without ending activities.
    ///
    /// Used at process exit; live activities stay on the host and are picked
    /// up again by the next process through the existing-activity monitor.
    pub async fn shutdown(&self, timeout: Duration) {
        info!("Shutting down live activity engine");
        self.inner.shutdown.cancel();
        for timer in self.inner.registry.drain_timers() {
            timer.cancel();
        }

        self.inner.jobs.close();
        self.inner.background.close();
        let drained = tokio::time::timeout(timeout, async {
            self.inner.jobs.wait().await;
            self.inner.background.wait().await;
        })
        .await;

        match drained {
            Ok(()) => info!("All engine tasks stopped"),
            Err(_) => warn!(
                "Engine shutdown timed out after {}s, {} task(s) still running",
                timeout.as_secs(),
                self.inner.jobs.len() + self.inner.background.len()
            ),
        }
    }

    fn deps(&self) -> &Dependencies {
        &self.inner.deps
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.deps.clock.now()
    }

    fn child_token(&self) -> CancellationToken {
        self.inner.shutdown.child_token()
    }

    fn spawn_job<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.jobs.spawn(future);
    }

    fn spawn_background<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.background.spawn(future);
    }

    fn track(&self, event: &str, properties: Map<String, Value>) {
        self.inner.deps.analytics.track(event, properties);
    }

    async fn live_activity(&self, id: &ActivityId) -> Option<LiveActivity> {
        self.deps()
            .activities
            .live_activities()
            .await
            .into_iter()
            .find(|a| &a.id == id)
    }

    async fn is_live(&self, id: &ActivityId) -> bool {
        self.live_activity(id).await.is_some()
    }
}
