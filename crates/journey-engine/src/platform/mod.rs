//! Collaborator interfaces the orchestrator is built against
//!
//! Every collaborator is an object-safe trait injected as `Arc<dyn _>`.
//! Hosts provide real implementations; the [`crate::memory`] module provides
//! in-process ones for tests and the simulator.

pub mod activity;
pub mod alarm;
pub mod analytics;
pub mod cache;
pub mod preferences;
pub mod push;
pub mod remote;

pub use activity::{ActivityPlatform, TokenStream};
pub use alarm::{AlarmPlatform, AlarmStream};
pub use analytics::{AnalyticsSink, LogAnalytics};
pub use cache::JourneyCache;
pub use preferences::PreferenceStore;
pub use push::PushTokenSupplier;
pub use remote::{CoordinationClient, RemoteOperation, RemoteParams};
