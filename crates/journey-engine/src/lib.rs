//! Live activity lifecycle and wake-up alarm engine
//!
//! Keeps a glanceable journey status surface (the *activity*) and a wake-up
//! alert (the *alarm*) in step with a train journey's timeline:
//! - automatic BeforeBoarding → OnBoard → PrepareToDropOff transitions
//! - deduplicated alarm scheduling and preference-driven rescheduling
//! - retried push-token registration with the coordination service
//! - monitoring loops over token rotation and alarm firing
//! - foreground catch-up and recovery from the journey cache
//!
//! Host integrations implement the traits in [`platform`]; [`memory`] holds
//! in-process implementations used by tests and the `journey-sim` binary.

pub mod clock;
pub mod error;
pub mod events;
pub mod file_cache;
pub mod http;
pub mod memory;
pub mod orchestrator;
pub mod platform;
pub mod registry;
pub mod retry;
pub mod timer;

pub use clock::{Clock, SystemClock, TokioClock};
pub use error::EngineError;
pub use file_cache::FileJourneyCache;
pub use http::HttpCoordinationClient;
pub use orchestrator::{AlarmRequest, Dependencies, EngineConfig, Orchestrator, StartRequest};
pub use registry::StateRegistry;
pub use retry::{RetryPolicy, perform_with_retry};
pub use timer::TimerHandle;
