//! Core types and configuration for journey-live
//!
//! This crate provides the data model shared by the live activity engine and
//! its host shells:
//! - journey stations, activity attributes and the journey state machine
//! - alarm snapshots and alarm platform status types
//! - cached train/journey records used for activity recovery
//! - layered TOML configuration and process-wide logging setup

pub mod config;
pub mod home;
pub mod logging;
pub mod schema;

pub use schema::{
    ActivityAttributes, ActivityContentState, ActivityId, AlarmCancelReason, AlarmId,
    AlarmMetadata, AlarmSnapshot, AlarmState, AlarmStatus, DismissalPolicy, JourneyData,
    JourneyState, JourneyStation, LiveActivity, Train,
};
