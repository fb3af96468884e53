//! Remote coordination service interface

use crate::error::EngineError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

/// JSON object sent as the body of a remote call.
pub type RemoteParams = Map<String, Value>;

/// Operations understood by the coordination service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    /// Ask the server to push the wake-up alert if the device alarm cannot ring.
    ScheduleArrivalAlert,
    /// Ask the server to push state changes at the expected times.
    ScheduleStateUpdates,
    RegisterLiveActivityToken,
    RegisterLiveActivityStartToken,
}

impl RemoteOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScheduleArrivalAlert => "scheduleArrivalAlert",
            Self::ScheduleStateUpdates => "scheduleStateUpdates",
            Self::RegisterLiveActivityToken => "registerLiveActivityToken",
            Self::RegisterLiveActivityStartToken => "registerLiveActivityStartToken",
        }
    }

    /// Registrations are idempotent server-side and safe to retry.
    pub fn is_idempotent(self) -> bool {
        matches!(
            self,
            Self::RegisterLiveActivityToken | Self::RegisterLiveActivityStartToken
        )
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait CoordinationClient: Send + Sync {
    async fn call(&self, operation: RemoteOperation, params: RemoteParams)
    -> Result<Value, EngineError>;
}
