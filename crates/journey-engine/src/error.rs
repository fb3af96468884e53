//! Engine error taxonomy
//!
//! Only [`EngineError::ActivityCreation`] ever crosses the orchestrator's
//! public boundary. Everything else is produced by collaborators, absorbed by
//! background jobs and logged.

use crate::platform::RemoteOperation;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The host refused to create the activity. Not retried.
    #[error("activity creation failed: {message}")]
    ActivityCreation {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Activity or alarm platform call failed.
    #[error("platform error: {message}")]
    Platform {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Remote coordination service call failed (transport or server side).
    #[error("remote call {operation} failed: {message}")]
    Remote {
        operation: RemoteOperation,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Journey cache could not be read or written.
    #[error("journey cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Cooperative cancellation; never reported as a failure.
    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
            source: None,
        }
    }

    pub fn remote(operation: RemoteOperation, message: impl Into<String>) -> Self {
        Self::Remote {
            operation,
            message: message.into(),
            source: None,
        }
    }

    pub fn cache(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::Cache {
            message: message.into(),
            source,
        }
    }

    /// Wrap any platform failure raised while requesting a new activity.
    pub fn creation_failed(error: EngineError) -> Self {
        match error {
            Self::ActivityCreation { .. } => error,
            other => Self::ActivityCreation {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
