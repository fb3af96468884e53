use super::lock;
use crate::error::EngineError;
use crate::platform::{CoordinationClient, RemoteOperation, RemoteParams};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One recorded remote call, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub operation: RemoteOperation,
    pub params: RemoteParams,
    pub succeeded: bool,
}

#[derive(Default)]
struct ClientState {
    failures: HashMap<RemoteOperation, u32>,
    call_log: Vec<RemoteCall>,
}

/// Coordination client that answers every call locally.
#[derive(Clone, Default)]
pub struct MemoryCoordinationClient {
    state: Arc<Mutex<ClientState>>,
}

impl MemoryCoordinationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls of `operation` fail.
    pub fn fail_next(&self, operation: RemoteOperation, count: u32) {
        lock(&self.state).failures.insert(operation, count);
    }

    /// Total calls of `operation`, including failed attempts.
    pub fn call_count(&self, operation: RemoteOperation) -> usize {
        lock(&self.state)
            .call_log
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Parameters of the successful calls of `operation`.
    pub fn successful_params(&self, operation: RemoteOperation) -> Vec<RemoteParams> {
        lock(&self.state)
            .call_log
            .iter()
            .filter(|c| c.operation == operation && c.succeeded)
            .map(|c| c.params.clone())
            .collect()
    }

    /// Get a copy of the call log for assertions
    pub fn get_calls(&self) -> Vec<RemoteCall> {
        lock(&self.state).call_log.clone()
    }
}

#[async_trait]
impl CoordinationClient for MemoryCoordinationClient {
    async fn call(
        &self,
        operation: RemoteOperation,
        params: RemoteParams,
    ) -> Result<Value, EngineError> {
        let mut state = lock(&self.state);
        let fail = match state.failures.get_mut(&operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        state.call_log.push(RemoteCall {
            operation,
            params,
            succeeded: !fail,
        });

        if fail {
            return Err(EngineError::remote(operation, "service unavailable"));
        }
        Ok(json!({ "ok": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_failures_then_success() {
        let client = MemoryCoordinationClient::new();
        client.fail_next(RemoteOperation::RegisterLiveActivityToken, 2);

        for _ in 0..2 {
            let err = client
                .call(RemoteOperation::RegisterLiveActivityToken, RemoteParams::new())
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::Remote { .. }));
        }
        let ok = client
            .call(RemoteOperation::RegisterLiveActivityToken, RemoteParams::new())
            .await
            .unwrap();
        assert_eq!(ok, json!({ "ok": true }));

        assert_eq!(client.call_count(RemoteOperation::RegisterLiveActivityToken), 3);
        assert_eq!(
            client
                .successful_params(RemoteOperation::RegisterLiveActivityToken)
                .len(),
            1
        );
        assert_eq!(client.call_count(RemoteOperation::ScheduleArrivalAlert), 0);
    }
}
