use serde_json::{Map, Value};
use tracing::info;

/// Fire-and-forget analytics sink. Implementations must not block.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &str, properties: Map<String, Value>);
}

/// Writes every event to the log instead of an analytics backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn track(&self, event: &str, properties: Map<String, Value>) {
        let properties = Value::Object(properties);
        info!(event, properties = %properties, "analytics");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_log_analytics_writes_event_and_properties() {
        let mut properties = Map::new();
        properties.insert("activity_id".to_string(), json!("act-1"));
        LogAnalytics.track("live_activity_started", properties);

        assert!(logs_contain("live_activity_started"));
        assert!(logs_contain(r#"{"activity_id":"act-1"}"#));
    }
}
