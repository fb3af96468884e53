use super::lock;
use crate::platform::AnalyticsSink;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub properties: Map<String, Value>,
}

impl AnalyticsEvent {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Analytics sink that keeps every event for later inspection.
#[derive(Clone, Default)]
pub struct RecordingAnalytics {
    events: Arc<Mutex<Vec<AnalyticsEvent>>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        lock(&self.events).clone()
    }

    pub fn events_named(&self, name: &str) -> Vec<AnalyticsEvent> {
        lock(&self.events)
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        lock(&self.events).iter().filter(|e| e.name == name).count()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(&self, event: &str, properties: Map<String, Value>) {
        lock(&self.events).push(AnalyticsEvent {
            name: event.to_string(),
            properties,
        });
    }
}
