use super::lock;
use crate::events;
use crate::platform::{AnalyticsSink, PreferenceStore};
use journey_live_core::config::AlarmConfig;
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy)]
struct AlarmPreferences {
    enabled: bool,
    offset_minutes: u32,
}

/// Preference store seeded from configuration and kept in memory.
#[derive(Clone)]
pub struct MemoryPreferences {
    values: Arc<Mutex<AlarmPreferences>>,
    analytics: Option<Arc<dyn AnalyticsSink>>,
}

impl MemoryPreferences {
    pub fn new(enabled: bool, offset_minutes: u32) -> Self {
        Self {
            values: Arc::new(Mutex::new(AlarmPreferences {
                enabled,
                offset_minutes,
            })),
            analytics: None,
        }
    }

    pub fn from_config(config: &AlarmConfig) -> Self {
        Self::new(config.enabled, config.offset_minutes)
    }

    /// Report preference changes to `analytics`.
    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    fn report(&self, setting: &str, old: serde_json::Value, new: serde_json::Value) {
        if let Some(analytics) = &self.analytics {
            analytics.track(
                events::ALARM_PREFERENCE_CHANGED,
                events::properties([("setting", json!(setting)), ("old_value", old), ("new_value", new)]),
            );
        }
    }
}

impl Default for MemoryPreferences {
    fn default() -> Self {
        Self::from_config(&AlarmConfig::default())
    }
}

impl PreferenceStore for MemoryPreferences {
    fn alarm_enabled(&self) -> bool {
        lock(&self.values).enabled
    }

    fn alarm_offset_minutes(&self) -> u32 {
        lock(&self.values).offset_minutes
    }

    fn set_alarm_enabled(&self, enabled: bool) {
        let old = std::mem::replace(&mut lock(&self.values).enabled, enabled);
        if old != enabled {
            self.report("alarm_enabled", json!(old), json!(enabled));
        }
    }

    fn set_alarm_offset_minutes(&self, minutes: u32) {
        let old = std::mem::replace(&mut lock(&self.values).offset_minutes, minutes);
        if old != minutes {
            self.report("alarm_offset_minutes", json!(old), json!(minutes));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RecordingAnalytics;

    #[test]
    fn test_seeded_from_config() {
        let prefs = MemoryPreferences::from_config(&AlarmConfig {
            enabled: false,
            offset_minutes: 7,
        });
        assert!(!prefs.alarm_enabled());
        assert_eq!(prefs.alarm_offset_minutes(), 7);
    }

    #[test]
    fn test_changes_are_reported_once() {
        let analytics = RecordingAnalytics::new();
        let prefs = MemoryPreferences::new(true, 10).with_analytics(Arc::new(analytics.clone()));

        prefs.set_alarm_offset_minutes(15);
        prefs.set_alarm_offset_minutes(15);
        prefs.set_alarm_enabled(true);

        let changes = analytics.events_named(events::ALARM_PREFERENCE_CHANGED);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].property("setting"), Some(&json!("alarm_offset_minutes")));
        assert_eq!(changes[0].property("old_value"), Some(&json!(10)));
        assert_eq!(changes[0].property("new_value"), Some(&json!(15)));
    }
}
