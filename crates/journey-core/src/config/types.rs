//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default wake-up alarm preference
    #[serde(default)]
    pub alarm: AlarmConfig,
    /// Activity display settings
    #[serde(default)]
    pub activity: ActivityConfig,
    /// Retry policy for token registration
    #[serde(default)]
    pub retry: RetryConfig,
    /// Remote coordination service
    #[serde(default)]
    pub remote: RemoteConfig,
    /// On-disk journey cache
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Alarm preference defaults, used until the user changes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Whether wake-up alarms are scheduled at all
    pub enabled: bool,
    /// Minutes before arrival at which the alarm rings
    pub offset_minutes: u32,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            offset_minutes: 10,
        }
    }
}

/// Activity display configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Minutes past the destination time after which the host marks the
    /// activity stale
    pub stale_after_minutes: u32,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            stale_after_minutes: 10,
        }
    }
}

/// Retry policy for idempotent remote registrations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Base of the exponential backoff, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound of the uniform random jitter, in milliseconds
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_jitter_ms: 50,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }
}

/// Remote coordination service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Service base URL; remote calls are recorded locally when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 15,
        }
    }
}

/// Journey cache configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache file path (default: ~/.local/share/journey-live/journey-cache.json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.alarm.enabled);
        assert_eq!(config.alarm.offset_minutes, 10);
        assert_eq!(config.activity.stale_after_minutes, 10);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay(), Duration::from_millis(500));
        assert_eq!(config.retry.max_jitter(), Duration::from_millis(50));
        assert!(config.remote.base_url.is_none());
        assert!(config.cache.path.is_none());
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let config: Config = toml::from_str(
            r#"
            [alarm]
            offset_minutes = 5
            "#,
        )
        .unwrap();
        assert!(config.alarm.enabled);
        assert_eq!(config.alarm.offset_minutes, 5);
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.remote.base_url = Some("https://coordination.example".to_string());
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
