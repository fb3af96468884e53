//! Configuration discovery and resolution

use super::types::{ActivityConfig, AlarmConfig, CacheConfig, Config, RemoteConfig, RetryConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Explicitly requested config file does not exist
    #[error("Configuration not found: {0}")]
    NotFound(PathBuf),
}

/// Command-line overrides for configuration
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Explicit config file; replaces the repo-local lookup
    pub config_path: Option<PathBuf>,
    /// Override alarm enabled preference
    pub alarm_enabled: Option<bool>,
    /// Override alarm lead time
    pub alarm_offset_minutes: Option<u32>,
    /// Override remote service URL
    pub remote_url: Option<String>,
}

/// Config file layer. Sections absent from the file leave lower layers intact.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    alarm: Option<AlarmConfig>,
    activity: Option<ActivityConfig>,
    retry: Option<RetryConfig>,
    remote: Option<RemoteConfig>,
    cache: Option<CacheConfig>,
}

/// Resolve configuration from all sources
///
/// Priority (highest to lowest):
/// 1. Command-line overrides
/// 2. Environment variables
/// 3. Explicit config file, or repo-local `.journey-live.toml` (walks up to git root)
/// 4. Global config (~/.config/journey-live/config.toml)
/// 5. Defaults
///
/// Unparseable global or repo-local files are skipped with a warning; an
/// explicit `config_path` that cannot be read or parsed is an error.
pub fn resolve_config(
    overrides: &ConfigOverrides,
    current_dir: &Path,
    home_dir: &Path,
) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    // 4. Global config
    let global_config_path = home_dir.join(".config/journey-live/config.toml");
    if global_config_path.exists() {
        match read_file_layer(&global_config_path) {
            Ok(layer) => merge_config(&mut config, layer),
            Err(e) => warn!("Failed to parse global config at {global_config_path:?}: {e}"),
        }
    }

    // 3. Explicit or repo-local config
    if let Some(ref explicit) = overrides.config_path {
        if !explicit.exists() {
            return Err(ConfigError::NotFound(explicit.clone()));
        }
        merge_config(&mut config, read_file_layer(explicit)?);
    } else if let Some(repo_config) = find_repo_local_config(current_dir) {
        match read_file_layer(&repo_config) {
            Ok(layer) => merge_config(&mut config, layer),
            Err(e) => warn!("Failed to parse repo config at {repo_config:?}: {e}"),
        }
    }

    // 2. Environment variables
    apply_env_overrides(&mut config);

    // 1. Command-line overrides
    apply_cli_overrides(&mut config, overrides);

    Ok(config)
}

/// Find repo-local config file
///
/// Searches current directory and parent directories up to git root
fn find_repo_local_config(current_dir: &Path) -> Option<PathBuf> {
    let mut dir = current_dir;

    loop {
        let config_path = dir.join(".journey-live.toml");
        if config_path.exists() {
            return Some(config_path);
        }

        if dir.join(".git").exists() {
            break;
        }

        dir = dir.parent()?;
    }

    None
}

fn read_file_layer(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

fn merge_config(base: &mut Config, file: FileConfig) {
    if let Some(alarm) = file.alarm {
        base.alarm = alarm;
    }
    if let Some(activity) = file.activity {
        base.activity = activity;
    }
    if let Some(retry) = file.retry {
        base.retry = retry;
    }
    if let Some(remote) = file.remote {
        base.remote = remote;
    }
    if let Some(cache) = file.cache {
        base.cache = cache;
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(value) = std::env::var("JOURNEY_ALARM_ENABLED") {
        match parse_bool(&value) {
            Some(enabled) => config.alarm.enabled = enabled,
            None => warn!("Ignoring JOURNEY_ALARM_ENABLED='{value}': not a boolean"),
        }
    }

    if let Ok(value) = std::env::var("JOURNEY_ALARM_OFFSET") {
        match value.trim().parse::<u32>() {
            Ok(minutes) => config.alarm.offset_minutes = minutes,
            Err(_) => warn!("Ignoring JOURNEY_ALARM_OFFSET='{value}': not a minute count"),
        }
    }

    if let Ok(url) = std::env::var("JOURNEY_REMOTE_URL") {
        let trimmed = url.trim();
        if !trimmed.is_empty() {
            config.remote.base_url = Some(trimmed.to_string());
        }
    }
}

fn apply_cli_overrides(config: &mut Config, overrides: &ConfigOverrides) {
    if let Some(enabled) = overrides.alarm_enabled {
        config.alarm.enabled = enabled;
    }

    if let Some(minutes) = overrides.alarm_offset_minutes {
        config.alarm.offset_minutes = minutes;
    }

    if let Some(ref url) = overrides.remote_url {
        config.remote.base_url = Some(url.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_merge_only_present_sections() {
        let mut base = Config::default();
        base.alarm.offset_minutes = 20;
        base.remote.base_url = Some("https://global.example".to_string());

        let layer: FileConfig = toml::from_str(
            r#"
            [remote]
            base_url = "https://local.example"
            "#,
        )
        .unwrap();
        merge_config(&mut base, layer);

        assert_eq!(base.alarm.offset_minutes, 20);
        assert_eq!(base.remote.base_url.as_deref(), Some("https://local.example"));
    }

    #[test]
    fn test_repo_local_lookup_stops_at_git_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let outer = dir.path();
        let repo = outer.join("repo");
        let nested = repo.join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        std::fs::write(outer.join(".journey-live.toml"), "").unwrap();

        assert_eq!(find_repo_local_config(&nested), None);

        std::fs::write(repo.join(".journey-live.toml"), "").unwrap();
        assert_eq!(
            find_repo_local_config(&nested),
            Some(repo.join(".journey-live.toml"))
        );
    }
}
