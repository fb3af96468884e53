//! Configuration resolution
//!
//! Resolves configuration from multiple sources with priority:
//! 1. Command-line flags (passed as parameters)
//! 2. Environment variables
//! 3. Explicit config file, or repo-local config (.journey-live.toml)
//! 4. Global config (~/.config/journey-live/config.toml)
//! 5. Defaults

mod discovery;
mod types;

pub use discovery::{ConfigError, ConfigOverrides, resolve_config};
pub use types::{ActivityConfig, AlarmConfig, CacheConfig, Config, RemoteConfig, RetryConfig};
