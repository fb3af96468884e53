//! Home directory resolution for journey-live
//!
//! # Precedence
//!
//! 1. `JOURNEY_HOME` environment variable (if set and non-empty)
//! 2. `dirs::home_dir()` platform default
//!
//! Tests and embedded hosts set `JOURNEY_HOME` so configuration and the
//! journey cache never touch the real user profile.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the home directory used for configuration and cache discovery.
///
/// # Errors
///
/// Returns an error if `JOURNEY_HOME` is unset and the platform home
/// directory cannot be determined.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("JOURNEY_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    dirs::home_dir().context("Could not determine home directory")
}

/// Default location of the on-disk journey cache.
pub fn default_cache_path(home_dir: &std::path::Path) -> PathBuf {
    home_dir.join(".local/share/journey-live/journey-cache.json")
}
