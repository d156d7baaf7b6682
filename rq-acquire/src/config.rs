//! Configuration resolution for rq-acquire
//!
//! Provides ENV → TOML resolution for the YouTube Data API key.

use rq_common::config::TomlConfig;
use tracing::{info, warn};

/// Environment variable holding the Data API key
pub const API_KEY_ENV_VAR: &str = "RQ_YOUTUBE_API_KEY";

/// Resolve the Data API key
///
/// **Priority:** ENV → TOML
///
/// A missing key is not fatal: the service starts, and every run fails its
/// search step until a key is configured.
pub fn resolve_youtube_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR)
        .ok()
        .filter(|key| is_valid_key(key));
    let toml_key = toml_config
        .youtube
        .api_key
        .clone()
        .filter(|key| is_valid_key(key));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "YouTube API key found in environment and TOML. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("YouTube API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("YouTube API key loaded from TOML config");
        return Some(key);
    }

    warn!(
        "YouTube API key not configured. Set {} or [youtube] api_key in the TOML config",
        API_KEY_ENV_VAR
    );
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
