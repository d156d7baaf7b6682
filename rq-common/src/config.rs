//! Configuration loading and config file resolution
//!
//! Every field has a compiled default, so a missing or partial TOML file
//! still yields a runnable configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RQ_CONFIG";

/// Complete service configuration as stored in TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (default: 127.0.0.1:5740)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// EventBus channel capacity (default: 1000)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Inbound work queue depth (default: 256)
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

/// External video platform endpoints and credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// Data API key (overridden by RQ_YOUTUBE_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Data API base URL (default: https://www.googleapis.com/youtube/v3)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Watch page base URL used for caption track discovery
    #[serde(default = "default_watch_base_url")]
    pub watch_base_url: String,
    /// Per-request HTTP timeout in seconds (default: 30)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

/// Quorum acquisition tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Candidates requested per search (default: 8)
    #[serde(default = "default_search_breadth")]
    pub search_breadth: usize,
    /// Accepted sources required before analysis (default: 3)
    #[serde(default = "default_quorum_target")]
    pub quorum_target: usize,
    /// Fixed pause between acceptances in milliseconds (default: 7000)
    #[serde(default = "default_pacing_base_ms")]
    pub pacing_base_ms: u64,
    /// Upper bound of random pause added to the base in milliseconds (default: 3000)
    #[serde(default = "default_pacing_jitter_ms")]
    pub pacing_jitter_ms: u64,
    /// Wall-clock budget for one primary extraction in seconds (default: 25)
    #[serde(default = "default_extraction_deadline_secs")]
    pub extraction_deadline_secs: u64,
    /// Time allowed for the caption probe in seconds (default: 10)
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Caption languages in priority order (default: en, hi, mr)
    #[serde(default = "default_preferred_languages")]
    pub preferred_languages: Vec<String>,
    /// Seed for jitter and identity selection; entropy-seeded when unset
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind_address() -> String {
    "127.0.0.1:5740".to_string()
}

fn default_event_capacity() -> usize {
    1000
}

fn default_queue_depth() -> usize {
    256
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_watch_base_url() -> String {
    "https://www.youtube.com".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_search_breadth() -> usize {
    8
}

fn default_quorum_target() -> usize {
    3
}

fn default_pacing_base_ms() -> u64 {
    7000
}

fn default_pacing_jitter_ms() -> u64 {
    3000
}

fn default_extraction_deadline_secs() -> u64 {
    25
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_preferred_languages() -> Vec<String> {
    vec!["en".to_string(), "hi".to_string(), "mr".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            event_capacity: default_event_capacity(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: default_api_base_url(),
            watch_base_url: default_watch_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_breadth: default_search_breadth(),
            quorum_target: default_quorum_target(),
            pacing_base_ms: default_pacing_base_ms(),
            pacing_jitter_ms: default_pacing_jitter_ms(),
            extraction_deadline_secs: default_extraction_deadline_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            preferred_languages: default_preferred_languages(),
            rng_seed: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PipelineConfig {
    /// Reject settings the orchestrator cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.quorum_target == 0 {
            return Err(Error::Config("pipeline.quorum_target must be at least 1".to_string()));
        }
        if self.search_breadth < self.quorum_target {
            return Err(Error::Config(format!(
                "pipeline.search_breadth ({}) must not be smaller than pipeline.quorum_target ({})",
                self.search_breadth, self.quorum_target
            )));
        }
        if self.extraction_deadline_secs == 0 {
            return Err(Error::Config(
                "pipeline.extraction_deadline_secs must be at least 1".to_string(),
            ));
        }
        if self.probe_timeout_secs == 0 {
            return Err(Error::Config(
                "pipeline.probe_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.preferred_languages.is_empty() {
            return Err(Error::Config(
                "pipeline.preferred_languages must name at least one language".to_string(),
            ));
        }
        Ok(())
    }
}

/// Config file resolution priority:
/// 1. Command-line argument (highest priority)
/// 2. RQ_CONFIG environment variable
/// 3. Per-user config file (`<config dir>/rq/<module>.toml`) if it exists
///
/// Returns `None` when no file applies; callers then use compiled defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>, module_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path(module_name).filter(|p| p.exists())
}

/// Per-user config file location, whether or not it exists
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rq").join(format!("{}.toml", module_name)))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

/// Load configuration, degrading to defaults when the file is missing
///
/// A file that exists but fails to parse is still an error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using compiled defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let config = load_toml_config(path)?;
    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Write config to disk atomically (temp file + rename)
///
/// The file may hold an API key, so on Unix it is created with mode 0600.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}
