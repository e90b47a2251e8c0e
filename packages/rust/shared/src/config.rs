//! Application configuration for RosterLens.
//!
//! User config lives at `~/.rosterlens/rosterlens.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterLensError};
use crate::types::CACHE_TTL_MS;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rosterlens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rosterlens";

// ---------------------------------------------------------------------------
// Config structs (matching rosterlens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Fetch and aggregation tuning.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Page-readiness polling.
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

/// Network profile, selecting timeout and per-batch concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkProfile {
    /// Ordinary desktop connection.
    #[default]
    Desktop,
    /// Slow or metered connection: longer waits, fewer outstanding requests.
    Constrained,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Base URL of the league hosting site.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Active network profile.
    #[serde(default)]
    pub profile: NetworkProfile,

    /// Path to the local cache database.
    #[serde(default = "default_cache_db")]
    pub cache_db: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            profile: NetworkProfile::default(),
            cache_db: default_cache_db(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.legacy.hockey".into()
}
fn default_cache_db() -> String {
    "~/.rosterlens/cache.db".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds on the desktop profile.
    #[serde(default = "default_timeout_desktop")]
    pub timeout_secs_desktop: u64,

    /// Request timeout in seconds on the constrained profile.
    #[serde(default = "default_timeout_constrained")]
    pub timeout_secs_constrained: u64,

    /// Concurrent requests per batch on the desktop profile.
    #[serde(default = "default_batch_desktop")]
    pub batch_size_desktop: usize,

    /// Concurrent requests per batch on the constrained profile.
    #[serde(default = "default_batch_constrained")]
    pub batch_size_constrained: usize,

    /// Pause between batches, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Cap on the number of team rosters fetched per run.
    #[serde(default = "default_max_teams")]
    pub max_teams: usize,

    /// Fraction of identifiers that must succeed before the run is
    /// reported as low-confidence. Results are returned either way.
    #[serde(default = "default_min_success_fraction")]
    pub min_success_fraction: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs_desktop: default_timeout_desktop(),
            timeout_secs_constrained: default_timeout_constrained(),
            batch_size_desktop: default_batch_desktop(),
            batch_size_constrained: default_batch_constrained(),
            pacing_ms: default_pacing_ms(),
            max_teams: default_max_teams(),
            min_success_fraction: default_min_success_fraction(),
        }
    }
}

fn default_timeout_desktop() -> u64 {
    5
}
fn default_timeout_constrained() -> u64 {
    8
}
fn default_batch_desktop() -> usize {
    5
}
fn default_batch_constrained() -> usize {
    2
}
fn default_pacing_ms() -> u64 {
    100
}
fn default_max_teams() -> usize {
    50
}
fn default_min_success_fraction() -> f64 {
    0.5
}

/// `[discovery]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Directory page identifiers to scan when the stats page itself does
    /// not link to team pages. Empty means page-link scanning only.
    #[serde(default)]
    pub directory_ids: Vec<String>,
}

/// `[readiness]` section — the bounded wait for the stats page to hold
/// enough recognizable rows before enrichment starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Maximum poll attempts before proceeding with whatever is present.
    #[serde(default = "default_ready_attempts")]
    pub attempts: u32,

    /// Minimum data rows across tables for the page to count as ready.
    #[serde(default = "default_ready_min_rows")]
    pub min_rows: usize,

    /// Delay between poll attempts, in milliseconds.
    #[serde(default = "default_ready_delay_ms")]
    pub delay_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            attempts: default_ready_attempts(),
            min_rows: default_ready_min_rows(),
            delay_ms: default_ready_delay_ms(),
        }
    }
}

fn default_ready_attempts() -> u32 {
    5
}
fn default_ready_min_rows() -> usize {
    3
}
fn default_ready_delay_ms() -> u64 {
    500
}

// ---------------------------------------------------------------------------
// Enrich options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime enrichment options — merged from config file + CLI flags,
/// with the network profile already resolved.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Base URL of the league hosting site.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Concurrent requests per batch.
    pub batch_size: usize,
    /// Pause between batches.
    pub pacing_ms: u64,
    /// Cap on rosters fetched per run.
    pub max_teams: usize,
    /// Low-confidence threshold on the success fraction.
    pub min_success_fraction: f64,
    /// Directory identifiers for directory-scan discovery.
    pub directory_ids: Vec<String>,
    /// Cache TTL in milliseconds.
    pub cache_ttl_ms: i64,
    /// Whether the cache participates at all.
    pub use_cache: bool,
    /// Readiness poll attempt ceiling.
    pub ready_attempts: u32,
    /// Readiness row threshold.
    pub ready_min_rows: usize,
    /// Readiness poll delay.
    pub ready_delay_ms: u64,
}

impl From<&AppConfig> for EnrichOptions {
    fn from(config: &AppConfig) -> Self {
        let (timeout_secs, batch_size) = match config.defaults.profile {
            NetworkProfile::Desktop => (
                config.fetch.timeout_secs_desktop,
                config.fetch.batch_size_desktop,
            ),
            NetworkProfile::Constrained => (
                config.fetch.timeout_secs_constrained,
                config.fetch.batch_size_constrained,
            ),
        };

        Self {
            base_url: config.defaults.base_url.clone(),
            timeout: Duration::from_secs(timeout_secs),
            batch_size,
            pacing_ms: config.fetch.pacing_ms,
            max_teams: config.fetch.max_teams,
            min_success_fraction: config.fetch.min_success_fraction,
            directory_ids: config.discovery.directory_ids.clone(),
            cache_ttl_ms: CACHE_TTL_MS,
            use_cache: true,
            ready_attempts: config.readiness.attempts,
            ready_min_rows: config.readiness.min_rows,
            ready_delay_ms: config.readiness.delay_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rosterlens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RosterLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rosterlens/rosterlens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RosterLensError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        RosterLensError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RosterLensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RosterLensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RosterLensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the cache database path, expanding a leading `~`.
pub fn cache_db_path(config: &AppConfig) -> Result<PathBuf> {
    let raw = &config.defaults.cache_db;
    if let Some(rest) = raw.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| RosterLensError::config("could not determine home directory"))?;
        Ok(home.join(rest))
    } else {
        Ok(PathBuf::from(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("min_success_fraction"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fetch.timeout_secs_desktop, 5);
        assert_eq!(parsed.fetch.max_teams, 50);
        assert_eq!(parsed.defaults.profile, NetworkProfile::Desktop);
    }

    #[test]
    fn config_with_directories() {
        let toml_str = r#"
[defaults]
profile = "constrained"

[discovery]
directory_ids = ["100", "200"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.profile, NetworkProfile::Constrained);
        assert_eq!(config.discovery.directory_ids, vec!["100", "200"]);
    }

    #[test]
    fn options_resolve_profile() {
        let mut config = AppConfig::default();
        let opts = EnrichOptions::from(&config);
        assert_eq!(opts.timeout, Duration::from_secs(5));
        assert_eq!(opts.batch_size, 5);

        config.defaults.profile = NetworkProfile::Constrained;
        let opts = EnrichOptions::from(&config);
        assert_eq!(opts.timeout, Duration::from_secs(8));
        assert_eq!(opts.batch_size, 2);
    }
}
