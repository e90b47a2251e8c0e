//! Shared types, error model, and configuration for RosterLens.
//!
//! This crate is the foundation depended on by all other RosterLens crates.
//! It provides:
//! - [`RosterLensError`] — the unified error type
//! - Domain types ([`PlayerRecord`], [`PlayerLookup`], [`SeasonId`], [`CacheEntry`])
//! - Configuration ([`AppConfig`], [`EnrichOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, DiscoveryConfig, EnrichOptions, FetchConfig, NetworkProfile,
    ReadinessConfig, cache_db_path, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{Result, RosterLensError};
pub use types::{
    CACHE_TTL_MS, CacheEntry, PlayerLookup, PlayerRecord, SeasonId, now_ms, player_id_from_href,
    team_id_from_href,
};
