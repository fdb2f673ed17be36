//! Cache configuration.
//!
//! Selects the backend and the TTLs of each cached family via the `[cache]`
//! section of `quire.toml`.

use std::time::Duration;

use serde::Deserialize;

pub(crate) const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 250;
pub(crate) const DEFAULT_PROJECTION_TTL_SECS: u64 = 3600;
pub(crate) const DEFAULT_STATS_TTL_SECS: u64 = 30;
pub(crate) const DEFAULT_LEADERBOARD_TTL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Per-process map. Leases only coordinate within one process.
    Memory,
    /// Shared `cache_entries` lease table.
    #[default]
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Upper bound for any single cache round trip.
    pub operation_timeout: Duration,
    pub projection_ttl: Duration,
    pub stats_ttl: Duration,
    pub leaderboard_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            projection_ttl: Duration::from_secs(DEFAULT_PROJECTION_TTL_SECS),
            stats_ttl: Duration::from_secs(DEFAULT_STATS_TTL_SECS),
            leaderboard_ttl: Duration::from_secs(DEFAULT_LEADERBOARD_TTL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            operation_timeout: settings.operation_timeout,
            projection_ttl: settings.projection_ttl,
            stats_ttl: settings.stats_ttl,
            leaderboard_ttl: settings.leaderboard_ttl,
        }
    }
}
