//! Quire cache layer
//!
//! All cached state is advisory and lives behind [`KvCache`]:
//!
//! - **Projections** (`post_projection:<id>`, long TTL)
//! - **Stats** (`post_stats:<id>`, short TTL)
//! - **Leaderboard** (`leaderboard:top20`, shared blob)
//! - **Debounce leases** (`debounce:score:<type>:<id>`, set-if-absent)
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "postgres"        # or "memory" (single process only)
//! operation_timeout_ms = 250
//! projection_ttl_secs = 3600
//! stats_ttl_secs = 30
//! leaderboard_ttl_secs = 60
//! ```

pub mod aside;
pub(crate) mod config;
mod keys;
mod memory;
mod store;

pub use aside::{BatchFamily, fetch_batch, fetch_one};
pub use config::{CacheBackend, CacheConfig};
pub use keys::CacheKey;
pub use memory::MemoryCache;
pub use store::{BoundedCache, CacheEntry, CacheError, KvCache};
