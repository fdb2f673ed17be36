//! Cron job purging expired cache entries and debounce leases.

use std::str::FromStr;
use std::sync::Arc;

use apalis::prelude::*;
use apalis_cron::Schedule;
use metrics::counter;

use crate::cache::KvCache;

use super::context::job_failed;

pub const DEFAULT_CACHE_SWEEP_CRON: &str = "0 */10 * * * *";

pub const METRIC_CACHE_SWEPT: &str = "quire_cache_swept_total";

/// Marker struct for the cron-triggered sweep.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron compatibility.
#[derive(Default, Debug, Clone)]
pub struct CacheSweepJob;

impl From<chrono::DateTime<chrono::Utc>> for CacheSweepJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

#[derive(Clone)]
pub struct CacheSweepContext {
    pub cache: Arc<dyn KvCache>,
}

pub async fn process_cache_sweep_job(
    _job: CacheSweepJob,
    ctx: Data<CacheSweepContext>,
) -> Result<(), apalis::prelude::Error> {
    let purged = ctx.cache.purge_expired().await.map_err(job_failed)?;
    counter!(METRIC_CACHE_SWEPT).increment(purged);
    if purged > 0 {
        tracing::info!(
            target = "quire::application::jobs::cache_sweep",
            purged,
            "Purged expired cache entries"
        );
    }
    Ok(())
}

/// Parses a six-field cron expression (seconds first).
pub fn cache_sweep_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression).map_err(|err| err.to_string())
}
