mod cache_sweep;
mod context;
mod queue;

pub use cache_sweep::{
    CacheSweepContext, CacheSweepJob, DEFAULT_CACHE_SWEEP_CRON, METRIC_CACHE_SWEPT,
    cache_sweep_schedule, process_cache_sweep_job,
};
pub use context::job_failed;
pub use queue::{DEFAULT_MAX_ATTEMPTS, DEFAULT_PRIORITY, enqueue_job};
