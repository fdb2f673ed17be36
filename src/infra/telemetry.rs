use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::feed::METRIC_FEED_ASSEMBLE_MS;
use crate::application::jobs::METRIC_CACHE_SWEPT;
use crate::application::scoring::{METRIC_SCORING_DEBOUNCED, METRIC_SCORING_ENQUEUED};
use crate::cache::aside::{METRIC_CACHE_ERROR, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Cache-aside hits, labelled by family."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Cache-aside misses served from the store, labelled by family."
        );
        describe_counter!(
            METRIC_CACHE_ERROR,
            Unit::Count,
            "Cache reads, writes or decodes that failed and fell back to the store."
        );
        describe_counter!(
            METRIC_SCORING_ENQUEUED,
            Unit::Count,
            "Score recomputation jobs accepted by the queue."
        );
        describe_counter!(
            METRIC_SCORING_DEBOUNCED,
            Unit::Count,
            "Score recomputation requests absorbed by a live lease."
        );
        describe_counter!(
            METRIC_CACHE_SWEPT,
            Unit::Count,
            "Expired cache entries removed by the sweep job."
        );
        describe_histogram!(
            METRIC_FEED_ASSEMBLE_MS,
            Unit::Milliseconds,
            "Time spent hydrating one feed page in milliseconds."
        );
    });
}
