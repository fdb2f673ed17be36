use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::time::Duration;

use metrics_util::debugging::DebuggingRecorder;
use quire::application::feed::METRIC_FEED_ASSEMBLE_MS;
use quire::application::jobs::METRIC_CACHE_SWEPT;
use quire::application::scoring::{METRIC_SCORING_DEBOUNCED, METRIC_SCORING_ENQUEUED};
use quire::cache::aside::{METRIC_CACHE_HIT, METRIC_CACHE_MISS};
use quire::cache::{BatchFamily, CacheKey, MemoryCache, fetch_batch};

#[tokio::test]
async fn cache_aside_emits_hit_and_miss_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let cache = MemoryCache::new();
    let family = BatchFamily {
        name: "stats",
        key: CacheKey::PostStats,
        ttl: Duration::from_secs(30),
    };

    for _ in 0..2 {
        let values = fetch_batch(&cache, family, &[1, 2, 2], |ids| async move {
            let values: HashMap<_, _> = ids.into_iter().map(|id| (id, id * 10)).collect();
            Ok::<_, Infallible>(values)
        })
        .await
        .expect("batch");
        assert_eq!(values.get(&2), Some(&20));
    }

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            metrics_util::debugging::DebugValue::Counter(count) => {
                Some((composite_key.key().name().to_string(), count))
            }
            _ => None,
        })
        .collect();

    assert_eq!(counters.get(METRIC_CACHE_MISS), Some(&2));
    assert_eq!(counters.get(METRIC_CACHE_HIT), Some(&2));

    // Names published by the other subsystems stay distinct.
    let names: HashSet<&str> = [
        METRIC_CACHE_HIT,
        METRIC_CACHE_MISS,
        METRIC_CACHE_SWEPT,
        METRIC_SCORING_ENQUEUED,
        METRIC_SCORING_DEBOUNCED,
        METRIC_FEED_ASSEMBLE_MS,
    ]
    .into_iter()
    .collect();
    assert_eq!(names.len(), 6);
    assert!(names.iter().all(|name| name.starts_with("quire_")));
}
