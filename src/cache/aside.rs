//! Cache-aside read helpers.
//!
//! Batch reads go cache first, then the loader for whatever was missing,
//! then one write-back. Cache faults never reach the caller: a failed read
//! is a full miss and a failed write is only logged.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::keys::CacheKey;
use super::store::{CacheEntry, KvCache};

pub const METRIC_CACHE_HIT: &str = "quire_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "quire_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "quire_cache_error_total";

const TARGET: &str = "quire::cache::aside";

/// Describes one cached family of per-id values.
#[derive(Debug, Clone, Copy)]
pub struct BatchFamily {
    /// Metric label, e.g. `projection`.
    pub name: &'static str,
    pub key: fn(i64) -> CacheKey,
    pub ttl: Duration,
}

/// Dedupes `ids`, serves what the cache holds and loads the rest.
///
/// The result only contains ids that were requested; ids the loader does not
/// return are simply absent.
pub async fn fetch_batch<T, E, F, Fut>(
    cache: &dyn KvCache,
    family: BatchFamily,
    ids: &[i64],
    load: F,
) -> Result<HashMap<i64, T>, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(Vec<i64>) -> Fut,
    Fut: Future<Output = Result<HashMap<i64, T>, E>>,
{
    let unique = dedupe(ids);
    if unique.is_empty() {
        return Ok(HashMap::new());
    }

    let keys: Vec<String> = unique.iter().map(|id| (family.key)(*id).render()).collect();
    let cached = match cache.mget(&keys).await {
        Ok(values) if values.len() == unique.len() => values,
        Ok(values) => {
            warn!(
                target = TARGET,
                family = family.name,
                expected = unique.len(),
                received = values.len(),
                "cache returned a mismatched batch; treating as a miss"
            );
            counter!(METRIC_CACHE_ERROR, "family" => family.name).increment(1);
            vec![None; unique.len()]
        }
        Err(err) => {
            warn!(
                target = TARGET,
                family = family.name,
                error = %err,
                "cache batch read failed; falling back to store"
            );
            counter!(METRIC_CACHE_ERROR, "family" => family.name).increment(1);
            vec![None; unique.len()]
        }
    };

    let mut found = HashMap::with_capacity(unique.len());
    let mut missing = Vec::new();
    for (id, raw) in unique.into_iter().zip(cached) {
        match raw.map(|raw| serde_json::from_str::<T>(&raw)) {
            Some(Ok(value)) => {
                found.insert(id, value);
            }
            Some(Err(err)) => {
                debug!(
                    target = TARGET,
                    family = family.name,
                    id,
                    error = %err,
                    "discarding malformed cache entry"
                );
                missing.push(id);
            }
            None => missing.push(id),
        }
    }

    counter!(METRIC_CACHE_HIT, "family" => family.name).increment(found.len() as u64);
    counter!(METRIC_CACHE_MISS, "family" => family.name).increment(missing.len() as u64);

    if missing.is_empty() {
        return Ok(found);
    }

    let requested: HashSet<i64> = missing.iter().copied().collect();
    let loaded = load(missing).await?;

    let mut write_back = Vec::with_capacity(loaded.len());
    for (id, value) in loaded {
        if !requested.contains(&id) {
            continue;
        }
        match serde_json::to_string(&value) {
            Ok(json) => write_back.push(CacheEntry::new(
                (family.key)(id).render(),
                json,
                family.ttl,
            )),
            Err(err) => warn!(
                target = TARGET,
                family = family.name,
                id,
                error = %err,
                "skipping write-back of unserializable value"
            ),
        }
        found.insert(id, value);
    }

    if !write_back.is_empty()
        && let Err(err) = cache.mset_ex(write_back).await
    {
        warn!(
            target = TARGET,
            family = family.name,
            error = %err,
            "cache write-back failed"
        );
        counter!(METRIC_CACHE_ERROR, "family" => family.name).increment(1);
    }

    Ok(found)
}

/// Single-blob variant used for shared, viewer-independent values.
pub async fn fetch_one<T, E, F, Fut>(
    cache: &dyn KvCache,
    name: &'static str,
    key: CacheKey,
    ttl: Duration,
    load: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let rendered = key.render();
    match cache.get(&rendered).await {
        Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT, "family" => name).increment(1);
                return Ok(value);
            }
            Err(err) => debug!(
                target = TARGET,
                family = name,
                error = %err,
                "discarding malformed cache entry"
            ),
        },
        Ok(None) => {}
        Err(err) => {
            warn!(
                target = TARGET,
                family = name,
                error = %err,
                "cache read failed; falling back to store"
            );
            counter!(METRIC_CACHE_ERROR, "family" => name).increment(1);
        }
    }
    counter!(METRIC_CACHE_MISS, "family" => name).increment(1);

    let value = load().await?;
    match serde_json::to_string(&value) {
        Ok(json) => {
            if let Err(err) = cache.set_ex(&rendered, &json, ttl).await {
                warn!(
                    target = TARGET,
                    family = name,
                    error = %err,
                    "cache write-back failed"
                );
                counter!(METRIC_CACHE_ERROR, "family" => name).increment(1);
            }
        }
        Err(err) => warn!(
            target = TARGET,
            family = name,
            error = %err,
            "skipping write-back of unserializable value"
        ),
    }
    Ok(value)
}

fn dedupe(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Cache doubles shared by service tests.

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::cache::memory::MemoryCache;
    use crate::cache::store::{CacheEntry, CacheError, KvCache};

    /// Memory cache that counts calls and remembers write batches.
    #[derive(Default)]
    pub struct RecordingCache {
        pub inner: MemoryCache,
        pub reads: AtomicUsize,
        pub writes: Mutex<Vec<Vec<CacheEntry>>>,
    }

    impl RecordingCache {
        pub fn read_calls(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        pub fn write_batches(&self) -> Vec<Vec<CacheEntry>> {
            self.writes.lock().expect("writes lock").clone()
        }

        pub fn total_calls(&self) -> usize {
            self.read_calls() + self.write_batches().len()
        }
    }

    #[async_trait]
    impl KvCache for RecordingCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.mget(keys).await
        }

        async fn set_ex(
            &self,
            key: &str,
            value: &str,
            ttl: std::time::Duration,
        ) -> Result<(), CacheError> {
            self.writes
                .lock()
                .expect("writes lock")
                .push(vec![CacheEntry::new(key, value, ttl)]);
            self.inner.set_ex(key, value, ttl).await
        }

        async fn set_nx_ex(
            &self,
            key: &str,
            value: &str,
            ttl: std::time::Duration,
        ) -> Result<bool, CacheError> {
            self.inner.set_nx_ex(key, value, ttl).await
        }

        async fn mset_ex(&self, entries: Vec<CacheEntry>) -> Result<(), CacheError> {
            self.writes.lock().expect("writes lock").push(entries.clone());
            self.inner.mset_ex(entries).await
        }

        async fn purge_expired(&self) -> Result<u64, CacheError> {
            self.inner.purge_expired().await
        }
    }

    /// Backend that is always down.
    pub struct DownCache;

    #[async_trait]
    impl KvCache for DownCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn mget(&self, _keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn set_ex(
            &self,
            _key: &str,
            _value: &str,
            _ttl: std::time::Duration,
        ) -> Result<(), CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn set_nx_ex(
            &self,
            _key: &str,
            _value: &str,
            _ttl: std::time::Duration,
        ) -> Result<bool, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn mset_ex(&self, _entries: Vec<CacheEntry>) -> Result<(), CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn purge_expired(&self) -> Result<u64, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }
    }
}
