use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::{Cache, CacheConsistencyError, CacheStats};

/// Default size bound for a cache instance
const DEFAULT_MAX_ENTRIES: usize = 10_000;
/// Default background sweep period
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Insertion-order stamp for a cache entry.
///
/// The `seq` component breaks ties between entries stamped within the same
/// clock tick, so every live entry owns a distinct recency slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EntryStamp {
    at: Instant,
    seq: u64,
}

/// Internal cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Serialized data using bincode
    data: Vec<u8>,
    /// Insertion stamp, mirrored in the recency index
    stamp: EntryStamp,
    /// Expiration timestamp
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Value map and recency index, guarded together by one lock.
///
/// Every mutation goes through the `*_pair` helpers so the two structures are
/// always updated inside the same critical section. An entry present in one
/// map but not the other is a bookkeeping bug, and `verify` reports it.
#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    recency: BTreeMap<EntryStamp, String>,
    next_seq: u64,
}

impl CacheInner {
    fn next_stamp(&mut self) -> EntryStamp {
        let seq = self.next_seq;
        self.next_seq += 1;
        EntryStamp {
            at: Instant::now(),
            seq,
        }
    }

    /// Insert an entry and its recency record together.
    fn insert_pair(&mut self, key: String, entry: CacheEntry) {
        let stamp = entry.stamp;
        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.recency.remove(&old.stamp);
        }
        self.recency.insert(stamp, key);
    }

    /// Remove an entry and its recency record together.
    fn remove_pair(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.stamp);
        Some(entry)
    }

    /// Evict oldest-stamp-first until the entry count is within `max_entries`.
    fn evict_over(&mut self, max_entries: usize) -> u64 {
        let mut evicted = 0;
        while self.entries.len() > max_entries {
            let Some((_, key)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&key);
            evicted += 1;
        }
        evicted
    }

    /// Remove every expired entry, returning how many were removed.
    fn sweep_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now >= entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove_pair(key);
        }
        expired.len()
    }

    /// Reconcile the two structures: every entry must own exactly one recency
    /// record and every recency record must point at a live entry.
    fn verify(&self) -> Result<(), CacheConsistencyError> {
        let value_only = self
            .entries
            .values()
            .filter(|entry| !self.recency.contains_key(&entry.stamp))
            .count();
        let recency_only = self
            .recency
            .iter()
            .filter(|(stamp, key)| {
                self.entries
                    .get(key.as_str())
                    .is_none_or(|entry| entry.stamp != **stamp)
            })
            .count();

        if value_only == 0 && recency_only == 0 {
            Ok(())
        } else {
            Err(CacheConsistencyError {
                value_only,
                recency_only,
            })
        }
    }
}

/// Outcome of the read-locked half of a `get`.
enum ReadOutcome {
    Hit(Vec<u8>),
    Expired(EntryStamp),
    Absent,
}

/// Bounded in-memory cache with TTL expiry.
///
/// Values are kept alongside their insertion stamps in one record, with a
/// recency index ordered by stamp for oldest-first eviction. Both structures
/// live behind a single `RwLock`, so no interleaving of `put`, `invalidate`
/// and `cleanup` can leave a value without a recency record or vice versa.
///
/// A background task sweeps expired entries every `sweep_interval`; `get`
/// also drops an expired entry lazily when it trips over one.
#[derive(Debug)]
pub struct MemoryCache {
    /// Entries plus recency index, mutated only under this lock
    state: Arc<RwLock<CacheInner>>,
    /// Size bound enforced on every put
    max_entries: usize,
    /// Cache hit counter
    hits: Arc<AtomicU64>,
    /// Cache miss counter
    misses: Arc<AtomicU64>,
    /// Eviction counter (expired or removed for the size bound)
    evictions: Arc<AtomicU64>,
    /// Background sweep task handle
    sweep_handle: Option<JoinHandle<()>>,
}

impl MemoryCache {
    /// Create a new cache with a background sweeper.
    ///
    /// Must be called from within a Tokio runtime; the sweeper is spawned on
    /// the current runtime and aborted when the cache is dropped.
    pub fn new(max_entries: usize, sweep_interval: Duration) -> Self {
        let mut cache = Self::without_sweeper(max_entries);
        cache.sweep_handle = Some(Self::start_sweeper(
            Arc::clone(&cache.state),
            Arc::clone(&cache.evictions),
            sweep_interval,
        ));
        cache
    }

    /// Create a new cache with no background task.
    ///
    /// Expired entries are still dropped lazily on `get` and by explicit
    /// `cleanup` calls. Useful outside a runtime and in tests that want
    /// deterministic sweeps.
    pub fn without_sweeper(max_entries: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheInner::default())),
            max_entries,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(AtomicU64::new(0)),
            sweep_handle: None,
        }
    }

    fn start_sweeper(
        state: Arc<RwLock<CacheInner>>,
        evictions: Arc<AtomicU64>,
        every: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);

            loop {
                interval.tick().await;

                let removed = {
                    let mut state = state.write().unwrap();
                    let removed = state.sweep_expired();
                    if let Err(e) = state.verify() {
                        ::tracing::error!(error = %e, "cache sweep found diverged bookkeeping");
                    }
                    removed
                };

                if removed > 0 {
                    evictions.fetch_add(removed as u64, Ordering::Relaxed);
                    ::tracing::debug!(removed, "cache sweep removed expired entries");
                }
            }
        })
    }

    /// Check that the value map and recency index still agree.
    ///
    /// Holding the invariant is the cache's job; this accessor exists so tests
    /// can assert it after arbitrary operation interleavings.
    pub fn verify_consistency(&self) -> Result<(), CacheConsistencyError> {
        self.state.read().unwrap().verify()
    }

    /// Current number of live entries
    pub fn len(&self) -> usize {
        self.state.read().unwrap().entries.len()
    }

    /// Whether the cache currently holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_SWEEP_INTERVAL)
    }
}

impl Drop for MemoryCache {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: for<'de> Deserialize<'de> + Send,
    {
        let outcome = {
            let state = self.state.read().unwrap();
            match state.entries.get(key) {
                Some(entry) if entry.is_expired() => ReadOutcome::Expired(entry.stamp),
                Some(entry) => ReadOutcome::Hit(entry.data.clone()),
                None => ReadOutcome::Absent,
            }
        };

        match outcome {
            ReadOutcome::Hit(data) => {
                let value: V = bincode::deserialize(&data)
                    .context("Failed to deserialize cached value")?;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            ReadOutcome::Expired(stamp) => {
                {
                    let mut state = self.state.write().unwrap();
                    // Only drop the entry we saw expire; a concurrent put may
                    // have replaced it under a fresh stamp.
                    if state
                        .entries
                        .get(key)
                        .is_some_and(|entry| entry.stamp == stamp)
                    {
                        state.remove_pair(key);
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            ReadOutcome::Absent => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<()>
    where
        V: Serialize + Send + Sync,
    {
        let data = bincode::serialize(value).context("Failed to serialize value")?;

        let evicted = {
            let mut state = self.state.write().unwrap();
            let stamp = state.next_stamp();
            let entry = CacheEntry {
                data,
                stamp,
                expires_at: Instant::now() + ttl,
            };
            state.insert_pair(key.to_string(), entry);
            state.evict_over(self.max_entries)
        };

        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }

        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.remove_pair(key);
        Ok(())
    }

    async fn cleanup(&self) -> Result<usize> {
        let removed = {
            let mut state = self.state.write().unwrap();
            let removed = state.sweep_expired();
            state.verify()?;
            removed
        };

        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        }

        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.entries.clear();
        state.recency.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let evictions = self.evictions.load(Ordering::Relaxed);
        let size = self.state.read().unwrap().entries.len();

        let mut stats = CacheStats {
            hits,
            misses,
            evictions,
            size,
            hit_rate: 0.0,
        };

        stats.calculate_hit_rate();

        Ok(stats)
    }
}
