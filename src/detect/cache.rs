//! In-memory detection verdict cache with TTL and usage-aware eviction.
//! Key: blake3 hash of (normalized_text | sorted_langs | strict | context).
//! Default capacity: 1000, TTL: 30 minutes, sweep every 5 minutes.

use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::languages::LanguageSet;

/// Share of capacity removed when eviction is forced under pressure.
const EVICT_FRACTION: f64 = 0.2;

/// Sweep period used when a zero interval is requested.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Compute the key from an already-normalized text and the policy.
    pub fn compute(
        normalized_text: &str,
        languages: &LanguageSet,
        strict: bool,
        context: Option<&str>,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(normalized_text.as_bytes());
        hasher.update(b"|");
        hasher.update(languages.joined().as_bytes());
        hasher.update(b"|");
        hasher.update(if strict { b"strict" } else { b"normal" });
        hasher.update(b"|");
        hasher.update(context.unwrap_or("").as_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

struct CacheEntry {
    verdict: bool,
    created_at: Instant,
    access_count: u32,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }

    /// Decayed frequency: access count per minute of age, age floored at 1.
    fn score(&self, now: Instant) -> f64 {
        let age_minutes = now.saturating_duration_since(self.created_at).as_secs_f64() / 60.0;
        self.access_count as f64 / age_minutes.max(1.0)
    }
}

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Snapshot of cache usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub total: u64,
    /// Hit percentage with one decimal place, `"0"` before any lookup.
    pub hit_rate: String,
}

pub struct DetectionCache {
    inner: Mutex<CacheState>,
    max_size: usize,
    ttl: Duration,
}

impl DetectionCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheState {
                // Capacity is enforced by `evict`, not by the LRU itself.
                entries: LruCache::unbounded(),
                hits: 0,
                misses: 0,
            }),
            max_size,
            ttl,
        }
    }

    /// Look up a verdict. Expired entries are removed and count as misses.
    pub fn get(&self, key: &CacheKey) -> Option<bool> {
        let now = Instant::now();
        let mut state = self.inner.lock();
        match state.entries.peek(key).map(|e| e.is_expired(now, self.ttl)) {
            None => {
                state.misses += 1;
                return None;
            }
            Some(true) => {
                state.entries.pop(key);
                state.misses += 1;
                return None;
            }
            Some(false) => {}
        }
        state.hits += 1;
        // `get` promotes the entry to most-recently-used.
        let entry = state.entries.get_mut(key)?;
        entry.access_count = entry.access_count.saturating_add(1);
        Some(entry.verdict)
    }

    /// Store a verdict. An existing key is overwritten in place and does not
    /// count against capacity again.
    pub fn set(&self, key: CacheKey, verdict: bool) {
        let now = Instant::now();
        let mut state = self.inner.lock();
        if !state.entries.contains(&key) && state.entries.len() >= self.max_size {
            Self::evict_locked(&mut state, self.max_size, self.ttl, now);
            if self.max_size == 0 {
                return;
            }
        }
        state.entries.put(
            key,
            CacheEntry {
                verdict,
                created_at: now,
                access_count: 1,
            },
        );
    }

    /// Purge expired entries, then drop the lowest-scoring entries if still
    /// at or above capacity. Returns the number of entries removed.
    pub fn evict(&self) -> usize {
        let mut state = self.inner.lock();
        Self::evict_locked(&mut state, self.max_size, self.ttl, Instant::now())
    }

    fn evict_locked(state: &mut CacheState, max_size: usize, ttl: Duration, now: Instant) -> usize {
        let mut removed = Self::purge_expired_locked(state, ttl, now);

        let len = state.entries.len();
        if len >= max_size && len > 0 {
            // At least enough to make room for one insert.
            let quota = (max_size as f64 * EVICT_FRACTION).floor() as usize;
            let count = quota.max(len + 1 - max_size).min(len);

            let mut ranked: Vec<(CacheKey, f64, Instant)> = state
                .entries
                .iter()
                .map(|(k, e)| (*k, e.score(now), e.created_at))
                .collect();
            ranked.sort_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.2.cmp(&b.2))
            });
            for (key, _, _) in ranked.into_iter().take(count) {
                state.entries.pop(&key);
            }
            removed += count;
        }

        if removed > 0 {
            debug!(removed, size = state.entries.len(), "cache_evicted");
        }
        removed
    }

    /// Remove every entry older than the TTL. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.inner.lock();
        Self::purge_expired_locked(&mut state, self.ttl, Instant::now())
    }

    fn purge_expired_locked(state: &mut CacheState, ttl: Duration, now: Instant) -> usize {
        let expired: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now, ttl))
            .map(|(k, _)| *k)
            .collect();
        for key in &expired {
            state.entries.pop(key);
        }
        expired.len()
    }

    /// Drop all entries and reset hit/miss counters.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.entries.clear();
        state.hits = 0;
        state.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        let total = state.hits + state.misses;
        let hit_rate = if total == 0 {
            "0".to_string()
        } else {
            format!("{:.1}", state.hits as f64 / total as f64 * 100.0)
        };
        CacheStats {
            size: state.entries.len(),
            max_size: self.max_size,
            hits: state.hits,
            misses: state.misses,
            total,
            hit_rate,
        }
    }

    /// Start a background task purging expired entries every `interval`.
    /// Must be called from within a Tokio runtime.
    /// A zero `interval` falls back to `DEFAULT_SWEEP_INTERVAL`.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> SweepHandle {
        let interval = if interval.is_zero() {
            warn!(
                fallback_ms = DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
                "zero sweep interval, using default"
            );
            DEFAULT_SWEEP_INTERVAL
        } else {
            interval
        };
        let token = CancellationToken::new();
        let child = token.child_token();
        let cache = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(cache) = cache.upgrade() else { break };
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            info!(removed, size = cache.len(), "cache sweep");
                        }
                    }
                }
            }
            debug!("cache sweeper exiting");
        });

        SweepHandle {
            token,
            task: Some(task),
        }
    }
}

/// Keeps the cache sweeper alive. Call `stop()` or drop to shut it down.
pub struct SweepHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop and wait for the sweep task to exit. Returns false if the task
    /// panicked or was aborted.
    pub async fn join(mut self) -> bool {
        self.stop();
        match self.task.take() {
            Some(task) => match task.await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "cache sweeper task failed");
                    false
                }
            },
            None => true,
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
