//! In-process cache with TTL and TTI expiry.
//!
//! Locking is two-level. The map of entries sits behind one `RwLock` taken only
//! for structural changes (insert, remove) and short lookups. Each entry keeps
//! its expiry clocks behind its own `Mutex`, so a read that resets the idle
//! clock on one key never blocks traffic on other keys.
//!
//! A touch and a sweep can race on the same key. The touch re-checks expiry
//! under the entry lock and refuses to extend a lapsed entry, so a lapsed
//! entry is never resurrected and the sweep always wins.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::Cache;
use crate::error::CacheError;

#[derive(Debug)]
struct Clocks {
    created: Instant,
    last_access: Instant,
}

#[derive(Debug)]
struct Entry {
    payload: Bytes,
    clocks: Mutex<Clocks>,
}

impl Entry {
    fn new(payload: Bytes, now: Instant) -> Self {
        Self {
            payload,
            clocks: Mutex::new(Clocks {
                created: now,
                last_access: now,
            }),
        }
    }
}

#[derive(Debug)]
struct Inner {
    entries: RwLock<HashMap<String, Arc<Entry>>>,
    ttl: Duration,
    tti: Duration,
}

impl Inner {
    fn lapsed(&self, clocks: &Clocks, now: Instant) -> bool {
        now.saturating_duration_since(clocks.created) >= self.ttl
            || now.saturating_duration_since(clocks.last_access) >= self.tti
    }

    fn lookup(&self, key: &str) -> Option<Arc<Entry>> {
        self.entries.read().get(key).cloned()
    }

    /// Remove every lapsed entry. Returns how many were removed.
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let candidates: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(_, entry)| self.lapsed(&entry.clocks.lock(), now))
            .map(|(key, _)| key.clone())
            .collect();
        if candidates.is_empty() {
            return 0;
        }

        let mut entries = self.entries.write();
        let mut removed = 0;
        for key in candidates {
            // The key may have been replaced since the read pass.
            let still_lapsed = entries
                .get(&key)
                .is_some_and(|entry| self.lapsed(&entry.clocks.lock(), now));
            if still_lapsed {
                entries.remove(&key);
                removed += 1;
            }
        }
        removed
    }
}

/// An in-process [`Cache`] with per-entry TTL and TTI clocks.
///
/// Construction spawns two sweeper tasks on the current tokio runtime, one
/// firing every TTL and one every TTI. They stop on [`LocalCache::shutdown`]
/// or when the cache is dropped. Outside a runtime no sweepers run and lapsed
/// entries are only hidden, not reclaimed.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bytes::Bytes;
/// use stormpath_cache::{Cache, LocalCache};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = LocalCache::new(Duration::from_secs(300), Duration::from_secs(60));
/// cache.set("https://api.stormpath.com/v1/accounts/abc", Bytes::from_static(b"{}")).unwrap();
/// assert!(cache.exists("https://api.stormpath.com/v1/accounts/abc").unwrap());
/// # }
/// ```
#[derive(Debug)]
pub struct LocalCache {
    inner: Arc<Inner>,
    sweepers: Mutex<Vec<JoinHandle<()>>>,
}

impl LocalCache {
    /// Create a cache and start its sweepers.
    ///
    /// Sweepers are spawned only when called inside a tokio runtime. Without
    /// one a warning is logged, lapsed entries stay hidden from reads, and
    /// their memory is reclaimed only by [`LocalCache::sweep`] or on
    /// overwrite. A zero duration, or one too large to schedule, starts no
    /// sweeper for that clock.
    #[must_use]
    pub fn new(ttl: Duration, tti: Duration) -> Self {
        let inner = Arc::new(Inner {
            entries: RwLock::new(HashMap::new()),
            ttl,
            tti,
        });

        let sweepers = match tokio::runtime::Handle::try_current() {
            Ok(handle) => vec![
                handle.spawn(run_sweeper(Arc::downgrade(&inner), ttl, "ttl")),
                handle.spawn(run_sweeper(Arc::downgrade(&inner), tti, "tti")),
            ],
            Err(_) => {
                warn!("no tokio runtime, cache sweepers disabled");
                Vec::new()
            }
        };

        Self {
            inner,
            sweepers: Mutex::new(sweepers),
        }
    }

    /// The absolute lifetime of an entry.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// The idle lifetime of an entry.
    #[must_use]
    pub fn tti(&self) -> Duration {
        self.inner.tti
    }

    /// Number of stored entries, including lapsed ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run one sweep immediately. Returns how many entries were removed.
    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    /// Stop the background sweepers. Stored entries are kept.
    pub fn shutdown(&self) {
        for handle in self.sweepers.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for LocalCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Cache for LocalCache {
    fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let Some(entry) = self.inner.lookup(key) else {
            return Ok(false);
        };
        let clocks = entry.clocks.lock();
        Ok(!self.inner.lapsed(&clocks, Instant::now()))
    }

    fn set(&self, key: &str, payload: Bytes) -> Result<(), CacheError> {
        let entry = Arc::new(Entry::new(payload, Instant::now()));
        self.inner.entries.write().insert(key.to_owned(), entry);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let Some(entry) = self.inner.lookup(key) else {
            return Ok(None);
        };
        let now = Instant::now();
        let mut clocks = entry.clocks.lock();
        if self.inner.lapsed(&clocks, now) {
            debug!(key, "cache entry lapsed");
            return Ok(None);
        }
        clocks.last_access = now;
        Ok(Some(entry.payload.clone()))
    }

    fn del(&self, key: &str) -> Result<(), CacheError> {
        self.inner.entries.write().remove(key);
        Ok(())
    }
}

async fn run_sweeper(inner: Weak<Inner>, period: Duration, clock: &'static str) {
    if period.is_zero() {
        return;
    }
    let Some(first_tick) = Instant::now().checked_add(period) else {
        debug!(clock, ?period, "sweep period out of range, sweeper not started");
        return;
    };
    let mut interval = tokio::time::interval_at(first_tick, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let removed = inner.sweep();
        if removed > 0 {
            debug!(clock, removed, "swept lapsed cache entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::advance;

    use super::*;

    const TTL: Duration = Duration::from_secs(60);
    const TTI: Duration = Duration::from_secs(20);

    fn payload() -> Bytes {
        Bytes::from_static(br#"{"href":"https://api.stormpath.com/v1/accounts/abc"}"#)
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_return_stored_bytes_before_expiry() {
        let cache = LocalCache::new(TTL, TTI);
        cache.set("k", payload()).unwrap();
        assert!(cache.exists("k").unwrap());
        assert_eq!(cache.get("k").unwrap(), Some(payload()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_miss_after_idle_time() {
        let cache = LocalCache::new(TTL, TTI);
        cache.set("k", payload()).unwrap();
        advance(TTI).await;
        assert!(!cache.exists("k").unwrap());
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_reset_idle_clock_on_access() {
        let cache = LocalCache::new(TTL, TTI);
        cache.set("k", payload()).unwrap();
        for _ in 0..2 {
            advance(TTI - Duration::from_secs(1)).await;
            assert!(cache.get("k").unwrap().is_some());
        }
        // 38s since creation, 0s idle
        assert!(cache.exists("k").unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_track_idle_time_per_key() {
        let cache = LocalCache::new(TTL, TTI);
        cache.set("touched", payload()).unwrap();
        cache.set("idle", payload()).unwrap();

        advance(TTI - Duration::from_secs(1)).await;
        assert!(cache.get("touched").unwrap().is_some());
        advance(Duration::from_secs(1)).await;

        assert!(cache.exists("touched").unwrap());
        assert!(!cache.exists("idle").unwrap());
        assert_eq!(cache.get("idle").unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_expire_on_ttl_despite_access() {
        let cache = LocalCache::new(TTL, TTI);
        cache.set("k", payload()).unwrap();
        for _ in 0..6 {
            advance(Duration::from_secs(10)).await;
            let _ = cache.get("k").unwrap();
        }
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_not_resurrect_lapsed_entry_on_access() {
        let cache = LocalCache::new(TTL, TTI);
        cache.sweepers.lock().iter().for_each(JoinHandle::abort);
        cache.set("k", payload()).unwrap();
        advance(TTI).await;
        assert_eq!(cache.get("k").unwrap(), None);
        advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("k").unwrap(), None);
        assert_eq!(cache.sweep(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_reclaim_lapsed_entries_in_background() {
        let cache = LocalCache::new(TTL, TTI);
        cache.set("a", payload()).unwrap();
        cache.set("b", payload()).unwrap();
        assert_eq!(cache.len(), 2);

        tokio::time::sleep(TTI + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_keep_replaced_entry_during_sweep() {
        let cache = LocalCache::new(TTL, TTI);
        cache.set("k", payload()).unwrap();
        advance(TTI).await;
        cache.set("k", Bytes::from_static(b"fresh")).unwrap();
        assert_eq!(cache.sweep(), 0);
        assert_eq!(cache.get("k").unwrap(), Some(Bytes::from_static(b"fresh")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_delete_entry() {
        let cache = LocalCache::new(TTL, TTI);
        cache.set("k", payload()).unwrap();
        cache.del("k").unwrap();
        cache.del("missing").unwrap();
        assert!(!cache.exists("k").unwrap());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_stop_sweepers_on_shutdown() {
        let cache = LocalCache::new(TTL, TTI);
        cache.shutdown();
        cache.set("k", payload()).unwrap();
        tokio::time::sleep(TTL * 2).await;
        assert_eq!(cache.len(), 1);
        assert!(!cache.exists("k").unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_accept_durations_too_large_to_schedule() {
        let cache = LocalCache::new(Duration::MAX, Duration::MAX);
        cache.set("k", payload()).unwrap();
        advance(Duration::from_secs(86_400)).await;
        assert_eq!(cache.get("k").unwrap(), Some(payload()));
    }

    #[test]
    fn test_should_work_without_runtime() {
        let cache = LocalCache::new(TTL, TTI);
        cache.set("k", payload()).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(payload()));
    }

    #[tokio::test]
    async fn test_should_share_cache_across_tasks() {
        let cache = Arc::new(LocalCache::new(TTL, TTI));
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let key = format!("k{i}");
                cache.set(&key, Bytes::from(key.clone())).unwrap();
                cache.get(&key).unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }
        assert_eq!(cache.len(), 8);
    }
}
