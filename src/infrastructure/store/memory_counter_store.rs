//! In-process counter store.

use super::sweep_interval;
use crate::domain::clock::Clock;
use crate::domain::stores::{CounterStore, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Windows {
    entries: HashMap<String, Window>,
    last_sweep: DateTime<Utc>,
}

impl Windows {
    /// Drops expired windows, at most once per sweep interval.
    fn sweep(&mut self, now: DateTime<Utc>) {
        if now - self.last_sweep < sweep_interval() {
            return;
        }

        let before = self.entries.len();
        self.entries.retain(|_, w| w.expires_at > now);
        self.last_sweep = now;

        debug!(removed = before - self.entries.len(), "swept expired counters");
    }
}

/// Counter store for a single process.
///
/// Used when Redis is not configured and in tests. Counters are not shared
/// between instances, so limits apply per process.
pub struct MemoryCounterStore {
    clock: Arc<dyn Clock>,
    windows: Mutex<Windows>,
}

impl MemoryCounterStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        debug!("Using in-memory counter store");
        let last_sweep = clock.now();
        Self {
            clock,
            windows: Mutex::new(Windows {
                entries: HashMap::new(),
                last_sweep,
            }),
        }
    }

    /// Number of keys currently held, expired or not.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> StoreResult<u64> {
        let now = self.clock.now();
        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        Ok(windows
            .entries
            .get(key)
            .filter(|w| w.expires_at > now)
            .map(|w| w.count)
            .unwrap_or(0))
    }

    async fn increment(&self, key: &str, ttl_ms: u64) -> StoreResult<u64> {
        let now = self.clock.now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        windows.sweep(now);

        let ttl = Duration::milliseconds(i64::try_from(ttl_ms).unwrap_or(i64::MAX));

        let window = windows
            .entries
            .entry(key.to_string())
            .and_modify(|w| {
                if w.expires_at <= now {
                    *w = Window {
                        count: 0,
                        expires_at: now + ttl,
                    };
                }
            })
            .or_insert(Window {
                count: 0,
                expires_at: now + ttl,
            });

        window.count += 1;
        Ok(window.count)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;

    fn store() -> (Arc<ManualClock>, MemoryCounterStore) {
        let clock = Arc::new(ManualClock::default());
        let store = MemoryCounterStore::new(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_missing_key_reads_zero() {
        let (_, store) = store();
        assert_eq!(store.get("rate-limit:nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_counts_up() {
        let (_, store) = store();

        assert_eq!(store.increment("k", 1000).await.unwrap(), 1);
        assert_eq!(store.increment("k", 1000).await.unwrap(), 2);
        assert_eq!(store.get("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_expiry_is_set_on_first_increment_only() {
        let (clock, store) = store();

        store.increment("k", 1000).await.unwrap();
        clock.advance(Duration::milliseconds(600));
        store.increment("k", 1000).await.unwrap();

        // 1000ms after the first increment the window is over, even though the
        // second increment happened only 400ms ago.
        clock.advance(Duration::milliseconds(400));
        assert_eq!(store.get("k").await.unwrap(), 0);
        assert_eq!(store.increment("k", 1000).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (_, store) = store();

        store.increment("a", 1000).await.unwrap();
        store.increment("a", 1000).await.unwrap();
        store.increment("b", 1000).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), 2);
        assert_eq!(store.get("b").await.unwrap(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_windows_are_swept() {
        let (clock, store) = store();

        for i in 0..1000 {
            store.increment(&format!("rate-limit:{}", i), 1000).await.unwrap();
        }
        assert_eq!(store.len(), 1000);

        clock.advance(Duration::seconds(120));
        store.increment("rate-limit:fresh", 1000).await.unwrap();

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_runs_at_most_once_per_interval() {
        let (clock, store) = store();

        clock.advance(Duration::seconds(120));
        store.increment("a", 1000).await.unwrap();

        // "a" has expired, but the last sweep was just now.
        clock.advance(Duration::seconds(2));
        store.increment("b", 1000).await.unwrap();
        assert_eq!(store.len(), 2);

        clock.advance(Duration::seconds(60));
        store.increment("c", 1000).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
