//! In-process session storage.

use super::sweep_interval;
use crate::domain::clock::Clock;
use crate::domain::session::SessionData;
use crate::domain::stores::{SessionStore, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug)]
struct Sessions {
    entries: HashMap<String, (SessionData, DateTime<Utc>)>,
    last_sweep: DateTime<Utc>,
}

/// Session store for a single process, with the same sliding TTL as the Redis store.
///
/// Expired sessions are dropped on load, and by a sweep that runs on save at
/// most once per sweep interval, so abandoned sessions do not accumulate.
pub struct MemorySessionStore {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    sessions: Mutex<Sessions>,
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>, ttl_seconds: u64) -> Self {
        let last_sweep = clock.now();
        Self {
            clock,
            ttl: Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX / 1000)),
            sessions: Mutex::new(Sessions {
                entries: HashMap::new(),
                last_sweep,
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> StoreResult<Option<SessionData>> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        match sessions.entries.get(id) {
            Some((data, expires_at)) if *expires_at > now => Ok(Some(data.clone())),
            Some(_) => {
                sessions.entries.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, id: &str, data: &SessionData) -> StoreResult<()> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        if now - sessions.last_sweep >= sweep_interval() {
            let before = sessions.entries.len();
            sessions.entries.retain(|_, (_, expires_at)| *expires_at > now);
            sessions.last_sweep = now;
            debug!(removed = before - sessions.entries.len(), "swept expired sessions");
        }

        sessions
            .entries
            .insert(id.to_string(), (data.clone(), now + self.ttl));
        Ok(())
    }
}
