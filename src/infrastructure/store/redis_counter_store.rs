//! Redis-backed shared counters.

use crate::domain::stores::{CounterStore, StoreError, StoreResult};
use async_trait::async_trait;
use redis::{AsyncCommands, Script, aio::ConnectionManager};
use tracing::debug;

/// Increments the counter and sets its expiry only when the increment created it.
///
/// Redis runs a script as one unit, so concurrent first requests cannot each
/// set their own expiry and a counter is never left without one.
const INCREMENT_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return current
"#;

/// Counter store shared by every process instance through Redis.
///
/// Errors are returned to the caller; the rate limiter decides how to degrade.
pub struct RedisCounterStore {
    client: ConnectionManager,
    increment: Script,
}

impl RedisCounterStore {
    pub fn new(client: ConnectionManager) -> Self {
        Self {
            client,
            increment: Script::new(INCREMENT_SCRIPT),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.client.clone();

        let value: Option<u64> = conn
            .get(key)
            .await
            .map_err(|e| StoreError::Operation(format!("GET {}: {}", key, e)))?;

        Ok(value.unwrap_or(0))
    }

    async fn increment(&self, key: &str, ttl_ms: u64) -> StoreResult<u64> {
        let mut conn = self.client.clone();

        let current: u64 = self
            .increment
            .key(key)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::Operation(format!("INCR {}: {}", key, e)))?;

        debug!(key, current, "counter incremented");

        Ok(current)
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
