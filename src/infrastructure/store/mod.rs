//! Counter and session store backends.
//!
//! - [`RedisCounterStore`] / [`RedisSessionStore`] - production, shared across instances
//! - [`MemoryCounterStore`] / [`MemorySessionStore`] - single-process fallback and tests

mod memory_counter_store;
mod memory_session_store;
mod redis_counter_store;
mod redis_session_store;

pub use memory_counter_store::MemoryCounterStore;
pub use memory_session_store::MemorySessionStore;
pub use redis_counter_store::RedisCounterStore;
pub use redis_session_store::RedisSessionStore;

use crate::domain::stores::{StoreError, StoreResult};
use chrono::Duration;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::info;

/// Minimum time between two expiry sweeps of an in-memory store.
fn sweep_interval() -> Duration {
    Duration::seconds(60)
}

/// Opens a managed Redis connection and validates it with a PING.
///
/// The returned manager is cheap to clone and is shared by both Redis stores.
///
/// # Errors
///
/// Returns [`StoreError::Connection`] if the URL is invalid, the connection cannot
/// be established, or the PING fails.
pub async fn connect_redis(redis_url: &str) -> StoreResult<ConnectionManager> {
    info!("Connecting to Redis");

    let client = Client::open(redis_url)
        .map_err(|e| StoreError::Connection(format!("Failed to create Redis client: {}", e)))?;

    let manager = ConnectionManager::new(client)
        .await
        .map_err(|e| StoreError::Connection(format!("Failed to connect to Redis: {}", e)))?;

    let mut test_conn = manager.clone();
    test_conn
        .ping::<()>()
        .await
        .map_err(|e| StoreError::Connection(format!("Redis PING failed: {}", e)))?;

    info!("Connected to Redis");

    Ok(manager)
}
