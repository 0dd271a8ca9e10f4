//! Shared counter store contract.

use super::StoreResult;
use async_trait::async_trait;

/// Key-value counter service shared by every process instance.
///
/// # Implementations
///
/// - [`crate::infrastructure::store::RedisCounterStore`] - Redis, atomic via a Lua script
/// - [`crate::infrastructure::store::MemoryCounterStore`] - single-process map
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current counter value. A missing or expired key reads as `0`.
    async fn get(&self, key: &str) -> StoreResult<u64>;

    /// Atomically increments `key` and returns the new value.
    ///
    /// When the increment creates the counter (new value is `1`), the key's expiry
    /// is set to `ttl_ms` in the same atomic step. Later increments never touch
    /// the expiry.
    async fn increment(&self, key: &str, ttl_ms: u64) -> StoreResult<u64>;

    /// Checks that the backend answers.
    async fn health_check(&self) -> bool;
}
