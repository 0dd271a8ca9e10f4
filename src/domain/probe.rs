//! Liveness probe contract for the backing database.

use async_trait::async_trait;

/// Checks that a backing dependency answers a trivial query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    /// Returns `Ok(())` when the dependency is reachable, or a human-readable error.
    async fn ping(&self) -> Result<(), String>;
}
