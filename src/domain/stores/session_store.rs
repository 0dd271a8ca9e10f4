//! Session persistence contract.

use super::StoreResult;
use crate::domain::session::SessionData;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads session data, `Ok(None)` when the id is unknown or expired.
    async fn load(&self, id: &str) -> StoreResult<Option<SessionData>>;

    /// Persists session data and refreshes its lifetime.
    async fn save(&self, id: &str, data: &SessionData) -> StoreResult<()>;
}
