//! Contracts for the external stores the pipeline depends on.
//!
//! - [`CounterStore`] - shared counters with atomic increment and expiry
//! - [`SessionStore`] - per-session data keyed by session id
//!
//! Implementations live in [`crate::infrastructure::store`].

pub mod counter_store;
pub mod session_store;

pub use counter_store::CounterStore;
pub use session_store::SessionStore;

#[cfg(test)]
pub use counter_store::MockCounterStore;
#[cfg(test)]
pub use session_store::MockSessionStore;

/// Errors raised by store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store operation error: {0}")]
    Operation(String),

    #[error("store operation timed out after {0}ms")]
    Timeout(u64),
}

pub type StoreResult<T> = Result<T, StoreError>;
