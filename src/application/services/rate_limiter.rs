//! Fixed-window rate limiting against a shared counter store.
//!
//! The limiter keeps no local state. Counters live in the [`CounterStore`] under
//! `rate-limit:<identity>` (or `rate-limit:<scope>:<identity>` for a per-route
//! policy), so any number of instances can share one limit.
//!
//! Store failures and timeouts fail open: the request is admitted without
//! rate-limit headers and the failure is logged.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use crate::domain::clock::Clock;
use crate::domain::stores::{CounterStore, StoreError, StoreResult};
use crate::error::AppError;

/// Default window length: 15 minutes.
pub const DEFAULT_WINDOW_MS: u64 = 900_000;

/// Default request budget per window.
pub const DEFAULT_MAX_REQUESTS: u64 = 100;

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

/// Limit configuration, fixed when the limiter is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window_ms: u64,
    pub max_requests: u64,
    /// Optional namespace for per-route limiters, so they count separately
    /// from the global policy.
    pub scope: Option<String>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_requests: DEFAULT_MAX_REQUESTS,
            scope: None,
        }
    }
}

impl RateLimitPolicy {
    pub fn new(window_ms: u64, max_requests: u64) -> Self {
        Self {
            window_ms,
            max_requests,
            scope: None,
        }
    }

    pub fn scoped(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Store key for an identity.
    pub fn key(&self, identity: &str) -> String {
        match &self.scope {
            Some(scope) => format!("rate-limit:{}:{}", scope, identity),
            None => format!("rate-limit:{}", identity),
        }
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window_ms / 1000
    }
}

/// Outcome of an admitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    /// Counted against the window. Values populate the `X-RateLimit-*` headers.
    Admit {
        limit: u64,
        remaining: u64,
        reset_at: DateTime<Utc>,
    },
    /// The store could not be consulted; admitted without header guarantees.
    AdmitDegraded,
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    policy: RateLimitPolicy,
    store_timeout: Duration,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Overrides the per-call store timeout. A timed out call is handled like a store failure.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Admission decision for one request from `identity`.
    ///
    /// # Flow
    ///
    /// 1. Read the identity's counter (missing reads as zero)
    /// 2. At or above the limit: reject without counting the request
    /// 3. Otherwise increment atomically, setting the window expiry on the first hit
    ///
    /// # Errors
    ///
    /// Returns [`AppError::TooManyRequests`] when the window's budget is spent.
    /// Store errors never surface; they yield [`RateDecision::AdmitDegraded`].
    pub async fn check(&self, identity: &str) -> Result<RateDecision, AppError> {
        let key = self.policy.key(identity);

        let current = match self.bounded(self.store.get(&key)).await {
            Ok(current) => current,
            Err(e) => return Ok(self.degrade(&key, e)),
        };

        if current >= self.policy.max_requests {
            warn!(key = %key, current, limit = self.policy.max_requests, "rate limit exceeded");
            return Err(AppError::TooManyRequests {
                retry_after_secs: self.policy.retry_after_secs(),
            });
        }

        let counted = match self
            .bounded(self.store.increment(&key, self.policy.window_ms))
            .await
        {
            Ok(counted) => counted,
            Err(e) => return Ok(self.degrade(&key, e)),
        };

        let window = ChronoDuration::milliseconds(
            i64::try_from(self.policy.window_ms).unwrap_or(i64::MAX),
        );

        // `counted` already includes this request; with no concurrent writers it
        // equals `current + 1`.
        Ok(RateDecision::Admit {
            limit: self.policy.max_requests,
            remaining: self.policy.max_requests.saturating_sub(counted),
            reset_at: self.clock.now() + window,
        })
    }

    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout.as_millis() as u64))?
    }

    fn degrade(&self, key: &str, err: StoreError) -> RateDecision {
        error!(key, error = %err, "rate limit store unavailable, admitting request");
        metrics::counter!("rate_limit_degraded_total").increment(1);
        RateDecision::AdmitDegraded
    }
}
