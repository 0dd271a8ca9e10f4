//! Request-defense services.

pub mod csrf_guard;
pub mod defense_pipeline;
pub mod rate_limiter;
pub mod sanitizer;

pub use csrf_guard::CsrfGuard;
pub use defense_pipeline::{DefensePipeline, InboundRequest, Payload};
pub use rate_limiter::{RateDecision, RateLimitPolicy, RateLimiter};
