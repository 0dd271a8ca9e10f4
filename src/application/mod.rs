//! Application layer: the request-defense services.
//!
//! Services consume the store and clock contracts from [`crate::domain`] and
//! expose an HTTP-agnostic API to the middleware layer.
//!
//! # Available Services
//!
//! - [`services::sanitizer`] - Recursive payload sanitization
//! - [`services::csrf_guard::CsrfGuard`] - Per-session CSRF tokens
//! - [`services::rate_limiter::RateLimiter`] - Fixed-window rate limiting, fail-open
//! - [`services::defense_pipeline::DefensePipeline`] - Ordered composition of the three

pub mod services;
