//! HTTP middleware for request processing and protection.
//!
//! - [`session`] - Cookie-backed session loading and persistence
//! - [`defense`] - Sanitization, CSRF and rate limiting for every request
//! - [`rate_limit`] - Per-route limiter and `X-RateLimit-*` headers
//! - [`tracing`] - Request spans and response logging

pub mod defense;
pub mod rate_limit;
pub mod session;
pub mod tracing;
