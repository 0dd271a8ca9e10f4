//! # Request Shield
//!
//! An Axum service that runs every inbound request through a fixed defense
//! pipeline before it reaches a handler.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - Sessions, identities, clocks and store traits
//! - **Application Layer** ([`application`]) - Sanitizer, CSRF guard, rate limiter, pipeline
//! - **Infrastructure Layer** ([`infrastructure`]) - Redis and in-memory stores, PostgreSQL probe
//! - **API Layer** ([`api`]) - Handlers, DTOs and middleware
//!
//! ## Pipeline
//!
//! 1. Sanitize path segments, query values and JSON/form bodies
//! 2. Verify the session's CSRF token on state-changing methods
//! 3. Admit the request against a fixed-window rate limit shared through Redis
//!
//! The first failing stage answers with a uniform JSON error
//! (see [`error::AppError`]).
//!
//! ## Quick Start
//!
//! ```bash
//! export REDIS_URL="redis://localhost:6379"  # Optional, in-memory otherwise
//! cargo run
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::services::{
        CsrfGuard, DefensePipeline, RateDecision, RateLimitPolicy, RateLimiter,
    };
    pub use crate::domain::clock::{Clock, ManualClock, SystemClock};
    pub use crate::domain::session::{Session, SessionData};
    pub use crate::error::AppError;
    pub use crate::state::{AppState, HttpSettings};
}
