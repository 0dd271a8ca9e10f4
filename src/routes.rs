//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /health`          - Health check: store and database (public)
//! - `GET  /api/csrf-token`  - CSRF token for the caller's session
//! - `POST /api/contact`     - Contact submission
//!
//! # Middleware
//!
//! Outermost first:
//!
//! 1. **Path normalization** - Trailing slash handling
//! 2. **Tracing** - Structured request/response logging
//! 3. **Session** - Cookie-backed session load and save
//! 4. **Defense** - Sanitization, CSRF verification, global rate limit
//!
//! Session and defense wrap the router as services rather than being added with
//! `Router::layer`, so the sanitized URI is what gets routed.

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::{defense, session, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Routes wrapped in the session and defense middleware.
///
/// This is the full application minus path normalization, and is what
/// integration tests drive.
pub fn defended_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::routes::api_routes(&state))
        .with_state(state.clone());

    let defended = middleware::from_fn_with_state(state.clone(), defense::layer).layer(router);
    let with_session = middleware::from_fn_with_state(state, session::layer).layer(defended);

    Router::new()
        .fallback_service(with_session)
        .layer(tracing::layer())
}

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(defended_router(state))
}
