//! API route configuration.
//!
//! Every route sits behind the global defense pipeline installed in
//! [`crate::routes::defended_router`]; routes here only add what is specific
//! to them.

use crate::api::handlers::{contact_handler, csrf_token_handler};
use crate::api::middleware::rate_limit::{self, RouteLimit};
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// API routes, mounted under `/api`.
///
/// # Endpoints
///
/// - `GET  /csrf-token` - Issue or return the session's CSRF token
/// - `POST /contact`    - Contact form submission (extra per-route rate limit)
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let contact_limit = RouteLimit {
        limiter: state.contact_limiter.clone(),
        behind_proxy: state.settings.behind_proxy,
    };

    Router::new()
        .route("/csrf-token", get(csrf_token_handler))
        .route(
            "/contact",
            post(contact_handler).route_layer(middleware::from_fn_with_state(
                contact_limit,
                rate_limit::layer,
            )),
        )
}
