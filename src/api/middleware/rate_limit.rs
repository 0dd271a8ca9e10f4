//! Fixed-window rate limiting middleware and response headers.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::application::services::{RateDecision, RateLimiter};
use crate::domain::identity::{AuthenticatedUser, rate_limit_identity};
use crate::error::AppError;
use crate::utils::client_ip::client_ip;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// State for a per-route limiter.
#[derive(Clone)]
pub struct RouteLimit {
    pub limiter: Arc<RateLimiter>,
    pub behind_proxy: bool,
}

/// Applies an extra limiter to a single route.
///
/// The global pipeline already limits every request; this layer adds a
/// separately counted budget (see [`crate::application::services::RateLimitPolicy::scoped`])
/// for sensitive endpoints.
///
/// # Example
///
/// ```rust,ignore
/// let limit = RouteLimit { limiter: Arc::new(contact_limiter), behind_proxy };
///
/// Router::new().route(
///     "/contact",
///     post(contact_handler).route_layer(middleware::from_fn_with_state(limit, rate_limit::layer)),
/// );
/// ```
///
/// # Errors
///
/// Returns `429 Too Many Requests` with a `Retry-After` header when the budget is spent.
pub async fn layer(
    State(limit): State<RouteLimit>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = request_identity(&req, limit.behind_proxy);

    let decision = limit.limiter.check(&identity).await.inspect_err(|e| {
        metrics::counter!("defense_rejections_total", "reason" => e.reason()).increment(1);
    })?;

    let mut response = next.run(req).await;
    apply_headers(response.headers_mut(), &decision);
    Ok(response)
}

/// Identity for rate limiting: authenticated user, else client IP.
pub fn request_identity(req: &Request, behind_proxy: bool) -> String {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip = client_ip(req.headers(), peer, behind_proxy);

    rate_limit_identity(req.extensions().get::<AuthenticatedUser>(), ip)
}

/// Writes `X-RateLimit-*` headers for an admitted request.
///
/// A degraded decision writes nothing. When an inner limiter already set the
/// headers, its (tighter, more specific) values are kept.
pub fn apply_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    let RateDecision::Admit {
        limit,
        remaining,
        reset_at,
    } = decision
    else {
        return;
    };

    if headers.contains_key(X_RATELIMIT_LIMIT) {
        return;
    }

    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(*limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(*remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_at.timestamp()));
}
