//! Ordered composition of the request defenses.
//!
//! For every inbound request: sanitize inputs, verify the CSRF token on
//! state-changing methods, then ask the rate limiter for admission. The first
//! rejection ends the chain.
//!
//! The HTTP plumbing (body buffering, URI rewriting, response headers) lives in
//! [`crate::api::middleware::defense`]; this type works on an already decoded
//! [`InboundRequest`].

use axum::http::{HeaderMap, Method};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::warn;

use super::csrf_guard::CsrfGuard;
use super::rate_limiter::{RateDecision, RateLimiter};
use super::sanitizer;
use crate::domain::session::Session;
use crate::error::AppError;

/// Decoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs in their original order.
    Form(Vec<(String, String)>),
    /// Anything else; passed through untouched.
    Opaque,
}

impl Payload {
    /// Object view used for the CSRF body-field lookup.
    pub fn as_value(&self) -> Option<Cow<'_, Value>> {
        match self {
            Payload::Json(value) => Some(Cow::Borrowed(value)),
            Payload::Form(pairs) => {
                let fields: Map<String, Value> = pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                Some(Cow::Owned(Value::Object(fields)))
            }
            Payload::Opaque => None,
        }
    }
}

/// Request parts the pipeline inspects and rewrites.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub headers: HeaderMap,
    /// Percent-decoded path segments.
    pub path_segments: Vec<String>,
    /// Decoded query pairs.
    pub query: Vec<(String, String)>,
    pub payload: Payload,
}

impl InboundRequest {
    /// Replaces every user-controlled string with its sanitized form.
    ///
    /// Query and form keys are kept as sent; only values are escaped.
    pub fn sanitize(&mut self) {
        for segment in &mut self.path_segments {
            if let Cow::Owned(clean) = sanitizer::sanitize_cow(segment) {
                *segment = clean;
            }
        }

        for (_, value) in &mut self.query {
            if let Cow::Owned(clean) = sanitizer::sanitize_cow(value) {
                *value = clean;
            }
        }

        match &mut self.payload {
            Payload::Json(value) => *value = sanitizer::sanitize(value),
            Payload::Form(pairs) => {
                for (_, value) in pairs.iter_mut() {
                    if let Cow::Owned(clean) = sanitizer::sanitize_cow(value) {
                        *value = clean;
                    }
                }
            }
            Payload::Opaque => {}
        }
    }
}

/// The global defense chain.
pub struct DefensePipeline {
    csrf: CsrfGuard,
    limiter: Arc<RateLimiter>,
}

impl DefensePipeline {
    pub fn new(csrf: CsrfGuard, limiter: Arc<RateLimiter>) -> Self {
        Self { csrf, limiter }
    }

    pub fn csrf(&self) -> &CsrfGuard {
        &self.csrf
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Runs the chain on `request`, sanitizing it in place.
    ///
    /// # Errors
    ///
    /// - [`AppError::SessionMissing`] / [`AppError::TokenMismatch`] from the CSRF stage
    /// - [`AppError::TooManyRequests`] from the rate-limit stage
    ///
    /// On error `request` has still been sanitized, but must not be handed on.
    pub async fn process(
        &self,
        request: &mut InboundRequest,
        session: Option<&Session>,
        identity: &str,
    ) -> Result<RateDecision, AppError> {
        request.sanitize();

        if !CsrfGuard::is_safe_method(&request.method) {
            let body = request.payload.as_value();
            self.csrf
                .guard(&request.method, &request.headers, body.as_deref(), session)
                .inspect_err(|e| {
                    warn!(method = %request.method, identity, reason = e.reason(), "CSRF check failed");
                })?;
        }

        self.limiter.check(identity).await
    }
}
