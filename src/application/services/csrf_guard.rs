//! CSRF protection with per-session double-submit tokens.
//!
//! Each session holds at most one token for its whole lifetime. State-changing
//! requests must echo it back in the `x-csrf-token` header (or the `_csrf` body
//! field for plain HTML forms).

use axum::http::{HeaderMap, HeaderName, Method};
use serde_json::Value;

use crate::domain::session::Session;
use crate::error::AppError;
use crate::utils::token::{CSRF_TOKEN_BYTES, generate_hex_token};

/// Default request header carrying the token.
pub const DEFAULT_CSRF_HEADER: &str = "x-csrf-token";

/// Body field checked when the header is absent.
pub const CSRF_BODY_FIELD: &str = "_csrf";

/// Issues and verifies CSRF tokens stored on the caller's [`Session`].
///
/// Holds no state of its own; all token state lives on the session.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    header_name: HeaderName,
}

impl Default for CsrfGuard {
    fn default() -> Self {
        Self::new(HeaderName::from_static(DEFAULT_CSRF_HEADER))
    }
}

impl CsrfGuard {
    pub fn new(header_name: HeaderName) -> Self {
        Self { header_name }
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Read-only verbs that never need a token.
    pub fn is_safe_method(method: &Method) -> bool {
        matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    /// Returns the session's token, issuing one first if it has none.
    ///
    /// Idempotent: a token, once issued, is returned unchanged on every call.
    pub fn ensure_token(&self, session: &Session) -> String {
        session.csrf_token_or_insert_with(|| {
            tracing::debug!(session = session.id(), "issuing CSRF token");
            generate_hex_token(CSRF_TOKEN_BYTES)
        })
    }

    /// Token accessor behind the token-fetch endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SessionMissing`] if the request carries no session at all.
    pub fn get_token(&self, session: Option<&Session>) -> Result<String, AppError> {
        let session = session.ok_or(AppError::SessionMissing)?;
        Ok(self.ensure_token(session))
    }

    /// Verifies a request.
    ///
    /// # Flow
    ///
    /// 1. Safe methods pass unconditionally
    /// 2. A missing session is a server misconfiguration
    /// 3. The session gets a token if it has none, even when the request is then
    ///    rejected, so the client can fetch it and retry
    /// 4. The presented token (header first, then body field) must equal the stored one
    ///
    /// # Errors
    ///
    /// - [`AppError::SessionMissing`] when `session` is `None` on a state-changing request
    /// - [`AppError::TokenMismatch`] when the presented token is absent or different
    pub fn guard(
        &self,
        method: &Method,
        headers: &HeaderMap,
        body: Option<&Value>,
        session: Option<&Session>,
    ) -> Result<(), AppError> {
        if Self::is_safe_method(method) {
            return Ok(());
        }

        let session = session.ok_or(AppError::SessionMissing)?;
        let expected = self.ensure_token(session);

        match self.presented_token(headers, body) {
            Some(presented) if tokens_match(presented.as_bytes(), expected.as_bytes()) => Ok(()),
            _ => Err(AppError::TokenMismatch),
        }
    }

    fn presented_token<'a>(&self, headers: &'a HeaderMap, body: Option<&'a Value>) -> Option<&'a str> {
        if let Some(value) = headers.get(&self.header_name) {
            return value.to_str().ok();
        }

        body.and_then(|b| b.get(CSRF_BODY_FIELD))
            .and_then(Value::as_str)
    }
}

/// Byte-for-byte comparison that does not stop at the first difference.
fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.len() == expected.len()
        && presented
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
