//! Shared application state injected into handlers and middleware.

use std::sync::Arc;

use crate::application::services::{CsrfGuard, DefensePipeline, RateLimiter};
use crate::domain::probe::DatabaseProbe;
use crate::domain::stores::{CounterStore, SessionStore};

/// Per-request HTTP settings taken from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub session_cookie: String,
    pub session_ttl_seconds: u64,
    pub max_body_bytes: usize,
    pub behind_proxy: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            session_cookie: "sid".to_string(),
            session_ttl_seconds: 86_400,
            max_body_bytes: 1024 * 1024,
            behind_proxy: false,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DefensePipeline>,
    /// Stricter, separately counted limiter for `POST /api/contact`.
    pub contact_limiter: Arc<RateLimiter>,
    pub counter_store: Arc<dyn CounterStore>,
    pub session_store: Arc<dyn SessionStore>,
    /// `None` when no database is configured.
    pub database: Option<Arc<dyn DatabaseProbe>>,
    pub settings: Arc<HttpSettings>,
}

impl AppState {
    pub fn csrf(&self) -> &CsrfGuard {
        self.pipeline.csrf()
    }
}
