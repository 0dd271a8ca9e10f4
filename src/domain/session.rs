//! Per-request session handle.
//!
//! A [`Session`] is created by the session layer (see
//! [`crate::api::middleware::session`]) and placed into request extensions.
//! Downstream code reads and writes its [`SessionData`] through the handle; the
//! session layer persists the data after the response is produced if it changed.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Serialized session contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
}

/// Cloneable handle to one session's data.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    is_new: bool,
    data: Arc<Mutex<SessionData>>,
}

impl Session {
    /// Wraps data loaded from the session store.
    pub fn existing(id: impl Into<String>, data: SessionData) -> Self {
        Self {
            id: id.into(),
            is_new: false,
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Starts an empty session that has not been persisted yet.
    pub fn fresh(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_new: true,
            data: Arc::new(Mutex::new(SessionData::default())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn csrf_token(&self) -> Option<String> {
        self.lock().csrf_token.clone()
    }

    /// Returns the stored token, or stores and returns the one produced by `issue`.
    ///
    /// The check and the write happen under one lock, so a token is never replaced.
    pub fn csrf_token_or_insert_with(&self, issue: impl FnOnce() -> String) -> String {
        self.lock().csrf_token.get_or_insert_with(issue).clone()
    }

    /// Copy of the current data, used by the session layer to detect changes.
    pub fn snapshot(&self) -> SessionData {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SessionData> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }
}
