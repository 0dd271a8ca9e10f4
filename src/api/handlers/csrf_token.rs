//! Handler for the CSRF token endpoint.

use axum::{Extension, Json, extract::State};

use crate::api::dto::csrf::CsrfTokenResponse;
use crate::domain::session::Session;
use crate::error::AppError;
use crate::state::AppState;

/// Returns the caller's CSRF token, issuing one on first use.
///
/// # Endpoint
///
/// `GET /api/csrf-token`
///
/// The token is stable for the lifetime of the session; clients may fetch it
/// once and reuse it on every state-changing request.
///
/// # Response
///
/// ```json
/// { "csrfToken": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08" }
/// ```
///
/// # Errors
///
/// Returns 500 if the session middleware is not installed.
pub async fn csrf_token_handler(
    State(state): State<AppState>,
    session: Option<Extension<Session>>,
) -> Result<Json<CsrfTokenResponse>, AppError> {
    let csrf_token = state
        .csrf()
        .get_token(session.as_ref().map(|Extension(s)| s))?;

    Ok(Json(CsrfTokenResponse { csrf_token }))
}
