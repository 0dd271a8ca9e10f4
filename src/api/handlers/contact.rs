//! Handler for the contact submission endpoint.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
};
use chrono::Utc;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::api::dto::contact::{ContactRequest, ContactResponse};
use crate::error::AppError;

/// Accepts a contact form submission.
///
/// # Endpoint
///
/// `POST /api/contact`
///
/// Requires a valid CSRF token and is subject to both the global and a
/// stricter per-route rate limit.
///
/// # Request Body
///
/// ```json
/// { "name": "Ada", "email": "ada@example.com", "message": "Hello" }
/// ```
///
/// # Response
///
/// `201 Created` with the sanitized submission:
///
/// ```json
/// {
///   "name": "Ada",
///   "email": "ada@example.com",
///   "message": "Hello",
///   "receivedAt": "2026-01-01T00:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request for a malformed body or failed validation.
pub async fn contact_handler(
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    let Json(payload) = payload
        .map_err(|e| AppError::bad_request("Invalid request body", json!({ "body": e.body_text() })))?;

    payload.validate()?;

    info!(email = %payload.email, "contact submission accepted");

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse::accepted(payload, Utc::now())),
    ))
}
