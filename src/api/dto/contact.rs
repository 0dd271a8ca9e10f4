//! DTOs for the contact submission endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Contact form submission.
///
/// String fields arrive already sanitized by the defense middleware, so the
/// length limits apply to the escaped text.
#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 5000, message = "Message must be 1-5000 characters"))]
    pub message: String,
}

/// Echo of an accepted submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub name: String,
    pub email: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

impl ContactResponse {
    pub fn accepted(req: ContactRequest, received_at: DateTime<Utc>) -> Self {
        Self {
            name: req.name,
            email: req.email,
            message: req.message,
            received_at,
        }
    }
}
