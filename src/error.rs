//! Application error type and its uniform HTTP rejection payload.
//!
//! Every rejection produced by the service (pipeline or handler) is rendered as:
//!
//! ```json
//! { "statusCode": 429, "message": "Too many requests, please try again later", "error": "Too Many Requests", "retryAfter": 900 }
//! ```

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use validator::ValidationErrors;

/// Uniform rejection body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request payload failed DTO validation.
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// Presented CSRF token is absent or does not match the session token.
    #[error("Invalid CSRF token")]
    TokenMismatch,

    /// No session object on the request. The session layer must run upstream.
    #[error("Session is not available for this request")]
    SessionMissing,

    #[error("Too many requests, please try again later")]
    TooManyRequests { retry_after_secs: u64 },

    #[error("Request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("{message}")]
    Internal { message: String },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::TokenMismatch => StatusCode::FORBIDDEN,
            AppError::SessionMissing | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Short machine-readable reason, used as a log field and metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation",
            AppError::TokenMismatch => "csrf_mismatch",
            AppError::SessionMissing => "session_missing",
            AppError::TooManyRequests { .. } => "rate_limited",
            AppError::PayloadTooLarge { .. } => "payload_too_large",
            AppError::Internal { .. } => "internal",
        }
    }

    /// Builds the serializable body without consuming the error.
    pub fn to_body(&self) -> ErrorBody {
        let status = self.status();

        let (retry_after, details) = match self {
            AppError::TooManyRequests { retry_after_secs } => (Some(*retry_after_secs), Value::Null),
            AppError::Validation { details, .. } => (None, details.clone()),
            _ => (None, Value::Null),
        };

        ErrorBody {
            status_code: status.as_u16(),
            message: self.to_string(),
            error: status.canonical_reason().unwrap_or("Error"),
            retry_after,
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.to_body())).into_response();

        if let AppError::TooManyRequests { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }

        response
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let fields: serde_json::Map<String, Value> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), json!(messages))
            })
            .collect();

        AppError::bad_request("Validation failed", json!({ "fields": fields }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, Option<HeaderValue>, Value) {
        let response = err.into_response();
        let status = response.status();
        let retry = response.headers().get(header::RETRY_AFTER).cloned();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, retry, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_token_mismatch_shape() {
        let (status, retry, json) = body_json(AppError::TokenMismatch).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(retry.is_none());
        assert_eq!(json["statusCode"], 403);
        assert_eq!(json["message"], "Invalid CSRF token");
        assert_eq!(json["error"], "Forbidden");
        assert!(json.get("retryAfter").is_none());
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn test_too_many_requests_carries_retry_after() {
        let (status, retry, json) = body_json(AppError::TooManyRequests {
            retry_after_secs: 60,
        })
        .await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(retry.unwrap(), "60");
        assert_eq!(json["statusCode"], 429);
        assert_eq!(json["error"], "Too Many Requests");
        assert_eq!(json["retryAfter"], 60);
    }

    #[tokio::test]
    async fn test_session_missing_is_server_error() {
        let (status, _, json) = body_json(AppError::SessionMissing).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["statusCode"], 500);
        assert_eq!(json["error"], "Internal Server Error");
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(AppError::TokenMismatch.reason(), "csrf_mismatch");
        assert_eq!(AppError::SessionMissing.reason(), "session_missing");
        assert_eq!(
            AppError::TooManyRequests {
                retry_after_secs: 1
            }
            .reason(),
            "rate_limited"
        );
    }
}
