use axum::{
    body::to_bytes,
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ValidationError;
use crate::repository::{BulkFailure, ItemFailure, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Persistence error: {0}")]
    Persistence(RepositoryError),

    #[error("{0}")]
    PartialFailure(#[from] BulkFailure),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Identity service unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            // Lost a registration race: the unique index caught the duplicate.
            RepositoryError::Duplicate { ref key, .. } => {
                Self::Conflict(format!("Device with serial number '{key}' already registered"))
            }
            other => Self::Persistence(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge(rejection.body_text());
        }
        Self::BadRequest(format!("error while decoding request body: {}", rejection.body_text()))
    }
}

/// JSON body of every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    /// Present only for partially failed bulk ingestion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<ItemFailure>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            Self::Persistence(e) => {
                tracing::error!("Persistence error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            Self::PartialFailure(e) => {
                tracing::warn!(failed = e.failures.len(), "Bulk ingestion partially failed");
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::IdentityUnavailable(msg) => {
                tracing::error!("Identity service error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "Identity service unavailable".to_string(),
                )
            }
            Self::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let failures = match self {
            Self::PartialFailure(e) => Some(e.failures),
            _ => None,
        };

        (status, Json(ErrorResponse { message, failures })).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Largest error body carried over into the rewritten message.
const ENVELOPE_BODY_LIMIT: usize = 64 * 1024;

/// Wrap error responses produced outside the handlers (body limit, rate
/// limiter, routing) in the same JSON body as `AppError`.
///
/// Status and headers such as `retry-after` are preserved.
pub async fn json_error_envelope(response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json || !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let message = to_bytes(body, ENVELOPE_BODY_LIMIT)
        .await
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    let body = Json(ErrorResponse {
        message,
        failures: None,
    })
    .into_response()
    .into_body();

    Response::from_parts(parts, body)
}
