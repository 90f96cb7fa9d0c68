use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::services::IdentityError;

/// User id resolved from the bearer token, available to handlers as a
/// request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing auth token".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid/Malformed auth token".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid/Malformed auth token".to_string()))
}

/// Reject requests without a verified bearer token, except on public paths.
///
/// Paths are compared after the `/api/v1` prefix has been stripped by nesting.
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let Some(identity) = state.identity.as_ref() else {
        return Ok(next.run(req).await);
    };

    let path = req.uri().path();
    if state.config.auth_public_paths.iter().any(|p| p == path) {
        return Ok(next.run(req).await);
    }

    let user_id = {
        let token = bearer_token(req.headers())?.to_string();
        identity.verify(&token).await.map_err(|e| match e {
            IdentityError::Rejected(_) => AppError::Unauthorized(e.to_string()),
            IdentityError::Unavailable(msg) => AppError::IdentityUnavailable(msg),
        })?
    };

    tracing::debug!(%user_id, "Request authenticated");
    req.extensions_mut().insert(AuthenticatedUser(user_id));
    Ok(next.run(req).await)
}

/// Legacy status policy: every failure other than 401 is reported as 500.
/// The JSON message body is left untouched.
pub async fn flatten_error_status(mut response: Response) -> Response {
    let status = response.status();
    if (status.is_client_error() || status.is_server_error()) && status != StatusCode::UNAUTHORIZED
    {
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    }
    response
}
