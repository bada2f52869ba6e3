//! API error taxonomy and response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::upstream::UpstreamError;

/// Everything a handler can fail with, mapped onto the HTTP surface.
///
/// Authentication failures deliberately collapse to one [`Unauthorized`]
/// response body regardless of cause; the distinct reasons are logged where
/// the failure happens, not leaked to the caller.
///
/// [`Unauthorized`]: ApiError::Unauthorized
#[derive(Debug)]
pub enum ApiError {
    /// Request body failed validation (422)
    Validation(String),
    /// Login with a bad username or password (401)
    InvalidCredentials,
    /// Missing, malformed, unknown, or expired session credential (401)
    Unauthorized,
    /// Client exceeded the request quota (429)
    RateLimited,
    /// Upstream call failed (502)
    Upstream(UpstreamError),
    /// Anything else (500); details stay in the logs
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            Self::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password")
            }
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded, try again later",
            ),
            Self::Upstream(err) => {
                let detail = match err {
                    UpstreamError::Unavailable(_) => "Upstream service unavailable",
                    UpstreamError::Status(_) => "Upstream service error",
                    UpstreamError::MalformedResponse => "Malformed upstream response",
                };
                (StatusCode::BAD_GATEWAY, detail)
            }
            Self::Internal(err) => {
                error!("Internal error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        Self::Upstream(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(ApiError::Validation("bad".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ApiError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(ApiError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(ApiError::Upstream(UpstreamError::Status(500))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ApiError::Internal(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
