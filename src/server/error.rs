//! Maps relay failures onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::query::QueryError;

/// Header carrying the caller's session cookie on query calls.
pub const AUTH_COOKIE_HEADER: &str = "auth-cookie";

/// Any failure a handler can return; each maps to exactly one status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Login or token flow failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Query run or save failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A query call arrived without the session cookie header.
    #[error(
        "missing Auth-Cookie header\n  Suggestion: Call POST /auth and send its authCookie value in the Auth-Cookie header"
    )]
    MissingAuthHeader,

    /// The request body could not be decoded.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    /// Status code this error is reported with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(AuthError::InvalidCredentials { .. } | AuthError::CaptchaRequired { .. })
            | Self::Query(QueryError::Upstream { .. } | QueryError::CaptchaRequired)
            | Self::MissingAuthHeader
            | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Query(QueryError::PollTimeout { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth(AuthError::Transport(_) | AuthError::Protocol(_))
            | Self::Query(QueryError::Transport(_) | QueryError::Protocol(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text placed in the `{"error": ...}` body.
    ///
    /// Upstream form errors are relayed as written; everything else uses the
    /// full `Display` text.
    #[must_use]
    pub fn response_message(&self) -> String {
        match self {
            Self::Auth(AuthError::InvalidCredentials { message }) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.response_message(),
        };
        (status, Json(body)).into_response()
    }
}
