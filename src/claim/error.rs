use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Token validation failures
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Token signature mismatch")]
    BadSignature,

    #[error("Token has expired")]
    Expired,
}

impl TokenError {
    /// Client-facing message
    pub fn detail(&self) -> &'static str {
        match self {
            TokenError::Malformed => "Invalid token",
            TokenError::BadSignature => "Invalid token signature",
            TokenError::Expired => "Token expired",
        }
    }

    pub fn to_err_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        (self.to_err_code(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}

/// Token issuance failures
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum IssueError {
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Failed to encode token: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for IssueError {
    fn from(error: serde_json::Error) -> Self {
        IssueError::Encoding(error.to_string())
    }
}

impl IntoResponse for IssueError {
    fn into_response(self) -> Response {
        match self {
            IssueError::UnknownResource(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "Video not found" })),
            )
                .into_response(),
            IssueError::Encoding(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "Failed to issue token" })),
            )
                .into_response(),
        }
    }
}
