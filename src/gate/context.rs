use crate::claim::{Claims, TokenError};
use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Per-request outcome of the access gate, stored in request extensions
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Access {
    Exempt,
    Authorized(Claims),
}

impl Access {
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Access::Exempt => None,
            Access::Authorized(claims) => Some(claims),
        }
    }
}

/// Reasons the gate refuses a request
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum GateError {
    #[error("No token provided")]
    MissingToken,

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl GateError {
    pub fn detail(&self) -> &'static str {
        match self {
            GateError::MissingToken => "No token provided",
            GateError::Token(err) => err.detail(),
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": self.detail() })),
        )
            .into_response()
    }
}

/// Extractor for handlers that must only run behind a validated token
#[derive(Debug, Clone)]
pub struct Authorized(pub Claims);

impl<S> FromRequestParts<S> for Authorized
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Access>() {
            Some(Access::Authorized(claims)) => Ok(Authorized(claims.clone())),
            _ => Err(GateError::MissingToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_authorized_extractor() {
        let claims = Claims::new("sample1", 1000, 60);
        let (mut parts, _) = Request::builder()
            .uri("/stream")
            .extension(Access::Authorized(claims.clone()))
            .body(())
            .unwrap()
            .into_parts();

        let Authorized(extracted) = Authorized::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(extracted, claims);
    }

    #[tokio::test]
    async fn test_exempt_context_is_rejected() {
        let (mut parts, _) = Request::builder()
            .uri("/stream")
            .extension(Access::Exempt)
            .body(())
            .unwrap()
            .into_parts();

        let err = Authorized::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err, GateError::MissingToken);

        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert!(Authorized::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[test]
    fn test_gate_error_details() {
        assert_eq!(GateError::MissingToken.detail(), "No token provided");
        assert_eq!(
            GateError::from(TokenError::Expired).detail(),
            "Token expired"
        );
    }
}
