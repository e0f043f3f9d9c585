use crate::AppState;
use crate::api::delivery::{DeliveryError, deliver};
use crate::gate::Authorized;
use axum::body::Body;
use axum::extract::{Extension, Query};
use axum::http::{Response, StatusCode};
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

#[derive(Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct GetTokenParams {
    pub video_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetTokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// Optional: when given, must name the video the token was issued for
    pub video_id: Option<String>,
}

pub async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: "Secure Video Backend Ready".into(),
    })
}

pub async fn get_token(
    Extension(state): Extension<AppState>,
    Query(params): Query<GetTokenParams>,
) -> Result<Json<GetTokenResponse>, Response<Body>> {
    let Some(video_id) = params.video_id.filter(|id| !id.is_empty()) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Missing video_id" })),
        )
            .into_response());
    };

    match state.issuer.issue(&video_id) {
        Ok(token) => Ok(Json(GetTokenResponse {
            token: token.into_string(),
        })),
        Err(err) => {
            warn!(%video_id, error = %err, "Token not issued");
            Err(err.into_response())
        }
    }
}

#[axum::debug_handler]
pub async fn stream(
    Extension(state): Extension<AppState>,
    Authorized(claims): Authorized,
    Query(params): Query<StreamParams>,
) -> Result<Response<Body>, DeliveryError> {
    deliver(&state, &claims, params.video_id.as_deref()).await
}
