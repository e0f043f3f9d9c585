use crate::AppState;
use crate::catalog::VideoKind;
use crate::claim::Claims;
use axum::Json;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Response, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, warn};

pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

const X_VIDEO_ID: HeaderName = HeaderName::from_static("x-video-id");
const X_TOKEN_VALID: HeaderName = HeaderName::from_static("x-token-valid");

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Video {0} is not in the catalog")]
    UnknownResource(String),

    #[error("Manifest missing at {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Token for {claimed} presented for {requested}")]
    ResourceMismatch { claimed: String, requested: String },

    #[error("Invalid delivery location for {0}")]
    InvalidLocation(String),

    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for DeliveryError {
    fn into_response(self) -> axum::response::Response {
        let (status, detail) = match &self {
            DeliveryError::UnknownResource(_) => (StatusCode::NOT_FOUND, "Video not found"),
            DeliveryError::FileNotFound(_) => (StatusCode::NOT_FOUND, "Video file not found"),
            DeliveryError::ResourceMismatch { .. } => {
                (StatusCode::FORBIDDEN, "Token not valid for this video")
            }
            DeliveryError::InvalidLocation(_) | DeliveryError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Error serving video")
            }
        };

        if status.is_server_error() {
            error!(error = %self, "Error serving video");
        } else {
            warn!(error = %self, "Video delivery refused");
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Resolve the claimed resource and build its response
///
/// The resource always comes from the claims. `requested` is the optional
/// `video_id` the client named; when present it must agree with the claim.
pub async fn deliver(
    state: &AppState,
    claims: &Claims,
    requested: Option<&str>,
) -> Result<Response<Body>, DeliveryError> {
    let video_id = claims.resource_id.as_str();

    if let Some(requested) = requested
        && requested != video_id
    {
        return Err(DeliveryError::ResourceMismatch {
            claimed: video_id.to_string(),
            requested: requested.to_string(),
        });
    }

    let descriptor = state
        .catalog
        .get(video_id)
        .ok_or_else(|| DeliveryError::UnknownResource(video_id.to_string()))?;

    let id_header = HeaderValue::from_str(video_id)
        .map_err(|_| DeliveryError::InvalidLocation(video_id.to_string()))?;

    match descriptor.kind {
        VideoKind::Manifest => {
            let path = state.media_dir().join(&descriptor.location);
            debug!(video_id, ?path, "Reading manifest");

            let body = tokio::fs::read(&path).await.map_err(|error| {
                if error.kind() == ErrorKind::NotFound {
                    DeliveryError::FileNotFound(path.clone())
                } else {
                    DeliveryError::Io(error)
                }
            })?;

            let mut res = Response::new(Body::from(body));
            let headers = res.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(HLS_CONTENT_TYPE),
            );
            headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );
            headers.insert(X_VIDEO_ID, id_header);
            headers.insert(X_TOKEN_VALID, HeaderValue::from_static("true"));
            Ok(res)
        }
        VideoKind::ExternalEmbed => {
            let location = HeaderValue::from_str(&descriptor.location)
                .map_err(|_| DeliveryError::InvalidLocation(video_id.to_string()))?;
            debug!(video_id, location = %descriptor.location, "Redirecting to external embed");

            let mut res = Response::new(Body::empty());
            *res.status_mut() = StatusCode::TEMPORARY_REDIRECT;
            let headers = res.headers_mut();
            headers.insert(header::LOCATION, location);
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(X_VIDEO_ID, id_header);
            headers.insert(X_TOKEN_VALID, HeaderValue::from_static("true"));
            Ok(res)
        }
    }
}
