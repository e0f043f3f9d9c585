use crate::claim::error::TokenError;
use crate::claim::header::decode_segment;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Claims carried by an access token
///
/// Serialized with the registered JWT names so that standard HS256 tooling
/// can read the tokens.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "video_id")]
    pub resource_id: String,

    /// Issue time, unix seconds
    #[serde(rename = "iat")]
    pub issued_at: u64,

    /// Expiry time, unix seconds
    #[serde(rename = "exp")]
    pub expires_at: u64,
}

impl Claims {
    pub fn new(resource_id: impl Into<String>, issued_at: u64, ttl_secs: u64) -> Self {
        Self {
            resource_id: resource_id.into(),
            issued_at,
            expires_at: issued_at.saturating_add(ttl_secs),
        }
    }

    /// Expired once `now` is strictly past `expires_at`
    pub fn is_expired(&self, now_unix: u64) -> bool {
        now_unix > self.expires_at
    }

    pub fn to_segment(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_segment(segment: &str) -> Result<Self, TokenError> {
        let bytes = decode_segment(segment)?;
        let claims: Claims = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

        if claims.resource_id.is_empty() || claims.expires_at <= claims.issued_at {
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }
}
