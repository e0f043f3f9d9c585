use crate::claim::error::TokenError;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

// Token layout: header "." claims "." signature, each base64url without padding
pub(crate) const SEGMENT_SEPARATOR: char = '.';

pub(crate) const ALG_HS256: &str = "HS256";
pub(crate) const TYP_JWT: &str = "JWT";

/// Plaintext header segment
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: ALG_HS256.to_string(),
            typ: Some(TYP_JWT.to_string()),
        }
    }
}

impl TokenHeader {
    pub fn to_segment(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_segment(segment: &str) -> Result<Self, TokenError> {
        let bytes = decode_segment(segment)?;
        let header: TokenHeader =
            serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

        if header.alg != ALG_HS256 {
            return Err(TokenError::Malformed);
        }

        Ok(header)
    }
}

pub(crate) fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    if segment.is_empty() {
        return Err(TokenError::Malformed);
    }
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)
}
