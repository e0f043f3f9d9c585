use crate::claim::error::TokenError;
use crate::claim::header::{SEGMENT_SEPARATOR, TokenHeader, decode_segment};
use crate::claim::key::SigningKey;
use crate::claim::payload::Claims;
use crate::clock::SharedClock;
use std::sync::Arc;

/// Verifies token signatures and expiry
///
/// Pure function of the token, the key and the clock. Never looks at the
/// catalog, so a token stays structurally valid after its catalog entry
/// disappears.
#[derive(Clone, Debug)]
pub struct TokenValidator {
    key: Arc<SigningKey>,
    clock: SharedClock,
}

impl TokenValidator {
    pub fn new(key: Arc<SigningKey>, clock: SharedClock) -> Self {
        Self { key, clock }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let segments = token.split(SEGMENT_SEPARATOR).collect::<Vec<_>>();
        let [header, claims, signature] = segments[..] else {
            return Err(TokenError::Malformed);
        };

        TokenHeader::from_segment(header)?;
        decode_segment(claims)?;
        let signature = decode_segment(signature)?;

        // signing input is the raw text of the first two segments
        let signed_len = header.len() + 1 + claims.len();
        if !self
            .key
            .verify(token[..signed_len].as_bytes(), &signature)
        {
            return Err(TokenError::BadSignature);
        }

        let claims = Claims::from_segment(claims)?;
        if claims.is_expired(self.clock.now_unix()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
