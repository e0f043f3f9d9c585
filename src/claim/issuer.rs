use crate::catalog::SharedRegistry;
use crate::claim::error::IssueError;
use crate::claim::header::{SEGMENT_SEPARATOR, TokenHeader};
use crate::claim::key::SigningKey;
use crate::claim::payload::Claims;
use crate::clock::SharedClock;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Signed bearer credential handed to clients
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mints tokens for resources known to the catalog
#[derive(Clone, Debug)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    registry: SharedRegistry,
    clock: SharedClock,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        key: Arc<SigningKey>,
        registry: SharedRegistry,
        clock: SharedClock,
        ttl: Duration,
    ) -> Self {
        Self {
            key,
            registry,
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, resource_id: &str) -> Result<AccessToken, IssueError> {
        if !self.registry.contains(resource_id) {
            return Err(IssueError::UnknownResource(resource_id.to_string()));
        }

        let claims = Claims::new(resource_id, self.clock.now_unix(), self.ttl.as_secs());
        let token = self.sign(&claims)?;

        info!(
            video_id = resource_id,
            expires_at = claims.expires_at,
            "Issued access token"
        );
        Ok(token)
    }

    /// Sign arbitrary claims without consulting the catalog
    pub(crate) fn sign(&self, claims: &Claims) -> Result<AccessToken, IssueError> {
        let signing_input = format!(
            "{}{SEGMENT_SEPARATOR}{}",
            TokenHeader::default().to_segment()?,
            claims.to_segment()?
        );
        let signature = URL_SAFE_NO_PAD.encode(self.key.sign(signing_input.as_bytes()));

        Ok(AccessToken(format!(
            "{signing_input}{SEGMENT_SEPARATOR}{signature}"
        )))
    }
}
