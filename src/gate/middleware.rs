use crate::claim::TokenValidator;
use crate::gate::context::{Access, GateError};
use crate::gate::policy::{ExemptionPolicy, ExemptionScope};
use axum::extract::{OriginalUri, Query, Request, State};
use axum::http::{HeaderMap, Uri, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Gate state shared by every request
#[derive(Clone, Debug)]
pub struct AccessGate {
    policy: Arc<ExemptionPolicy>,
    validator: TokenValidator,
}

impl AccessGate {
    pub fn new(policy: ExemptionPolicy, validator: TokenValidator) -> Self {
        Self {
            policy: Arc::new(policy),
            validator,
        }
    }

    pub fn policy(&self) -> &ExemptionPolicy {
        &self.policy
    }

    /// Decide whether a request may reach its handler
    pub fn decide(&self, uri: &Uri, headers: &HeaderMap) -> Result<Access, GateError> {
        let path = uri.path();
        let rule = self.policy.classify(path);

        if let Some(rule) = rule
            && rule.scope == ExemptionScope::Always
        {
            debug!(path, rationale = %rule.rationale, "Exempt path");
            return Ok(Access::Exempt);
        }

        let Some(token) = extract_token(uri, headers) else {
            if let Some(rule) = rule {
                debug!(path, rationale = %rule.rationale, "Serving public path without token");
                return Ok(Access::Exempt);
            }
            return Err(GateError::MissingToken);
        };

        let claims = self.validator.validate(&token)?;
        info!(
            video_id = %claims.resource_id,
            expires_at = claims.expires_at,
            "Token valid"
        );
        Ok(Access::Authorized(claims))
    }
}

/// Authorization header first (optional `Bearer ` marker), then `?token=`
pub(crate) fn extract_token(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|value| {
            let value = value.trim();
            match value.strip_prefix("Bearer") {
                Some(rest) if rest.is_empty() || rest.starts_with(' ') => rest.trim(),
                _ => value,
            }
        })
        .filter(|token| !token.is_empty());

    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.token)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Middleware running [`AccessGate::decide`] in front of every handler
///
/// Decides on the URI as the client sent it, before any nested router
/// stripped its prefix.
pub async fn access_gate(State(gate): State<AccessGate>, mut req: Request, next: Next) -> Response {
    let uri = match req.extensions().get::<OriginalUri>() {
        Some(OriginalUri(original)) => original.clone(),
        None => req.uri().clone(),
    };

    let access = match gate.decide(&uri, req.headers()) {
        Ok(access) => access,
        Err(err) => {
            warn!(
                method = %req.method(),
                path = uri.path(),
                reason = %err,
                "Request rejected"
            );
            return err.into_response();
        }
    };

    req.extensions_mut().insert(access);

    let start = Instant::now();
    let response = next.run(req).await;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        status = %response.status(),
        "Request processed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StaticCatalog, default_videos};
    use crate::claim::{KeyMaterial, SigningKey, TokenError, TokenIssuer};
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn setup(clock: Arc<ManualClock>) -> (TokenIssuer, AccessGate) {
        let key = Arc::new(SigningKey::new(&KeyMaterial::from([3u8; 32])).unwrap());
        let issuer = TokenIssuer::new(
            key.clone(),
            Arc::new(StaticCatalog::from_entries(&default_videos())),
            clock.clone(),
            Duration::from_secs(3600),
        );
        let gate = AccessGate::new(
            ExemptionPolicy::default(),
            TokenValidator::new(key, clock),
        );
        (issuer, gate)
    }

    fn headers(auth: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(auth) = auth {
            headers.insert(header::AUTHORIZATION, auth.parse().unwrap());
        }
        headers
    }

    #[test]
    fn test_exempt_paths_skip_validation() {
        let (_, gate) = setup(Arc::new(ManualClock::new(1000)));

        for path in ["/", "/get-token?video_id=sample1"] {
            let uri: Uri = path.parse().unwrap();
            assert_eq!(gate.decide(&uri, &headers(None)), Ok(Access::Exempt));
            // a garbage token on an always-exempt path is never looked at
            assert_eq!(
                gate.decide(&uri, &headers(Some("Bearer garbage"))),
                Ok(Access::Exempt)
            );
        }
    }

    #[test]
    fn test_missing_token() {
        let (_, gate) = setup(Arc::new(ManualClock::new(1000)));
        let uri: Uri = "/stream".parse().unwrap();

        assert_eq!(
            gate.decide(&uri, &headers(None)),
            Err(GateError::MissingToken)
        );
        assert_eq!(
            gate.decide(&uri, &headers(Some("Bearer "))),
            Err(GateError::MissingToken)
        );

        let uri: Uri = "/stream?token=".parse().unwrap();
        assert_eq!(
            gate.decide(&uri, &headers(None)),
            Err(GateError::MissingToken)
        );
    }

    #[test]
    fn test_header_and_query_tokens() {
        let (issuer, gate) = setup(Arc::new(ManualClock::new(1000)));
        let token = issuer.issue("sample1").unwrap();

        let uri: Uri = "/stream".parse().unwrap();
        let access = gate
            .decide(&uri, &headers(Some(&format!("Bearer {token}"))))
            .unwrap();
        assert_eq!(access.claims().unwrap().resource_id, "sample1");

        // bare header value without the Bearer marker
        let access = gate
            .decide(&uri, &headers(Some(token.as_str())))
            .unwrap();
        assert_eq!(access.claims().unwrap().resource_id, "sample1");

        let uri: Uri = format!("/stream?token={token}").parse().unwrap();
        let access = gate.decide(&uri, &headers(None)).unwrap();
        assert_eq!(access.claims().unwrap().resource_id, "sample1");
    }

    #[test]
    fn test_header_takes_precedence() {
        let (issuer, gate) = setup(Arc::new(ManualClock::new(1000)));
        let header_token = issuer.issue("sample1").unwrap();
        let query_token = issuer.issue("yt1").unwrap();

        let uri: Uri = format!("/stream?token={query_token}").parse().unwrap();
        let access = gate
            .decide(&uri, &headers(Some(&format!("Bearer {header_token}"))))
            .unwrap();
        assert_eq!(access.claims().unwrap().resource_id, "sample1");

        // a broken header token is not rescued by a good query token
        assert_eq!(
            gate.decide(&uri, &headers(Some("Bearer not.a.token"))),
            Err(GateError::Token(TokenError::Malformed))
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let clock = Arc::new(ManualClock::new(1000));
        let (issuer, gate) = setup(clock.clone());
        let token = issuer.issue("sample1").unwrap();

        clock.advance(Duration::from_secs(61 * 60));
        let uri: Uri = "/stream".parse().unwrap();
        assert_eq!(
            gate.decide(&uri, &headers(Some(&format!("Bearer {token}")))),
            Err(GateError::Token(TokenError::Expired))
        );
    }

    #[test]
    fn test_static_carve_out() {
        let (issuer, gate) = setup(Arc::new(ManualClock::new(1000)));
        let uri: Uri = "/static/logo.png".parse().unwrap();

        assert_eq!(gate.decide(&uri, &headers(None)), Ok(Access::Exempt));

        // with a token the carve-out no longer applies
        assert_eq!(
            gate.decide(&uri, &headers(Some("Bearer bogus"))),
            Err(GateError::Token(TokenError::Malformed))
        );

        let token = issuer.issue("sample1").unwrap();
        let access = gate
            .decide(&uri, &headers(Some(&format!("Bearer {token}"))))
            .unwrap();
        assert!(matches!(access, Access::Authorized(_)));
    }

    #[test]
    fn test_segments_are_not_exempt() {
        let (_, gate) = setup(Arc::new(ManualClock::new(1000)));
        let uri: Uri = "/sample1/segment-001.ts".parse().unwrap();
        assert_eq!(
            gate.decide(&uri, &headers(None)),
            Err(GateError::MissingToken)
        );

        let uri: Uri = "/static/../stream".parse().unwrap();
        assert_eq!(
            gate.decide(&uri, &headers(None)),
            Err(GateError::MissingToken)
        );
    }
}
