use super::{AuthOutcome, AuthProvider};
use crate::dispatcher::RawRequest;
use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use tracing::{debug, warn};

/// Simple Bearer/JWT provider that validates tokens from the `Authorization`
/// header.
///
/// Tokens are expected to have the form `header.payload.signature` where the
/// signature part must match the configured `signature` string. The payload
/// is base64-decoded into JSON and, on success, surfaced to the handler as
/// `user_info`. A whitespace-separated `scope` field in the payload is
/// checked against any required scopes.
///
/// This is a pre-shared-secret implementation suitable for testing and
/// internal microservices; production validation against external issuers
/// belongs in its own provider.
pub struct BearerJwtProvider {
    signature: String,
    required_scopes: Vec<String>,
}

impl BearerJwtProvider {
    /// Create a new Bearer JWT provider with the given signature.
    ///
    /// The signature is checked against the third part of presented tokens.
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            required_scopes: Vec::new(),
        }
    }

    /// Require a scope to be present in the token's `scope` claim.
    ///
    /// May be called multiple times; all required scopes must be present.
    #[must_use]
    pub fn require_scope(mut self, scope: impl Into<String>) -> Self {
        self.required_scopes.push(scope.into());
        self
    }

    fn extract_token<'a>(&self, req: &'a RawRequest) -> Option<&'a str> {
        req.get_header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
    }

    fn decode_claims(&self, token: &str) -> Option<Value> {
        let mut parts = token.split('.');
        let header = parts.next();
        let payload = parts.next()?;
        let sig = parts.next();
        if header.is_none() || sig != Some(self.signature.as_str()) {
            debug!("Bearer token rejected: malformed token or invalid signature");
            return None;
        }
        let payload_bytes = match general_purpose::STANDARD.decode(payload) {
            Ok(b) => b,
            Err(e) => {
                debug!(error = ?e, "Bearer token rejected: invalid base64 payload");
                return None;
            }
        };
        match serde_json::from_slice(&payload_bytes) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(error = ?e, "Bearer token rejected: invalid JSON payload");
                None
            }
        }
    }

    fn has_required_scopes(&self, claims: &Value) -> bool {
        let token_scopes = claims.get("scope").and_then(|v| v.as_str()).unwrap_or("");
        let has_all = self
            .required_scopes
            .iter()
            .all(|s| token_scopes.split_whitespace().any(|ts| ts == s));

        if !has_all {
            warn!(
                token_scopes,
                required = ?self.required_scopes,
                "Bearer token missing required scopes"
            );
        }

        has_all
    }
}

impl AuthProvider for BearerJwtProvider {
    fn authenticate(&self, req: &RawRequest) -> anyhow::Result<AuthOutcome> {
        let Some(token) = self.extract_token(req) else {
            debug!("Bearer token missing (no Authorization header)");
            return Ok(AuthOutcome::Unauthorized);
        };
        let Some(claims) = self.decode_claims(token) else {
            return Ok(AuthOutcome::Unauthorized);
        };
        if !self.has_required_scopes(&claims) {
            return Ok(AuthOutcome::Unauthorized);
        }
        debug!("Bearer token validation succeeded");
        Ok(AuthOutcome::Granted {
            user_info: Some(claims),
        })
    }
}
