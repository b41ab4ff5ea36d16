//! # Auth Module
//!
//! The authentication gate and its pluggable providers.
//!
//! ## Overview
//!
//! Identity verification (JWT, session store, IAM) is an external concern:
//! the crate defines the [`AuthProvider`] trait and a gate that normalizes
//! every provider failure, so the dispatcher never sees a raw error. Two
//! simple providers ship with the crate:
//! - **API Keys** - a pre-shared key checked against a request header
//! - **Bearer JWT** - `header.payload.signature` tokens with signature and
//!   scope checking, surfacing the decoded payload as user info
//!
//! ## Gate Semantics
//!
//! For a binding with `requires_auth == false` the gate reports
//! [`AuthOutcome::Skipped`] without ever touching the provider -
//! authentication was skipped, not merely unauthenticated. When auth is
//! required but no provider is configured, the gate reports
//! [`AuthOutcome::Failed`]: that is a deployment mistake, not a client error,
//! and it maps to the canonical 500.
//!
//! ## Custom Providers
//!
//! ```rust
//! use gauntlet::auth::{AuthOutcome, AuthProvider};
//! use gauntlet::dispatcher::RawRequest;
//!
//! struct HeaderKeyProvider { key: String }
//!
//! impl AuthProvider for HeaderKeyProvider {
//!     fn authenticate(&self, req: &RawRequest) -> anyhow::Result<AuthOutcome> {
//!         if req.get_header("x-api-key") == Some(self.key.as_str()) {
//!             Ok(AuthOutcome::Granted { user_info: None })
//!         } else {
//!             Ok(AuthOutcome::Unauthorized)
//!         }
//!     }
//! }
//! ```
//!
//! Claims returned in [`AuthOutcome::Granted`] are made available to handlers
//! as `HandlerEvent::user_info`, e.g. for forwarding identity to downstream
//! services or making authorization decisions in business logic.

use crate::dispatcher::RawRequest;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, warn};

/// Result of running the authentication gate for one dispatch.
///
/// At most one failure state can be reported; the enum makes any other
/// combination unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// The provider accepted the identity. `user_info` carries its claims,
    /// if any, through to the handler.
    Granted {
        /// Decoded claims or other provider-specific identity data
        user_info: Option<Value>,
    },
    /// The binding does not require authentication; no provider was consulted.
    Skipped,
    /// The provider explicitly rejected the identity.
    Unauthorized,
    /// The provider is missing or failed unexpectedly.
    Failed,
}

/// Trait for implementing authentication providers.
///
/// Implement this to plug identity verification into the dispatcher. The
/// provider receives the raw, untyped request fields - identity is
/// established before anything downstream is trusted.
pub trait AuthProvider: Send + Sync {
    /// Authenticate a request.
    ///
    /// # Errors
    ///
    /// An `Err` means the provider itself failed (remote store unreachable,
    /// key material unavailable). The gate converts it to
    /// [`AuthOutcome::Failed`]; to reject a client, return
    /// [`AuthOutcome::Unauthorized`] instead.
    fn authenticate(&self, req: &RawRequest) -> anyhow::Result<AuthOutcome>;
}

/// Run the authentication gate for one dispatch.
///
/// Normalizes every failure mode - missing provider, provider error, provider
/// panic - to [`AuthOutcome::Failed`] so no raw failure crosses the gate
/// boundary. The underlying reason is logged and then discarded.
#[must_use]
pub fn run_gate(
    provider: Option<&dyn AuthProvider>,
    requires_auth: bool,
    req: &RawRequest,
) -> AuthOutcome {
    if !requires_auth {
        return AuthOutcome::Skipped;
    }

    let Some(provider) = provider else {
        warn!("Authentication required but no provider configured");
        return AuthOutcome::Failed;
    };

    match catch_unwind(AssertUnwindSafe(|| provider.authenticate(req))) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            error!(error = %err, "Auth provider returned an error");
            AuthOutcome::Failed
        }
        Err(panic) => {
            error!(panic_message = ?panic, "Auth provider panicked");
            AuthOutcome::Failed
        }
    }
}

// Re-export the shipped providers
pub use api_key::ApiKeyProvider;
pub use bearer_jwt::BearerJwtProvider;

// Provider modules
mod api_key;
mod bearer_jwt;
