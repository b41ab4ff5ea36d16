//! Tests for the authentication gate and the shipped providers
//!
//! The gate's job is uniform failure normalization: whatever a provider does
//! (reject, error, panic, not exist), the dispatcher only ever sees an
//! `AuthOutcome`.


use base64::{engine::general_purpose, Engine as _};
use gauntlet::auth::{run_gate, ApiKeyProvider, AuthOutcome, AuthProvider, BearerJwtProvider};
use gauntlet::{RawRequest, RequestEvent};
use http::Method;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_util::TestTracing;

struct CountingProvider {
    calls: AtomicUsize,
}

impl AuthProvider for CountingProvider {
    fn authenticate(&self, _req: &RawRequest) -> anyhow::Result<AuthOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AuthOutcome::Granted { user_info: None })
    }
}

struct ErroringProvider;

impl AuthProvider for ErroringProvider {
    fn authenticate(&self, _req: &RawRequest) -> anyhow::Result<AuthOutcome> {
        Err(anyhow::anyhow!("session store unreachable"))
    }
}

struct PanickingProvider;

impl AuthProvider for PanickingProvider {
    fn authenticate(&self, _req: &RawRequest) -> anyhow::Result<AuthOutcome> {
        panic!("provider exploded");
    }
}

fn bearer_token(payload: &serde_json::Value, signature: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(payload.to_string());
    format!("hdr.{encoded}.{signature}")
}

#[test]
fn test_gate_skips_when_auth_not_required() {
    let _tracing = TestTracing::init();
    let provider = CountingProvider {
        calls: AtomicUsize::new(0),
    };
    let event = RequestEvent::new(Method::GET);

    let outcome = run_gate(Some(&provider), false, &RawRequest::of(&event));

    assert_eq!(outcome, AuthOutcome::Skipped);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_gate_fails_without_provider() {
    let _tracing = TestTracing::init();
    let event = RequestEvent::new(Method::GET);

    let outcome = run_gate(None, true, &RawRequest::of(&event));

    assert_eq!(outcome, AuthOutcome::Failed);
}

#[test]
fn test_gate_normalizes_provider_error() {
    let _tracing = TestTracing::init();
    let event = RequestEvent::new(Method::GET);

    let outcome = run_gate(Some(&ErroringProvider), true, &RawRequest::of(&event));

    assert_eq!(outcome, AuthOutcome::Failed);
}

#[test]
fn test_gate_normalizes_provider_panic() {
    let _tracing = TestTracing::init();
    let event = RequestEvent::new(Method::GET);

    let outcome = run_gate(Some(&PanickingProvider), true, &RawRequest::of(&event));

    assert_eq!(outcome, AuthOutcome::Failed);
}

#[test]
fn test_api_key_provider() {
    let _tracing = TestTracing::init();
    let provider = ApiKeyProvider::new("test123");

    let mut event = RequestEvent::new(Method::GET);
    event
        .headers
        .push((Arc::from("X-API-Key"), "test123".to_string()));
    let outcome = provider
        .authenticate(&RawRequest::of(&event))
        .expect("provider is infallible");
    assert_eq!(outcome, AuthOutcome::Granted { user_info: None });

    let mut wrong = RequestEvent::new(Method::GET);
    wrong
        .headers
        .push((Arc::from("X-API-Key"), "nope".to_string()));
    let outcome = provider
        .authenticate(&RawRequest::of(&wrong))
        .expect("provider is infallible");
    assert_eq!(outcome, AuthOutcome::Unauthorized);

    let missing = RequestEvent::new(Method::GET);
    let outcome = provider
        .authenticate(&RawRequest::of(&missing))
        .expect("provider is infallible");
    assert_eq!(outcome, AuthOutcome::Unauthorized);
}

#[test]
fn test_api_key_provider_custom_header() {
    let _tracing = TestTracing::init();
    let provider = ApiKeyProvider::new("test123").header_name("x-internal-key");

    let mut event = RequestEvent::new(Method::GET);
    event
        .headers
        .push((Arc::from("x-internal-key"), "test123".to_string()));
    let outcome = provider
        .authenticate(&RawRequest::of(&event))
        .expect("provider is infallible");
    assert_eq!(outcome, AuthOutcome::Granted { user_info: None });
}

#[test]
fn test_bearer_jwt_valid_token_surfaces_claims() {
    let _tracing = TestTracing::init();
    let provider = BearerJwtProvider::new("sig");
    let claims = json!({"sub": "u1", "scope": "read write"});

    let mut event = RequestEvent::new(Method::GET);
    event.headers.push((
        Arc::from("authorization"),
        format!("Bearer {}", bearer_token(&claims, "sig")),
    ));

    let outcome = provider
        .authenticate(&RawRequest::of(&event))
        .expect("provider is infallible");
    assert_eq!(
        outcome,
        AuthOutcome::Granted {
            user_info: Some(claims)
        }
    );
}

#[test]
fn test_bearer_jwt_rejects_bad_signature() {
    let _tracing = TestTracing::init();
    let provider = BearerJwtProvider::new("sig");
    let claims = json!({"sub": "u1"});

    let mut event = RequestEvent::new(Method::GET);
    event.headers.push((
        Arc::from("authorization"),
        format!("Bearer {}", bearer_token(&claims, "forged")),
    ));

    let outcome = provider
        .authenticate(&RawRequest::of(&event))
        .expect("provider is infallible");
    assert_eq!(outcome, AuthOutcome::Unauthorized);
}

#[test]
fn test_bearer_jwt_rejects_missing_header() {
    let _tracing = TestTracing::init();
    let provider = BearerJwtProvider::new("sig");
    let event = RequestEvent::new(Method::GET);

    let outcome = provider
        .authenticate(&RawRequest::of(&event))
        .expect("provider is infallible");
    assert_eq!(outcome, AuthOutcome::Unauthorized);
}

#[test]
fn test_bearer_jwt_enforces_required_scopes() {
    let _tracing = TestTracing::init();
    let provider = BearerJwtProvider::new("sig")
        .require_scope("read:items")
        .require_scope("write:items");

    let partial = json!({"sub": "u1", "scope": "read:items"});
    let mut event = RequestEvent::new(Method::GET);
    event.headers.push((
        Arc::from("authorization"),
        format!("Bearer {}", bearer_token(&partial, "sig")),
    ));
    let outcome = provider
        .authenticate(&RawRequest::of(&event))
        .expect("provider is infallible");
    assert_eq!(outcome, AuthOutcome::Unauthorized);

    let full = json!({"sub": "u1", "scope": "read:items write:items"});
    let mut event = RequestEvent::new(Method::GET);
    event.headers.push((
        Arc::from("authorization"),
        format!("Bearer {}", bearer_token(&full, "sig")),
    ));
    let outcome = provider
        .authenticate(&RawRequest::of(&event))
        .expect("provider is infallible");
    assert_eq!(
        outcome,
        AuthOutcome::Granted {
            user_info: Some(full)
        }
    );
}
