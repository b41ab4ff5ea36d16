//! Tests for the field validation gate
//!
//! Each of the four validators is independently optional, applies only to its
//! own field, and the gate's result is the AND across all four.


use gauntlet::validator::FieldValidators;
use gauntlet::{schema_validator, RawRequest, RequestEvent};
use http::Method;
use serde_json::json;
use std::sync::Arc;
use tracing_util::TestTracing;

fn sample_event() -> RequestEvent {
    let mut event = RequestEvent::new(Method::POST);
    event
        .headers
        .push((Arc::from("content-type"), "application/json".to_string()));
    event
        .path_params
        .push((Arc::from("id"), "item-001".to_string()));
    event
        .query_params
        .push((Arc::from("limit"), "10".to_string()));
    event.body = Some(json!({"name": "Sample Item"}));
    event
}

#[test]
fn test_absent_validators_pass() {
    let _tracing = TestTracing::init();
    let event = RequestEvent::new(Method::GET);
    assert!(FieldValidators::new().validate(&RawRequest::of(&event)));
}

#[test]
fn test_each_validator_sees_its_own_field() {
    let _tracing = TestTracing::init();
    let validators = FieldValidators::new()
        .body(|body| body.and_then(|b| b.get("name")).is_some())
        .path_params(|params| params.iter().any(|(k, _)| k.as_ref() == "id"))
        .query_params(|params| {
            params
                .iter()
                .all(|(k, v)| k.as_ref() != "limit" || v.parse::<usize>().is_ok())
        })
        .headers(|headers| {
            headers
                .iter()
                .any(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        });

    let event = sample_event();
    assert!(validators.validate(&RawRequest::of(&event)));
}

#[test]
fn test_single_failing_validator_fails_the_gate() {
    let _tracing = TestTracing::init();
    let validators = FieldValidators::new()
        .body(|_| true)
        .headers(|headers| headers.iter().any(|(k, _)| k.as_ref() == "x-required"));

    let event = sample_event();
    assert!(!validators.validate(&RawRequest::of(&event)));
}

#[test]
fn test_validator_receives_absent_body() {
    let _tracing = TestTracing::init();
    // Absence is the validator's decision: this one allows a missing body.
    let lenient = FieldValidators::new().body(|body| body.is_none() || body.is_some());
    let strict = FieldValidators::new().body(|body| body.is_some());

    let event = RequestEvent::new(Method::GET);
    assert!(lenient.validate(&RawRequest::of(&event)));
    assert!(!strict.validate(&RawRequest::of(&event)));
}

#[test]
fn test_schema_validator_accepts_and_rejects() {
    let _tracing = TestTracing::init();
    let schema = json!({
        "type": "object",
        "required": ["name"],
        "properties": {"name": {"type": "string"}}
    });
    let validator = schema_validator(&schema).expect("schema compiles");

    assert!(validator(Some(&json!({"name": "Bella"}))));
    assert!(!validator(Some(&json!({"name": 42}))));
    assert!(!validator(Some(&json!("not an object"))));
}

#[test]
fn test_schema_validator_treats_absent_body_as_null() {
    let _tracing = TestTracing::init();
    let object_only = schema_validator(&json!({"type": "object"})).expect("schema compiles");
    assert!(!object_only(None));

    let nullable =
        schema_validator(&json!({"type": ["object", "null"]})).expect("schema compiles");
    assert!(nullable(None));
}

#[test]
fn test_schema_validator_rejects_invalid_schema() {
    let _tracing = TestTracing::init();
    assert!(schema_validator(&json!({"type": 12})).is_err());
}
