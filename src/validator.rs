//! Field validation gate and custom-check types.
//!
//! Validation is split in two stages. The field gate applies up to four
//! independently optional validators - body, path parameters, query
//! parameters, headers - and reduces their results to a single pass/fail.
//! The custom check is a second, optional stage that receives the raw
//! untyped fields and may short-circuit the dispatch with its own response.
//!
//! The comparison logic itself always lives in the injected validator; the
//! gate only decides what a present/absent validator means and how results
//! combine.

use crate::dispatcher::{HandlerResponse, HeaderVec, ParamVec, RawRequest};
use anyhow::{anyhow, Result};
use jsonschema::validator_for;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Predicate over the optional request body.
///
/// Receives `None` when no body is present; it is the validator's decision
/// whether absence is acceptable (e.g. an optional body on GET).
pub type BodyValidator = Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

/// Predicate over path or query parameters
pub type ParamValidator = Arc<dyn Fn(&ParamVec) -> bool + Send + Sync>;

/// Predicate over request headers
pub type HeaderValidator = Arc<dyn Fn(&HeaderVec) -> bool + Send + Sync>;

/// Per-field validators for one method binding.
///
/// Each validator is independently optional; an absent validator always
/// passes. The gate's overall result is the AND across all four checks.
#[derive(Clone, Default)]
pub struct FieldValidators {
    /// Validator applied to the request body
    pub body: Option<BodyValidator>,
    /// Validator applied to the path parameters
    pub path_params: Option<ParamValidator>,
    /// Validator applied to the query parameters
    pub query_params: Option<ParamValidator>,
    /// Validator applied to the headers
    pub headers: Option<HeaderValidator>,
}

impl FieldValidators {
    /// A validator set where every field passes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a body validator.
    #[must_use]
    pub fn body<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(f));
        self
    }

    /// Attach a path parameter validator.
    #[must_use]
    pub fn path_params<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParamVec) -> bool + Send + Sync + 'static,
    {
        self.path_params = Some(Arc::new(f));
        self
    }

    /// Attach a query parameter validator.
    #[must_use]
    pub fn query_params<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParamVec) -> bool + Send + Sync + 'static,
    {
        self.query_params = Some(Arc::new(f));
        self
    }

    /// Attach a header validator.
    #[must_use]
    pub fn headers<F>(mut self, f: F) -> Self
    where
        F: Fn(&HeaderVec) -> bool + Send + Sync + 'static,
    {
        self.headers = Some(Arc::new(f));
        self
    }

    /// Apply every present validator to its field and AND the results.
    #[must_use]
    pub fn validate(&self, req: &RawRequest) -> bool {
        let body_ok = self.body.as_ref().map_or(true, |v| v(req.body));
        let path_ok = self.path_params.as_ref().map_or(true, |v| v(req.path_params));
        let query_ok = self
            .query_params
            .as_ref()
            .map_or(true, |v| v(req.query_params));
        let headers_ok = self.headers.as_ref().map_or(true, |v| v(req.headers));

        if !body_ok || !path_ok || !query_ok || !headers_ok {
            debug!(
                body_ok,
                path_ok, query_ok, headers_ok, "Field validation rejected request"
            );
            return false;
        }
        true
    }
}

/// Compile a JSON Schema once and use it as a body validator.
///
/// An absent body is validated as JSON `null`, so schemas that should accept
/// body-less requests must allow `null`.
///
/// # Errors
///
/// Returns an error if the schema itself does not compile.
pub fn schema_validator(schema: &Value) -> Result<BodyValidator> {
    let compiled =
        validator_for(schema).map_err(|e| anyhow!("invalid body schema: {e}"))?;
    Ok(Arc::new(move |body: Option<&Value>| {
        let null = Value::Null;
        let instance = body.unwrap_or(&null);
        let details: Vec<String> = compiled.iter_errors(instance).map(|e| e.to_string()).collect();
        if !details.is_empty() {
            debug!(?details, "Body schema validation failed");
            return false;
        }
        true
    }))
}

/// Outcome of a bound custom check.
#[derive(Debug, Clone)]
pub struct CustomOutcome {
    /// Whether the check passed
    pub passed: bool,
    /// A response to return verbatim, bypassing the rest of the pipeline.
    ///
    /// When present this is the authoritative signal: it wins even if
    /// `passed` is true.
    pub override_response: Option<HandlerResponse>,
}

impl CustomOutcome {
    /// The check passed; continue the pipeline.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            passed: true,
            override_response: None,
        }
    }

    /// The check failed; the dispatcher returns the canonical 400.
    #[must_use]
    pub fn fail() -> Self {
        Self {
            passed: false,
            override_response: None,
        }
    }

    /// Short-circuit the dispatch with a bespoke response.
    #[must_use]
    pub fn respond(response: HandlerResponse) -> Self {
        Self {
            passed: true,
            override_response: Some(response),
        }
    }
}

/// Trait for the optional second validation stage of a binding.
///
/// The check receives the raw untyped fields - not the authenticated, merged
/// event - because custom validation may need to run before identity is
/// trusted.
pub trait CustomCheck: Send + Sync {
    /// Check a request.
    ///
    /// # Errors
    ///
    /// Unlike the auth gate, nothing is normalized here: an `Err` propagates
    /// to the dispatcher's outer invocation boundary and becomes the
    /// canonical internal error.
    fn check(&self, req: &RawRequest) -> Result<CustomOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_outcome_constructors() {
        assert!(CustomOutcome::pass().passed);
        assert!(CustomOutcome::pass().override_response.is_none());
        assert!(!CustomOutcome::fail().passed);
        let resp = HandlerResponse::new(418, Value::String("teapot".to_string()));
        let outcome = CustomOutcome::respond(resp.clone());
        assert!(outcome.passed);
        assert_eq!(outcome.override_response, Some(resp));
    }
}
