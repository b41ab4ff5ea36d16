//! Dispatcher core module - hot path for event dispatch.

use crate::auth::{run_gate, AuthOutcome, AuthProvider};
use crate::ids::RequestId;
use crate::runtime_config::RuntimeConfig;
use crate::validator::FieldValidators;
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maximum inline path/query parameters before heap allocation
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers before heap allocation
///
/// Most requests have ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated parameter storage for the hot path
///
/// Parameter names use `Arc<str>` instead of `String` because names repeat
/// across requests and `Arc::clone()` is O(1). Values remain `String` as they
/// are per-request data.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Stack-allocated header storage for the hot path
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// One incoming request event, immutable for the duration of a dispatch.
///
/// The host (Lambda shim, test harness, queue consumer) is responsible for
/// producing this from whatever transport it speaks; the dispatcher never
/// parses wire formats.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// HTTP headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    /// Path parameters extracted by the host (stack-allocated for ≤8 params)
    pub path_params: ParamVec,
    /// Query string parameters (stack-allocated for ≤8 params)
    pub query_params: ParamVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
}

impl RequestEvent {
    /// Create an event for the given method with no fields set.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            headers: HeaderVec::new(),
            path_params: ParamVec::new(),
            query_params: ParamVec::new(),
            body: None,
        }
    }
}

/// Borrowed, untyped view of a request's fields.
///
/// This is what the authentication provider and the custom check receive:
/// raw fields, before any identity has been established and before the merged
/// event exists. Handlers never see this type.
pub struct RawRequest<'a> {
    /// HTTP headers from the request
    pub headers: &'a HeaderVec,
    /// Path parameters from the request
    pub path_params: &'a ParamVec,
    /// Query parameters from the request
    pub query_params: &'a ParamVec,
    /// Request body, if present
    pub body: Option<&'a Value>,
}

impl<'a> RawRequest<'a> {
    /// Borrow the fields of an incoming event.
    #[must_use]
    pub fn of(event: &'a RequestEvent) -> Self {
        Self {
            headers: &event.headers,
            path_params: &event.path_params,
            query_params: &event.query_params,
            body: event.body.as_ref(),
        }
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate query parameter names
    /// exist (e.g. `?limit=10&limit=20`), returns the last occurrence.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Merged event passed to a handler coroutine.
///
/// Combines the raw request fields with the authenticated context established
/// by the auth gate, plus a reply channel for sending the response back to
/// the dispatcher.
#[derive(Debug, Clone)]
pub struct HandlerEvent {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// HTTP headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    /// Path parameters (stack-allocated for ≤8 params)
    pub path_params: ParamVec,
    /// Query string parameters (stack-allocated for ≤8 params)
    pub query_params: ParamVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
    /// Authenticated user context established by the auth gate.
    ///
    /// `None` when the binding does not require authentication, or when the
    /// provider granted access without claims. Handlers must not assume its
    /// presence.
    pub user_info: Option<Value>,
    /// Channel for sending the response back to the dispatcher
    pub reply_tx: mpsc::Sender<HandlerResponse>,
}

impl HandlerEvent {
    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to HashMap for compatibility
    /// Note: This allocates - use get_path_param() in hot paths
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Convert query_params to HashMap for compatibility
    /// Note: This allocates - use get_query_param() in hot paths
    #[must_use]
    pub fn query_params_map(&self) -> HashMap<String, String> {
        self.query_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Response produced by one dispatch.
///
/// Either one of the three canonical terminal values owned by the dispatcher,
/// or whatever the bound handler replied with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 400, 500, etc.)
    pub status: u16,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    /// Create a new response with the given status and body
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Canonical terminal response: the method has no binding, or a
    /// validation gate rejected the request.
    #[must_use]
    pub fn bad_request() -> Self {
        Self::new(400, Value::String("Bad Request".to_string()))
    }

    /// Canonical terminal response: the auth provider rejected the identity.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(401, Value::String("Unauthorized".to_string()))
    }

    /// Canonical terminal response: a collaborator failed unexpectedly or the
    /// pipeline is misconfigured. The root cause is logged, never surfaced.
    #[must_use]
    pub fn internal_error() -> Self {
        Self::new(500, Value::String("Internal Server Error".to_string()))
    }
}

/// Type alias for a channel sender that delivers merged events to a handler
pub type HandlerSender = mpsc::Sender<HandlerEvent>;

/// Gate configuration for one method binding.
///
/// Everything that runs ahead of the handler: the authentication requirement,
/// the optional per-field validators, and the optional custom check.
#[derive(Clone, Default)]
pub struct Gates {
    /// Whether the auth gate must establish an identity before dispatch
    pub requires_auth: bool,
    /// Optional per-field validators (absent validators pass)
    pub validators: FieldValidators,
    /// Optional custom check, run against the raw fields after validation
    pub custom_check: Option<Arc<dyn crate::validator::CustomCheck>>,
}

impl Gates {
    /// Gate configuration that lets every event straight through to the handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the auth gate to establish an identity.
    #[must_use]
    pub fn require_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Attach per-field validators.
    #[must_use]
    pub fn validators(mut self, validators: FieldValidators) -> Self {
        self.validators = validators;
        self
    }

    /// Attach a custom check.
    #[must_use]
    pub fn custom_check(mut self, check: Arc<dyn crate::validator::CustomCheck>) -> Self {
        self.custom_check = Some(check);
        self
    }
}

/// Configuration attached to one method: its gates and the channel to its
/// handler coroutine. Created at bind time, immutable thereafter.
#[derive(Clone)]
pub struct MethodBinding {
    /// Gates run ahead of the handler
    pub gates: Gates,
    /// Channel sender for the bound handler coroutine
    pub handler_tx: HandlerSender,
}

/// Dispatcher that runs incoming events through the gate pipeline and into
/// registered handler coroutines.
///
/// Holds the per-method binding table and the optional authentication
/// provider. Both are configured before serving (via `&mut self` methods) and
/// only read during dispatch (`&self`), so concurrent dispatches share purely
/// read-only state.
#[derive(Clone)]
pub struct Dispatcher {
    /// Map of HTTP methods to their configured pipeline bindings
    pub bindings: HashMap<Method, MethodBinding>,
    /// Authentication provider consulted by bindings that require auth.
    ///
    /// Fixed at construction. When absent, any binding requiring auth fails
    /// with the canonical internal error for every dispatch.
    pub auth_provider: Option<Arc<dyn AuthProvider>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a dispatcher with no bindings and no authentication provider.
    #[must_use]
    pub fn new() -> Self {
        Dispatcher {
            bindings: HashMap::new(),
            auth_provider: None,
        }
    }

    /// Create a dispatcher that consults the given provider for bindings
    /// requiring authentication.
    #[must_use]
    pub fn with_auth_provider(provider: Arc<dyn AuthProvider>) -> Self {
        Dispatcher {
            bindings: HashMap::new(),
            auth_provider: Some(provider),
        }
    }

    /// Bind a pre-spawned handler sender to a method.
    ///
    /// **IMPORTANT**: If a binding for the method already exists, it is
    /// replaced. The old sender is dropped, which closes its channel and
    /// causes the old handler coroutine to exit when it tries to receive.
    pub fn bind_sender(&mut self, method: Method, gates: Gates, sender: HandlerSender) {
        if let Some(old) = self.bindings.remove(&method) {
            drop(old);
            warn!(
                method = %method,
                total_bindings = self.bindings.len(),
                "Replaced existing binding - old handler coroutine will exit"
            );
        }

        info!(
            method = %method,
            requires_auth = gates.requires_auth,
            total_bindings = self.bindings.len() + 1,
            "Binding registered successfully"
        );

        self.bindings.insert(
            method,
            MethodBinding {
                gates,
                handler_tx: sender,
            },
        );
    }

    /// Bind a handler function to a method behind the given gates.
    ///
    /// Spawns a coroutine that processes merged events from a channel. The
    /// handler is wrapped with panic recovery so a failing handler cannot take
    /// the process down; a panicking handler never replies, and the dispatcher
    /// maps the lost reply to the canonical internal error.
    ///
    /// # Safety
    ///
    /// This function is marked unsafe because it calls
    /// `may::coroutine::Builder::spawn()`, which is unsafe in the `may`
    /// runtime. The caller must ensure:
    /// - The May coroutine runtime is properly initialized before calling this
    /// - The handler sends a response through the reply channel for every
    ///   event it completes (to avoid resource leaks)
    pub unsafe fn bind<F>(&mut self, method: Method, gates: Gates, handler_fn: F)
    where
        F: Fn(HandlerEvent) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<HandlerEvent>();
        let stack_size = RuntimeConfig::from_env().stack_size;
        let label = method.to_string();

        // SAFETY: spawn() is unsafe by the may runtime's contract, not this
        // function's logic. The handler is Send + 'static so no references
        // dangle, and responses travel over the reply channel, not panics.
        let spawn_result = unsafe {
            coroutine::Builder::new()
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(method = %label, stack_size, "Handler coroutine start");

                    for event in rx.iter() {
                        let request_id = event.request_id;
                        let execution_start = Instant::now();

                        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| {
                            handler_fn(event);
                        })) {
                            // The event (and its reply sender) unwound with the
                            // panic; the dispatcher sees a closed reply channel.
                            error!(
                                request_id = %request_id,
                                method = %label,
                                panic_message = ?panic,
                                "Handler panicked"
                            );
                        } else {
                            debug!(
                                request_id = %request_id,
                                method = %label,
                                execution_time_ms = execution_start.elapsed().as_millis() as u64,
                                "Handler execution complete"
                            );
                        }
                    }
                })
        };

        if let Err(e) = spawn_result {
            error!(
                method = %method,
                error = %e,
                stack_size,
                "Failed to spawn handler coroutine"
            );
            return;
        }

        self.bind_sender(method, gates, tx);
    }

    /// Dispatch one event through the gate pipeline to its bound handler.
    ///
    /// Gates run in a fixed order and each may short-circuit with a terminal
    /// response; every dispatch produces exactly one response:
    ///
    /// 1. Binding lookup - no binding for the method ⇒ 400
    /// 2. Auth gate - unauthorized ⇒ 401, provider failure/missing ⇒ 500
    /// 3. Field validation gate - any validator rejects ⇒ 400
    /// 4. Custom check - override response returned verbatim; failed ⇒ 400;
    ///    error/panic ⇒ 500
    /// 5. Handler invocation - no reply ⇒ 500, otherwise the handler's
    ///    response unchanged
    ///
    /// No gate is retried; each runs at most once per dispatch.
    #[must_use]
    pub fn dispatch(&self, event: RequestEvent) -> HandlerResponse {
        let request_id = event.request_id;

        debug!(
            request_id = %request_id,
            method = %event.method,
            total_bindings = self.bindings.len(),
            "Binding lookup"
        );

        let Some(binding) = self.bindings.get(&event.method) else {
            warn!(
                request_id = %request_id,
                method = %event.method,
                "No binding for method"
            );
            return HandlerResponse::bad_request();
        };

        let raw = RawRequest::of(&event);

        let user_info = match run_gate(
            self.auth_provider.as_deref(),
            binding.gates.requires_auth,
            &raw,
        ) {
            AuthOutcome::Granted { user_info } => user_info,
            AuthOutcome::Skipped => None,
            AuthOutcome::Unauthorized => {
                info!(request_id = %request_id, "Authentication rejected identity");
                return HandlerResponse::unauthorized();
            }
            AuthOutcome::Failed => {
                error!(request_id = %request_id, "Authentication gate failed");
                return HandlerResponse::internal_error();
            }
        };

        if !binding.gates.validators.validate(&raw) {
            info!(request_id = %request_id, "Field validation failed");
            return HandlerResponse::bad_request();
        }

        if let Some(check) = &binding.gates.custom_check {
            // The custom check shares the handler's failure boundary: an
            // unexpected error here becomes the canonical internal error.
            match catch_unwind(AssertUnwindSafe(|| check.check(&raw))) {
                Ok(Ok(outcome)) => {
                    if let Some(resp) = outcome.override_response {
                        debug!(
                            request_id = %request_id,
                            status = resp.status,
                            "Custom check returned override response"
                        );
                        return resp;
                    }
                    if !outcome.passed {
                        info!(request_id = %request_id, "Custom check rejected request");
                        return HandlerResponse::bad_request();
                    }
                }
                Ok(Err(err)) => {
                    error!(request_id = %request_id, error = %err, "Custom check failed");
                    return HandlerResponse::internal_error();
                }
                Err(panic) => {
                    error!(request_id = %request_id, panic_message = ?panic, "Custom check panicked");
                    return HandlerResponse::internal_error();
                }
            }
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        let merged = HandlerEvent {
            request_id,
            method: event.method,
            headers: event.headers,
            path_params: event.path_params,
            query_params: event.query_params,
            body: event.body,
            user_info,
            reply_tx,
        };

        info!(
            request_id = %request_id,
            method = %merged.method,
            "Event dispatched to handler"
        );

        let start = Instant::now();
        if binding.handler_tx.send(merged).is_err() {
            error!(
                request_id = %request_id,
                "Handler channel closed - handler may have crashed"
            );
            return HandlerResponse::internal_error();
        }

        match reply_rx.recv() {
            Ok(resp) => {
                info!(
                    request_id = %request_id,
                    status = resp.status,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Handler response received"
                );
                resp
            }
            Err(_) => {
                // Handler panicked or dropped the reply sender without
                // responding. The reason stays in the logs.
                error!(
                    request_id = %request_id,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Handler did not produce a response"
                );
                HandlerResponse::internal_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_responses() {
        assert_eq!(HandlerResponse::bad_request().status, 400);
        assert_eq!(HandlerResponse::bad_request().body, json!("Bad Request"));
        assert_eq!(HandlerResponse::unauthorized().status, 401);
        assert_eq!(HandlerResponse::unauthorized().body, json!("Unauthorized"));
        assert_eq!(HandlerResponse::internal_error().status, 500);
        assert_eq!(
            HandlerResponse::internal_error().body,
            json!("Internal Server Error")
        );
    }

    #[test]
    fn test_gates_builder() {
        let gates = Gates::new().require_auth();
        assert!(gates.requires_auth);
        assert!(gates.custom_check.is_none());
    }

    #[test]
    fn test_raw_request_header_lookup_is_case_insensitive() {
        let mut event = RequestEvent::new(Method::GET);
        event
            .headers
            .push((Arc::from("Content-Type"), "application/json".to_string()));
        let raw = RawRequest::of(&event);
        assert_eq!(raw.get_header("content-type"), Some("application/json"));
        assert_eq!(raw.get_header("x-missing"), None);
    }
}
