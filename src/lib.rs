//! # Gauntlet
//!
//! **Gauntlet** is a per-request dispatch pipeline for serverless HTTP
//! handlers, built on the `may` coroutine runtime. Given one incoming request
//! event, it decides - in a fixed, short-circuiting order - whether to
//! authenticate, validate, and finally invoke a user-supplied handler,
//! producing exactly one structured response.
//!
//! ## Overview
//!
//! Gauntlet does not speak any transport: the host (a Lambda shim, a test
//! harness, a queue consumer) produces a [`RequestEvent`] from whatever wire
//! format it handles, and Gauntlet runs the event through the gauntlet of
//! gates in front of the bound handler:
//!
//! 1. **Binding lookup** - each HTTP method is bound to one pipeline; an
//!    unbound method is a bad request
//! 2. **Authentication gate** - an optionally required, pluggable
//!    [`AuthProvider`] establishes the identity that handlers see as
//!    `user_info`
//! 3. **Field validation gate** - up to four optional per-field validators
//!    (body, path params, query params, headers), ANDed
//! 4. **Custom check** - an optional second stage over the raw fields that
//!    can fail the dispatch or override the response entirely
//! 5. **Handler invocation** - the merged, typed event is delivered to the
//!    handler coroutine over a channel
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`dispatcher`]** - The method binding table and the gate pipeline (the
//!   only module with real control flow)
//! - **[`auth`]** - The [`AuthProvider`] trait, outcome normalization, and
//!   the shipped API-key and bearer-JWT providers
//! - **[`validator`]** - Per-field validators, the JSON Schema body-validator
//!   helper, and the custom-check types
//! - **[`typed`]** - Type-safe handler traits converting events with `TryFrom`
//! - **[`ids`]** - ULID request identifiers for correlation
//! - **[`runtime_config`]** - Coroutine stack-size configuration
//!
//! ### Dispatch Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant Dispatcher
//!     participant Auth as Auth Gate
//!     participant Val as Validation Gate
//!     participant Custom as Custom Check
//!     participant Handler as Handler<br/>(Coroutine)
//!
//!     Host->>Dispatcher: dispatch(RequestEvent)
//!     Dispatcher->>Dispatcher: Binding lookup by method
//!
//!     alt No Binding
//!         Dispatcher-->>Host: 400 Bad Request
//!     end
//!
//!     Dispatcher->>Auth: run_gate(provider, requires_auth, raw)
//!     alt Rejected
//!         Auth-->>Host: 401 Unauthorized
//!     else Provider missing / failed
//!         Auth-->>Host: 500 Internal Server Error
//!     end
//!
//!     Dispatcher->>Val: validate(raw)
//!     alt Validator rejects
//!         Val-->>Host: 400 Bad Request
//!     end
//!
//!     Dispatcher->>Custom: check(raw)
//!     alt Override present
//!         Custom-->>Host: override response, verbatim
//!     else Check failed
//!         Custom-->>Host: 400 Bad Request
//!     end
//!
//!     Dispatcher->>Handler: Send via channel (HandlerEvent)
//!     Handler-->>Dispatcher: HandlerResponse
//!
//!     alt Handler panics / never replies
//!         Dispatcher-->>Host: 500 Internal Server Error
//!     end
//!
//!     Dispatcher-->>Host: Handler response, unchanged
//! ```
//!
//! Exactly one of {400, 401, 500, handler response} is produced per dispatch,
//! and no gate ever retries. The three canonical bodies are fixed strings
//! regardless of root cause - failure reasons go to `tracing`, never to the
//! response.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gauntlet::{Dispatcher, Gates, HandlerResponse, RequestEvent};
//! use http::Method;
//! use serde_json::json;
//!
//! let mut dispatcher = Dispatcher::new();
//! unsafe {
//!     dispatcher.bind(Method::GET, Gates::new(), |event| {
//!         let _ = event.reply_tx.send(HandlerResponse::new(200, json!("ok")));
//!     });
//! }
//!
//! let response = dispatcher.dispatch(RequestEvent::new(Method::GET));
//! assert_eq!(response.status, 200);
//! ```
//!
//! ## Runtime Considerations
//!
//! Gauntlet uses the `may` coroutine runtime, not tokio or async-std:
//!
//! - Each bound handler runs in its own coroutine (lightweight thread)
//! - Events and replies travel over MPSC channels
//! - Stack size is configurable via the `GAUNTLET_STACK_SIZE` environment
//!   variable
//! - Blocking operations inside handlers should use `may`'s blocking
//!   facilities
//!
//! Configuration is "configure once, use many times": bindings and the auth
//! provider are set on `&mut Dispatcher` before serving, and `dispatch`
//! borrows `&self`, so no mutable state is shared between live dispatches.

pub mod auth;
pub mod dispatcher;
pub mod ids;
pub mod runtime_config;
pub mod typed;
pub mod validator;

pub use auth::{ApiKeyProvider, AuthOutcome, AuthProvider, BearerJwtProvider};
pub use dispatcher::{
    Dispatcher, Gates, HandlerEvent, HandlerResponse, HandlerSender, HeaderVec, MethodBinding,
    ParamVec, RawRequest, RequestEvent, MAX_INLINE_HEADERS, MAX_INLINE_PARAMS,
};
pub use ids::RequestId;
pub use validator::{
    schema_validator, BodyValidator, CustomCheck, CustomOutcome, FieldValidators, HeaderValidator,
    ParamValidator,
};
