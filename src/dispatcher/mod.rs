//! # Dispatcher Module
//!
//! Coroutine-based gate-pipeline dispatch for serverless HTTP handler events.
//! The dispatcher owns the per-method binding table and runs every incoming
//! event through a fixed, short-circuiting sequence of gates before invoking
//! the bound handler.
//!
//! ## Overview
//!
//! The dispatcher is the only part of the crate with real control flow. It:
//! - Manages a registry of method bindings and their handler coroutines
//! - Runs the auth, field-validation, and custom-check gates in order
//! - Delivers merged events to handlers via channels and collects replies
//! - Maps every failure to exactly one of the three canonical responses
//!
//! ## Handler Registration
//!
//! Handlers are bound per HTTP method at startup:
//!
//! ```rust,ignore
//! use gauntlet::dispatcher::{Dispatcher, Gates, HandlerResponse};
//! use http::Method;
//!
//! let mut dispatcher = Dispatcher::new();
//! unsafe {
//!     dispatcher.bind(Method::GET, Gates::new(), |event| {
//!         let _ = event.reply_tx.send(HandlerResponse::new(
//!             200,
//!             serde_json::json!({ "id": event.get_path_param("id") }),
//!         ));
//!     });
//! }
//! ```
//!
//! ## Event Flow
//!
//! 1. Host produces a [`RequestEvent`] from its transport
//! 2. Dispatcher looks up the binding by HTTP method
//! 3. Gates run in order; any gate may short-circuit with a terminal response
//! 4. The merged event is sent to the handler coroutine via channel
//! 5. The handler's reply (or its absence) becomes the dispatch result
//!
//! ## Error Handling
//!
//! - Unbound methods and rejected validation return the canonical 400
//! - Rejected identities return the canonical 401
//! - Provider misconfiguration, collaborator failures, and handler panics
//!   return the canonical 500; the root cause is logged, never surfaced
//!
//! ## Concurrency
//!
//! One dispatch is a linear sequence of suspension points with no fan-out.
//! Concurrent dispatches only share read-only state: configuration happens on
//! `&mut Dispatcher` before serving, dispatch borrows `&self`.

mod core;

pub use core::{
    Dispatcher, Gates, HandlerEvent, HandlerResponse, HandlerSender, HeaderVec, MethodBinding,
    ParamVec, RawRequest, RequestEvent, MAX_INLINE_HEADERS, MAX_INLINE_PARAMS,
};
