//! # Typed Module
//!
//! Type-safe handler bindings. Instead of working with raw [`HandlerEvent`]
//! and sending a [`HandlerResponse`] by hand, a handler can declare its
//! request and response types and let the binding do the conversion.
//!
//! [`HandlerEvent`]: crate::dispatcher::HandlerEvent
//! [`HandlerResponse`]: crate::dispatcher::HandlerResponse
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gauntlet::typed::{Handler, TypedHandlerEvent};
//! use serde::Serialize;
//!
//! struct GetUserRequest { user_id: String }
//!
//! impl TryFrom<gauntlet::HandlerEvent> for GetUserRequest {
//!     type Error = anyhow::Error;
//!     fn try_from(event: gauntlet::HandlerEvent) -> anyhow::Result<Self> {
//!         let user_id = event
//!             .get_path_param("user_id")
//!             .ok_or_else(|| anyhow::anyhow!("missing user_id"))?
//!             .to_string();
//!         Ok(Self { user_id })
//!     }
//! }
//!
//! #[derive(Serialize)]
//! struct GetUserResponse { id: String, name: String }
//!
//! struct GetUserHandler;
//!
//! impl Handler for GetUserHandler {
//!     type Request = GetUserRequest;
//!     type Response = GetUserResponse;
//!     fn handle(&self, req: TypedHandlerEvent<GetUserRequest>) -> GetUserResponse {
//!         GetUserResponse { id: req.data.user_id, name: "John".to_string() }
//!     }
//! }
//! ```
//!
//! A conversion failure replies with the canonical 400; the reason is logged,
//! never sent. Handlers that need to control the status code use the untyped
//! `Dispatcher::bind` and reply with an explicit `HandlerResponse`.

mod core;

pub use core::*;
