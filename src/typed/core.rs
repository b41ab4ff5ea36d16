use crate::dispatcher::{Dispatcher, Gates, HandlerEvent, HandlerResponse, HandlerSender};
use crate::ids::RequestId;
use crate::runtime_config::RuntimeConfig;
use anyhow::Result;
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error};

/// Trait implemented by typed coroutine handlers.
///
/// A handler receives a [`TypedHandlerEvent`] carrying its converted request
/// type and returns a serializable response. The binding performs the
/// conversion and the reply, so a mismatch between a handler and its bound
/// types is impossible to express.
pub trait Handler: Send + 'static {
    /// The typed request type (converted from [`HandlerEvent`])
    type Request: TryFrom<HandlerEvent, Error = anyhow::Error> + Send + 'static;
    /// The typed response type (serialized to JSON)
    type Response: Serialize + Send + 'static;

    /// Handle a typed event and return a typed response
    fn handle(&self, req: TypedHandlerEvent<Self::Request>) -> Self::Response;
}

/// Typed event data passed to a [`Handler`]
///
/// Carries the request metadata and authenticated context along with the
/// typed data converted from the raw event.
#[derive(Debug, Clone)]
pub struct TypedHandlerEvent<T> {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Path parameters extracted by the host
    pub path_params: HashMap<String, String>,
    /// Query string parameters
    pub query_params: HashMap<String, String>,
    /// Authenticated user context, if the auth gate established one
    pub user_info: Option<Value>,
    /// Typed request data (converted and validated)
    pub data: T,
}

/// Trait for converting a raw [`HandlerEvent`] into a typed event
///
/// Implemented automatically for `TypedHandlerEvent<T>` where `T` can be
/// converted from [`HandlerEvent`].
pub trait TypedHandlerFor<T>: Sized {
    /// Convert a raw event to a typed event
    ///
    /// # Errors
    ///
    /// Returns an error if the event data cannot be converted to type `T`
    fn from_event(event: HandlerEvent) -> Result<TypedHandlerEvent<T>>;
}

impl<T> TypedHandlerFor<T> for TypedHandlerEvent<T>
where
    T: TryFrom<HandlerEvent, Error = anyhow::Error>,
{
    fn from_event(event: HandlerEvent) -> Result<TypedHandlerEvent<T>> {
        let data = T::try_from(event.clone())?;
        let path_params = event.path_params_map();
        let query_params = event.query_params_map();

        Ok(TypedHandlerEvent {
            request_id: event.request_id,
            method: event.method,
            path_params,
            query_params,
            user_info: event.user_info,
            data,
        })
    }
}

/// Spawn a typed handler coroutine and return a sender to communicate with it.
///
/// # Safety
///
/// This function is unsafe because it spawns a coroutine via
/// `may::coroutine::Builder::spawn()`. The caller must ensure the May
/// coroutine runtime is properly initialized and that the handler is safe to
/// execute in a concurrent context.
pub unsafe fn spawn_typed<H>(handler: H) -> HandlerSender
where
    H: Handler + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<HandlerEvent>();
    let stack_size = RuntimeConfig::from_env().stack_size;

    // SAFETY: see function-level contract; the handler is Send + 'static and
    // replies travel over the per-event channel.
    let spawn_result = unsafe {
        coroutine::Builder::new()
            .stack_size(stack_size)
            .spawn(move || {
                for event in rx.iter() {
                    let reply_tx = event.reply_tx.clone();
                    let request_id = event.request_id;

                    let result = catch_unwind(AssertUnwindSafe(|| {
                        let typed = match TypedHandlerEvent::<H::Request>::from_event(event) {
                            Ok(t) => t,
                            Err(err) => {
                                // Conversion failure is a validation-class
                                // rejection: canonical 400, reason logged only.
                                debug!(
                                    request_id = %request_id,
                                    error = %err,
                                    "Typed conversion failed"
                                );
                                let _ = reply_tx.send(HandlerResponse::bad_request());
                                return;
                            }
                        };

                        let response = handler.handle(typed);

                        match serde_json::to_value(response) {
                            Ok(body) => {
                                let _ = reply_tx.send(HandlerResponse::new(200, body));
                            }
                            Err(err) => {
                                // Dropping the reply maps to the canonical
                                // internal error on the dispatcher side.
                                error!(
                                    request_id = %request_id,
                                    error = %err,
                                    "Failed to serialize handler response"
                                );
                            }
                        }
                    }));

                    if let Err(panic) = result {
                        error!(
                            request_id = %request_id,
                            panic_message = ?panic,
                            "Typed handler panicked"
                        );
                    }
                }
            })
    };

    if let Err(e) = spawn_result {
        error!(error = %e, stack_size, "Failed to spawn typed handler coroutine");
    }

    tx
}

impl Dispatcher {
    /// Bind a typed handler to a method behind the given gates.
    ///
    /// The handler's request type is converted from the merged event with
    /// `TryFrom`; its response type is serialized to JSON and replied with
    /// status 200.
    ///
    /// # Safety
    ///
    /// This function is unsafe because it internally calls [`spawn_typed`],
    /// with the same requirements: the May coroutine runtime must be
    /// initialized and the handler safe to run concurrently.
    pub unsafe fn bind_typed<H>(&mut self, method: Method, gates: Gates, handler: H)
    where
        H: Handler + Send + 'static,
    {
        let tx = unsafe { spawn_typed(handler) };
        self.bind_sender(method, gates, tx);
    }
}
