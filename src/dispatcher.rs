//! Request dispatch: route → middleware → handler → response.
//!
//! ```text
//! resolve ──► 404 / 405 (no middleware runs)
//!    │
//! before-hooks, chain order ──► first failure stops here ─┐
//!    │                                                    │
//! handler                                                 │
//!    │                                                    │
//! reply → Response  |  Fault → its status  |  error → 500 ◄┘
//!    │
//! after-hooks, reverse order, only for middleware whose before completed
//!    │
//! status pinned for fault / error responses
//! ```
//!
//! # Policies
//!
//! - After-hooks see fault and error responses too. They may add headers or
//!   rewrite the body, but the status of such a response is restored once
//!   they have run: a `404` fault leaves as a `404`.
//! - After-hooks receive the request as the handler received it, including
//!   state written by before-hooks.
//! - A failing after-hook (fault or error) turns the response into a `500`
//!   and the remaining after-hooks are skipped.
//! - Panics in handlers and hooks are caught and treated as internal errors.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::{Instrument, debug, debug_span, error};

use crate::adapter::ResponseAdapter;
use crate::fault::{Fault, HandlerError};
use crate::reply::Outcome;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Resolution, Route, RouteTable};
use crate::status::Status;

/// The frozen application: routes with composed chains plus response policy.
///
/// Built by [`App::build`](crate::App::build). Immutable, `Send + Sync`;
/// share it behind an `Arc`.
pub struct Dispatcher {
    table: RouteTable,
    adapter: ResponseAdapter,
    expose_errors: bool,
}

impl Dispatcher {
    pub(crate) fn new(table: RouteTable, adapter: ResponseAdapter, expose_errors: bool) -> Self {
        Self { table, adapter, expose_errors }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    /// Turns one request into one response. Never fails.
    pub async fn dispatch(&self, req: Request) -> Response {
        let span = debug_span!("dispatch", method = %req.method(), path = %req.path());
        self.run(req).instrument(span).await
    }

    async fn run(&self, mut req: Request) -> Response {
        let (route, params) = match self.table.resolve(req.path(), req.method()) {
            Resolution::Found { route, params } => (route, params),
            Resolution::MethodNotAllowed { allowed } => {
                debug!("method not allowed");
                let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                let mut res = Response::from(Fault::new(Status::MethodNotAllowed));
                res.set_header("allow", allow);
                return res;
            }
            Resolution::NotFound => {
                debug!("no route");
                return Response::from(Fault::new(Status::NotFound));
            }
        };
        req.params = params;

        let chain = route.chain();
        let mut entered = 0;
        let mut failure = None;
        for mw in chain {
            match guarded("before-hook", || mw.before(&mut req)) {
                Ok(()) => entered += 1,
                Err(err) => {
                    debug!(middleware = %mw.identity(), "before-hook stopped the request");
                    failure = Some(err);
                    break;
                }
            }
        }

        let (outcome, view) = match failure {
            Some(err) => (Err(err), Some(req)),
            None => {
                let view = (entered > 0).then(|| req.clone());
                (self.invoke(route, req).await, view)
            }
        };

        let (mut response, mut pinned) = self.settle(outcome);

        if let Some(view) = &view {
            for mw in chain[..entered].iter().rev() {
                if let Err(err) = guarded("after-hook", || mw.after(view, &mut response)) {
                    response = self.internal_error(&format_args!("after-hook {}: {err}", mw.identity()));
                    pinned = Some(Status::InternalServerError.code());
                    break;
                }
            }
        }

        if let Some(code) = pinned {
            response.status = code;
        }
        response
    }

    async fn invoke(&self, route: &Route, req: Request) -> Outcome {
        let handler = route.handler();
        AssertUnwindSafe(async move { handler.call(req).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(HandlerError::internal(format!("handler panicked: {}", panic_message(&*payload))))
            })
    }

    /// Maps an outcome to a response and, for failures, the status to pin.
    fn settle(&self, outcome: Outcome) -> (Response, Option<u16>) {
        let normalized = outcome.and_then(|reply| self.adapter.normalize(reply).map_err(HandlerError::from));
        match normalized {
            Ok(response) => (response, None),
            Err(HandlerError::Fault(fault)) => {
                debug!(status = fault.status().code(), %fault, "request faulted");
                let code = fault.status().code();
                (Response::from(fault), Some(code))
            }
            Err(HandlerError::Internal(err)) => (
                self.internal_error(&err),
                Some(Status::InternalServerError.code()),
            ),
        }
    }

    /// Logs the full error and builds the client-facing `500`.
    fn internal_error(&self, err: &dyn fmt::Display) -> Response {
        error!(error = %err, "internal error while handling request");
        let body = if self.expose_errors {
            format!("{}: {err}", Status::InternalServerError.reason())
        } else {
            Status::InternalServerError.reason().to_owned()
        };
        Response::builder().status(Status::InternalServerError).text(body)
    }
}

/// Runs a hook, turning a panic into an internal error.
fn guarded(what: &str, hook: impl FnOnce() -> Result<(), HandlerError>) -> Result<(), HandlerError> {
    std::panic::catch_unwind(AssertUnwindSafe(hook)).unwrap_or_else(|payload| {
        Err(HandlerError::internal(format!("{what} panicked: {}", panic_message(&*payload))))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
