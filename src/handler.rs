//! Handler trait and type erasure.
//!
//! Routes store handlers as `Arc<dyn ErasedHandler>`. Calling one wraps the
//! user's future so that its return value is lowered through [`IntoReply`]
//! into an [`Outcome`] before the dispatcher sees it.
//!
//! # The request slot
//!
//! Every handler must take the [`Request`] as its one argument. That rule is
//! checked by the `Handler` bound when the route is registered: a function
//! with any other signature simply does not implement `Handler`, and the
//! registration call does not compile.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::reply::{IntoReply, Outcome};
use crate::request::Request;

// ── Internal types ────────────────────────────────────────────────────────────

/// Future returned by an erased handler.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

/// Object-safe view of a handler. Public only because it shows up in
/// [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A handler as the route table stores it.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Anything callable as `Fn(Request) -> impl Future<Output = impl IntoReply>`.
///
/// Sealed. `async fn`s and closures returning futures get it from the
/// blanket impl; there is nothing to implement by hand.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_reply() })
    }
}
