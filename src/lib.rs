//! # tsumugi
//!
//! A minimal HTTP application framework: a route table, before/after
//! middleware, and a response adapter that turns whatever a handler returns
//! into a proper HTTP response.
//!
//! ## The pipeline
//!
//! Every request takes the same path through the [`Dispatcher`]:
//!
//! - **Resolve**: radix-tree lookup via [`matchit`]. Unknown paths are `404`;
//!   a known path under another method is `405` with an `allow` header.
//! - **Before-hooks**: the route's middleware chain, global entries first.
//!   Any hook may stop the request.
//! - **Handler**: `async fn(Request) -> impl IntoReply`.
//! - **Adapt**: strings become text, serde values become JSON, `(Status, T)`
//!   pairs override the status. See [`ResponseAdapter`].
//! - **After-hooks**: reverse chain order, for every middleware that ran.
//!
//! Failures are classified once. A [`Fault`] carries its own status to the
//! client; any other error becomes a generic `500` and is logged in full.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde::Serialize;
//! use tsumugi::middleware::{ApiKey, Logger};
//! use tsumugi::{App, Fault, HandlerError, Json, Method, Request, RouteOptions, Server, Status};
//!
//! #[derive(Serialize)]
//! struct User { id: String, name: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tsumugi::Error> {
//!     let mut app = App::new();
//!     app.register_middleware(Logger)
//!         .get("/users/{id}", get_user)?
//!         .on(Method::Post, "/users", create_user, RouteOptions::new().middleware(ApiKey::new("s3cret")))?;
//!
//!     Server::bind("0.0.0.0:3000").serve(app.build()).await
//! }
//!
//! async fn get_user(req: Request) -> Result<Json<User>, HandlerError> {
//!     let id = req.param("id").ok_or(Fault::new(Status::BadRequest))?;
//!     Ok(Json(User { id: id.to_owned(), name: "alice".into() }))
//! }
//!
//! async fn create_user(req: Request) -> Result<(Status, String), HandlerError> {
//!     if req.body().is_empty() {
//!         return Err(Fault::new(Status::BadRequest).with_message("empty body").into());
//!     }
//!     Ok((Status::Created, "created".to_owned()))
//! }
//! ```
//!
//! ## Configuration
//!
//! [`Config`] reads `application.yaml`: socket, global middleware by name,
//! and application constants. [`App::from_config`] wires it up through the
//! [`middleware::MiddlewareRegistry`].

mod adapter;
mod app;
mod config;
mod context;
mod dispatcher;
mod error;
mod fault;
mod handler;
mod method;
mod reply;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod middleware;

pub use adapter::ResponseAdapter;
pub use app::App;
pub use config::{CONFIG_FILE, Config, ConfigError, MiddlewareSpec, SocketConfig};
pub use context::Context;
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use fault::{BoxError, Fault, HandlerError};
pub use handler::Handler;
pub use method::Method;
pub use reply::{IntoReply, Json, Outcome, Reply};
pub use request::{Request, RequestBuilder};
pub use response::{ContentType, Response, ResponseBuilder};
pub use router::{Resolution, Route, RouteOptions, RouteTable};
pub use server::{Server, serve_listener};
pub use status::Status;
