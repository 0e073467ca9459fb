//! Unified error type.

use crate::config::ConfigError;
use crate::method::Method;

/// The error type returned by tsumugi's fallible operations.
///
/// Everything here is a startup failure (registering routes and middleware,
/// loading configuration, binding a socket), with one exception:
/// [`Error::UnadaptableResponseType`] comes from the response adapter at
/// request time and is always answered with a `500`.
///
/// Application-level failures (404, 401, 422 …) are [`Fault`](crate::Fault)s,
/// not `Error`s.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },

    #[error("unsupported method `{0}`, expected one of GET, POST, PUT, DELETE, PATCH")]
    UnsupportedMethod(String),

    #[error("invalid route `{path}`: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("no middleware named `{0}` in the registry")]
    UnknownMiddleware(String),

    #[error("middleware `{name}` rejected its parameters: {reason}")]
    InvalidMiddlewareType { name: String, reason: String },

    #[error("handler returned a value that cannot be turned into a response: {0}")]
    UnadaptableResponseType(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
