//! Middleware layer.
//!
//! A middleware is a pair of hooks around the handler:
//!
//! - [`before`](Middleware::before) runs on the inbound request, in chain
//!   order. It may mutate the request (attach state, rewrite headers) or stop
//!   the request with a [`Fault`](crate::Fault) or an internal error.
//! - [`after`](Middleware::after) runs on the outbound response, in reverse
//!   chain order, for every middleware whose `before` completed.
//!
//! Every middleware has a [`MiddlewareId`]: a stable name built from its type
//! and constructor parameters. Identities decide deduplication and which
//! entries a route's forbidden list removes (see [`compose`]).
//!
//! ```rust
//! use tsumugi::middleware::{Middleware, MiddlewareId};
//! use tsumugi::{HandlerError, Request, Response};
//!
//! struct PoweredBy(&'static str);
//!
//! impl Middleware for PoweredBy {
//!     fn identity(&self) -> MiddlewareId {
//!         MiddlewareId::new("powered_by").param("value", self.0)
//!     }
//!
//!     fn after(&self, _req: &Request, res: &mut Response) -> Result<(), HandlerError> {
//!         res.append_header("x-powered-by", self.0);
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Middleware instances are shared by every request running through them.
//! Anything they mutate outside the request must be synchronized by the
//! middleware itself; [`RateLimit`] is the built-in example.

mod api_key;
mod chain;
mod logger;
mod rate_limit;
mod registry;

use std::fmt;
use std::sync::Arc;

pub use api_key::ApiKey;
pub use chain::compose;
pub(crate) use chain::unmatched_forbidden;
pub use logger::Logger;
pub use rate_limit::RateLimit;
pub use registry::{MiddlewareRegistry, Params};

use crate::fault::HandlerError;
use crate::request::Request;
use crate::response::Response;

/// Before/after hooks wrapped around a handler.
pub trait Middleware: Send + Sync + 'static {
    /// Stable identity. Two instances configured the same way must return
    /// equal ids.
    fn identity(&self) -> MiddlewareId;

    fn before(&self, _req: &mut Request) -> Result<(), HandlerError> {
        Ok(())
    }

    fn after(&self, _req: &Request, _res: &mut Response) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// A middleware shared between routes and requests.
pub type SharedMiddleware = Arc<dyn Middleware>;

// ── MiddlewareId ──────────────────────────────────────────────────────────────

/// Deterministic middleware identity: a name plus ordered parameters.
///
/// Renders as `name` or `name(key=value,key=value)`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MiddlewareId {
    name: String,
    params: Vec<(String, String)>,
}

impl MiddlewareId {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), params: Vec::new() }
    }

    /// Appends a constructor parameter.
    pub fn param(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.params.push((key.to_owned(), value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MiddlewareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.params.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str(")")
    }
}

impl From<&str> for MiddlewareId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MiddlewareId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_renders_name_and_params_in_order() {
        let id = MiddlewareId::new("rate_limit").param("calls", 10).param("period_secs", 60);
        assert_eq!(id.to_string(), "rate_limit(calls=10,period_secs=60)");
        assert_eq!(MiddlewareId::from("logger").to_string(), "logger");
    }

    #[test]
    fn identically_configured_ids_are_equal() {
        let a = MiddlewareId::new("api_key").param("header", "x-api-key");
        let b = MiddlewareId::new("api_key").param("header", "x-api-key");
        let c = MiddlewareId::new("api_key").param("header", "authorization");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
