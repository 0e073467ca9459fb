//! Classified failures and the handler error type.
//!
//! Handlers and middleware fail in one of two ways:
//!
//! - a [`Fault`]: an expected outcome with an explicit HTTP status
//!   (`401` from an auth check, `404` for a missing record). The client sees
//!   that status and the fault's message, nothing else.
//! - an internal error: anything else. The client sees a generic `500`; the
//!   full error goes to the log.
//!
//! [`HandlerError`] carries either. Any `std::error::Error` converts into the
//! internal variant, so `?` works inside handlers:
//!
//! ```rust
//! use tsumugi::{Fault, HandlerError, Request, Status};
//!
//! async fn read_config(req: Request) -> Result<String, HandlerError> {
//!     let name = req.query("name").ok_or(Fault::new(Status::BadRequest))?;
//!     let text = std::fs::read_to_string(name)?; // io::Error → 500
//!     Ok(text)
//! }
//! ```

use std::fmt;

use crate::response::Response;
use crate::status::Status;

/// Boxed, thread-safe error used for unclassified failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An expected failure with an explicit HTTP status and optional message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fault {
    status: Status,
    message: Option<String>,
}

impl Fault {
    pub fn new(status: Status) -> Self {
        Self { status, message: None }
    }

    /// Attach a client-facing message. It becomes the response body.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {msg}", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}

/// Body is the message when present, otherwise the reason phrase.
impl From<Fault> for Response {
    fn from(fault: Fault) -> Self {
        let body = fault.message.unwrap_or_else(|| fault.status.reason().to_owned());
        Response::builder().status(fault.status).text(body)
    }
}

/// Failure signalled by a handler or a middleware hook.
///
/// Deliberately not a `std::error::Error` itself, so the blanket conversion
/// from any error type can coexist with `From<Fault>`.
#[derive(Debug)]
pub enum HandlerError {
    Fault(Fault),
    Internal(BoxError),
}

impl HandlerError {
    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fault(fault) => write!(f, "fault: {fault}"),
            Self::Internal(err) => write!(f, "internal error: {err}"),
        }
    }
}

impl From<Fault> for HandlerError {
    fn from(fault: Fault) -> Self {
        Self::Fault(fault)
    }
}

impl From<Status> for HandlerError {
    fn from(status: Status) -> Self {
        Self::Fault(Fault::new(status))
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::Internal(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_response_uses_message_then_reason() {
        let res = Response::from(Fault::new(Status::Unauthorized).with_message("missing key"));
        assert_eq!(res.status_code(), 401);
        assert_eq!(res.body(), b"missing key".as_slice());

        let res = Response::from(Fault::new(Status::NotFound));
        assert_eq!(res.body(), b"Not Found".as_slice());
    }

    #[test]
    fn std_errors_become_internal() {
        let io = std::io::Error::other("disk on fire");
        assert!(matches!(HandlerError::from(io), HandlerError::Internal(_)));
        assert!(matches!(
            HandlerError::from(Status::Forbidden),
            HandlerError::Fault(f) if f.status() == Status::Forbidden
        ));
    }
}
