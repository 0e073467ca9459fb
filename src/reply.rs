//! What handlers return, before it becomes a [`Response`].
//!
//! A handler may return any [`IntoReply`] type. The value is first lowered to a
//! [`Reply`], an untyped description of "text", "bytes", "structured data",
//! "a finished response" or "one of those with a status override", and then
//! the [`ResponseAdapter`](crate::ResponseAdapter) turns the `Reply` into a
//! [`Response`].
//!
//! ```rust
//! use serde::Serialize;
//! use tsumugi::{HandlerError, Json, Request, Status};
//!
//! #[derive(Serialize)]
//! struct User { id: u64, name: String }
//!
//! async fn hello(_req: Request) -> &'static str { "hello" }
//!
//! async fn get_user(_req: Request) -> Json<User> {
//!     Json(User { id: 1, name: "alice".into() })
//! }
//!
//! async fn create_user(_req: Request) -> Result<(Status, Json<User>), HandlerError> {
//!     Ok((Status::Created, Json(User { id: 2, name: "bob".into() })))
//! }
//! ```

use bytes::Bytes;
use serde::Serialize;

use crate::error::Error;
use crate::fault::HandlerError;
use crate::response::Response;
use crate::status::Status;

/// A handler's raw return value.
#[derive(Debug)]
pub enum Reply {
    Text(String),
    Binary(Bytes),
    /// Structured data, serialized as JSON when it is an object or array.
    Data(serde_json::Value),
    Response(Response),
    /// A reply with an explicit status code.
    WithStatus(u16, Box<Reply>),
}

/// Result of running a handler: a reply, or the reason there is none.
pub type Outcome = Result<Reply, HandlerError>;

/// Conversion of a handler's return value into an [`Outcome`].
///
/// Implement it on your own types to return them directly from handlers.
pub trait IntoReply {
    fn into_reply(self) -> Outcome;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Outcome { Ok(self) }
}

impl IntoReply for Response {
    fn into_reply(self) -> Outcome { Ok(Reply::Response(self)) }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Outcome { Ok(Reply::Text(self.to_owned())) }
}

impl IntoReply for String {
    fn into_reply(self) -> Outcome { Ok(Reply::Text(self)) }
}

impl IntoReply for Vec<u8> {
    fn into_reply(self) -> Outcome { Ok(Reply::Binary(self.into())) }
}

impl IntoReply for Bytes {
    fn into_reply(self) -> Outcome { Ok(Reply::Binary(self)) }
}

impl IntoReply for serde_json::Value {
    fn into_reply(self) -> Outcome { Ok(Reply::Data(self)) }
}

/// Return a [`Status`] directly from a handler: `return Status::NoContent`
impl IntoReply for Status {
    fn into_reply(self) -> Outcome { Ok(Reply::Response(Response::status(self))) }
}

impl<T: IntoReply> IntoReply for (Status, T) {
    fn into_reply(self) -> Outcome {
        let (status, body) = self;
        Ok(Reply::WithStatus(status.code(), Box::new(body.into_reply()?)))
    }
}

/// Raw status code. Codes outside the registered set are rejected by the
/// adapter, not here.
impl<T: IntoReply> IntoReply for (u16, T) {
    fn into_reply(self) -> Outcome {
        let (code, body) = self;
        Ok(Reply::WithStatus(code, Box::new(body.into_reply()?)))
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<HandlerError>,
{
    fn into_reply(self) -> Outcome {
        match self {
            Ok(value) => value.into_reply(),
            Err(err) => Err(err.into()),
        }
    }
}

// ── Json ──────────────────────────────────────────────────────────────────────

/// Structured data serialized with serde.
///
/// A value whose `Serialize` impl fails (a map with non-string keys, a
/// custom impl returning an error) cannot be adapted and ends as a `500`.
#[derive(Clone, Debug)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Outcome {
        serde_json::to_value(&self.0)
            .map(Reply::Data)
            .map_err(|e| HandlerError::internal(Error::UnadaptableResponseType(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::fault::Fault;

    #[test]
    fn status_pairs_nest_the_inner_reply() {
        match (Status::Created, "made").into_reply().unwrap() {
            Reply::WithStatus(201, inner) => assert!(matches!(*inner, Reply::Text(ref t) if t == "made")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn err_results_keep_their_classification() {
        let faulted: Result<&'static str, Fault> = Err(Fault::new(Status::Unauthorized));
        assert!(matches!(faulted.into_reply(), Err(HandlerError::Fault(f)) if f.status() == Status::Unauthorized));

        let broken: Result<&'static str, std::io::Error> = Err(std::io::Error::other("boom"));
        assert!(matches!(broken.into_reply(), Err(HandlerError::Internal(_))));
    }

    #[test]
    fn json_with_non_string_keys_is_unadaptable() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys cannot be JSON object keys");
        assert!(matches!(Json(map).into_reply(), Err(HandlerError::Internal(_))));
    }
}
