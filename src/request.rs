//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

use crate::fault::Fault;
use crate::status::Status;

/// An incoming HTTP request, fully buffered.
///
/// One `Request` exists per inbound request and is never shared between
/// requests. Middleware may mutate it in their before-hooks; the
/// [`state`](Request::state) bag is where they leave data for each other and
/// for the handler.
///
/// # Query parameters
///
/// When a key repeats, [`query`](Request::query) returns the **first**
/// occurrence. [`query_all`](Request::query_all) returns every value in the
/// order they appeared.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: http::Method,
    pub(crate) path: String,
    pub(crate) raw_query: Option<String>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) state: Extensions,
}

impl Request {
    /// Assembles a request from the pieces a transport delivers.
    pub fn from_parts(method: http::Method, uri: &http::Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self::assemble(method, uri.path(), uri.query(), headers, body)
    }

    /// Builder, mostly useful in tests and custom transports.
    pub fn builder() -> RequestBuilder {
        RequestBuilder {
            method: http::Method::GET,
            target: "/".to_owned(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    fn assemble(
        method: http::Method,
        path: &str,
        raw_query: Option<&str>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        let query = raw_query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            method,
            path: path.to_owned(),
            raw_query: raw_query.map(str::to_owned),
            query,
            headers,
            body,
            params: HashMap::new(),
            state: Extensions::new(),
        }
    }

    pub fn method(&self) -> &http::Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The undecoded query string, without the leading `?`.
    pub fn query_string(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    /// First value of a query parameter, percent-decoded.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Every value of a query parameter, in order of appearance.
    pub fn query_all(&self, name: &str) -> Vec<&str> {
        self.query.iter().filter(|(k, _)| k == name).map(|(_, v)| v.as_str()).collect()
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII
    /// are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Deserializes a JSON body.
    ///
    /// Fails with `415` when the content-type is not `application/json` and
    /// with `400` when the body does not parse.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Fault> {
        let is_json = self
            .header(CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.starts_with("application/json"));
        if !is_json {
            return Err(Fault::new(Status::UnsupportedMediaType));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| Fault::new(Status::BadRequest).with_message(format!("invalid JSON body: {e}")))
    }

    /// Per-request typed storage shared by middleware and the handler.
    pub fn state(&self) -> &Extensions { &self.state }
    pub fn state_mut(&mut self) -> &mut Extensions { &mut self.state }
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Fluent builder for [`Request`]. Invalid headers surface from
/// [`build`](RequestBuilder::build).
pub struct RequestBuilder {
    method: http::Method,
    target: String,
    headers: HeaderMap,
    body: Bytes,
    error: Option<http::Error>,
}

impl RequestBuilder {
    pub fn method(mut self, method: http::Method) -> Self {
        self.method = method;
        self
    }

    /// Path with an optional query string, e.g. `/users?page=2`.
    pub fn uri(mut self, target: &str) -> Self {
        target.clone_into(&mut self.target);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            (Err(e), _) => self.error = self.error.or(Some(e.into())),
            (_, Err(e)) => self.error = self.error.or(Some(e.into())),
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Result<Request, http::Error> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let (path, query) = match self.target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (self.target.as_str(), None),
        };
        Ok(Request::assemble(self.method, path, query, self.headers, self.body))
    }
}
