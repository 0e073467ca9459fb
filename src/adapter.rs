//! Turns a handler's [`Reply`] into a [`Response`].

use serde_json::Value;

use crate::error::Error;
use crate::reply::Reply;
use crate::response::{ContentType, Response};
use crate::status::Status;

/// Normalizes handler replies into canonical responses.
///
/// | Reply | Response |
/// |---|---|
/// | `Text` | 200, text content-type (`text/plain` unless configured) |
/// | `Binary` | 200, `application/octet-stream` |
/// | `Data` object / array | 200, `application/json` |
/// | `Data` string / number / bool | 200, the value as text |
/// | `Data` null | [`Error::UnadaptableResponseType`] |
/// | `Response` | unchanged |
/// | `WithStatus(code, r)` | `r` normalized, status replaced by `code` |
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseAdapter {
    text_content_type: ContentType,
}

impl ResponseAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type for `Reply::Text`, typically `Text` or `Html`.
    pub fn with_text_content_type(mut self, content_type: ContentType) -> Self {
        self.text_content_type = content_type;
        self
    }

    pub fn text_content_type(&self) -> ContentType {
        self.text_content_type
    }

    pub fn normalize(&self, reply: Reply) -> Result<Response, Error> {
        match reply {
            Reply::Text(text) => Ok(self.text(text)),
            Reply::Binary(bytes) => Ok(Response::builder().bytes(ContentType::OctetStream, bytes)),
            Reply::Data(value) => self.data(value),
            Reply::Response(response) => Ok(response),
            Reply::WithStatus(code, inner) => {
                let status = Status::from_code(code).ok_or_else(|| {
                    Error::UnadaptableResponseType(format!("unknown status code {code}"))
                })?;
                let mut response = self.normalize(*inner)?;
                response.set_status(status);
                Ok(response)
            }
        }
    }

    fn text(&self, text: String) -> Response {
        Response::builder().bytes(self.text_content_type, text)
    }

    fn data(&self, value: Value) -> Result<Response, Error> {
        match value {
            Value::Null => Err(Error::UnadaptableResponseType(
                "null has no response representation".to_owned(),
            )),
            Value::String(s) => Ok(self.text(s)),
            Value::Bool(_) | Value::Number(_) => Ok(self.text(value.to_string())),
            Value::Array(_) | Value::Object(_) => serde_json::to_vec(&value)
                .map(Response::json)
                .map_err(|e| Error::UnadaptableResponseType(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn mapping_becomes_json() {
        let res = ResponseAdapter::new().normalize(Reply::Data(json!({"x": 1}))).unwrap();
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body, json!({"x": 1}));
    }

    #[test]
    fn list_of_records_becomes_json() {
        let res = ResponseAdapter::new()
            .normalize(Reply::Data(json!([{"id": 1}, {"id": 2}])))
            .unwrap();
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body(), br#"[{"id":1},{"id":2}]"#.as_slice());
    }

    #[test]
    fn text_uses_the_configured_content_type() {
        let plain = ResponseAdapter::new().normalize(Reply::Text("hi".into())).unwrap();
        assert_eq!(plain.header("content-type"), Some("text/plain; charset=utf-8"));

        let html = ResponseAdapter::new()
            .with_text_content_type(ContentType::Html)
            .normalize(Reply::Text("<p>hi</p>".into()))
            .unwrap();
        assert_eq!(html.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(html.body(), b"<p>hi</p>".as_slice());
    }

    #[test]
    fn scalars_are_rendered_as_text() {
        let res = ResponseAdapter::new().normalize(Reply::Data(json!(42))).unwrap();
        assert_eq!(res.body(), b"42".as_slice());
        assert_eq!(res.status_code(), 200);
    }

    #[test]
    fn binary_is_octet_stream() {
        let res = ResponseAdapter::new().normalize(Reply::Binary(bytes::Bytes::from_static(&[0, 1, 2]))).unwrap();
        assert_eq!(res.header("content-type"), Some("application/octet-stream"));
        assert_eq!(res.body(), &[0u8, 1, 2][..]);
    }

    #[test]
    fn responses_pass_through_unchanged() {
        let original = Response::builder().status(Status::Accepted).header("x-a", "1").text("queued");
        let res = ResponseAdapter::new().normalize(Reply::Response(original.clone())).unwrap();
        assert_eq!(res, original);
    }

    #[test]
    fn status_pair_overrides_status() {
        let reply = Reply::WithStatus(418, Box::new(Reply::Text("short and stout".into())));
        let res = ResponseAdapter::new().normalize(reply).unwrap();
        assert_eq!(res.status_code(), 418);
        assert_eq!(res.body(), b"short and stout".as_slice());
    }

    #[test]
    fn null_and_unknown_codes_are_unadaptable() {
        let adapter = ResponseAdapter::new();
        assert!(matches!(
            adapter.normalize(Reply::Data(Value::Null)),
            Err(Error::UnadaptableResponseType(_))
        ));
        assert!(matches!(
            adapter.normalize(Reply::WithStatus(999, Box::new(Reply::Text(String::new())))),
            Err(Error::UnadaptableResponseType(_))
        ));
    }
}
