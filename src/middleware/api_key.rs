use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::registry::{Params, parse_params};
use super::{Middleware, MiddlewareId};
use crate::context::Context;
use crate::fault::{Fault, HandlerError};
use crate::request::Request;
use crate::status::Status;

const DEFAULT_HEADER: &str = "x-api-key";

/// Rejects requests that do not carry the expected key in a header.
///
/// A missing or wrong key stops the request with `401 Unauthorized`.
///
/// Only the SHA-256 digest of the key is kept. Presented keys are hashed and
/// compared digest to digest in constant time. The identity carries the
/// header name and a short fingerprint of the digest, so two `ApiKey`s with
/// different keys stay distinct in a chain while the key itself never shows
/// up in logs.
pub struct ApiKey {
    header: String,
    digest: [u8; 32],
}

#[derive(Deserialize)]
struct ApiKeyParams {
    #[serde(default = "default_header")]
    header: String,
    key: Option<String>,
}

fn default_header() -> String {
    DEFAULT_HEADER.to_owned()
}

fn sha256(value: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(value.as_bytes()));
    out
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl ApiKey {
    /// Checks the `x-api-key` header.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self::with_header(DEFAULT_HEADER, key)
    }

    pub fn with_header(header: impl Into<String>, key: impl AsRef<str>) -> Self {
        Self { header: header.into(), digest: sha256(key.as_ref()) }
    }

    /// Registry constructor. Without a `key` param the `API_KEY` constant is used.
    pub(crate) fn from_params(params: &Params, ctx: &Context) -> Result<Self, String> {
        let parsed: ApiKeyParams = parse_params(params)?;
        let key = parsed
            .key
            .or_else(|| ctx.get_str("API_KEY").map(str::to_owned))
            .ok_or("missing `key` parameter and no API_KEY constant")?;
        Ok(Self::with_header(parsed.header, key))
    }

    /// First eight digest bytes, hex encoded.
    fn fingerprint(&self) -> String {
        self.digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Middleware for ApiKey {
    fn identity(&self) -> MiddlewareId {
        MiddlewareId::new("api_key")
            .param("header", &self.header)
            .param("key", self.fingerprint())
    }

    fn before(&self, req: &mut Request) -> Result<(), HandlerError> {
        match req.header(&self.header) {
            Some(presented) if constant_time_eq(&sha256(presented), &self.digest) => Ok(()),
            Some(_) => Err(Fault::new(Status::Unauthorized).with_message("invalid api key").into()),
            None => Err(Fault::new(Status::Unauthorized).with_message("missing api key").into()),
        }
    }
}
