//! Name → constructor table for middleware configured by string.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{ApiKey, Logger, RateLimit, SharedMiddleware};
use crate::context::Context;
use crate::error::Error;

/// Constructor parameters, as written in configuration.
pub type Params = serde_json::Map<String, Value>;

type Constructor =
    Box<dyn Fn(&Params, &Context) -> Result<SharedMiddleware, String> + Send + Sync + 'static>;

/// Maps middleware names to constructors.
///
/// Populated at startup and consulted when configuration names a middleware.
/// [`MiddlewareRegistry::default`] knows the built-ins:
///
/// | Name | Type | Params |
/// |---|---|---|
/// | `logger` | [`Logger`] | none |
/// | `api_key` | [`ApiKey`] | `key` (or the `API_KEY` constant), `header` (default `x-api-key`) |
/// | `rate_limit` | [`RateLimit`] | `calls`, `period_secs` or `period_ms` |
///
/// ```rust
/// use std::sync::Arc;
/// use tsumugi::middleware::{Logger, MiddlewareRegistry};
///
/// let mut registry = MiddlewareRegistry::new();
/// registry.register("access_log", |_params, _ctx| Ok(Arc::new(Logger)));
/// assert!(registry.contains("access_log"));
/// ```
pub struct MiddlewareRegistry {
    constructors: HashMap<String, Constructor>,
}

impl MiddlewareRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { constructors: HashMap::new() }
    }

    /// Adds or replaces a constructor. The closure reports bad parameters as
    /// a plain message.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> &mut Self
    where
        F: Fn(&Params, &Context) -> Result<SharedMiddleware, String> + Send + Sync + 'static,
    {
        self.constructors.insert(name.to_owned(), Box::new(constructor));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Instantiates the middleware registered under `name`.
    pub fn build(&self, name: &str, params: &Params, ctx: &Context) -> Result<SharedMiddleware, Error> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| Error::UnknownMiddleware(name.to_owned()))?;
        constructor(params, ctx).map_err(|reason| Error::InvalidMiddlewareType {
            name: name.to_owned(),
            reason,
        })
    }
}

impl Default for MiddlewareRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register("logger", |_, _| Ok(Arc::new(Logger)))
            .register("api_key", |params, ctx| Ok(Arc::new(ApiKey::from_params(params, ctx)?)))
            .register("rate_limit", |params, _| Ok(Arc::new(RateLimit::from_params(params)?)));
        registry
    }
}

/// Deserializes constructor parameters into a typed struct.
pub(crate) fn parse_params<T: DeserializeOwned>(params: &Params) -> Result<T, String> {
    serde_json::from_value(Value::Object(params.clone())).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    #[test]
    fn builds_builtins_by_name() {
        let registry = MiddlewareRegistry::default();
        let ctx = Context::default();

        let logger = registry.build("logger", &Params::new(), &ctx).unwrap();
        assert_eq!(logger.identity().to_string(), "logger");

        let limit = registry
            .build("rate_limit", &params(json!({"calls": 5, "period_secs": 1})), &ctx)
            .unwrap();
        assert_eq!(limit.identity().to_string(), "rate_limit(calls=5,period=1s)");

        assert_eq!(registry.names(), ["api_key", "logger", "rate_limit"]);
    }

    #[test]
    fn unknown_names_fail() {
        let err = MiddlewareRegistry::default()
            .build("gzip", &Params::new(), &Context::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnknownMiddleware(name) if name == "gzip"));
    }

    #[test]
    fn bad_params_fail_with_the_middleware_name() {
        let err = MiddlewareRegistry::default()
            .build("rate_limit", &params(json!({"calls": "many"})), &Context::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidMiddlewareType { name, .. } if name == "rate_limit"));
    }

    #[test]
    fn custom_constructors_replace_defaults() {
        let mut registry = MiddlewareRegistry::default();
        registry.register("logger", |_, _| Err("disabled in tests".to_owned()));
        assert!(registry.build("logger", &Params::new(), &Context::default()).is_err());
    }
}
