//! Application context handed to middleware constructors and handlers.

use serde_json::{Map, Value};

use crate::config::Config;

/// Read-only application-wide values, built once at startup.
///
/// Holds the configuration's `final` constants. Keys are upper-cased at every
/// nesting level, and [`get`](Context::get) upper-cases its argument, so
/// `get("db_url")` and `get("DB_URL")` are the same lookup.
///
/// Handlers receive it by capturing the `Arc` returned from
/// [`App::context`](crate::App::context); registry constructors receive it as
/// an argument.
#[derive(Clone, Debug, Default)]
pub struct Context {
    constants: Map<String, Value>,
}

impl Context {
    pub fn new(constants: Map<String, Value>) -> Self {
        Self { constants: uppercase_keys(constants) }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.constants.clone())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.constants.get(&key.to_ascii_uppercase())
    }

    /// String constant, `None` when absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn constants(&self) -> &Map<String, Value> {
        &self.constants
    }
}

fn uppercase_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| (k.to_ascii_uppercase(), uppercase_nested(v)))
        .collect()
}

fn uppercase_nested(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(uppercase_keys(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(uppercase_nested).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keys_are_uppercased_at_every_level() {
        let Value::Object(map) = json!({
            "db": {"url": "postgres://", "pool": [{"size": 4}]},
            "name": "demo"
        }) else {
            unreachable!()
        };
        let ctx = Context::new(map);

        assert_eq!(ctx.get_str("name"), Some("demo"));
        assert_eq!(ctx.get("DB"), Some(&json!({"URL": "postgres://", "POOL": [{"SIZE": 4}]})));
        assert_eq!(ctx.get("missing"), None);
    }
}
