//! Configuration loading from `application.yaml`.
//!
//! ```yaml
//! socket:
//!   host: 0.0.0.0
//!   port: 8080
//!
//! middlewares:
//!   - logger                      # bare name, no params
//!   - name: rate_limit
//!     params: { calls: 100, period_secs: 60 }
//!
//! final:                          # constants, keys upper-cased on load
//!   api_key: s3cret
//!
//! debug: false                    # expose internal error text in 500 bodies
//! text_content_type: text         # or html
//! ```
//!
//! Every section is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::middleware::Params;
use crate::response::ContentType;

/// File name looked up by [`Config::load_dir`].
pub const CONFIG_FILE: &str = "application.yaml";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3323;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Parsed `application.yaml`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub socket: SocketConfig,
    pub middlewares: Vec<MiddlewareSpec>,
    #[serde(rename = "final")]
    pub constants: Map<String, Value>,
    pub debug: bool,
    pub text_content_type: ContentType,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    pub host: String,
    pub port: u16,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self { host: DEFAULT_HOST.to_owned(), port: DEFAULT_PORT }
    }
}

/// One configured middleware: registry name plus constructor params.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(from = "RawMiddlewareSpec")]
pub struct MiddlewareSpec {
    pub name: String,
    pub params: Params,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMiddlewareSpec {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        params: Params,
    },
}

impl From<RawMiddlewareSpec> for MiddlewareSpec {
    fn from(raw: RawMiddlewareSpec) -> Self {
        match raw {
            RawMiddlewareSpec::Name(name) => Self { name, params: Params::new() },
            RawMiddlewareSpec::Full { name, params } => Self { name, params },
        }
    }
}

impl Config {
    /// Loads and parses a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
        Self::from_yaml_str(&content)
    }

    /// Loads `application.yaml` from a directory.
    pub fn load_dir(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(root.as_ref().join(CONFIG_FILE))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // an empty document is an empty config, not an error
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Global middleware, in the order they are listed.
    pub fn get_middleware(&self) -> &[MiddlewareSpec] {
        &self.middlewares
    }

    pub fn get_socket_info(&self) -> (&str, u16) {
        (&self.socket.host, self.socket.port)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::*;

    const SAMPLE: &str = r#"
socket:
  host: 0.0.0.0
  port: 8080
middlewares:
  - logger
  - name: rate_limit
    params:
      calls: 10
      period_secs: 60
final:
  api_key: s3cret
  db:
    url: postgres://localhost
debug: true
text_content_type: html
"#;

    #[test]
    fn parses_every_section() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.get_socket_info(), ("0.0.0.0", 8080));
        let names: Vec<&str> = config.get_middleware().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["logger", "rate_limit"]);
        assert!(config.middlewares[0].params.is_empty());
        assert_eq!(config.middlewares[1].params["calls"], json!(10));
        assert_eq!(config.constants["db"], json!({"url": "postgres://localhost"}));
        assert!(config.debug);
        assert_eq!(config.text_content_type, ContentType::Html);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config = Config::from_yaml_str("middlewares: [logger]").unwrap();
        assert_eq!(config.get_socket_info(), (DEFAULT_HOST, DEFAULT_PORT));
        assert!(!config.debug);
        assert_eq!(config.text_content_type, ContentType::Text);

        let empty = Config::from_yaml_str("").unwrap();
        assert!(empty.get_middleware().is_empty());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = Config::from_yaml_str("socket: [unterminated").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.socket.port, 8080);

        let missing = Config::load_dir("/definitely/not/here").unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
