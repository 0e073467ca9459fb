//! HTTP method as a typed enum.
//!
//! Only the five verbs a route can be registered under are represented.
//! Any other method string is rejected at registration time with
//! [`Error::UnsupportedMethod`]; at request time an unknown method on a known
//! path resolves to `405 Method Not Allowed`.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A method a route can be registered under.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub const ALL: [Method; 5] = [Self::Get, Self::Post, Self::Put, Self::Delete, Self::Patch];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get    => "GET",
            Self::Patch  => "PATCH",
            Self::Post   => "POST",
            Self::Put    => "PUT",
        }
    }

    /// Maps an inbound method. Anything outside the supported set is `None`.
    pub fn from_http(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::DELETE => Some(Self::Delete),
            http::Method::GET    => Some(Self::Get),
            http::Method::PATCH  => Some(Self::Patch),
            http::Method::POST   => Some(Self::Post),
            http::Method::PUT    => Some(Self::Put),
            _                    => None,
        }
    }
}

/// Parses a method name. Registration input is upper-cased first, so
/// `"get"` and `"GET"` are the same verb.
impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DELETE" => Ok(Self::Delete),
            "GET"    => Ok(Self::Get),
            "PATCH"  => Ok(Self::Patch),
            "POST"   => Ok(Self::Post),
            "PUT"    => Ok(Self::Put),
            _        => Err(Error::UnsupportedMethod(s.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Patch".parse::<Method>().unwrap(), Method::Patch);
    }

    #[test]
    fn rejects_verbs_outside_the_supported_set() {
        let err = "OPTIONS".parse::<Method>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedMethod(m) if m == "OPTIONS"));
        assert_eq!(Method::from_http(&http::Method::HEAD), None);
    }
}
