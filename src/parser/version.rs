//! HTTP protocol versions.

use std::fmt;
use std::str::FromStr;

use crate::parser::error::Error;

/// Protocol versions accepted on the request line.
///
/// Responses are always written as HTTP/1.1 with `Connection: close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
    Http20,
}

impl FromStr for HttpVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP/1.0" => Ok(HttpVersion::Http10),
            "HTTP/1.1" => Ok(HttpVersion::Http11),
            "HTTP/2" | "HTTP/2.0" => Ok(HttpVersion::Http20),
            _ => Err(Error::InvalidVersion(s.to_string())),
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
            HttpVersion::Http20 => "HTTP/2",
        };
        f.write_str(token)
    }
}
