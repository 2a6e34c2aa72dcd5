//! Error types for the HTTP parser.

use thiserror::Error;

/// Errors that can occur during HTTP request parsing.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP method in the request is not supported.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request target is not an origin-form path.
    #[error("Invalid HTTP path")]
    InvalidPath,

    /// The request line is malformed (wrong format or missing components).
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    /// The HTTP version in the request is not supported.
    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// A header in the request has an invalid format.
    #[error("Invalid header format")]
    InvalidHeaderFormat,

    /// The request is empty.
    #[error("Empty request")]
    EmptyRequest,
}