//! Error types for the HTTP server.

use thiserror::Error;

use crate::parser::{Error as ParserError, Method};

/// Errors that can occur while serving a connection.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error, including a transfer aborted mid-stream.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Requested route or shared file not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A shared file's backing file has gone from disk.
    #[error("File not found on disk: {0}")]
    FileMissing(String),

    /// Method not allowed for the requested resource.
    #[error("Method {0} not allowed for path: {1}")]
    MethodNotAllowed(Method, String),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The client did not send a complete request head in time.
    #[error("Timed out waiting for request")]
    Timeout,
}

impl Error {
    /// Whether the error is an ordinary 4xx outcome rather than a server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ParseError(_)
                | Error::NotFound(_)
                | Error::FileMissing(_)
                | Error::MethodNotAllowed(_, _)
                | Error::Timeout
        )
    }
}
