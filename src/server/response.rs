//! HTTP response types and utilities.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::server::error::Error;

/// HTTP status codes the share server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    InternalServerError = 500,
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

/// Represents an HTTP response with a buffered body.
///
/// File downloads send only the head through this type and stream the body
/// separately.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// The HTTP headers
    pub headers: BTreeMap<String, String>,
    /// The response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a new HTTP response with the given status code.
    ///
    /// Every connection carries exactly one request, so `Connection: close`
    /// is always set.
    pub fn new(status: StatusCode) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Server".to_string(), "lanshare".to_string());
        headers.insert("Connection".to_string(), "close".to_string());

        Self {
            status,
            headers,
            body: Vec::new(),
        }
    }

    /// A `text/plain` response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_content_type("text/plain; charset=utf-8")
            .with_body_string(body)
    }

    /// Set the response body with a string.
    pub fn with_body_string(self, body: impl Into<String>) -> Self {
        self.with_body_bytes(body.into().into_bytes())
    }

    /// Set the response body with bytes.
    pub fn with_body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        let content_length = self.body.len().to_string();
        self.with_header("Content-Length", content_length)
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the content type.
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    /// Set the response body with a JSON value.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(value)?;
        Ok(self
            .with_content_type("application/json")
            .with_body_bytes(json))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialize the status line and headers, including the blank line.
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.reason_phrase()
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("\r\n");
        head.into_bytes()
    }

    /// Convert the whole response to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.head_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Write the response and flush.
    pub async fn write_to<W>(&self, socket: &mut W) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        socket.write_all(&self.to_bytes()).await?;
        socket.flush().await?;
        Ok(())
    }
}
