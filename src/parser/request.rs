//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Represents a parsed HTTP request head.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, including any query string
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// Percent-decoded query parameters
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    /// Create a new HTTP request.
    ///
    /// Query parameters are split out of `path` and percent-decoded. A `+` in a
    /// query value decodes to a space, matching form encoding.
    pub fn new(method: Method, path: String, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let query_params: HashMap<String, String> = path
            .split_once('?')
            .map(|(_, query)| query
                .split('&')
                .filter(|s| !s.is_empty())
                .map(|pair| {
                    if let Some((k, v)) = pair.split_once('=') {
                        (decode_component(k), decode_component(v))
                    } else {
                        (decode_component(pair), String::new())
                    }
                })
                .collect())
            .unwrap_or_default();

        Self {
            method,
            path,
            version,
            headers,
            query_params,
        }
    }

    /// The path component of the target, with the query string stripped.
    pub fn route_path(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _)) => path,
            None => &self.path,
        }
    }

    /// Get a header value.
    ///
    /// # Arguments
    ///
    /// * `name` - The header name
    ///
    /// # Returns
    ///
    /// The header value, if it exists
    pub fn get_header(&self, name: &str) -> Option<&String> {
        // Headers are case-insensitive, so we need to do a case-insensitive lookup
        self.headers.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                Some(v)
            } else {
                None
            }
        })
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// The `User-Agent` header, or an empty string when the client sent none.
    pub fn user_agent(&self) -> &str {
        self.get_header("User-Agent").map(String::as_str).unwrap_or("")
    }

    /// Get a decoded query parameter value.
    pub fn query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// Check if a query parameter exists.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_params.contains_key(name)
    }
}

/// Decode one `application/x-www-form-urlencoded` component.
///
/// Invalid UTF-8 after decoding falls back to the raw component.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Parse an HTTP request head from a byte slice.
///
/// # Arguments
///
/// * `input` - A byte slice containing the HTTP request to parse
///
/// # Returns
///
/// The parsed HTTP request, or an error if the request is invalid
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    // Convert the input to a string
    let input_str = match std::str::from_utf8(input) {
        Ok(s) => s,
        Err(_) => return Err(Error::MalformedRequestLine("Invalid UTF-8".to_string())),
    };

    // Split the input into lines
    let mut lines = input_str.lines();

    // Parse the request line
    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    // Split the request line into method, target, and version
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let path = parts[1].to_string();
    if !path.starts_with('/') {
        return Err(Error::InvalidPath);
    }

    let version = HttpVersion::from_str(parts[2])?;

    let mut headers = HashMap::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let (name, value) = line.split_once(':').ok_or(Error::InvalidHeaderFormat)?;
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    Ok(HttpRequest::new(method, path, version, headers))
}
