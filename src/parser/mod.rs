//! HTTP parser module.
//!
//! Parses the request head a browser or download tool sends to the share
//! server: request line, headers and the decoded query string.

mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

// Re-export the parse_request function
pub use request::parse_request;
