//! HTTP server for the share.
//!
//! One task per connection, one request per connection. Routes are a closed
//! enum resolved from the query-stripped path; all state lives in the
//! [`ShareState`](crate::share::ShareState) handed to the server.

mod config;
mod download;
mod error;
mod http_server;
mod response;
mod router;

// Re-export public items
pub use config::{ServerConfig, DEFAULT_PORT};
pub use download::{content_disposition, content_type, PreparedDownload};
pub use error::Error;
pub use http_server::HttpServer;
pub use response::{HttpResponse, StatusCode};
pub use router::Route;
