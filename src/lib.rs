//! Share hand-picked local files with other devices on the same network.
//!
//! The operator picks files; anyone on the LAN can open the index page, see
//! the list and download. The server keeps a registry of clients that have
//! connected and a log of what they downloaded, both exposed as JSON for the
//! operator's front-end to poll.
//!
//! # Serving
//!
//! ```no_run
//! use lanshare::{HttpServer, ServerConfig, ShareState, SharedFileCatalog};
//!
//! # async fn run() -> Result<(), lanshare::ServerError> {
//! let catalog = SharedFileCatalog::new();
//! catalog.register("/srv/share/slides.pdf").expect("file exists");
//!
//! let server = HttpServer::new(ServerConfig::with_port(8080), ShareState::new(catalog));
//! server.start().await
//! # }
//! ```
//!
//! # Endpoints
//!
//! | Path | Response |
//! |---|---|
//! | `/` | HTML page that polls `/api/files` |
//! | `/api/files` | `[{"name", "size"}]` |
//! | `/api/clients` | `[{"ip", "ua", "since"}]` |
//! | `/api/logs` | last 200 `[{"t", "ip", "event"}]` |
//! | `/download?name=<file>` | the file, or 404 |

pub mod host;
pub mod parser;
pub mod server;
pub mod settings;
pub mod share;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{Error as ServerError, HttpResponse, HttpServer, Route, ServerConfig, StatusCode};
pub use settings::Settings;
pub use share::{ClientRegistry, Event, EventLog, LogEntry, ShareState, SharedFile, SharedFileCatalog};
