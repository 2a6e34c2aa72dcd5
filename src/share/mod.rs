//! Shared state owned by the share server.
//!
//! Each component is a cheap, cloneable handle over its own synchronised
//! storage, so the server and the operator front-end can hold the same
//! instances without any process-wide globals.

mod catalog;
mod clients;
mod error;
mod events;
mod tests;

pub use catalog::{SharedFile, SharedFileCatalog};
pub use clients::{ClientRecord, ClientRegistry};
pub use error::Error;
pub use events::{Event, EventLog, LogEntry, API_LOG_TAIL, DEFAULT_LOG_RETENTION, DISPLAY_LOG_TAIL};

/// The state every request handler sees.
#[derive(Clone, Default)]
pub struct ShareState {
    /// Files exposed for download.
    pub catalog: SharedFileCatalog,
    /// Clients seen since start-up.
    pub clients: ClientRegistry,
    /// Connection and download events.
    pub events: EventLog,
}

impl ShareState {
    /// Create state around an existing catalog with an empty registry and log.
    pub fn new(catalog: SharedFileCatalog) -> Self {
        Self {
            catalog,
            clients: ClientRegistry::new(),
            events: EventLog::new(),
        }
    }
}
