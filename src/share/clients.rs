//! Registry of clients that have contacted the server.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Serialize, Serializer};

/// The first contact from one IP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRecord {
    pub ip: IpAddr,
    /// User agent of the first request; later changes are not recorded.
    #[serde(rename = "ua")]
    pub user_agent: String,
    #[serde(serialize_with = "serialize_http_date")]
    pub since: DateTime<Utc>,
}

impl ClientRecord {
    fn new(ip: IpAddr, user_agent: &str) -> Self {
        Self {
            ip,
            user_agent: user_agent.to_string(),
            since: Utc::now(),
        }
    }
}

/// Render a timestamp as an HTTP-date, e.g. `Mon, 19 Oct 2026 10:00:00 GMT`.
pub(crate) fn http_date(time: &DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn serialize_http_date<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&http_date(time))
}

/// First-seen-wins map of client IP to its record.
///
/// Records are never updated or removed while the process runs.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<DashMap<IpAddr, ClientRecord>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a request from `ip`.
    ///
    /// Returns `true` only for the call that inserted the record. The check
    /// and insert happen under one shard lock, so concurrent first visits from
    /// the same address produce exactly one `true`.
    pub fn record_visit(&self, ip: IpAddr, user_agent: &str) -> bool {
        match self.clients.entry(ip) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(ClientRecord::new(ip, user_agent));
                true
            }
        }
    }

    pub fn get(&self, ip: &IpAddr) -> Option<ClientRecord> {
        self.clients.get(ip).map(|record| record.value().clone())
    }

    /// Snapshot of every record, oldest first.
    pub fn list_all(&self) -> Vec<ClientRecord> {
        let mut records: Vec<ClientRecord> = self
            .clients
            .iter()
            .map(|record| record.value().clone())
            .collect();
        records.sort_by(|a, b| a.since.cmp(&b.since).then_with(|| a.ip.cmp(&b.ip)));
        records
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
