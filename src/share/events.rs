//! Append-only log of connection and download events.

use std::collections::VecDeque;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::Local;
use log::debug;
use parking_lot::Mutex;
use serde::{Serialize, Serializer};

/// Entries returned by `/api/logs`.
pub const API_LOG_TAIL: usize = 200;

/// Entries the front-end shows at once.
pub const DISPLAY_LOG_TAIL: usize = 50;

/// Entries kept in memory before the oldest are dropped.
pub const DEFAULT_LOG_RETENTION: usize = 1000;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// First request from a client.
    Connected,
    /// A shared file was sent in full.
    Downloaded(String),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Connected => f.write_str("connected"),
            Event::Downloaded(name) => write!(f, "downloaded {name}"),
        }
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One timestamped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Local wall-clock time, `HH:MM:SS`.
    #[serde(rename = "t")]
    pub time: String,
    pub ip: IpAddr,
    pub event: Event,
}

impl LogEntry {
    /// Stamp `event` from `ip` with the current local time.
    pub fn now(ip: IpAddr, event: Event) -> Self {
        Self {
            time: Local::now().format("%H:%M:%S").to_string(),
            ip,
            event,
        }
    }
}

struct Ring {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    total: u64,
}

/// Event log shared by all connections.
///
/// Appends are O(1) under a short mutex hold. Storage is capped; once full,
/// the oldest entry is dropped for each new one.
#[derive(Clone)]
pub struct EventLog {
    ring: Arc<Mutex<Ring>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create a log retaining [`DEFAULT_LOG_RETENTION`] entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_RETENTION)
    }

    /// Create a log retaining at most `capacity` entries (minimum one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: Arc::new(Mutex::new(Ring {
                entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_RETENTION)),
                capacity,
                total: 0,
            })),
        }
    }

    pub fn append(&self, entry: LogEntry) {
        debug!("{} {}", entry.ip, entry.event);
        let mut ring = self.ring.lock();
        if ring.entries.len() == ring.capacity {
            ring.entries.pop_front();
        }
        ring.entries.push_back(entry);
        ring.total += 1;
    }

    /// Record `event` from `ip` at the current time.
    pub fn record(&self, ip: IpAddr, event: Event) {
        self.append(LogEntry::now(ip, event));
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        let ring = self.ring.lock();
        let skip = ring.entries.len().saturating_sub(n);
        ring.entries.iter().skip(skip).cloned().collect()
    }

    /// Entries appended after the first `seen` appends, with the new total.
    ///
    /// Both are read under one lock, so feeding the returned total back in
    /// never skips or repeats an entry. Entries already dropped from the ring
    /// are not returned.
    pub fn since(&self, seen: u64) -> (u64, Vec<LogEntry>) {
        let ring = self.ring.lock();
        let fresh = usize::try_from(ring.total.saturating_sub(seen)).unwrap_or(usize::MAX);
        let skip = ring.entries.len().saturating_sub(fresh);
        (ring.total, ring.entries.iter().skip(skip).cloned().collect())
    }

    /// Entries currently retained.
    pub fn len(&self) -> usize {
        self.ring.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().entries.is_empty()
    }

    /// Appends made since creation, including dropped entries.
    pub fn total_appended(&self) -> u64 {
        self.ring.lock().total
    }
}
