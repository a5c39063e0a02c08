//! Connection and endpoint traffic counters

use std::ops::AddAssign;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub messages_read: u64,
    pub messages_written: u64,
}

impl AddAssign for StatsSnapshot {
    fn add_assign(&mut self, other: Self) {
        self.bytes_read += other.bytes_read;
        self.bytes_written += other.bytes_written;
        self.messages_read += other.messages_read;
        self.messages_written += other.messages_written;
    }
}

/// Live counters of one connection, updated by its handler thread
#[derive(Debug, Default)]
pub struct ConnectionStats {
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    messages_read: AtomicU64,
    messages_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&self, bytes: usize, messages: usize) {
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_read.fetch_add(messages as u64, Ordering::Relaxed);
    }

    pub fn record_written(&self, bytes: usize, messages: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_written.fetch_add(messages as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            messages_read: self.messages_read.load(Ordering::Relaxed),
            messages_written: self.messages_written.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.bytes_read.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.messages_read.store(0, Ordering::Relaxed);
        self.messages_written.store(0, Ordering::Relaxed);
    }
}

/// Traffic of a whole connector endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStats {
    pub totals: StatsSnapshot,
    pub closed_connections: u64,
    pub active_connections: u64,
}

impl EndpointStats {
    /// Adds the final counters of a closed connection
    pub fn fold_closed(&mut self, connection: StatsSnapshot) {
        self.totals += connection;
        self.closed_connections += 1;
    }

    /// Adds the current counters of a live connection
    pub fn add_active(&mut self, connection: StatsSnapshot) {
        self.totals += connection;
        self.active_connections += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
