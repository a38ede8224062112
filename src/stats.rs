//! In-process server statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between the accept loop and the registry
///
/// All counters use relaxed atomics; they feed logs and the snapshot
/// accessor, nothing that needs cross-counter consistency.
#[derive(Debug, Default)]
pub struct ServerStats {
    total_connections: AtomicU64,
    frames_broadcast: AtomicU64,
    frames_delivered: AtomicU64,
    frames_dropped: AtomicU64,
}

impl ServerStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one accepted connection
    pub(crate) fn record_connection(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one broadcast call and its per-client outcomes
    pub(crate) fn record_broadcast(&self, delivered: u64, dropped: u64) {
        self.frames_broadcast.fetch_add(1, Ordering::Relaxed);
        self.frames_delivered.fetch_add(delivered, Ordering::Relaxed);
        self.frames_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            frames_broadcast: self.frames_broadcast.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the server counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Connections accepted since startup
    pub total_connections: u64,
    /// Broadcast calls made
    pub frames_broadcast: u64,
    /// Per-client enqueues that succeeded
    pub frames_delivered: u64,
    /// Per-client enqueues dropped by full or closed queues
    pub frames_dropped: u64,
}
