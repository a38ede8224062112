//! Client registry implementation
//!
//! The central set of live streaming clients. Registration and removal
//! take the write lock; broadcasting takes the read lock and performs one
//! non-blocking enqueue per member, so no client can stall the producer
//! or hold the registry hostage.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;

use super::entry::ClientEntry;
use crate::stats::ServerStats;

/// Central registry of streaming clients
///
/// Thread-safe via `RwLock`. A session is a member exactly while its
/// streaming loop is alive: the accept path registers an entry after the
/// multipart head has been sent and deregisters it when the loop returns.
pub struct ClientRegistry {
    /// Map of session ID to client entry
    clients: RwLock<HashMap<u64, Arc<ClientEntry>>>,

    /// Shared broadcast/connection counters
    stats: Arc<ServerStats>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            stats: Arc::new(ServerStats::new()),
        }
    }

    /// Get the shared statistics counters
    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Add a client under the write lock
    pub async fn register(&self, entry: Arc<ClientEntry>) {
        let mut clients = self.clients.write().await;
        let session_id = entry.session_id;
        let peer = entry.peer_addr;
        clients.insert(session_id, entry);

        tracing::info!(
            session_id = session_id,
            peer = %peer,
            clients = clients.len(),
            "client registered"
        );
    }

    /// Remove a client under the write lock
    ///
    /// Idempotent: removing an unknown ID is a no-op, so a second close
    /// trigger cannot double-fire. The removed client's queue is closed,
    /// which wakes a dequeue blocked inside its session loop.
    pub async fn deregister(&self, session_id: u64) {
        let mut clients = self.clients.write().await;
        if let Some(entry) = clients.remove(&session_id) {
            entry.close();
            tracing::info!(
                session_id = session_id,
                clients = clients.len(),
                "client deregistered"
            );
        }
    }

    /// Offer a frame to every currently registered client
    ///
    /// One enqueue attempt per member; a full queue drops the frame for
    /// that client only. The call never blocks on a slow consumer.
    pub async fn broadcast(&self, frame: Bytes) {
        let clients = self.clients.read().await;

        let mut delivered: u64 = 0;
        let mut dropped: u64 = 0;
        for entry in clients.values() {
            if entry.offer(frame.clone()) {
                delivered += 1;
            } else {
                dropped += 1;
            }
        }
        drop(clients);

        self.stats.record_broadcast(delivered, dropped);
        tracing::trace!(delivered, dropped, "frame broadcast");
    }

    /// Number of currently registered clients
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Whether a session is currently registered
    pub async fn contains(&self, session_id: u64) -> bool {
        self.clients.read().await.contains_key(&session_id)
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
