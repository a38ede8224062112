//! Per-client registry entry

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;

use crate::queue::FrameQueue;

/// A streaming client as the registry sees it
///
/// Holds just enough to route frames: identity plus the client's queue.
/// The session task owns everything else (socket, state machine).
#[derive(Debug)]
pub struct ClientEntry {
    /// Unique session ID
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// The client's frame queue, shared with its session task
    queue: Arc<FrameQueue>,
}

impl ClientEntry {
    /// Create a new entry around a session's queue
    pub fn new(session_id: u64, peer_addr: SocketAddr, queue: Arc<FrameQueue>) -> Self {
        Self {
            session_id,
            peer_addr,
            queue,
        }
    }

    /// Offer a frame without blocking
    ///
    /// Returns `false` when the client's queue dropped the frame.
    pub(super) fn offer(&self, frame: Bytes) -> bool {
        self.queue.enqueue(frame)
    }

    /// Close the client's queue, waking a blocked dequeue
    pub(super) fn close(&self) {
        self.queue.close();
    }

    /// Number of frames currently buffered for this client
    pub fn backlog(&self) -> usize {
        self.queue.len()
    }
}
