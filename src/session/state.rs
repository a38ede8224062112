//! Session state machine
//!
//! Tracks a client connection from accept to teardown.

use std::net::SocketAddr;
use std::time::Instant;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Request line being read and checked
    Handshaking,
    /// Header block being consumed, credentials checked
    Authenticating,
    /// Multipart head sent, frames flowing
    Streaming,
    /// Session closed
    Closed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Whether the client passed authentication (vacuously true when no
    /// validator is configured)
    pub authenticated: bool,

    /// Frames written to the socket
    pub frames_sent: u64,

    /// Bytes written to the socket, part headers included
    pub bytes_sent: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Handshaking,
            connected_at: Instant::now(),
            authenticated: false,
            frames_sent: 0,
            bytes_sent: 0,
        }
    }

    /// Transition to the header/auth phase
    pub fn begin_auth(&mut self) {
        if self.phase == SessionPhase::Handshaking {
            self.phase = SessionPhase::Authenticating;
        }
    }

    /// Transition to streaming once the multipart head is on the wire
    pub fn begin_streaming(&mut self) {
        if self.phase == SessionPhase::Authenticating {
            self.phase = SessionPhase::Streaming;
        }
    }

    /// Enter the terminal phase
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Whether the session reached its terminal phase
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    /// Whether the session is currently streaming
    pub fn is_streaming(&self) -> bool {
        self.phase == SessionPhase::Streaming
    }

    /// Account for one frame written to the socket
    pub fn record_frame(&mut self, bytes: usize) {
        self.frames_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Get session duration
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}
