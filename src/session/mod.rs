//! Per-connection client sessions
//!
//! Each accepted connection gets one `ClientSession` running on its own
//! tokio task. The session walks a four-phase state machine (handshake,
//! authentication, streaming, closed) and owns the connection's frame
//! queue; the registry only ever touches that queue through broadcast.

pub mod client;
pub mod state;

pub use client::ClientSession;
pub use state::{SessionPhase, SessionState};
