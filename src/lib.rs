//! MJPEG-over-HTTP broadcast server
//!
//! A small concurrent server that fans one producer's JPEG frames out to
//! any number of HTTP clients as `multipart/x-mixed-replace` streams.
//! Each client connects and disconnects independently and absorbs its own
//! backpressure in a bounded per-client queue, so one stalled viewer can
//! never slow the producer or the other viewers.
//!
//! # Architecture
//!
//! ```text
//!  [FrameSource] ──► MjpegServer::broadcast(frame)
//!                          │
//!                          ▼
//!                  ClientRegistry ── one non-blocking enqueue per client
//!                   │          │
//!                   ▼          ▼
//!             FrameQueue   FrameQueue      (bounded, drop on overflow)
//!                   │          │
//!                   ▼          ▼
//!            ClientSession  ClientSession  (one tokio task each)
//!                   │          │
//!                   ▼          ▼
//!               TCP socket  TCP socket
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mjpeg_rs::{MjpegServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> mjpeg_rs::Result<()> {
//!     let config = ServerConfig::with_addr("0.0.0.0:8088".parse().unwrap());
//!     let server = Arc::new(MjpegServer::new(config));
//!
//!     let accept = Arc::clone(&server);
//!     tokio::spawn(async move { accept.run().await });
//!
//!     // drive the broadcast side from any frame producer
//!     loop {
//!         let frame = bytes::Bytes::from_static(b"...jpeg bytes...");
//!         server.broadcast(frame).await;
//!         tokio::time::sleep(std::time::Duration::from_millis(33)).await;
//!     }
//! }
//! ```

pub mod error;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod server;
pub mod session;
pub mod source;
pub mod stats;

pub use error::{Error, Result, SessionError};
pub use queue::{Dequeued, FrameQueue, OverflowPolicy};
pub use registry::{ClientEntry, ClientRegistry};
pub use server::{AuthCredentials, AuthValidator, MjpegServer, ServerConfig};
pub use session::{ClientSession, SessionPhase};
pub use source::{FrameSource, Paced};
pub use stats::{ServerStats, StatsSnapshot};
