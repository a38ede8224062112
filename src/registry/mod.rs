//! Client registry for broadcast fan-out
//!
//! The registry is the one piece of state shared across tasks: the set of
//! currently streaming clients. The producer side offers every frame to
//! every member; each member absorbs backpressure in its own bounded queue.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<ClientRegistry>
//!                  ┌──────────────────────────┐
//!                  │ clients: HashMap<u64,    │
//!                  │   Arc<ClientEntry> {     │
//!                  │     queue: FrameQueue,   │
//!                  │   }                      │
//!                  │ >                        │
//!                  └───────────┬──────────────┘
//!                              │ broadcast(frame)
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!     [Session 1]         [Session 2]         [Session 3]
//!     queue.dequeue()     queue.dequeue()     queue.dequeue()
//!          │                   │                   │
//!          └──► part header + JPEG bytes ──► TCP socket
//! ```
//!
//! # Zero-Copy Design
//!
//! Frames are `bytes::Bytes`: a broadcast to N clients clones N reference-
//! counted handles to a single allocation, never the JPEG payload.

pub mod entry;
pub mod store;

pub use entry::ClientEntry;
pub use store::ClientRegistry;
