//! Bounded per-client frame queue
//!
//! Every connected client owns exactly one `FrameQueue`. The registry's
//! broadcast offers each frame to each queue without ever blocking; a full
//! queue sheds load according to its [`OverflowPolicy`]. Backpressure is
//! absorbed here, per client, instead of propagating to the producer.
//!
//! Frames are `bytes::Bytes`, so a broadcast to N clients clones N handles
//! to one shared allocation, never the JPEG payload itself.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Default maximum number of frames buffered per client
pub const DEFAULT_QUEUE_CAPACITY: usize = 30;

/// Default time a session waits for a frame before giving up
pub const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_secs(30);

/// What to do with an incoming frame when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the incoming frame, keep the queued ones
    #[default]
    DropNewest,
    /// Evict the oldest queued frame to make room
    DropOldest,
}

/// Outcome of a [`FrameQueue::dequeue`] call
#[derive(Debug, Clone, PartialEq)]
pub enum Dequeued {
    /// The next frame, in broadcast order
    Frame(Bytes),
    /// No frame arrived within the timeout
    TimedOut,
    /// The queue was closed; no more frames will ever arrive
    Closed,
}

#[derive(Debug)]
struct Inner {
    frames: VecDeque<Bytes>,
    closed: bool,
}

/// Bounded FIFO of frames with a non-blocking producer side
///
/// Written only through the registry's broadcast, read only by the owning
/// session's loop. `len() <= capacity` holds at all times.
#[derive(Debug)]
pub struct FrameQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
}

impl FrameQueue {
    /// Create a queue with the default capacity and drop-newest policy
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a queue with a custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_policy(capacity, OverflowPolicy::default())
    }

    /// Create a queue with a custom capacity and overflow policy
    pub fn with_policy(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                frames: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            capacity: capacity.max(1),
            policy,
        }
    }

    /// Offer a frame without blocking
    ///
    /// Returns `false` if the frame was dropped (queue full under
    /// [`OverflowPolicy::DropNewest`], or queue already closed). Under
    /// [`OverflowPolicy::DropOldest`] a full queue evicts its oldest frame
    /// and the call still returns `true`.
    pub fn enqueue(&self, frame: Bytes) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return false;
        }

        if inner.frames.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::DropNewest => return false,
                OverflowPolicy::DropOldest => {
                    inner.frames.pop_front();
                }
            }
        }

        inner.frames.push_back(frame);
        drop(inner);
        self.notify.notify_one();
        true
    }

    /// Wait up to `timeout` for the next frame
    ///
    /// Frames come out in the order they were enqueued, with gaps where
    /// overflow dropped them but never reordered or duplicated.
    pub async fn dequeue(&self, timeout: Duration) -> Dequeued {
        let deadline = Instant::now() + timeout;

        loop {
            // Arm the waiter before checking state so a frame enqueued
            // between the check and the await still wakes us.
            let notified = self.notify.notified();

            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(frame) = inner.frames.pop_front() {
                    return Dequeued::Frame(frame);
                }
                if inner.closed {
                    return Dequeued::Closed;
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Dequeued::TimedOut;
            }
        }
    }

    /// Close the queue
    ///
    /// Idempotent. Later `enqueue` calls return `false`; a blocked
    /// `dequeue` wakes up and drains remaining frames before observing
    /// [`Dequeued::Closed`].
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        drop(inner);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Whether the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Number of frames currently buffered
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().frames.len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of buffered frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}
