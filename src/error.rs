//! Error types
//!
//! The crate distinguishes server-level failures (bind/accept) from
//! per-session failures. A `SessionError` never crosses the session task
//! boundary: it is logged where the session ends and the rest of the
//! server keeps running.

use std::io;

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for server operations
#[derive(Debug)]
pub enum Error {
    /// Socket-level failure (bind, accept)
    Io(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Why a single client session ended
///
/// Every variant is terminal for the session that produced it. Variants
/// that carry an HTTP status have already had that status written to the
/// client by the time the error surfaces.
#[derive(Debug)]
pub enum SessionError {
    /// Request violated the HTTP contract; the matching 4xx was sent
    Protocol {
        /// Status code sent to the client
        status: u16,
        /// Short reason, also used as the response body
        reason: &'static str,
    },
    /// Authentication required and not satisfied by end of headers (401 sent)
    Unauthorized,
    /// Connection-level failure, no response possible
    Transport(io::Error),
    /// No frame arrived within the dequeue timeout
    QueueTimeout,
    /// The session's queue was closed from the registry side
    QueueClosed,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Protocol { status, reason } => {
                write!(f, "protocol error ({}): {}", status, reason)
            }
            SessionError::Unauthorized => write!(f, "client failed authentication"),
            SessionError::Transport(e) => write!(f, "transport error: {}", e),
            SessionError::QueueTimeout => write!(f, "no frames to send within timeout"),
            SessionError::QueueClosed => write!(f, "frame queue closed"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        SessionError::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let e = SessionError::Protocol {
            status: 405,
            reason: "method not supported",
        };
        assert_eq!(e.to_string(), "protocol error (405): method not supported");

        let e = SessionError::QueueTimeout;
        assert_eq!(e.to_string(), "no frames to send within timeout");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        let e = SessionError::from(io_err);
        assert!(matches!(e, SessionError::Transport(_)));
    }
}
