//! MJPEG server: accept loop, configuration, authentication
//!
//! The server owns the listening socket and the client registry. Each
//! accepted connection becomes a [`crate::session::ClientSession`] on its
//! own task; the producer side drives [`listener::MjpegServer::broadcast`]
//! once per captured frame.

pub mod auth;
pub mod config;
pub mod listener;

pub use auth::{AuthCredentials, AuthValidator};
pub use config::ServerConfig;
pub use listener::MjpegServer;
