//! HTTP wire protocol for the MJPEG stream endpoint
//!
//! The server speaks a deliberately tiny slice of HTTP/1.1: one `GET`
//! resource, optional Basic authentication, and a `multipart/x-mixed-replace`
//! response that never ends. Response rendering is byte-exact; clients such
//! as browsers and `ffplay` depend on the precise head and part framing.

pub mod constants;
pub mod http;

pub use constants::{DEFAULT_BOUNDARY, MAX_LINE_LENGTH, SERVER_NAME, STREAM_PATH};
pub use http::RequestLine;
