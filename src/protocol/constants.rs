//! Protocol constants

/// Value of the `Server` response header
pub const SERVER_NAME: &str = "mjpeg-rs";

/// The single resource the server knows how to serve
pub const STREAM_PATH: &str = "/image.mjpg";

/// Default multipart boundary token
pub const DEFAULT_BOUNDARY: &str = "mjpegstream";

/// Upper bound on one request or header line
pub const MAX_LINE_LENGTH: usize = 8 * 1024;
