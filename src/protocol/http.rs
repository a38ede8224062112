//! Request parsing and byte-exact response rendering
//!
//! ```text
//! Client                                      Server
//!   |---- GET /image.mjpg HTTP/1.1 ----------->|
//!   |---- Authorization: Basic ... (optional) ->|
//!   |---- <blank line> ------------------------>|
//!   |                                           |
//!   |<--- HTTP/1.1 200 OK + multipart head -----|
//!   |<--- --boundary / part headers / JPEG -----|
//!   |<--- --boundary / part headers / JPEG -----|
//!   |                ...forever...              |
//! ```
//!
//! One wire quirk is preserved on purpose: the response head declares
//! `boundary=--<token>` (with the `--` prefix) and each part marker then
//! repeats `--<token>`. Widely deployed MJPEG consumers accept this form.

use bytes::Bytes;

use super::constants::STREAM_PATH;
use crate::error::SessionError;

/// One parsed HTTP request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// Request method, verbatim
    pub method: String,
    /// Request target, verbatim
    pub path: String,
}

/// Parse `METHOD PATH VERSION` out of a raw request line
pub fn parse_request_line(line: &str) -> Result<RequestLine, SessionError> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(method), Some(path)) => Ok(RequestLine {
            method: method.to_string(),
            path: path.to_string(),
        }),
        _ => Err(SessionError::Protocol {
            status: 400,
            reason: "malformed request line",
        }),
    }
}

/// Enforce the single supported verb and resource
///
/// The method comparison is exact, the path comparison is case-insensitive.
pub fn validate_request(request: &RequestLine) -> Result<(), SessionError> {
    if request.method != "GET" {
        return Err(SessionError::Protocol {
            status: 405,
            reason: "method not supported",
        });
    }
    if !request.path.eq_ignore_ascii_case(STREAM_PATH) {
        return Err(SessionError::Protocol {
            status: 404,
            reason: "unable to find resource on server",
        });
    }
    Ok(())
}

/// Split one `Name: value` header line, trimming surrounding whitespace
///
/// Splits once on the first colon, so values containing colons survive.
pub fn split_header(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    Some((name.trim(), value.trim()))
}

/// Message text for the status codes the server can emit
pub fn status_message(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "File Not Found",
        405 => "Method Not Allowed",
        _ => "Error",
    }
}

/// Render the multipart response head, sent exactly once per session
pub fn render_stream_head(server_name: &str, boundary: &str) -> Bytes {
    let head = format!(
        "HTTP/1.1 200 OK\r\n\
         Server: {}\r\n\
         Connection: close\r\n\
         Pragma: no-cache\r\n\
         Cache-Control: no-cache\r\n\
         Content-Type: multipart/x-mixed-replace;boundary=--{}\r\n\r\n",
        server_name, boundary
    );
    Bytes::from(head)
}

/// Render the part header that precedes one JPEG frame
pub fn render_part_header(boundary: &str, content_length: usize) -> Bytes {
    let header = format!(
        "--{}\r\n\
         Content-Type: image/jpeg\r\n\
         Content-Length: {}\r\n\r\n",
        boundary, content_length
    );
    Bytes::from(header)
}

/// Render a terminal plain-text error response
pub fn render_error(server_name: &str, status: u16, body: &str) -> Bytes {
    let response = format!(
        "HTTP/1.1 {} {}\r\n\
         Server: {}\r\n\
         Connection: close\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: {}\r\n\r\n{}",
        status,
        status_message(status),
        server_name,
        body.len(),
        body
    );
    Bytes::from(response)
}
