//! HTTP Basic authentication
//!
//! Credential checking is injected: the server carries an optional
//! validator predicate, and a session is only admitted to streaming once
//! some `Authorization` header satisfies it. No validator means no auth.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Injected credential check
///
/// Called with the decoded username and password; returns whether the
/// pair grants access.
pub type AuthValidator = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Username/password pair decoded from an `Authorization: Basic` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCredentials {
    username: String,
    password: String,
}

impl AuthCredentials {
    /// Decode from the value of an `Authorization` header
    ///
    /// Accepts only the `Basic <base64>` scheme where the decoded payload
    /// is UTF-8 `username:password`. The payload is split once, on the
    /// first colon, so passwords may contain colons. Any malformed value
    /// yields `None`; a later header on the same request may still pass.
    pub fn from_basic_header(value: &str) -> Option<Self> {
        let encoded = value.trim().strip_prefix("Basic ")?;
        let decoded = BASE64.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;

        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Decoded username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Decoded password
    pub fn password(&self) -> &str {
        &self.password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic_header() {
        // base64("user:pass")
        let creds = AuthCredentials::from_basic_header("Basic dXNlcjpwYXNz").unwrap();
        assert_eq!(creds.username(), "user");
        assert_eq!(creds.password(), "pass");
    }

    #[test]
    fn test_decode_tolerates_surrounding_whitespace() {
        let creds = AuthCredentials::from_basic_header("  Basic dXNlcjpwYXNz  ").unwrap();
        assert_eq!(creds.username(), "user");
    }

    #[test]
    fn test_password_may_contain_colons() {
        // base64("user:pa:ss") — split happens on the FIRST colon only
        let creds = AuthCredentials::from_basic_header("Basic dXNlcjpwYTpzcw==").unwrap();
        assert_eq!(creds.username(), "user");
        assert_eq!(creds.password(), "pa:ss");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(AuthCredentials::from_basic_header("Bearer abcdef").is_none());
        assert!(AuthCredentials::from_basic_header("basic dXNlcjpwYXNz").is_none());
    }

    #[test]
    fn test_rejects_invalid_base64() {
        assert!(AuthCredentials::from_basic_header("Basic !!!not-base64!!!").is_none());
    }

    #[test]
    fn test_rejects_payload_without_colon() {
        // base64("nocolon")
        assert!(AuthCredentials::from_basic_header("Basic bm9jb2xvbg==").is_none());
    }

    #[test]
    fn test_rejects_non_utf8_payload() {
        // base64 of raw bytes [0xff, 0xfe, b':', 0xfd]
        let encoded = BASE64.encode([0xff, 0xfe, b':', 0xfd]);
        assert!(AuthCredentials::from_basic_header(&format!("Basic {}", encoded)).is_none());
    }
}
