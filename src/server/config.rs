//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::{DEFAULT_BOUNDARY, SERVER_NAME};
use crate::queue::{OverflowPolicy, DEFAULT_DEQUEUE_TIMEOUT, DEFAULT_QUEUE_CAPACITY};
use crate::server::auth::AuthValidator;

/// Server configuration options
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum frames buffered per client before overflow kicks in
    pub queue_capacity: usize,

    /// What to do with a frame offered to a full client queue
    pub overflow: OverflowPolicy,

    /// How long a session waits for a frame before closing
    pub dequeue_timeout: Duration,

    /// Multipart boundary token
    pub boundary: String,

    /// Value of the `Server` response header
    pub server_name: String,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Optional credential check; `None` means no authentication
    pub auth: Option<AuthValidator>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8088".parse().unwrap(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow: OverflowPolicy::DropNewest,
            dequeue_timeout: DEFAULT_DEQUEUE_TIMEOUT,
            boundary: DEFAULT_BOUNDARY.to_string(),
            server_name: SERVER_NAME.to_string(),
            tcp_nodelay: true, // frames should hit the wire immediately
            auth: None,
        }
    }
}

impl ServerConfig {
    /// Create a new config with a custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the per-client queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the overflow policy for full client queues
    pub fn overflow(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = policy;
        self
    }

    /// Set the dequeue timeout
    pub fn dequeue_timeout(mut self, timeout: Duration) -> Self {
        self.dequeue_timeout = timeout;
        self
    }

    /// Set the multipart boundary token
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = boundary.into();
        self
    }

    /// Set the `Server` header value
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Require HTTP Basic authentication checked by `validator`
    pub fn auth_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.auth = Some(std::sync::Arc::new(validator));
        self
    }

    /// Whether clients must authenticate
    pub fn auth_required(&self) -> bool {
        self.auth.is_some()
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("queue_capacity", &self.queue_capacity)
            .field("overflow", &self.overflow)
            .field("dequeue_timeout", &self.dequeue_timeout)
            .field("boundary", &self.boundary)
            .field("server_name", &self.server_name)
            .field("tcp_nodelay", &self.tcp_nodelay)
            .field("auth", &self.auth.is_some())
            .finish()
    }
}
