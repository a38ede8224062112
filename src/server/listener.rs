//! MJPEG server listener
//!
//! Handles the TCP accept loop, spawns session tasks, and forwards
//! frames from the producer into the registry.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};

use crate::error::Result;
use crate::registry::{ClientEntry, ClientRegistry};
use crate::server::config::ServerConfig;
use crate::session::ClientSession;
use crate::source::FrameSource;
use crate::stats::StatsSnapshot;

/// MJPEG broadcast server
///
/// Cheap to share behind an `Arc`: one task runs the accept loop while
/// the producer loop calls [`MjpegServer::broadcast`] or
/// [`MjpegServer::stream_from`].
pub struct MjpegServer {
    config: ServerConfig,
    registry: Arc<ClientRegistry>,
    next_session_id: AtomicU64,
}

impl MjpegServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(ClientRegistry::new()),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Copy the current server counters
    pub fn stats(&self) -> StatsSnapshot {
        self.registry.stats().snapshot()
    }

    /// Offer one frame to every streaming client
    ///
    /// Never blocks on a slow client; intended to be called once per
    /// frame the producer yields.
    pub async fn broadcast(&self, frame: Bytes) {
        self.registry.broadcast(frame).await;
    }

    /// Drive an exhaustible frame source, broadcasting every frame
    ///
    /// Returns when the source ends or fails. Connected sessions are not
    /// torn down here; they starve out through their queue timeouts.
    pub async fn stream_from<S: FrameSource>(&self, mut source: S) -> Result<()> {
        loop {
            match source.next_frame().await? {
                Some(frame) => self.broadcast(frame).await,
                None => break,
            }
        }
        tracing::info!("frame source exhausted, broadcast loop stopped");
        Ok(())
    }

    /// Run the server
    ///
    /// This method blocks until the accept loop fails to bind.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "MJPEG server listening");

        self.accept_loop(&listener).await
    }

    /// Run the server with graceful shutdown
    ///
    /// Resolves when `shutdown` completes and the listening socket has
    /// been dropped. Sessions already streaming keep running until they
    /// hit their own failure or timeout paths.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "MJPEG server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "new connection"
        );

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(session_id = session_id, error = %e, "failed to configure socket");
            return;
        }

        self.registry.stats().record_connection();

        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            let mut session = ClientSession::new(session_id, peer_addr, socket, config);

            match session.negotiate().await {
                Ok(()) => {
                    let entry = Arc::new(ClientEntry::new(session_id, peer_addr, session.queue()));
                    registry.register(entry).await;

                    // always terminal; the reason says why
                    let reason = session.stream().await;
                    registry.deregister(session_id).await;

                    tracing::debug!(
                        session_id = session_id,
                        frames_sent = session.state().frames_sent,
                        reason = %reason,
                        "session ended"
                    );
                }
                Err(e) => {
                    tracing::debug!(session_id = session_id, error = %e, "session rejected");
                }
            }
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::protocol::http;

    const JPEG: &[u8] = b"\xff\xd8\xff\xe0test-frame\xff\xd9";

    async fn spawn_server(config: ServerConfig) -> (Arc<MjpegServer>, SocketAddr) {
        let server = Arc::new(MjpegServer::new(config));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = accept.accept_loop(&listener).await;
        });

        (server, addr)
    }

    async fn wait_for_clients(server: &MjpegServer, count: usize) {
        for _ in 0..100 {
            if server.registry().client_count().await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "registry never reached {} clients (now {})",
            count,
            server.registry().client_count().await
        );
    }

    #[tokio::test]
    async fn test_end_to_end_stream() {
        let config = ServerConfig::default().dequeue_timeout(Duration::from_secs(2));
        let (server, addr) = spawn_server(config.clone()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /image.mjpg HTTP/1.1\r\nHost: test\r\n\r\n")
            .await
            .unwrap();

        wait_for_clients(&server, 1).await;
        server.broadcast(Bytes::from_static(JPEG)).await;

        let head = http::render_stream_head(&config.server_name, &config.boundary);
        let part = http::render_part_header(&config.boundary, JPEG.len());
        let mut expected = Vec::new();
        expected.extend_from_slice(&head);
        expected.extend_from_slice(&part);
        expected.extend_from_slice(JPEG);

        let mut buf = vec![0u8; expected.len()];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, expected);

        let snapshot = server.stats();
        assert_eq!(snapshot.total_connections, 1);
        assert_eq!(snapshot.frames_delivered, 1);
    }

    #[tokio::test]
    async fn test_rejected_request_is_never_registered() {
        let config = ServerConfig::default();
        let (server, addr) = spawn_server(config).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /favicon.ico HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        let response = String::from_utf8(buf).unwrap();
        assert!(response.starts_with("HTTP/1.1 404 File Not Found\r\n"));

        assert_eq!(server.registry().client_count().await, 0);
    }

    #[tokio::test]
    async fn test_disconnected_client_is_deregistered() {
        let config = ServerConfig::default().dequeue_timeout(Duration::from_secs(5));
        let (server, addr) = spawn_server(config).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /image.mjpg HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        wait_for_clients(&server, 1).await;

        drop(stream);

        // keep broadcasting until the session trips over the dead socket
        for _ in 0..200 {
            server.broadcast(Bytes::from_static(JPEG)).await;
            if server.registry().client_count().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(server.registry().client_count().await, 0);
    }

    #[tokio::test]
    async fn test_idle_session_times_out_and_deregisters() {
        let config = ServerConfig::default().dequeue_timeout(Duration::from_millis(200));
        let (server, addr) = spawn_server(config).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /image.mjpg HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        wait_for_clients(&server, 1).await;

        // no frames ever broadcast: the session must starve out on its own
        wait_for_clients(&server, 0).await;

        // the multipart head still went out before the timeout
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        let response = String::from_utf8(buf).unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_broadcast_fans_out_to_all_clients() {
        let config = ServerConfig::default().dequeue_timeout(Duration::from_secs(2));
        let (server, addr) = spawn_server(config).await;

        let mut clients = Vec::new();
        for _ in 0..3 {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /image.mjpg HTTP/1.1\r\n\r\n")
                .await
                .unwrap();
            clients.push(stream);
        }
        wait_for_clients(&server, 3).await;

        server.broadcast(Bytes::from_static(JPEG)).await;

        for stream in &mut clients {
            let mut head = vec![0u8; 15];
            stream.read_exact(&mut head).await.unwrap();
            assert_eq!(&head, b"HTTP/1.1 200 OK");
        }

        let snapshot = server.stats();
        assert_eq!(snapshot.total_connections, 3);
        assert_eq!(snapshot.frames_delivered, 3);
    }
}
