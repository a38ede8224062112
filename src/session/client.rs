//! Client session: handshake, authentication, and the streaming loop
//!
//! A session is generic over its transport so tests can drive it with an
//! in-memory duplex stream instead of a TCP socket. Terminal conditions
//! (protocol violation, failed auth, transport failure, queue timeout,
//! queue close) surface as a [`SessionError`] and never leave the task
//! that runs the session.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
    ReadHalf, WriteHalf,
};

use crate::error::SessionError;
use crate::protocol::constants::MAX_LINE_LENGTH;
use crate::protocol::http;
use crate::queue::{Dequeued, FrameQueue};
use crate::server::auth::AuthCredentials;
use crate::server::config::ServerConfig;
use crate::session::state::SessionState;

/// One client connection working through the session state machine
///
/// Owns its transport and its frame queue. The queue handle is shared
/// with the registry (the write side); this session's loop is the only
/// reader.
pub struct ClientSession<S> {
    state: SessionState,
    reader: BufReader<ReadHalf<S>>,
    writer: BufWriter<WriteHalf<S>>,
    queue: Arc<FrameQueue>,
    config: ServerConfig,
}

impl<S: AsyncRead + AsyncWrite + Send + Unpin> ClientSession<S> {
    /// Create a session over an accepted transport
    pub fn new(id: u64, peer_addr: SocketAddr, stream: S, config: ServerConfig) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let queue = Arc::new(FrameQueue::with_policy(
            config.queue_capacity,
            config.overflow,
        ));

        Self {
            state: SessionState::new(id, peer_addr),
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            queue,
            config,
        }
    }

    /// The session's frame queue, for wiring up a registry entry
    pub fn queue(&self) -> Arc<FrameQueue> {
        Arc::clone(&self.queue)
    }

    /// Current session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Read the request, enforce the route and credentials, and send the
    /// multipart response head
    ///
    /// On a protocol or auth violation the matching 4xx response is
    /// written before the error is returned; either way an `Err` here
    /// means the session is over and must not be registered.
    pub async fn negotiate(&mut self) -> Result<(), SessionError> {
        let result = self.do_negotiate().await;

        if let Err(ref e) = result {
            match e {
                SessionError::Protocol { status, reason } => {
                    // best effort: the client may already be gone
                    let _ = self.send_error(*status, reason).await;
                }
                SessionError::Unauthorized => {
                    let _ = self.send_error(401, "unauthorized access detected").await;
                }
                _ => {}
            }
            self.state.close();
        }

        result
    }

    async fn do_negotiate(&mut self) -> Result<(), SessionError> {
        // Handshaking: request line
        let line = self.read_line().await?;
        let request = http::parse_request_line(&line)?;
        http::validate_request(&request)?;

        // Authenticating: consume the header block; the headers themselves
        // are unused except for Authorization
        self.state.begin_auth();
        let mut authenticated = !self.config.auth_required();
        loop {
            let line = self.read_line().await?;
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            if authenticated {
                continue;
            }

            if let Some((name, value)) = http::split_header(line) {
                if name.eq_ignore_ascii_case("authorization") {
                    if let Some(credentials) = AuthCredentials::from_basic_header(value) {
                        if let Some(validator) = &self.config.auth {
                            let check = validator.as_ref();
                            if check(credentials.username(), credentials.password()) {
                                authenticated = true;
                                self.state.authenticated = true;
                            }
                        }
                    }
                }
            }
        }

        if !authenticated {
            return Err(SessionError::Unauthorized);
        }
        self.state.authenticated = true;

        // Streaming: the multipart head goes out exactly once
        let head = http::render_stream_head(&self.config.server_name, &self.config.boundary);
        self.writer.write_all(&head).await?;
        self.writer.flush().await?;
        self.state.begin_streaming();

        tracing::debug!(
            session_id = self.state.id,
            peer = %self.state.peer_addr,
            "multipart stream started"
        );
        Ok(())
    }

    /// Drain the queue onto the socket until a terminal condition
    ///
    /// Always returns the reason the session ended; the caller logs it
    /// and deregisters this session.
    pub async fn stream(&mut self) -> SessionError {
        loop {
            match self.queue.dequeue(self.config.dequeue_timeout).await {
                Dequeued::Frame(frame) => {
                    if let Err(e) = self.send_frame(&frame).await {
                        self.state.close();
                        return e;
                    }
                }
                Dequeued::TimedOut => {
                    self.state.close();
                    return SessionError::QueueTimeout;
                }
                Dequeued::Closed => {
                    self.state.close();
                    return SessionError::QueueClosed;
                }
            }
        }
    }

    async fn send_frame(&mut self, frame: &Bytes) -> Result<(), SessionError> {
        let header = http::render_part_header(&self.config.boundary, frame.len());
        self.writer.write_all(&header).await?;
        self.writer.write_all(frame).await?;
        self.writer.flush().await?;

        self.state.record_frame(header.len() + frame.len());
        tracing::trace!(
            session_id = self.state.id,
            bytes = frame.len(),
            "frame sent"
        );
        Ok(())
    }

    async fn send_error(&mut self, status: u16, body: &str) -> Result<(), SessionError> {
        let response = http::render_error(&self.config.server_name, status, body);
        self.writer.write_all(&response).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read one CRLF-terminated line, bounded by [`MAX_LINE_LENGTH`]
    async fn read_line(&mut self) -> Result<String, SessionError> {
        let mut line = String::new();
        let mut limited = (&mut self.reader).take(MAX_LINE_LENGTH as u64);
        let n = limited.read_line(&mut line).await?;

        if n == 0 {
            return Err(SessionError::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed while reading request",
            )));
        }
        if !line.ends_with('\n') && line.len() >= MAX_LINE_LENGTH {
            return Err(SessionError::Protocol {
                status: 400,
                reason: "header line too long",
            });
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio_test::assert_ok;

    use super::*;
    use crate::session::state::SessionPhase;

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 54321)
    }

    fn test_config() -> ServerConfig {
        ServerConfig::default()
            .boundary("testbound")
            .server_name("test-server")
            .dequeue_timeout(Duration::from_millis(100))
    }

    fn session(config: ServerConfig) -> (tokio::io::DuplexStream, ClientSession<DuplexStream>) {
        let (client, server) = tokio::io::duplex(16 * 1024);
        (client, ClientSession::new(1, peer(), server, config))
    }

    async fn read_response(mut client: DuplexStream) -> String {
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_get_stream_path_yields_multipart_head() {
        let (mut client, mut session) = session(test_config());

        client
            .write_all(b"GET /image.mjpg HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        assert_ok!(session.negotiate().await);
        assert!(session.state().is_streaming());

        drop(session);
        let response = read_response(client).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: multipart/x-mixed-replace;boundary=--testbound"));
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected_with_405() {
        let (mut client, mut session) = session(test_config());

        client
            .write_all(b"POST /image.mjpg HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let err = session.negotiate().await.unwrap_err();
        assert!(matches!(err, SessionError::Protocol { status: 405, .. }));
        assert_eq!(session.state().phase, SessionPhase::Closed);

        drop(session);
        let response = read_response(client).await;
        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(response.ends_with("method not supported"));
    }

    #[tokio::test]
    async fn test_wrong_path_is_rejected_with_404() {
        let (mut client, mut session) = session(test_config());

        client
            .write_all(b"GET /other HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let err = session.negotiate().await.unwrap_err();
        assert!(matches!(err, SessionError::Protocol { status: 404, .. }));

        drop(session);
        let response = read_response(client).await;
        assert!(response.starts_with("HTTP/1.1 404 File Not Found\r\n"));
    }

    #[tokio::test]
    async fn test_missing_credentials_are_rejected_with_401() {
        let config = test_config().auth_validator(|user, pass| user == "user" && pass == "pass");
        let (mut client, mut session) = session(config);

        client
            .write_all(b"GET /image.mjpg HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let err = session.negotiate().await.unwrap_err();
        assert!(matches!(err, SessionError::Unauthorized));

        drop(session);
        let response = read_response(client).await;
        assert!(response.starts_with("HTTP/1.1 401 Unauthorized\r\n"));
        assert!(response.ends_with("unauthorized access detected"));
    }

    #[tokio::test]
    async fn test_valid_credentials_admit_the_client() {
        let config = test_config().auth_validator(|user, pass| user == "user" && pass == "pass");
        let (mut client, mut session) = session(config);

        // base64("user:pass")
        client
            .write_all(
                b"GET /image.mjpg HTTP/1.1\r\nAuthorization: Basic dXNlcjpwYXNz\r\n\r\n",
            )
            .await
            .unwrap();
        assert_ok!(session.negotiate().await);
        assert!(session.state().authenticated);

        drop(session);
        let response = read_response(client).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_rejected_with_401() {
        let config = test_config().auth_validator(|user, pass| user == "user" && pass == "pass");
        let (mut client, mut session) = session(config);

        // base64("user:wrong")
        client
            .write_all(
                b"GET /image.mjpg HTTP/1.1\r\nAuthorization: Basic dXNlcjp3cm9uZw==\r\n\r\n",
            )
            .await
            .unwrap();
        let err = session.negotiate().await.unwrap_err();
        assert!(matches!(err, SessionError::Unauthorized));
    }

    #[tokio::test]
    async fn test_streaming_writes_exact_part_framing() {
        let (mut client, mut session) = session(test_config());

        client
            .write_all(b"GET /image.mjpg HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        assert_ok!(session.negotiate().await);

        let queue = session.queue();
        assert!(queue.enqueue(Bytes::from_static(b"\xff\xd8jpeg-data")));
        queue.close();

        // drains the pending frame, then observes the close
        let reason = session.stream().await;
        assert!(matches!(reason, SessionError::QueueClosed));
        assert_eq!(session.state().frames_sent, 1);

        drop(session);
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();

        let head = http::render_stream_head("test-server", "testbound");
        let part = http::render_part_header("testbound", 11);
        let mut expected = Vec::new();
        expected.extend_from_slice(&head);
        expected.extend_from_slice(&part);
        expected.extend_from_slice(b"\xff\xd8jpeg-data");
        assert_eq!(buf, expected);
    }

    #[tokio::test]
    async fn test_frames_arrive_in_broadcast_order() {
        let (mut client, mut session) = session(test_config());

        client
            .write_all(b"GET /image.mjpg HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        assert_ok!(session.negotiate().await);

        let queue = session.queue();
        assert!(queue.enqueue(Bytes::from_static(b"frame-1")));
        assert!(queue.enqueue(Bytes::from_static(b"frame-2")));
        assert!(queue.enqueue(Bytes::from_static(b"frame-3")));
        queue.close();

        let reason = session.stream().await;
        assert!(matches!(reason, SessionError::QueueClosed));
        assert_eq!(session.state().frames_sent, 3);

        drop(session);
        let response = read_response(client).await;
        let first = response.find("frame-1").unwrap();
        let second = response.find("frame-2").unwrap();
        let third = response.find("frame-3").unwrap();
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn test_queue_timeout_ends_the_session() {
        let config = test_config().dequeue_timeout(Duration::from_millis(20));
        let (mut client, mut session) = session(config);

        client
            .write_all(b"GET /image.mjpg HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        assert_ok!(session.negotiate().await);

        let reason = session.stream().await;
        assert!(matches!(reason, SessionError::QueueTimeout));
        assert!(session.state().is_closed());
    }

    #[tokio::test]
    async fn test_client_hangup_during_handshake() {
        let (client, mut session) = session(test_config());

        drop(client);
        let err = session.negotiate().await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[tokio::test]
    async fn test_oversized_request_line_is_rejected() {
        let (mut client, mut session) = session(test_config());

        let negotiate = tokio::spawn(async move {
            let err = session.negotiate().await.unwrap_err();
            assert!(matches!(err, SessionError::Protocol { status: 400, .. }));
        });

        let garbage = vec![b'a'; MAX_LINE_LENGTH + 1024];
        // the session bails before consuming the whole line; ignore the
        // write error from its side of the pipe closing
        let _ = client.write_all(&garbage).await;

        negotiate.await.unwrap();
    }
}
