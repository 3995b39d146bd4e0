use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::core::command::{self, Cmd};
use crate::core::config::{deadline, CacheConfig};
use crate::core::reply;
use crate::proto::codec::{Decoder, Encoder};
use crate::proto::frame::Frame;
use crate::{Error, Result};

/// Spare capacity reserved in the read buffer before each socket read.
const READ_CHUNK: usize = 16 * 1024;

/// A single connection to the cache server.
///
/// Commands are buffered with [`send`](Connection::send), written with
/// [`flush`](Connection::flush) and answered in order by
/// [`receive`](Connection::receive). Read and write deadlines are fixed when
/// the connection is created. Any I/O or protocol failure marks the
/// connection broken so the pool drops it instead of lending it again.
pub struct Connection {
    stream: TcpStream,
    address: String,
    encoder: Encoder,
    decoder: Decoder,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    created_at: Instant,
    last_used: Instant,
    pending: usize,
    broken: bool,
}

impl Connection {
    /// Wraps an established stream. No timeouts are configured.
    pub fn new(stream: TcpStream, address: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            stream,
            address: address.into(),
            encoder: Encoder::new(),
            decoder: Decoder::new(),
            read_timeout: None,
            write_timeout: None,
            created_at: now,
            last_used: now,
            pending: 0,
            broken: false,
        }
    }

    /// Configures read and write deadlines.
    pub fn with_timeouts(
        mut self,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Self {
        self.read_timeout = read_timeout;
        self.write_timeout = write_timeout;
        self
    }

    /// Dials the configured server, then authenticates and selects the
    /// database when configured.
    ///
    /// # Errors
    ///
    /// [`Error::Dial`] if the TCP connection cannot be made within the dial
    /// timeout, [`Error::Auth`] if AUTH is rejected, and the usual command
    /// errors for SELECT.
    #[instrument(skip(config), fields(address = %config.address()), level = "debug")]
    pub async fn dial(config: &CacheConfig) -> Result<Self> {
        let address = config.address();
        let connect = TcpStream::connect(address.as_str());
        let stream = with_deadline(deadline(config.dial_timeout), "dial", connect)
            .await
            .map_err(|source| Error::Dial {
                address: address.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;

        let mut conn = Connection::new(stream, address).with_timeouts(
            deadline(config.read_timeout),
            deadline(config.write_timeout),
        );

        if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
            let reply = conn.execute(&command::auth(password)).await?;
            if reply.error_message().is_some() {
                return Err(Error::Auth);
            }
        }

        if config.database != 0 {
            let reply = conn.execute(&command::select(config.database)).await?;
            reply::to_unit(reply)?;
        }

        debug!("connection established");
        Ok(conn)
    }

    /// Buffers a command without writing it.
    pub fn send(&mut self, cmd: &Cmd) {
        self.encoder.encode_command(cmd.as_args());
        self.pending += 1;
    }

    /// Writes every buffered command to the socket.
    pub async fn flush(&mut self) -> Result<()> {
        if self.encoder.is_empty() {
            return Ok(());
        }
        let data = self.encoder.take();
        let stream = &mut self.stream;
        let written = with_deadline(self.write_timeout, "write", async move {
            stream.write_all(&data).await?;
            stream.flush().await
        })
        .await;
        self.track(written.map_err(Error::from))
    }

    /// Reads the next pending reply.
    ///
    /// Error replies from the server are returned as [`Frame::Error`], not as
    /// `Err`; the connection stays usable after them.
    pub async fn receive(&mut self) -> Result<Frame> {
        let frame = self.read_frame().await;
        if frame.is_ok() {
            self.pending = self.pending.saturating_sub(1);
            self.last_used = Instant::now();
        }
        self.track(frame)
    }

    /// Sends one command and waits for its reply.
    pub async fn execute(&mut self, cmd: &Cmd) -> Result<Frame> {
        self.send(cmd);
        self.flush().await?;
        self.receive().await
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.decoder.decode()? {
                return Ok(frame);
            }
            let buf = self.decoder.read_buffer(READ_CHUNK);
            let n = with_deadline(self.read_timeout, "read", self.stream.read_buf(buf)).await?;
            if n == 0 {
                return Err(Error::Protocol {
                    message: "connection closed".to_string(),
                });
            }
        }
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_connection_fatal() && !self.broken {
                warn!(address = %self.address, error = %e, "connection broken");
                self.broken = true;
            }
        }
        result
    }

    /// Marks the connection as unusable; the pool will close it on release.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Returns true once an I/O or protocol failure has been seen.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Number of commands sent whose replies have not been read.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Address this connection was dialed to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// When the connection was established.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// How long since the connection was last used or returned to the pool.
    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    pub(crate) fn touch(&mut self) {
        self.last_used = Instant::now();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("pending", &self.pending)
            .field("broken", &self.broken)
            .finish()
    }
}

async fn with_deadline<T>(
    limit: Option<Duration>,
    operation: &'static str,
    fut: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{operation} timed out after {limit:?}"),
            ))
        }),
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn pair() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, server) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (
            Connection::new(client.unwrap(), addr.to_string()),
            server.unwrap().0,
        )
    }

    #[tokio::test]
    async fn test_execute_ping() {
        let (mut conn, mut server) = pair().await;
        let server = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = server.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"*1\r\n$4\r\nPING\r\n");
            server.write_all(b"+PONG\r\n").await.unwrap();
        });

        let frame = conn.execute(&command::ping()).await.unwrap();
        assert_eq!(frame, Frame::simple("PONG"));
        assert_eq!(conn.pending(), 0);
        assert!(!conn.is_broken());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_buffers_until_flush() {
        let (mut conn, mut server) = pair().await;
        conn.send(&command::del("a"));
        conn.send(&command::del("b"));
        assert_eq!(conn.pending(), 2);
        conn.flush().await.unwrap();

        let expected = b"*2\r\n$3\r\nDEL\r\n$1\r\na\r\n*2\r\n$3\r\nDEL\r\n$1\r\nb\r\n";
        let mut buf = vec![0u8; expected.len()];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[..], &expected[..]);

        server.write_all(b":1\r\n:0\r\n").await.unwrap();
        assert_eq!(conn.receive().await.unwrap(), Frame::Integer(1));
        assert_eq!(conn.receive().await.unwrap(), Frame::Integer(0));
        assert_eq!(conn.pending(), 0);
    }

    #[tokio::test]
    async fn test_server_error_keeps_connection() {
        let (mut conn, mut server) = pair().await;
        let server = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let _ = server.read(&mut buf).await.unwrap();
            server.write_all(b"-ERR unknown command\r\n").await.unwrap();
        });

        let frame = conn.execute(&Cmd::new("NOPE")).await.unwrap();
        assert_eq!(frame.error_message().as_deref(), Some("ERR unknown command"));
        assert!(!conn.is_broken());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_peer_marks_broken() {
        let (mut conn, server) = pair().await;
        drop(server);

        let result = conn.execute(&command::ping()).await;
        assert!(result.is_err());
        assert!(conn.is_broken());
    }

    #[tokio::test]
    async fn test_read_timeout_marks_broken() {
        let (conn, _server) = pair().await;
        let mut conn = conn.with_timeouts(Some(Duration::from_millis(50)), None);

        let err = conn.execute(&command::ping()).await.unwrap_err();
        match err {
            Error::Io { source } => assert_eq!(source.kind(), io::ErrorKind::TimedOut),
            other => panic!("Expected Io timeout, got {other:?}"),
        }
        assert!(conn.is_broken());
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = CacheConfig {
            port,
            ..CacheConfig::default()
        };
        let err = Connection::dial(&config).await.unwrap_err();
        assert!(matches!(err, Error::Dial { .. }));
    }
}
