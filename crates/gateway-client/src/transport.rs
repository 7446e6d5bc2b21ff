//! TCP transport: connect + handshake, locked frame writes, timed frame
//! reads.
//!
//! ```text
//!            ┌──────────── Mutex<WriteSide> ───────────┐
//! send_frame │ [len u32 BE][payload]  one write_all    │──► socket
//!            └─────────────────────────────────────────┘
//!            ┌──────────── Mutex<ReadSide> ────────────┐
//! socket ──► │ timeout(read) + try_read drain          │
//!            │        └─► FrameBuffer (keeps partials) │──► Vec<Frame>
//!            └─────────────────────────────────────────┘
//! ```
//!
//! A transport connects once. State only moves forward:
//! `Unknown → Connected → Disconnected`.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use bytes::BytesMut;
use gateway_protocol::{
    decode_handshake, encode_handshake, Frame, FrameBuffer, ProtocolVersion, ServerHello,
    MIN_CLIENT_VERSION,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

const READ_CHUNK: usize = 8 * 1024;

/// Connection lifecycle.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unknown = 0,
    Connected = 1,
    Disconnected = 2,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connected,
            2 => ConnectionState::Disconnected,
            _ => ConnectionState::Unknown,
        }
    }
}

struct ReadSide {
    half: Option<OwnedReadHalf>,
    buffer: FrameBuffer,
    /// Complete frames that arrived together with the handshake reply.
    backlog: VecDeque<Frame>,
}

pub struct Transport {
    read_timeout: Duration,
    state: AtomicU8,
    hello: OnceLock<ServerHello>,
    reader: Mutex<ReadSide>,
    writer: Mutex<Option<OwnedWriteHalf>>,
}

impl Transport {
    pub fn new(read_timeout: Duration) -> Self {
        Transport {
            read_timeout,
            state: AtomicU8::new(ConnectionState::Unknown as u8),
            hello: OnceLock::new(),
            reader: Mutex::new(ReadSide {
                half: None,
                buffer: FrameBuffer::new(),
                backlog: VecDeque::new(),
            }),
            writer: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Negotiated version, once the handshake has completed.
    pub fn version(&self) -> Option<ProtocolVersion> {
        self.hello.get().map(|h| h.version)
    }

    pub fn connection_time(&self) -> Option<&str> {
        self.hello.get().map(|h| h.connection_time.as_str())
    }

    /// Opens the socket and runs the version handshake.
    ///
    /// Only valid from `Unknown`; a transport never reconnects.
    pub async fn connect(
        &self,
        addr: &str,
        connect_options: Option<&str>,
        connect_timeout: Duration,
    ) -> ClientResult<ServerHello> {
        let mut writer = self.writer.lock().await;
        if self.state() != ConnectionState::Unknown {
            return Err(ClientError::ReconnectUnsupported);
        }

        info!("Connecting to {}...", addr);
        let stream = match timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(ClientError::Connection {
                    addr: addr.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(ClientError::Connection {
                    addr: addr.to_string(),
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                })
            }
        };
        stream.set_nodelay(true)?;
        let (mut read_half, mut write_half) = stream.into_split();

        write_half.write_all(&encode_handshake(connect_options)?).await?;
        write_half.flush().await?;

        let mut reader = self.reader.lock().await;
        reader.buffer = FrameBuffer::new();
        let mut frames = read_handshake(&mut read_half, &mut reader.buffer, connect_timeout).await?;
        let first = frames.pop_front().ok_or_else(|| {
            ClientError::Handshake("no reply from gateway".to_string())
        })?;
        let hello = decode_handshake(&first).map_err(|e| ClientError::Handshake(e.to_string()))?;

        if hello.version.get() < MIN_CLIENT_VERSION {
            return Err(ClientError::UnsupportedServerVersion {
                server: hello.version.get(),
                min: MIN_CLIENT_VERSION,
            });
        }

        info!(
            "Connected to {} (server version {}, connection time {})",
            addr, hello.version, hello.connection_time
        );

        reader.backlog = frames;
        reader.half = Some(read_half);
        *writer = Some(write_half);
        let _ = self.hello.set(hello.clone());
        self.state
            .store(ConnectionState::Connected as u8, Ordering::Release);

        Ok(hello)
    }

    /// Writes one frame atomically with respect to other senders.
    pub async fn send_frame(&self, frame: &Frame) -> ClientResult<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let mut buf = BytesMut::with_capacity(frame.payload().len() + 4);
        frame.encode(&mut buf)?;

        let mut writer = self.writer.lock().await;
        let half = writer.as_mut().ok_or(ClientError::NotConnected)?;
        half.write_all(&buf).await?;
        half.flush().await?;
        Ok(())
    }

    /// Returns every complete frame currently available.
    ///
    /// Waits at most one read timeout for the first byte, then drains
    /// whatever else is already buffered by the OS. An empty result means
    /// nothing arrived in time. Partial frames stay buffered for the next
    /// call.
    pub async fn receive_frames(&self) -> ClientResult<Vec<Frame>> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let mut side = self.reader.lock().await;
        if !side.backlog.is_empty() {
            return Ok(side.backlog.drain(..).collect());
        }

        let ReadSide { half, buffer, .. } = &mut *side;
        let half = half.as_mut().ok_or(ClientError::NotConnected)?;

        let mut chunk = [0u8; READ_CHUNK];
        let read = timeout(self.read_timeout, half.read(&mut chunk)).await;
        let n = match read {
            Err(_) => return Ok(Vec::new()),
            Ok(Ok(0)) => {
                warn!("Gateway closed the connection");
                drop(side);
                self.disconnect().await;
                return Err(ClientError::ConnectionClosed);
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
        };

        let mut frames = buffer.push(&chunk[..n])?;
        loop {
            match half.try_read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => frames.extend(buffer.push(&chunk[..n])?),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        debug!(
            frames = frames.len(),
            pending = buffer.pending(),
            "received frames"
        );
        Ok(frames)
    }

    /// Closes the socket. Safe to call more than once.
    pub async fn disconnect(&self) {
        let mut writer = self.writer.lock().await;
        if let Some(mut half) = writer.take() {
            let _ = half.shutdown().await;
            info!("Disconnected from gateway");
        }
        drop(writer);

        let mut reader = self.reader.lock().await;
        reader.half = None;
        reader.backlog.clear();
        self.state
            .store(ConnectionState::Disconnected as u8, Ordering::Release);
    }
}

async fn read_handshake(
    half: &mut OwnedReadHalf,
    buffer: &mut FrameBuffer,
    limit: Duration,
) -> ClientResult<VecDeque<Frame>> {
    let deadline = Instant::now() + limit;
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let n = match timeout(remaining, half.read(&mut chunk)).await {
            Err(_) => {
                return Err(ClientError::Handshake(
                    "timed out waiting for server version".to_string(),
                ))
            }
            Ok(Ok(0)) => return Err(ClientError::ConnectionClosed),
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
        };

        let frames = buffer.push(&chunk[..n])?;
        if !frames.is_empty() {
            return Ok(frames.into());
        }
    }
}
