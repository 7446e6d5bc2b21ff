// crates/gateway-client/tests/common/mod.rs
//
// Scripted in-process gateway: performs the server half of the handshake,
// then lets each test read requests and push frames.

#![allow(dead_code)]

use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::{Bytes, BytesMut};
use gateway_client::ClientConfig;
use gateway_protocol::{decode_tokens, Frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const CONNECTION_TIME: &str = "20261016 09:30:00 EST";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// NUL-terminated payload from text tokens.
pub fn payload(tokens: &[&str]) -> Bytes {
    let mut out = Vec::new();
    for t in tokens {
        out.extend_from_slice(t.as_bytes());
        out.push(0);
    }
    Bytes::from(out)
}

/// Length-prefixed frame bytes.
pub fn frame_bytes(tokens: &[&str]) -> Bytes {
    Frame::new(payload(tokens))
        .encode_to_bytes()
        .expect("test frame fits")
}

/// Client config pointed at `port` with short timeouts.
pub fn config(port: u16) -> ClientConfig {
    let mut config = ClientConfig::new("127.0.0.1", port, 1);
    config.read_timeout = Duration::from_millis(50);
    config.request_timeout = Duration::from_secs(2);
    config.connect_timeout = Duration::from_secs(2);
    config
}

/// Server side of one accepted connection.
pub struct GatewaySide {
    stream: TcpStream,
    buffer: BytesMut,
    /// Version range string the client announced.
    pub announced: String,
    /// Tokens of the `start_api` request.
    pub start_api: Vec<String>,
}

impl GatewaySide {
    async fn read_exact_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = Frame::decode(&mut self.buffer)? {
                return Ok(frame);
            }
            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                bail!("client closed the connection");
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Next request the client sent, as text tokens.
    pub async fn read_request(&mut self) -> Result<Vec<String>> {
        let frame = self.read_exact_frame().await?;
        Ok(decode_tokens(frame.payload())
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect())
    }

    pub async fn send(&mut self, tokens: &[&str]) -> Result<()> {
        self.send_raw(&frame_bytes(tokens)).await
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Writes `bytes` in pieces cut at `cuts`, pausing between writes so
    /// each piece arrives as a separate read.
    pub async fn send_in_pieces(&mut self, bytes: &[u8], cuts: &[usize]) -> Result<()> {
        let mut start = 0;
        for &cut in cuts.iter().chain(std::iter::once(&bytes.len())) {
            self.send_raw(&bytes[start..cut]).await?;
            tokio::time::sleep(Duration::from_millis(20)).await;
            start = cut;
        }
        Ok(())
    }

    /// Half-closes the gateway side; the client sees end of stream.
    pub async fn shutdown_write(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Waits until the client closes its side, ignoring anything it sends.
    pub async fn wait_for_close(&mut self, limit: Duration) -> Result<()> {
        let mut chunk = [0u8; 4096];
        loop {
            match tokio::time::timeout(limit, self.stream.read(&mut chunk)).await {
                Ok(Ok(0)) => return Ok(()),
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => bail!("client kept its socket open"),
            }
        }
    }

    /// Holds the connection open without sending anything.
    pub async fn idle(&mut self, for_: Duration) {
        tokio::time::sleep(for_).await;
    }
}

/// Accepts one client, answers the handshake with `server_version` and
/// reads `start_api`. `after_hello` frames are sent in the same write as
/// the handshake reply.
async fn accept(
    listener: TcpListener,
    server_version: i32,
    after_hello: Vec<Vec<String>>,
) -> Result<GatewaySide> {
    let (stream, _) = listener.accept().await?;
    let mut side = GatewaySide {
        stream,
        buffer: BytesMut::new(),
        announced: String::new(),
        start_api: Vec::new(),
    };

    let mut prefix = [0u8; 4];
    side.stream.read_exact(&mut prefix).await?;
    if &prefix != b"API\0" {
        bail!("bad prefix {:?}", prefix);
    }
    let range = side.read_exact_frame().await?;
    side.announced = String::from_utf8(range.payload().to_vec()).context("range is utf-8")?;

    let mut hello = BytesMut::new();
    let version = server_version.to_string();
    hello.extend_from_slice(&frame_bytes(&[version.as_str(), CONNECTION_TIME]));
    for tokens in &after_hello {
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        hello.extend_from_slice(&frame_bytes(&refs));
    }
    side.send_raw(&hello).await?;

    if server_version >= gateway_protocol::MIN_CLIENT_VERSION {
        side.start_api = side.read_request().await?;
    }
    Ok(side)
}

/// Starts a mock gateway running `script` against the first client.
pub async fn spawn<F, Fut>(server_version: i32, script: F) -> Result<(u16, JoinHandle<Result<()>>)>
where
    F: FnOnce(GatewaySide) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    spawn_with_greeting(server_version, Vec::new(), script).await
}

pub async fn spawn_with_greeting<F, Fut>(
    server_version: i32,
    after_hello: Vec<Vec<String>>,
    script: F,
) -> Result<(u16, JoinHandle<Result<()>>)>
where
    F: FnOnce(GatewaySide) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let handle = tokio::spawn(async move {
        let side = accept(listener, server_version, after_hello).await?;
        script(side).await
    });
    Ok((port, handle))
}
