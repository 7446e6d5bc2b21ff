//! Client-side error taxonomy.

use std::io;

use gateway_protocol::ProtocolError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The socket could not be opened or the connect timed out.
    #[error("failed to connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Send or receive attempted without a live connection.
    #[error("not connected to the gateway")]
    NotConnected,

    /// The gateway closed the socket.
    #[error("connection closed by the gateway")]
    ConnectionClosed,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("gateway version {server} is older than the minimum supported {min}")]
    UnsupportedServerVersion { server: i32, min: i32 },

    /// The call needs a newer gateway than the one negotiated.
    #[error("{feature} needs gateway version {required}, negotiated {negotiated}")]
    FeatureNotSupported {
        feature: &'static str,
        required: i32,
        negotiated: i32,
    },

    /// A connection is single-use; build a new client instead.
    #[error("client has already been connected once; reconnect is not supported")]
    ReconnectUnsupported,

    #[error("invalid configuration: {0}")]
    Config(String),
}
