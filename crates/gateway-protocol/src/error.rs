//! Wire protocol error types.

use thiserror::Error;

/// Result type for wire protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can arise when framing, encoding or decoding messages.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// A field could not be encoded (missing required value, embedded NUL).
    /// Raised before any byte of the message is produced.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: &'static str },

    /// The message ended before the decoder consumed all expected tokens.
    #[error("message truncated: needed token #{position} of {available}")]
    Truncated { position: usize, available: usize },

    /// A token could not be interpreted as the type the schema expects.
    #[error("malformed token #{position} ({token:?}): expected {expected}")]
    Malformed {
        position: usize,
        token: String,
        expected: &'static str,
    },

    /// Inbound wire id with no registered decoder.
    #[error("no decoder registered for inbound message id {wire_id}")]
    UnknownMessage { wire_id: i32 },

    /// Frame length prefix exceeds the protocol maximum.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Frame payload carried no tokens at all.
    #[error("empty message payload")]
    EmptyMessage,

    /// Handshake reply did not carry `(serverVersion, connectionTime)`.
    #[error("malformed handshake reply: {0}")]
    Handshake(String),
}

impl ProtocolError {
    pub fn invalid_field(field: &'static str, reason: &'static str) -> Self {
        ProtocolError::InvalidField { field, reason }
    }
}
