//! gateway-protocol
//!
//! Wire-level pieces of the gateway protocol.
//!
//! This crate turns logical gateway messages
//! (`gateway_core::OutboundRequest` / `InboundMessage`) into frames and
//! back again. It does no I/O.
//!
//! - [`frame`]           : length-prefixed frames and stream reassembly
//! - [`field_codec`]     : NUL-terminated tokens, sentinels, token cursor
//! - [`wire_types`]      : direction-scoped message ids, protocol version
//! - [`server_versions`] : version thresholds gating optional fields
//! - [`handshake`]       : connect prefix and server hello
//! - [`decoders`]        : per-message inbound decoders
//! - [`registry`]        : id tables and decoder dispatch
//! - [`encoders`]        : version-gated outbound slot builders

pub mod error;
pub mod wire_types;
pub mod server_versions;
pub mod frame;
pub mod field_codec;
pub mod handshake;
pub mod decoders;
pub mod registry;
pub mod encoders;

pub use error::{ProtocolError, ProtocolResult};

pub use wire_types::{
    IncomingId,
    OutgoingId,
    ProtocolVersion,
    WireId,
    MAX_CLIENT_VERSION,
    MAX_FRAME_LEN,
    MIN_CLIENT_VERSION,
};

pub use frame::{Frame, FrameBuffer};

pub use field_codec::{
    decode_tokens,
    encode_field,
    encode_message,
    encode_optional_double,
    encode_optional_int,
    Field,
    FieldReader,
    UNSET_DOUBLE,
    UNSET_INTEGER,
    UNSET_LONG,
};

pub use handshake::{decode_handshake, encode_handshake, ServerHello};

pub use registry::{Decoded, IdMap, MessageRegistry};

pub use encoders::{builder_for, encode_request, min_version, MessageBuilder};
