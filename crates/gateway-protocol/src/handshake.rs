//! Connection handshake.
//!
//! The client writes `"API\0"` followed by one frame holding the supported
//! version range (`"v100..176"`, optionally followed by a space and
//! connect options). The range string is raw text, not a NUL-terminated
//! token. The gateway answers with one frame of two tokens:
//! `serverVersion` and `connectionTime`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, ProtocolResult};
use crate::field_codec::FieldReader;
use crate::frame::Frame;
use crate::wire_types::{version_range, ProtocolVersion, API_PREFIX};

/// The gateway's half of the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub version: ProtocolVersion,
    pub connection_time: String,
}

/// Bytes the client sends right after the TCP connect.
pub fn encode_handshake(connect_options: Option<&str>) -> ProtocolResult<Bytes> {
    let mut range = version_range();
    if let Some(options) = connect_options.filter(|o| !o.is_empty()) {
        range.push(' ');
        range.push_str(options);
    }

    let mut buf = BytesMut::with_capacity(API_PREFIX.len() + 4 + range.len());
    buf.put_slice(API_PREFIX);
    Frame::new(Bytes::from(range)).encode(&mut buf)?;
    Ok(buf.freeze())
}

pub fn decode_handshake(frame: &Frame) -> ProtocolResult<ServerHello> {
    let mut reader = FieldReader::from_payload(frame.payload());
    if reader.remaining() < 2 {
        return Err(ProtocolError::Handshake(format!(
            "expected 2 fields, got {}",
            reader.remaining()
        )));
    }

    let version = reader
        .read_i32()
        .map_err(|e| ProtocolError::Handshake(e.to_string()))?;
    let connection_time = reader.read_str()?;

    Ok(ServerHello {
        version: ProtocolVersion::new(version),
        connection_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_bytes() {
        let bytes = encode_handshake(None).unwrap();
        assert_eq!(&bytes[..4], b"API\0");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 9]);
        assert_eq!(&bytes[8..], b"v100..176");
    }

    #[test]
    fn handshake_with_connect_options() {
        let bytes = encode_handshake(Some("+PACEAPI")).unwrap();
        assert_eq!(&bytes[8..], b"v100..176 +PACEAPI");
    }

    #[test]
    fn server_reply_is_parsed() {
        let frame = Frame::new(Bytes::from_static(b"176\x0020261016 09:30:00 EST\x00"));
        let hello = decode_handshake(&frame).unwrap();
        assert_eq!(hello.version, ProtocolVersion::new(176));
        assert_eq!(hello.connection_time, "20261016 09:30:00 EST");
    }

    #[test]
    fn short_reply_is_rejected() {
        let frame = Frame::new(Bytes::from_static(b"176\x00"));
        assert!(matches!(
            decode_handshake(&frame),
            Err(ProtocolError::Handshake(_))
        ));
    }
}
