//! Length-prefixed framing.
//!
//! ```text
//! [4-byte big-endian length][length bytes of NUL-terminated tokens]
//! ```
//!
//! There is no checksum and no type byte outside the payload; the first
//! token of every payload is the message id.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, ProtocolResult};
use crate::wire_types::{FRAME_HEADER_LEN, MAX_FRAME_LEN};

/// One complete frame. The length is always the payload length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Frame {
            payload: payload.into(),
        }
    }

    pub fn length(&self) -> u32 {
        self.payload.len() as u32
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Appends header and payload to `buf`. A payload the peer would
    /// refuse is rejected and `buf` is left untouched.
    pub fn encode(&self, buf: &mut BytesMut) -> ProtocolResult<()> {
        if self.payload.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge {
                size: self.payload.len(),
                max: MAX_FRAME_LEN,
            });
        }
        buf.reserve(FRAME_HEADER_LEN + self.payload.len());
        buf.put_u32(self.length());
        buf.put_slice(&self.payload);
        Ok(())
    }

    pub fn encode_to_bytes(&self) -> ProtocolResult<Bytes> {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Attempts to take one frame off the front of `buf`.
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched if the header or the
    /// payload is still incomplete.
    pub fn decode(buf: &mut BytesMut) -> ProtocolResult<Option<Frame>> {
        if buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if len > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_LEN,
            });
        }

        if buf.len() < FRAME_HEADER_LEN + len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_LEN);
        let payload = buf.split_to(len).freeze();
        Ok(Some(Frame { payload }))
    }
}

/// Accumulates socket reads and hands out complete frames.
///
/// A read boundary is never assumed to be a frame boundary: bytes of a
/// trailing partial frame stay buffered and are completed by later pushes.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_capacity(64 * 1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        FrameBuffer {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Appends `data` and extracts every frame that is now complete.
    pub fn push(&mut self, data: &[u8]) -> ProtocolResult<Vec<Frame>> {
        self.buffer.extend_from_slice(data);
        self.drain_frames()
    }

    /// Extracts every complete frame already buffered.
    pub fn drain_frames(&mut self) -> ProtocolResult<Vec<Frame>> {
        let mut frames = Vec::new();
        while let Some(frame) = Frame::decode(&mut self.buffer)? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bytes {
        Bytes::from_static(b"79\x0042\x001\x00265598\x00AAPL\x00")
    }

    #[test]
    fn frame_roundtrip() {
        let frame = Frame::new(sample());
        let mut buf = BytesMut::from(&frame.encode_to_bytes().unwrap()[..]);

        let decoded = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.payload(), &sample());
        assert_eq!(decoded.length() as usize, sample().len());
        assert!(buf.is_empty());
    }

    #[test]
    fn header_is_big_endian() {
        let encoded = Frame::new(Bytes::from_static(b"abc")).encode_to_bytes().unwrap();
        assert_eq!(&encoded[..4], &[0, 0, 0, 3]);
    }

    #[test]
    fn reassembles_across_every_split_point() {
        let encoded = Frame::new(sample()).encode_to_bytes().unwrap();

        for split in 0..=encoded.len() {
            let mut fb = FrameBuffer::new();
            let mut frames = fb.push(&encoded[..split]).unwrap();
            frames.extend(fb.push(&encoded[split..]).unwrap());

            assert_eq!(frames.len(), 1, "split at {}", split);
            assert_eq!(frames[0].payload(), &sample());
            assert_eq!(fb.pending(), 0);
        }
    }

    #[test]
    fn several_frames_in_one_read_and_a_partial_tail() {
        let mut wire = BytesMut::new();
        Frame::new(Bytes::from_static(b"9\x001\x00")).encode(&mut wire).unwrap();
        Frame::new(Bytes::from_static(b"62\x001\x00")).encode(&mut wire).unwrap();
        let tail = Frame::new(Bytes::from_static(b"49\x001\x00")).encode_to_bytes().unwrap();
        wire.extend_from_slice(&tail[..5]);

        let mut fb = FrameBuffer::new();
        let frames = fb.push(&wire).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(fb.pending(), 5);

        let rest = fb.push(&tail[5..]).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].payload().as_ref(), b"49\x001\x00");
    }

    #[test]
    fn empty_payload_is_a_valid_frame() {
        let mut fb = FrameBuffer::new();
        let frames = fb.push(&[0, 0, 0, 0]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].length(), 0);
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut fb = FrameBuffer::new();
        let err = fb.push(&[0x01, 0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[test]
    fn oversized_payload_is_not_encoded() {
        let frame = Frame::new(vec![b'x'; MAX_FRAME_LEN + 1]);
        let mut buf = BytesMut::new();
        let err = frame.encode(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FrameTooLarge { size, .. } if size == MAX_FRAME_LEN + 1
        ));
        assert!(buf.is_empty());

        let largest = Frame::new(vec![b'x'; MAX_FRAME_LEN]);
        assert_eq!(largest.encode_to_bytes().unwrap().len(), MAX_FRAME_LEN + 4);
    }
}
