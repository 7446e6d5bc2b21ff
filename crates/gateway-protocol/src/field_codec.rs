//! Field codec: typed values ↔ NUL-terminated tokens.
//!
//! Encoding is typed ([`Field`]); decoding only splits a payload into raw
//! tokens. Interpretation of each token is left to the message decoder,
//! which reads them in order through a [`FieldReader`].
//!
//! Optional numerics use a sentinel to mean "not specified". The sentinel
//! is sent as an empty token rather than its literal text, and an empty
//! token read through a sentinel-aware accessor comes back as the
//! sentinel. Plain accessors read an empty token as zero.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::Frame;

/// "Not specified" marker for 32-bit integer fields.
pub const UNSET_INTEGER: i32 = i32::MAX;

/// "Not specified" marker for floating point fields.
pub const UNSET_DOUBLE: f64 = f64::MAX;

/// "Not specified" marker for 64-bit integer fields.
pub const UNSET_LONG: i64 = i64::MAX;

const NUL: u8 = 0;

/// A typed outbound value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Int(i64),
    Double(f64),
    /// Encoded as `"1"` / `"0"`.
    Bool(bool),
    Text(String),
    /// Integer where [`UNSET_INTEGER`] encodes as an empty token.
    OptionalInt(i32),
    /// Double where [`UNSET_DOUBLE`] encodes as an empty token.
    OptionalDouble(f64),
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v as i64)
    }
}

impl From<i64> for Field {
    fn from(v: i64) -> Self {
        Field::Int(v)
    }
}

impl From<f64> for Field {
    fn from(v: f64) -> Self {
        Field::Double(v)
    }
}

impl From<bool> for Field {
    fn from(v: bool) -> Self {
        Field::Bool(v)
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Text(v.to_string())
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Text(v)
    }
}

impl From<&String> for Field {
    fn from(v: &String) -> Self {
        Field::Text(v.clone())
    }
}

impl Field {
    /// Text form of the value, without the terminator.
    pub fn to_wire_string(&self) -> String {
        match self {
            Field::Int(v) => v.to_string(),
            Field::Double(v) => v.to_string(),
            Field::Bool(true) => "1".to_string(),
            Field::Bool(false) => "0".to_string(),
            Field::Text(s) => s.clone(),
            Field::OptionalInt(v) if *v == UNSET_INTEGER => String::new(),
            Field::OptionalInt(v) => v.to_string(),
            Field::OptionalDouble(v) if *v == UNSET_DOUBLE => String::new(),
            Field::OptionalDouble(v) => v.to_string(),
        }
    }

    /// A NUL inside a text value would split it into two tokens.
    pub fn check(&self, name: &'static str) -> ProtocolResult<()> {
        match self {
            Field::Text(s) if s.as_bytes().contains(&NUL) => {
                Err(ProtocolError::invalid_field(name, "contains a NUL byte"))
            }
            _ => Ok(()),
        }
    }
}

/// Appends one NUL-terminated token for `field`.
pub fn encode_field(field: &Field, out: &mut BytesMut) -> ProtocolResult<()> {
    field.check("value")?;
    out.put_slice(field.to_wire_string().as_bytes());
    out.put_u8(NUL);
    Ok(())
}

/// Appends an integer token, or an empty token when `value` is the sentinel.
pub fn encode_optional_int(value: i32, out: &mut BytesMut) {
    if value != UNSET_INTEGER {
        out.put_slice(value.to_string().as_bytes());
    }
    out.put_u8(NUL);
}

/// Appends a double token, or an empty token when `value` is the sentinel.
pub fn encode_optional_double(value: f64, out: &mut BytesMut) {
    if value != UNSET_DOUBLE {
        out.put_slice(value.to_string().as_bytes());
    }
    out.put_u8(NUL);
}

/// Encodes `fields` in order into a frame.
///
/// Every field is checked before the first byte is written, so a failure
/// never leaves a partially built payload behind.
pub fn encode_message(fields: &[Field]) -> ProtocolResult<Frame> {
    for field in fields {
        field.check("value")?;
    }

    let mut out = BytesMut::with_capacity(fields.len() * 8);
    for field in fields {
        encode_field(field, &mut out)?;
    }
    Ok(Frame::new(out.freeze()))
}

/// Splits a payload into its NUL-terminated tokens.
///
/// Tokens are zero-copy slices of `payload`. A trailing run of bytes
/// without a terminator is kept as a final token if it is non-empty.
pub fn decode_tokens(payload: &Bytes) -> Vec<Bytes> {
    let mut tokens = Vec::new();
    let mut start = 0;

    for (i, b) in payload.iter().enumerate() {
        if *b == NUL {
            tokens.push(payload.slice(start..i));
            start = i + 1;
        }
    }
    if start < payload.len() {
        tokens.push(payload.slice(start..));
    }

    tokens
}

/// Cursor over the tokens of one inbound message.
#[derive(Debug, Clone)]
pub struct FieldReader {
    tokens: Vec<Bytes>,
    pos: usize,
}

impl FieldReader {
    pub fn new(tokens: Vec<Bytes>) -> Self {
        FieldReader { tokens, pos: 0 }
    }

    pub fn from_payload(payload: &Bytes) -> Self {
        Self::new(decode_tokens(payload))
    }

    /// Index of the next token to be read.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.pos)
    }

    fn next_token(&mut self) -> ProtocolResult<(usize, Bytes)> {
        let position = self.pos;
        let token = self
            .tokens
            .get(position)
            .cloned()
            .ok_or(ProtocolError::Truncated {
                position,
                available: self.tokens.len(),
            })?;
        self.pos += 1;
        Ok((position, token))
    }

    fn parse<T: std::str::FromStr>(
        &mut self,
        expected: &'static str,
        empty: T,
    ) -> ProtocolResult<T> {
        let (position, token) = self.next_token()?;
        let text = String::from_utf8_lossy(&token);
        let text = text.trim();
        if text.is_empty() {
            return Ok(empty);
        }
        text.parse::<T>().map_err(|_| ProtocolError::Malformed {
            position,
            token: text.to_string(),
            expected,
        })
    }

    pub fn read_str(&mut self) -> ProtocolResult<String> {
        let (_, token) = self.next_token()?;
        Ok(String::from_utf8_lossy(&token).into_owned())
    }

    /// Empty token reads as `0`.
    pub fn read_i32(&mut self) -> ProtocolResult<i32> {
        self.parse("integer", 0)
    }

    /// Empty token reads as `0`.
    pub fn read_i64(&mut self) -> ProtocolResult<i64> {
        self.parse("long", 0)
    }

    /// Empty token reads as `0.0`.
    pub fn read_f64(&mut self) -> ProtocolResult<f64> {
        self.parse("double", 0.0)
    }

    /// Any non-zero integer is `true`.
    pub fn read_bool(&mut self) -> ProtocolResult<bool> {
        Ok(self.read_i32()? != 0)
    }

    /// Empty token reads as [`UNSET_INTEGER`].
    pub fn read_i32_unset(&mut self) -> ProtocolResult<i32> {
        self.parse("integer", UNSET_INTEGER)
    }

    /// Empty token reads as [`UNSET_LONG`].
    pub fn read_i64_unset(&mut self) -> ProtocolResult<i64> {
        self.parse("long", UNSET_LONG)
    }

    /// Empty token reads as [`UNSET_DOUBLE`].
    pub fn read_f64_unset(&mut self) -> ProtocolResult<f64> {
        self.parse("double", UNSET_DOUBLE)
    }

    /// Count-prefixed repeat group: one count token followed by `count`
    /// fixed-shape repeats, each read by `item`.
    pub fn read_group<T, F>(&mut self, mut item: F) -> ProtocolResult<Vec<T>>
    where
        F: FnMut(&mut FieldReader) -> ProtocolResult<T>,
    {
        let position = self.pos;
        let count = self.read_i32()?;
        if count < 0 {
            return Err(ProtocolError::Malformed {
                position,
                token: count.to_string(),
                expected: "non-negative group count",
            });
        }

        let mut items = Vec::with_capacity((count as usize).min(self.remaining()));
        for _ in 0..count {
            items.push(item(self)?);
        }
        Ok(items)
    }

    pub fn skip(&mut self, n: usize) -> ProtocolResult<()> {
        for _ in 0..n {
            self.next_token()?;
        }
        Ok(())
    }

    /// Unread tokens as text.
    pub fn rest_as_strings(&self) -> Vec<String> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect()
    }
}

/// `None` for the sentinel, `Some(v)` otherwise.
pub fn unset_double_to_option(v: f64) -> Option<f64> {
    if v == UNSET_DOUBLE {
        None
    } else {
        Some(v)
    }
}

/// `None` for the sentinel, `Some(v)` otherwise.
pub fn unset_int_to_option(v: i32) -> Option<i32> {
    if v == UNSET_INTEGER {
        None
    } else {
        Some(v)
    }
}
