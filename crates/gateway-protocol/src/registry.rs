//! Message schema registry.
//!
//! ```text
//!   frame payload
//!        │
//!        ▼
//!   [wire id token] ──► IdMap<IncomingId> ──► decoder_for(id) ──► InboundMessage
//!        │                    │ miss                │ none
//!        ▼                    ▼                     ▼
//!   remaining tokens     UnknownMessage        UnknownMessage
//! ```
//!
//! The two id tables are built once from the static id enums and handed
//! to [`MessageRegistry::new`]; nothing here is a module-level global.

use std::collections::HashMap;

use bytes::Bytes;
use gateway_core::InboundMessage;
use tracing::debug;

use crate::decoders::{decoder_for, Decoder};
use crate::error::{ProtocolError, ProtocolResult};
use crate::field_codec::FieldReader;
use crate::wire_types::{IncomingId, OutgoingId, ProtocolVersion, WireId};

/// Bidirectional id ↔ name table for one message direction.
#[derive(Debug, Clone)]
pub struct IdMap<T: WireId> {
    by_id: HashMap<i32, T>,
    by_name: HashMap<&'static str, T>,
}

impl<T: WireId> IdMap<T> {
    pub fn from_ids(ids: &[T]) -> Self {
        let mut by_id = HashMap::with_capacity(ids.len());
        let mut by_name = HashMap::with_capacity(ids.len());
        for &id in ids {
            by_id.insert(id.id(), id);
            by_name.insert(id.name(), id);
        }
        IdMap { by_id, by_name }
    }

    /// Table holding every id of `T`.
    pub fn standard() -> Self {
        Self::from_ids(T::ALL)
    }

    pub fn by_id(&self, wire_id: i32) -> Option<T> {
        self.by_id.get(&wire_id).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<T> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// One inbound message after dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub wire_id: i32,
    /// `None` when the wire id is not in the inbound table.
    pub id: Option<IncomingId>,
    pub message: InboundMessage,
}

impl Decoded {
    /// Request id carried by the message, if it has one.
    pub fn request_id(&self) -> Option<i32> {
        self.message.request_id()
    }
}

/// Dispatches inbound payloads to their decoders.
#[derive(Debug, Clone)]
pub struct MessageRegistry {
    outgoing: IdMap<OutgoingId>,
    incoming: IdMap<IncomingId>,
}

impl MessageRegistry {
    pub fn new(outgoing: IdMap<OutgoingId>, incoming: IdMap<IncomingId>) -> Self {
        MessageRegistry { outgoing, incoming }
    }

    /// Registry over the full outbound and inbound tables.
    pub fn standard() -> Self {
        Self::new(IdMap::standard(), IdMap::standard())
    }

    pub fn outgoing(&self) -> &IdMap<OutgoingId> {
        &self.outgoing
    }

    pub fn incoming(&self) -> &IdMap<IncomingId> {
        &self.incoming
    }

    /// Decoder for an inbound wire id, if the id is known and decodable.
    pub fn decoder(&self, wire_id: i32) -> Option<(IncomingId, Decoder)> {
        let id = self.incoming.by_id(wire_id)?;
        decoder_for(id).map(|d| (id, d))
    }

    /// Decodes one frame payload.
    ///
    /// Ids without a decoder yield [`ProtocolError::UnknownMessage`]; the
    /// caller decides whether that is fatal.
    pub fn decode(&self, payload: &Bytes, version: ProtocolVersion) -> ProtocolResult<Decoded> {
        let mut reader = FieldReader::from_payload(payload);
        if reader.remaining() == 0 {
            return Err(ProtocolError::EmptyMessage);
        }

        let wire_id = reader.read_i32()?;
        let (id, decoder) = self
            .decoder(wire_id)
            .ok_or(ProtocolError::UnknownMessage { wire_id })?;

        let message = decoder(&mut reader, version)?;
        if reader.remaining() > 0 {
            debug!(
                message = id.name(),
                extra = reader.remaining(),
                "trailing tokens ignored"
            );
        }

        Ok(Decoded {
            wire_id,
            id: Some(id),
            message,
        })
    }

    /// Like [`decode`](Self::decode), but never fails: anything that cannot
    /// be decoded comes back as [`InboundMessage::Unrecognized`] holding the
    /// raw tokens. The error is returned alongside for logging.
    pub fn decode_lossy(
        &self,
        payload: &Bytes,
        version: ProtocolVersion,
    ) -> (Decoded, Option<ProtocolError>) {
        match self.decode(payload, version) {
            Ok(decoded) => (decoded, None),
            Err(err) => {
                let reader = FieldReader::from_payload(payload);
                let mut fields = reader.rest_as_strings();
                let wire_id = if fields.is_empty() {
                    0
                } else {
                    fields.remove(0).trim().parse().unwrap_or(0)
                };
                let known = self.incoming.by_id(wire_id);
                let decoded = Decoded {
                    wire_id,
                    id: known,
                    message: InboundMessage::Unrecognized {
                        wire_id,
                        name: known.map(|id| id.name()),
                        fields,
                    },
                };
                (decoded, Some(err))
            }
        }
    }
}

impl Default for MessageRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
