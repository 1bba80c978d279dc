//! # Packet Codec Contract
//!
//! Per-packet encode/decode expressed as an ordered walk over a layout table.
//!
//! A packet kind implements [`PacketCodec`] by declaring its layout (a slice of
//! [`VersionedField`] in wire order) and by reading/writing each field through
//! a [`FieldReader`] or [`FieldWriter`]. Those enforce the declared order, so
//! a codec that skips or swaps a field fails with `FieldOrder` instead of
//! producing a silently misaligned buffer.
//!
//! ## Guarantees
//! - `encode` returns a buffer only when every present field was written
//! - `decode` exposes a packet only when every present field was read
//! - A failed secondary payload parse yields [`Decoded::PayloadUnparseable`],
//!   keeping the successfully decoded primary fields

use bytes::Bytes;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::core::cursor::{WireReader, WireWriter};
use crate::core::field::{FieldShape, FieldValue, Presence, VersionedField};
use crate::core::version::VersionPair;
use crate::error::{ProtocolError, Result};
use crate::payload::PayloadError;
use crate::protocol::registry::PacketKind;
use crate::utils::metrics::global_metrics;

/// Encode/decode contract implemented by every packet kind.
pub trait PacketCodec: Sized {
    /// Structured form of the packet's secondary payload (`()` if none).
    type Payload;

    const KIND: PacketKind;

    /// Fields in wire order.
    fn layout() -> &'static [VersionedField];

    fn write_fields(&self, out: &mut FieldWriter<'_>) -> Result<()>;

    fn read_fields(input: &mut FieldReader<'_, '_>) -> Result<Self>;

    /// Secondary parse run after the primary fields decoded.
    fn parse_payload(&self) -> std::result::Result<Self::Payload, PayloadError>;
}

/// Outcome of a decode whose primary fields all succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<P, S> {
    Complete { packet: P, payload: S },
    /// Primary fields are valid; the structured payload is not.
    PayloadUnparseable { packet: P, reason: String },
}

impl<P, S> Decoded<P, S> {
    pub fn packet(&self) -> &P {
        match self {
            Decoded::Complete { packet, .. } | Decoded::PayloadUnparseable { packet, .. } => packet,
        }
    }

    pub fn into_packet(self) -> P {
        match self {
            Decoded::Complete { packet, .. } | Decoded::PayloadUnparseable { packet, .. } => packet,
        }
    }

    pub fn payload(&self) -> Option<&S> {
        match self {
            Decoded::Complete { payload, .. } => Some(payload),
            Decoded::PayloadUnparseable { .. } => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Decoded::Complete { .. })
    }

    /// Treat an unparseable payload as an error.
    pub fn into_result(self) -> Result<(P, S)> {
        match self {
            Decoded::Complete { packet, payload } => Ok((packet, payload)),
            Decoded::PayloadUnparseable { reason, .. } => {
                Err(ProtocolError::PayloadUnparseable(reason))
            }
        }
    }

    pub fn map<Q, T>(
        self,
        packet_fn: impl FnOnce(P) -> Q,
        payload_fn: impl FnOnce(S) -> T,
    ) -> Decoded<Q, T> {
        match self {
            Decoded::Complete { packet, payload } => Decoded::Complete {
                packet: packet_fn(packet),
                payload: payload_fn(payload),
            },
            Decoded::PayloadUnparseable { packet, reason } => Decoded::PayloadUnparseable {
                packet: packet_fn(packet),
                reason,
            },
        }
    }
}

/// Encode a packet for a version pair.
#[instrument(level = "trace", skip(packet), fields(kind = ?P::KIND))]
pub fn encode<P: PacketCodec>(packet: &P, versions: VersionPair) -> Result<Bytes> {
    let mut wire = WireWriter::with_capacity(64);
    let result = {
        let mut out = FieldWriter::new(&mut wire, versions, P::layout());
        packet.write_fields(&mut out).and_then(|()| out.finish())
    };
    match result {
        Ok(()) => {
            global_metrics().packet_encoded(wire.len() as u64);
            Ok(wire.into_bytes())
        }
        Err(e) => {
            global_metrics().encode_error();
            Err(e)
        }
    }
}

/// Decode a packet body for a version pair.
#[instrument(level = "trace", skip(buf), fields(kind = ?P::KIND, len = buf.len()))]
pub fn decode<P: PacketCodec>(buf: &[u8], versions: VersionPair) -> Result<Decoded<P, P::Payload>> {
    let mut wire = WireReader::new(buf);
    let packet = {
        let mut input = FieldReader::new(&mut wire, versions, P::layout());
        P::read_fields(&mut input).and_then(|packet| input.finish().map(|()| packet))
    };
    let packet = match packet {
        Ok(packet) => packet,
        Err(e) => {
            global_metrics().decode_error();
            return Err(e);
        }
    };
    global_metrics().packet_decoded(buf.len() as u64);

    if !wire.is_empty() {
        debug!(
            kind = ?P::KIND,
            trailing = wire.remaining(),
            "Trailing bytes after last declared field"
        );
    }

    Ok(match packet.parse_payload() {
        Ok(payload) => Decoded::Complete { packet, payload },
        Err(e) => {
            global_metrics().payload_failure();
            warn!(kind = ?P::KIND, error = %e, "Payload unparseable, primary fields kept");
            Decoded::PayloadUnparseable {
                packet,
                reason: e.to_string(),
            }
        }
    })
}

/// Ordered cursor over a layout used while decoding.
pub struct FieldReader<'r, 'a> {
    wire: &'r mut WireReader<'a>,
    versions: VersionPair,
    layout: &'static [VersionedField],
    next: usize,
}

impl<'r, 'a> FieldReader<'r, 'a> {
    pub fn new(
        wire: &'r mut WireReader<'a>,
        versions: VersionPair,
        layout: &'static [VersionedField],
    ) -> Self {
        Self {
            wire,
            versions,
            layout,
            next: 0,
        }
    }

    pub fn versions(&self) -> VersionPair {
        self.versions
    }

    fn advance(&mut self, field: &VersionedField) -> Result<Presence> {
        let expected = self.layout.get(self.next).ok_or_else(|| ProtocolError::FieldOrder {
            expected: "<end of layout>".to_string(),
            found: field.name().to_string(),
        })?;
        if expected.name() != field.name() {
            return Err(ProtocolError::FieldOrder {
                expected: expected.name().to_string(),
                found: field.name().to_string(),
            });
        }
        self.next += 1;
        Ok(expected.presence(self.versions))
    }

    /// Read the next declared field; `None` when absent for this pair.
    pub fn read(&mut self, field: &VersionedField) -> Result<Option<FieldValue>> {
        match self.advance(field)? {
            Presence::Absent => Ok(None),
            Presence::Present(shape) => self.wire.read_value(&shape).map(Some),
        }
    }

    pub fn read_text(&mut self, field: &VersionedField) -> Result<Option<String>> {
        self.read(field)?.map(|v| v.into_text(field.name())).transpose()
    }

    pub fn read_int(&mut self, field: &VersionedField) -> Result<Option<i64>> {
        self.read(field)?.map(|v| v.into_int(field.name())).transpose()
    }

    pub fn read_double(&mut self, field: &VersionedField) -> Result<Option<f64>> {
        self.read(field)?.map(|v| v.into_double(field.name())).transpose()
    }

    pub fn read_bool(&mut self, field: &VersionedField) -> Result<Option<bool>> {
        self.read(field)?.map(|v| v.into_bool(field.name())).transpose()
    }

    pub fn read_identifier(&mut self, field: &VersionedField) -> Result<Option<Uuid>> {
        self.read(field)?.map(|v| v.into_identifier(field.name())).transpose()
    }

    /// Read a field that every revision carries.
    pub fn require<T>(
        &mut self,
        field: &VersionedField,
        read: impl FnOnce(&mut Self, &VersionedField) -> Result<Option<T>>,
    ) -> Result<T> {
        read(self, field)?.ok_or_else(|| ProtocolError::FieldTypeMismatch {
            field: field.name().to_string(),
            expected: "present".to_string(),
        })
    }

    /// Read a count field, then `count` elements laid out by `element`.
    ///
    /// The count is validated against `max` and against the remaining input
    /// (every element occupies at least one byte) before allocating.
    pub fn read_repeated<T>(
        &mut self,
        count_field: &VersionedField,
        max: usize,
        element: &'static [VersionedField],
        mut read_one: impl FnMut(&mut FieldReader<'_, 'a>) -> Result<T>,
    ) -> Result<Vec<T>> {
        let Some(declared) = self.read_int(count_field)? else {
            return Ok(Vec::new());
        };
        let count = usize::try_from(declared)
            .ok()
            .filter(|count| *count <= max)
            .ok_or(ProtocolError::MalformedPacket {
                length: declared,
                limit: max,
            })?;
        let remaining = self.wire.remaining();
        if count > remaining {
            return Err(ProtocolError::TruncatedPacket {
                needed: count,
                remaining,
            });
        }

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let mut nested = FieldReader::new(&mut *self.wire, self.versions, element);
            let item = read_one(&mut nested)?;
            nested.finish()?;
            items.push(item);
        }
        Ok(items)
    }

    /// Every declared field must have been visited.
    pub fn finish(&self) -> Result<()> {
        match self.layout.get(self.next) {
            None => Ok(()),
            Some(missing) => Err(ProtocolError::FieldOrder {
                expected: missing.name().to_string(),
                found: "<end of codec>".to_string(),
            }),
        }
    }
}

/// Ordered cursor over a layout used while encoding.
pub struct FieldWriter<'w> {
    wire: &'w mut WireWriter,
    versions: VersionPair,
    layout: &'static [VersionedField],
    next: usize,
}

impl<'w> FieldWriter<'w> {
    pub fn new(
        wire: &'w mut WireWriter,
        versions: VersionPair,
        layout: &'static [VersionedField],
    ) -> Self {
        Self {
            wire,
            versions,
            layout,
            next: 0,
        }
    }

    pub fn versions(&self) -> VersionPair {
        self.versions
    }

    fn advance(&mut self, field: &VersionedField) -> Result<Presence> {
        let expected = self.layout.get(self.next).ok_or_else(|| ProtocolError::FieldOrder {
            expected: "<end of layout>".to_string(),
            found: field.name().to_string(),
        })?;
        if expected.name() != field.name() {
            return Err(ProtocolError::FieldOrder {
                expected: expected.name().to_string(),
                found: field.name().to_string(),
            });
        }
        self.next += 1;
        Ok(expected.presence(self.versions))
    }

    fn mismatch(field: &VersionedField, expected: &str) -> ProtocolError {
        ProtocolError::FieldTypeMismatch {
            field: field.name().to_string(),
            expected: expected.to_string(),
        }
    }

    pub fn write_text(&mut self, field: &VersionedField, value: &str) -> Result<()> {
        match self.advance(field)? {
            Presence::Absent => Ok(()),
            Presence::Present(FieldShape::Text { max_len }) => self.wire.write_text(value, max_len),
            Presence::Present(FieldShape::Bytes { max_len }) => {
                self.wire.write_length_prefixed_bytes(value.as_bytes(), max_len)
            }
            Presence::Present(shape) => Err(Self::mismatch(field, shape.name())),
        }
    }

    pub fn write_bytes(&mut self, field: &VersionedField, value: &[u8]) -> Result<()> {
        match self.advance(field)? {
            Presence::Absent => Ok(()),
            Presence::Present(FieldShape::Bytes { max_len }) => {
                self.wire.write_length_prefixed_bytes(value, max_len)
            }
            Presence::Present(shape) => Err(Self::mismatch(field, shape.name())),
        }
    }

    pub fn write_int(&mut self, field: &VersionedField, value: i64) -> Result<()> {
        match self.advance(field)? {
            Presence::Absent => Ok(()),
            Presence::Present(FieldShape::Int(width)) => {
                self.wire.write_fixed_int(field.name(), width, value)
            }
            Presence::Present(FieldShape::VarInt) => {
                let value = i32::try_from(value).map_err(|_| ProtocolError::ValueOutOfRange {
                    field: field.name().to_string(),
                    value,
                })?;
                self.wire.write_var_int(value);
                Ok(())
            }
            Presence::Present(FieldShape::VarLong) => {
                self.wire.write_var_long(value);
                Ok(())
            }
            Presence::Present(shape) => Err(Self::mismatch(field, shape.name())),
        }
    }

    pub fn write_double(&mut self, field: &VersionedField, value: f64) -> Result<()> {
        match self.advance(field)? {
            Presence::Absent => Ok(()),
            Presence::Present(FieldShape::Double) => {
                self.wire.write_f64(value);
                Ok(())
            }
            Presence::Present(shape) => Err(Self::mismatch(field, shape.name())),
        }
    }

    pub fn write_bool(&mut self, field: &VersionedField, value: bool) -> Result<()> {
        match self.advance(field)? {
            Presence::Absent => Ok(()),
            Presence::Present(FieldShape::Bool) => {
                self.wire.write_bool(value);
                Ok(())
            }
            Presence::Present(shape) => Err(Self::mismatch(field, shape.name())),
        }
    }

    pub fn write_identifier(&mut self, field: &VersionedField, value: &Uuid) -> Result<()> {
        match self.advance(field)? {
            Presence::Absent => Ok(()),
            Presence::Present(FieldShape::Identifier) => {
                self.wire.write_identifier(value);
                Ok(())
            }
            Presence::Present(shape) => Err(Self::mismatch(field, shape.name())),
        }
    }

    /// Write a count field, then each item laid out by `element`.
    pub fn write_repeated<T>(
        &mut self,
        count_field: &VersionedField,
        max: usize,
        element: &'static [VersionedField],
        items: &[T],
        mut write_one: impl FnMut(&mut FieldWriter<'_>, &T) -> Result<()>,
    ) -> Result<()> {
        if items.len() > max {
            return Err(ProtocolError::FieldTooLarge {
                length: items.len(),
                limit: max,
            });
        }
        let count = i64::try_from(items.len()).map_err(|_| ProtocolError::FieldTooLarge {
            length: items.len(),
            limit: max,
        })?;
        if !self.advance_peek(count_field)? {
            // The count is absent for this pair, so the group cannot be sent
            self.next += 1;
            return if items.is_empty() {
                Ok(())
            } else {
                Err(ProtocolError::FieldTooLarge {
                    length: items.len(),
                    limit: 0,
                })
            };
        }
        self.write_int(count_field, count)?;

        for item in items {
            let mut nested = FieldWriter::new(&mut *self.wire, self.versions, element);
            write_one(&mut nested, item)?;
            nested.finish()?;
        }
        Ok(())
    }

    /// Check order without consuming; returns whether the field is present.
    fn advance_peek(&self, field: &VersionedField) -> Result<bool> {
        match self.layout.get(self.next) {
            Some(expected) if expected.name() == field.name() => {
                Ok(expected.presence(self.versions).is_present())
            }
            Some(expected) => Err(ProtocolError::FieldOrder {
                expected: expected.name().to_string(),
                found: field.name().to_string(),
            }),
            None => Err(ProtocolError::FieldOrder {
                expected: "<end of layout>".to_string(),
                found: field.name().to_string(),
            }),
        }
    }

    pub fn finish(&self) -> Result<()> {
        match self.layout.get(self.next) {
            None => Ok(()),
            Some(missing) => Err(ProtocolError::FieldOrder {
                expected: missing.name().to_string(),
                found: "<end of codec>".to_string(),
            }),
        }
    }
}
