//! # Wire Cursor
//!
//! Forward-only, bounds-checked primitive reads and writes.
//!
//! [`WireReader`] walks a borrowed byte slice; [`WireWriter`] appends into an
//! owned `BytesMut`. Neither knows anything about protocol versions.
//!
//! ## Security
//! - Declared lengths are checked against the field limit and then against the
//!   remaining input *before* anything is allocated or copied
//! - VarInts are capped at 5 bytes, VarLongs at 10
//! - Oversized values are rejected at encode time, never truncated

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::core::field::{FieldShape, FieldValue, IntWidth};
use crate::error::{ProtocolError, Result};

/// Length of an identifier field on the wire.
pub const IDENTIFIER_LEN: usize = 16;

const VARINT_MAX_BYTES: usize = 5;
const VARLONG_MAX_BYTES: usize = 10;

/// Forward-only reader over an input buffer.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread tail of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    #[inline]
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(ProtocolError::TruncatedPacket {
                needed: n,
                remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    #[inline]
    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Signed big-endian integer of the given width, sign-extended.
    pub fn read_fixed_int(&mut self, width: IntWidth) -> Result<i64> {
        Ok(match width {
            IntWidth::I8 => i64::from(i8::from_be_bytes(self.take_array()?)),
            IntWidth::I16 => i64::from(i16::from_be_bytes(self.take_array()?)),
            IntWidth::I32 => i64::from(i32::from_be_bytes(self.take_array()?)),
            IntWidth::I64 => i64::from_be_bytes(self.take_array()?),
        })
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    pub fn read_var_int(&mut self) -> Result<i32> {
        let mut value: u32 = 0;
        for i in 0..VARINT_MAX_BYTES {
            let byte = self.read_u8()?;
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value as i32);
            }
        }
        Err(ProtocolError::VarIntTooLong)
    }

    pub fn read_var_long(&mut self) -> Result<i64> {
        let mut value: u64 = 0;
        for i in 0..VARLONG_MAX_BYTES {
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value as i64);
            }
        }
        Err(ProtocolError::VarIntTooLong)
    }

    /// Read a VarInt length and validate it against `max_len` and the
    /// remaining input, in that order.
    pub fn read_length(&mut self, max_len: usize) -> Result<usize> {
        let declared = self.read_var_int()?;
        let length = usize::try_from(declared).map_err(|_| ProtocolError::MalformedPacket {
            length: i64::from(declared),
            limit: max_len,
        })?;
        if length > max_len {
            return Err(ProtocolError::MalformedPacket {
                length: i64::from(declared),
                limit: max_len,
            });
        }
        let remaining = self.remaining();
        if length > remaining {
            return Err(ProtocolError::TruncatedPacket {
                needed: length,
                remaining,
            });
        }
        Ok(length)
    }

    pub fn read_length_prefixed_bytes(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let length = self.read_length(max_len)?;
        Ok(self.take(length)?.to_vec())
    }

    pub fn read_text(&mut self, max_len: usize) -> Result<String> {
        let length = self.read_length(max_len)?;
        let raw = self.take(length)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|e| ProtocolError::InvalidText(e.to_string()))
    }

    pub fn read_identifier(&mut self) -> Result<Uuid> {
        Ok(Uuid::from_bytes(self.take_array::<IDENTIFIER_LEN>()?))
    }

    /// Read one value in the given shape.
    pub fn read_value(&mut self, shape: &FieldShape) -> Result<FieldValue> {
        Ok(match *shape {
            FieldShape::Bool => FieldValue::Bool(self.read_bool()?),
            FieldShape::Int(width) => FieldValue::Int(self.read_fixed_int(width)?),
            FieldShape::VarInt => FieldValue::Int(i64::from(self.read_var_int()?)),
            FieldShape::VarLong => FieldValue::Int(self.read_var_long()?),
            FieldShape::Double => FieldValue::Double(self.read_f64()?),
            FieldShape::Text { max_len } => FieldValue::Text(self.read_text(max_len)?),
            FieldShape::Bytes { max_len } => {
                FieldValue::Bytes(self.read_length_prefixed_bytes(max_len)?)
            }
            FieldShape::Identifier => FieldValue::Identifier(self.read_identifier()?),
        })
    }
}

/// Append-only writer producing an owned buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    /// Write `value` as a signed big-endian integer of `width`.
    pub fn write_fixed_int(&mut self, field: &str, width: IntWidth, value: i64) -> Result<()> {
        if !width.fits(value) {
            return Err(ProtocolError::ValueOutOfRange {
                field: field.to_string(),
                value,
            });
        }
        match width {
            IntWidth::I8 => self.buf.put_i8(value as i8),
            IntWidth::I16 => self.buf.put_i16(value as i16),
            IntWidth::I32 => self.buf.put_i32(value as i32),
            IntWidth::I64 => self.buf.put_i64(value),
        }
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64(value);
    }

    pub fn write_var_int(&mut self, value: i32) {
        put_var_int(&mut self.buf, value);
    }

    pub fn write_var_long(&mut self, value: i64) {
        let mut value = value as u64;
        loop {
            if value & !0x7F == 0 {
                self.buf.put_u8(value as u8);
                return;
            }
            self.buf.put_u8((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
    }

    fn write_length(&mut self, length: usize, max_len: usize) -> Result<()> {
        if length > max_len {
            return Err(ProtocolError::FieldTooLarge {
                length,
                limit: max_len,
            });
        }
        let prefix = i32::try_from(length).map_err(|_| ProtocolError::FieldTooLarge {
            length,
            limit: i32::MAX as usize,
        })?;
        self.write_var_int(prefix);
        Ok(())
    }

    pub fn write_length_prefixed_bytes(&mut self, value: &[u8], max_len: usize) -> Result<()> {
        self.write_length(value.len(), max_len)?;
        self.buf.put_slice(value);
        Ok(())
    }

    pub fn write_text(&mut self, value: &str, max_len: usize) -> Result<()> {
        self.write_length_prefixed_bytes(value.as_bytes(), max_len)
    }

    pub fn write_identifier(&mut self, value: &Uuid) {
        self.buf.put_slice(value.as_bytes());
    }
}

/// Encode a VarInt into any buffer.
pub fn put_var_int<B: BufMut>(buf: &mut B, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7F == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
}

/// Number of bytes `value` occupies as a VarInt.
pub fn var_int_len(value: i32) -> usize {
    let value = value as u32;
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_int_known_encodings() {
        let cases: [(i32, &[u8]); 6] = [
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7F]),
            (128, &[0x80, 0x01]),
            (2_097_151, &[0xFF, 0xFF, 0x7F]),
            (-1, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];
        for (value, bytes) in cases {
            let mut w = WireWriter::new();
            w.write_var_int(value);
            assert_eq!(w.as_slice(), bytes, "encoding {value}");
            assert_eq!(var_int_len(value), bytes.len());
            assert_eq!(WireReader::new(bytes).read_var_int().ok(), Some(value));
        }
    }

    #[test]
    fn test_var_int_too_long() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert!(matches!(
            WireReader::new(&bytes).read_var_int(),
            Err(ProtocolError::VarIntTooLong)
        ));
    }

    #[test]
    fn test_var_long_extremes() {
        for value in [0i64, 1, -1, i64::MAX, i64::MIN] {
            let mut w = WireWriter::new();
            w.write_var_long(value);
            assert!(w.len() <= VARLONG_MAX_BYTES);
            assert_eq!(WireReader::new(w.as_slice()).read_var_long().ok(), Some(value));
        }
    }

    #[test]
    fn test_length_checked_against_limit_before_remaining() {
        // Declares 11 bytes with a limit of 10 and only 2 bytes present
        let bytes = [11u8, b'h', b'i'];
        match WireReader::new(&bytes).read_text(10) {
            Err(ProtocolError::MalformedPacket { length, limit }) => {
                assert_eq!((length, limit), (11, 10));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_length_within_limit_but_beyond_buffer() {
        let bytes = [5u8, b'h', b'i'];
        match WireReader::new(&bytes).read_text(10) {
            Err(ProtocolError::TruncatedPacket { needed, remaining }) => {
                assert_eq!((needed, remaining), (5, 2));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_negative_length_is_malformed() {
        let mut w = WireWriter::new();
        w.write_var_int(-3);
        assert!(matches!(
            WireReader::new(w.as_slice()).read_length_prefixed_bytes(100),
            Err(ProtocolError::MalformedPacket { length: -3, .. })
        ));
    }

    #[test]
    fn test_write_text_over_limit_writes_nothing() {
        let mut w = WireWriter::new();
        let err = w.write_text("abcdef", 5).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FieldTooLarge {
                length: 6,
                limit: 5
            }
        ));
        assert!(w.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let bytes = [2u8, 0xC3, 0x28];
        assert!(matches!(
            WireReader::new(&bytes).read_text(10),
            Err(ProtocolError::InvalidText(_))
        ));
    }

    #[test]
    fn test_fixed_int_sign_extension_and_range() {
        let mut w = WireWriter::new();
        w.write_fixed_int("x", IntWidth::I16, -2).expect("fits");
        assert_eq!(w.as_slice(), &[0xFF, 0xFE]);
        assert_eq!(
            WireReader::new(w.as_slice()).read_fixed_int(IntWidth::I16).ok(),
            Some(-2)
        );
        assert!(matches!(
            w.write_fixed_int("x", IntWidth::I8, 300),
            Err(ProtocolError::ValueOutOfRange { value: 300, .. })
        ));
    }

    #[test]
    fn test_identifier_layout_is_big_endian_halves() {
        let id = Uuid::from_u64_pair(0x0102_0304_0506_0708, 0x090A_0B0C_0D0E_0F10);
        let mut w = WireWriter::new();
        w.write_identifier(&id);
        assert_eq!(w.len(), IDENTIFIER_LEN);
        assert_eq!(&w.as_slice()[..8], &0x0102_0304_0506_0708u64.to_be_bytes());
        assert_eq!(WireReader::new(w.as_slice()).read_identifier().ok(), Some(id));
    }

    #[test]
    fn test_reader_only_advances() {
        let bytes = [1u8, 2, 3];
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_u8().ok(), Some(1));
        assert!(r.read_fixed_int(IntWidth::I32).is_err());
        assert_eq!(r.position(), 1);
        assert_eq!(r.rest(), &[2, 3]);
    }
}
