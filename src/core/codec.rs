//! # Frame Codec
//!
//! `tokio_util` codec splitting a byte stream into opcode-tagged frames.
//!
//! ## Wire Format
//! ```text
//! [VarInt length] [VarInt opcode] [body]
//! ```
//! `length` covers the opcode and the body. Incomplete frames are left in the
//! buffer untouched until more bytes arrive.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::config::{CodecConfig, MAX_FRAME_SIZE};
use crate::core::cursor::{put_var_int, var_int_len, WireReader};
use crate::error::{ProtocolError, Result};

/// A framed packet whose body has not been interpreted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub opcode: i32,
    pub body: Bytes,
}

impl RawFrame {
    pub fn new(opcode: i32, body: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            body: body.into(),
        }
    }
}

/// Length-prefixed frame codec.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.max_frame_size)
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

/// Peek a VarInt prefix. `Ok(None)` means more bytes are needed.
fn peek_var_int(src: &[u8]) -> Result<Option<(i32, usize)>> {
    let mut value: u32 = 0;
    for (i, byte) in src.iter().take(5).enumerate() {
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value as i32, i + 1)));
        }
    }
    if src.len() >= 5 {
        return Err(ProtocolError::VarIntTooLong);
    }
    Ok(None)
}

impl Decoder for FrameCodec {
    type Item = RawFrame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let Some((declared, prefix_len)) = peek_var_int(src)? else {
            return Ok(None);
        };

        let length = usize::try_from(declared)
            .ok()
            .filter(|len| *len <= self.max_frame_size)
            .ok_or(ProtocolError::MalformedPacket {
                length: i64::from(declared),
                limit: self.max_frame_size,
            })?;

        if src.len() < prefix_len + length {
            src.reserve(prefix_len + length - src.len());
            return Ok(None);
        }

        src.advance(prefix_len);
        let frame = src.split_to(length).freeze();

        let mut reader = WireReader::new(&frame);
        let opcode = reader.read_var_int()?;
        let body = frame.slice(reader.position()..);
        trace!(opcode, body_len = body.len(), "Frame decoded");

        Ok(Some(RawFrame { opcode, body }))
    }
}

impl Encoder<RawFrame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: RawFrame, dst: &mut BytesMut) -> Result<()> {
        let length = var_int_len(item.opcode) + item.body.len();
        if length > self.max_frame_size {
            return Err(ProtocolError::FieldTooLarge {
                length,
                limit: self.max_frame_size,
            });
        }

        // max_frame_size is far below i32::MAX in any valid configuration
        let prefix = i32::try_from(length).map_err(|_| ProtocolError::FieldTooLarge {
            length,
            limit: i32::MAX as usize,
        })?;

        dst.reserve(var_int_len(prefix) + length);
        put_var_int(dst, prefix);
        put_var_int(dst, item.opcode);
        dst.extend_from_slice(&item.body);
        Ok(())
    }
}
