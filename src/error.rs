//! # Error Types
//!
//! Error handling for the versioned codec and the capability resolver.
//!
//! This module defines every failure the crate can report, from wire-level
//! framing problems to permanently unsupported native runtimes.
//!
//! ## Error Categories
//! - **Wire Errors**: truncated buffers, oversized declared lengths, bad VarInts
//! - **Encode Errors**: caller-supplied values that exceed protocol limits
//! - **Payload Errors**: secondary structured-payload parse failures
//! - **Runtime Errors**: capability resolution exhausted, native invocation failures
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! ## Example Usage
//! ```rust
//! use packet_compat::core::cursor::WireReader;
//! use packet_compat::error::{ProtocolError, Result};
//!
//! fn first_byte(buf: &[u8]) -> Result<u8> {
//!     WireReader::new(buf).read_u8()
//! }
//!
//! match first_byte(&[]) {
//!     Err(ProtocolError::TruncatedPacket { needed, remaining }) => {
//!         assert_eq!((needed, remaining), (1, 0));
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use crate::runtime::RuntimeError;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

// ProtocolError is the primary error type for all codec and resolver operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Truncated packet: needed {needed} bytes, {remaining} remaining")]
    TruncatedPacket { needed: usize, remaining: usize },

    #[error("Malformed packet: declared length {length} outside limit {limit}")]
    MalformedPacket { length: i64, limit: usize },

    #[error("Field too large: {length} exceeds limit {limit}")]
    FieldTooLarge { length: usize, limit: usize },

    #[error("VarInt is too long")]
    VarIntTooLong,

    #[error("Value {value} does not fit the wire width of field '{field}'")]
    ValueOutOfRange { field: String, value: i64 },

    #[error("Invalid value {value} for field '{field}'")]
    InvalidEnumValue { field: String, value: i64 },

    #[error("Invalid text: {0}")]
    InvalidText(String),

    #[error("Field '{field}' cannot hold a {expected} value")]
    FieldTypeMismatch { field: String, expected: String },

    #[error("Field order violated: expected '{expected}', got '{found}'")]
    FieldOrder { expected: String, found: String },

    #[error("Payload unparseable: {0}")]
    PayloadUnparseable(String),

    #[error("Unsupported runtime: no candidate for '{operation}' ({tried} tried)")]
    UnsupportedRuntime { operation: String, tried: usize },

    #[error("No native runtime installed")]
    RuntimeNotInstalled,

    #[error("Runtime error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Runtime(#[from] RuntimeError),

    #[error("Unknown packet opcode {opcode:#04x} for client {version}")]
    UnknownPacketKind { opcode: i32, version: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Whether the error came from the wire layer and is scoped to a single packet.
    pub fn is_wire_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::TruncatedPacket { .. }
                | ProtocolError::MalformedPacket { .. }
                | ProtocolError::VarIntTooLong
                | ProtocolError::InvalidEnumValue { .. }
                | ProtocolError::InvalidText(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
