//! # Versioned Fields
//!
//! Declarative description of whether a packet field is on the wire, and in
//! which shape, for a given [`VersionPair`].
//!
//! A packet layout is a table of [`VersionedField`] entries in wire order.
//! Each entry pairs a presence [`Gate`] with a [`ShapeRule`], so the version
//! matrix of a packet can be inspected and tested without touching bytes.
//!
//! ```rust
//! use packet_compat::core::field::{FieldShape, Gate, IntWidth, VersionedField};
//! use packet_compat::core::version::{ClientVersion, ServerVersion, VersionPair};
//!
//! const POSITION: VersionedField = VersionedField::new("position", FieldShape::Int(IntWidth::I8))
//!     .since(Gate::Either(ServerVersion::V1_8, ClientVersion::V1_8));
//!
//! let old = VersionPair::new(ServerVersion::V1_7_10, ClientVersion::V1_7_10);
//! let mixed = VersionPair::new(ServerVersion::V1_7_10, ClientVersion::V1_8);
//! assert!(!POSITION.presence(old).is_present());
//! assert!(POSITION.presence(mixed).is_present());
//! ```

use crate::core::version::{ClientVersion, ProtocolRevision, ServerVersion, VersionPair};
use crate::error::{ProtocolError, Result};
use uuid::Uuid;

/// Version predicate deciding whether a field (or a shape variant) applies.
///
/// Every threshold is inclusive: the named revision itself satisfies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    /// Server at or above the revision.
    Server(ServerVersion),
    /// Client at or above the revision.
    Client(ClientVersion),
    /// Either axis at or above its revision.
    Either(ServerVersion, ClientVersion),
    /// Both axes at or above their revisions.
    Both(ServerVersion, ClientVersion),
}

impl Gate {
    pub fn allows(&self, versions: VersionPair) -> bool {
        match *self {
            Gate::Always => true,
            Gate::Server(min) => versions.server.is_newer_than_or_equals(min),
            Gate::Client(min) => versions.client.is_newer_than_or_equals(min),
            Gate::Either(server, client) => {
                versions.server.is_newer_than_or_equals(server)
                    || versions.client.is_newer_than_or_equals(client)
            }
            Gate::Both(server, client) => {
                versions.server.is_newer_than_or_equals(server)
                    && versions.client.is_newer_than_or_equals(client)
            }
        }
    }
}

/// Fixed integer widths, big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::I8 => 1,
            IntWidth::I16 => 2,
            IntWidth::I32 => 4,
            IntWidth::I64 => 8,
        }
    }

    /// Whether `value` is representable as a signed integer of this width.
    pub fn fits(self, value: i64) -> bool {
        match self {
            IntWidth::I8 => i8::try_from(value).is_ok(),
            IntWidth::I16 => i16::try_from(value).is_ok(),
            IntWidth::I32 => i32::try_from(value).is_ok(),
            IntWidth::I64 => true,
        }
    }
}

/// Concrete wire encoding of a present field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Bool,
    Int(IntWidth),
    VarInt,
    VarLong,
    Double,
    /// VarInt byte length followed by UTF-8 bytes.
    Text { max_len: usize },
    /// VarInt byte length followed by raw bytes.
    Bytes { max_len: usize },
    /// 16-byte identifier (two big-endian 64-bit halves).
    Identifier,
}

impl FieldShape {
    pub fn name(&self) -> &'static str {
        match self {
            FieldShape::Bool => "bool",
            FieldShape::Int(_) => "int",
            FieldShape::VarInt => "varint",
            FieldShape::VarLong => "varlong",
            FieldShape::Double => "double",
            FieldShape::Text { .. } => "text",
            FieldShape::Bytes { .. } => "bytes",
            FieldShape::Identifier => "identifier",
        }
    }

    /// Maximum length for length-prefixed shapes.
    pub fn max_len(&self) -> Option<usize> {
        match self {
            FieldShape::Text { max_len } | FieldShape::Bytes { max_len } => Some(*max_len),
            _ => None,
        }
    }
}

/// How a field's shape depends on the version pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRule {
    Fixed(FieldShape),
    /// `newer` once `gate` allows the pair, `older` before.
    Switch {
        gate: Gate,
        older: FieldShape,
        newer: FieldShape,
    },
}

/// Decision record for one field under one version pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Absent,
    Present(FieldShape),
}

impl Presence {
    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present(_))
    }

    pub fn shape(&self) -> Option<FieldShape> {
        match self {
            Presence::Present(shape) => Some(*shape),
            Presence::Absent => None,
        }
    }
}

/// One entry of a packet layout table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionedField {
    name: &'static str,
    presence: Gate,
    shape: ShapeRule,
}

impl VersionedField {
    /// A field present in every revision with a single shape.
    pub const fn new(name: &'static str, shape: FieldShape) -> Self {
        Self {
            name,
            presence: Gate::Always,
            shape: ShapeRule::Fixed(shape),
        }
    }

    /// Restrict presence to pairs the gate allows.
    pub const fn since(mut self, gate: Gate) -> Self {
        self.presence = gate;
        self
    }

    /// Switch to `newer` once `gate` allows the pair; the current shape
    /// becomes the older one.
    pub const fn switch(mut self, gate: Gate, newer: FieldShape) -> Self {
        let older = match self.shape {
            ShapeRule::Fixed(shape) => shape,
            ShapeRule::Switch { newer: previous, .. } => previous,
        };
        self.shape = ShapeRule::Switch { gate, older, newer };
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn gate(&self) -> Gate {
        self.presence
    }

    pub fn shape_rule(&self) -> ShapeRule {
        self.shape
    }

    /// Pure presence decision for the pair.
    pub fn presence(&self, versions: VersionPair) -> Presence {
        if !self.presence.allows(versions) {
            return Presence::Absent;
        }
        let shape = match self.shape {
            ShapeRule::Fixed(shape) => shape,
            ShapeRule::Switch { gate, older, newer } => {
                if gate.allows(versions) {
                    newer
                } else {
                    older
                }
            }
        };
        Presence::Present(shape)
    }
}

/// Resolve every entry of a layout for a pair, in wire order.
pub fn plan(layout: &[VersionedField], versions: VersionPair) -> Vec<(&'static str, Presence)> {
    layout
        .iter()
        .map(|field| (field.name(), field.presence(versions)))
        .collect()
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Identifier(Uuid),
}

impl FieldValue {
    fn mismatch(field: &str, expected: &str) -> ProtocolError {
        ProtocolError::FieldTypeMismatch {
            field: field.to_string(),
            expected: expected.to_string(),
        }
    }

    pub fn into_bool(self, field: &str) -> Result<bool> {
        match self {
            FieldValue::Bool(v) => Ok(v),
            _ => Err(Self::mismatch(field, "bool")),
        }
    }

    pub fn into_int(self, field: &str) -> Result<i64> {
        match self {
            FieldValue::Int(v) => Ok(v),
            _ => Err(Self::mismatch(field, "int")),
        }
    }

    pub fn into_double(self, field: &str) -> Result<f64> {
        match self {
            FieldValue::Double(v) => Ok(v),
            _ => Err(Self::mismatch(field, "double")),
        }
    }

    pub fn into_text(self, field: &str) -> Result<String> {
        match self {
            FieldValue::Text(v) => Ok(v),
            _ => Err(Self::mismatch(field, "text")),
        }
    }

    pub fn into_bytes(self, field: &str) -> Result<Vec<u8>> {
        match self {
            FieldValue::Bytes(v) => Ok(v),
            _ => Err(Self::mismatch(field, "bytes")),
        }
    }

    pub fn into_identifier(self, field: &str) -> Result<Uuid> {
        match self {
            FieldValue::Identifier(v) => Ok(v),
            _ => Err(Self::mismatch(field, "identifier")),
        }
    }
}
