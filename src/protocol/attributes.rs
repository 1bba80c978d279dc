//! Clientbound entity attribute update.
//!
//! ## Wire Layout
//! ```text
//! entity_id       i32 before 1.8, VarInt from 1.8
//! property_count  i32 before 1.17, VarInt from 1.17
//!   key             text (max 64)
//!   value           f64
//!   modifier_count  i16 before 1.8, VarInt from 1.8
//!     uuid            16 bytes
//!     amount          f64
//!     operation       i8
//! ```

use uuid::Uuid;

use crate::core::field::{FieldShape, Gate, IntWidth, VersionedField};
use crate::core::version::ServerVersion;
use crate::error::{ProtocolError, Result};
use crate::payload::PayloadError;
use crate::protocol::packet::{FieldReader, FieldWriter, PacketCodec};
use crate::protocol::registry::PacketKind;

pub const MAX_KEY_LENGTH: usize = 64;

/// Upper bound on properties per packet.
pub const MAX_PROPERTIES: usize = 1024;

/// Upper bound on modifiers per property.
pub const MAX_MODIFIERS: usize = 1024;

pub const ENTITY_ID: VersionedField =
    VersionedField::new("entity_id", FieldShape::Int(IntWidth::I32))
        .switch(Gate::Server(ServerVersion::V1_8), FieldShape::VarInt);

pub const PROPERTY_COUNT: VersionedField =
    VersionedField::new("property_count", FieldShape::Int(IntWidth::I32))
        .switch(Gate::Server(ServerVersion::V1_17), FieldShape::VarInt);

pub const KEY: VersionedField = VersionedField::new(
    "key",
    FieldShape::Text {
        max_len: MAX_KEY_LENGTH,
    },
);

pub const VALUE: VersionedField = VersionedField::new("value", FieldShape::Double);

pub const MODIFIER_COUNT: VersionedField =
    VersionedField::new("modifier_count", FieldShape::Int(IntWidth::I16))
        .switch(Gate::Server(ServerVersion::V1_8), FieldShape::VarInt);

pub const MODIFIER_UUID: VersionedField = VersionedField::new("uuid", FieldShape::Identifier);

pub const MODIFIER_AMOUNT: VersionedField = VersionedField::new("amount", FieldShape::Double);

pub const MODIFIER_OPERATION: VersionedField =
    VersionedField::new("operation", FieldShape::Int(IntWidth::I8));

static LAYOUT: [VersionedField; 2] = [ENTITY_ID, PROPERTY_COUNT];
static PROPERTY_LAYOUT: [VersionedField; 3] = [KEY, VALUE, MODIFIER_COUNT];
static MODIFIER_LAYOUT: [VersionedField; 3] = [MODIFIER_UUID, MODIFIER_AMOUNT, MODIFIER_OPERATION];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModifierOperation {
    #[default]
    Add,
    MultiplyBase,
    MultiplyTotal,
}

impl ModifierOperation {
    pub fn ordinal(self) -> i64 {
        self as i64
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        match ordinal {
            0 => Some(ModifierOperation::Add),
            1 => Some(ModifierOperation::MultiplyBase),
            2 => Some(ModifierOperation::MultiplyTotal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeModifier {
    pub uuid: Uuid,
    pub amount: f64,
    pub operation: ModifierOperation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeProperty {
    pub key: String,
    pub value: f64,
    pub modifiers: Vec<AttributeModifier>,
}

impl AttributeProperty {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
            modifiers: Vec::new(),
        }
    }

    pub fn with_modifier(mut self, modifier: AttributeModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAttributes {
    pub entity_id: i32,
    pub properties: Vec<AttributeProperty>,
}

fn read_modifier(input: &mut FieldReader<'_, '_>) -> Result<AttributeModifier> {
    let uuid = input.require(&MODIFIER_UUID, FieldReader::read_identifier)?;
    let amount = input.require(&MODIFIER_AMOUNT, FieldReader::read_double)?;
    let ordinal = input.require(&MODIFIER_OPERATION, FieldReader::read_int)?;
    let operation =
        ModifierOperation::from_ordinal(ordinal).ok_or_else(|| ProtocolError::InvalidEnumValue {
            field: MODIFIER_OPERATION.name().to_string(),
            value: ordinal,
        })?;
    Ok(AttributeModifier {
        uuid,
        amount,
        operation,
    })
}

fn read_property(input: &mut FieldReader<'_, '_>) -> Result<AttributeProperty> {
    let key = input.require(&KEY, FieldReader::read_text)?;
    let value = input.require(&VALUE, FieldReader::read_double)?;
    let modifiers =
        input.read_repeated(&MODIFIER_COUNT, MAX_MODIFIERS, &MODIFIER_LAYOUT, read_modifier)?;
    Ok(AttributeProperty {
        key,
        value,
        modifiers,
    })
}

fn write_modifier(out: &mut FieldWriter<'_>, modifier: &AttributeModifier) -> Result<()> {
    out.write_identifier(&MODIFIER_UUID, &modifier.uuid)?;
    out.write_double(&MODIFIER_AMOUNT, modifier.amount)?;
    out.write_int(&MODIFIER_OPERATION, modifier.operation.ordinal())
}

fn write_property(out: &mut FieldWriter<'_>, property: &AttributeProperty) -> Result<()> {
    out.write_text(&KEY, &property.key)?;
    out.write_double(&VALUE, property.value)?;
    out.write_repeated(
        &MODIFIER_COUNT,
        MAX_MODIFIERS,
        &MODIFIER_LAYOUT,
        &property.modifiers,
        write_modifier,
    )
}

impl PacketCodec for UpdateAttributes {
    type Payload = ();

    const KIND: PacketKind = PacketKind::UpdateAttributes;

    fn layout() -> &'static [VersionedField] {
        &LAYOUT
    }

    fn write_fields(&self, out: &mut FieldWriter<'_>) -> Result<()> {
        out.write_int(&ENTITY_ID, i64::from(self.entity_id))?;
        out.write_repeated(
            &PROPERTY_COUNT,
            MAX_PROPERTIES,
            &PROPERTY_LAYOUT,
            &self.properties,
            write_property,
        )
    }

    fn read_fields(input: &mut FieldReader<'_, '_>) -> Result<Self> {
        let raw_id = input.require(&ENTITY_ID, FieldReader::read_int)?;
        let entity_id = i32::try_from(raw_id).map_err(|_| ProtocolError::ValueOutOfRange {
            field: ENTITY_ID.name().to_string(),
            value: raw_id,
        })?;
        let properties =
            input.read_repeated(&PROPERTY_COUNT, MAX_PROPERTIES, &PROPERTY_LAYOUT, read_property)?;
        Ok(Self {
            entity_id,
            properties,
        })
    }

    fn parse_payload(&self) -> std::result::Result<(), PayloadError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::VersionPair;
    use crate::protocol::packet::{decode, encode};

    fn sample() -> UpdateAttributes {
        UpdateAttributes {
            entity_id: 300,
            properties: vec![AttributeProperty::new("generic.maxHealth", 20.0).with_modifier(
                AttributeModifier {
                    uuid: Uuid::from_u128(0x1234),
                    amount: 0.5,
                    operation: ModifierOperation::MultiplyBase,
                },
            )],
        }
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_widths_change_across_revisions() {
        let packet = sample();
        let legacy = encode(&packet, VersionPair::native(ServerVersion::V1_7_10)).expect("1.7");
        let modern = encode(&packet, VersionPair::native(ServerVersion::V1_16_5)).expect("1.16");
        let newest = encode(&packet, VersionPair::native(ServerVersion::V1_17)).expect("1.17");

        // entity id: 4 bytes vs VarInt(300) = 2 bytes
        assert_eq!(&legacy[..4], &300i32.to_be_bytes());
        assert_eq!(&modern[..2], &[0xAC, 0x02]);
        // property count: i32 until 1.17, VarInt after
        assert_eq!(&modern[2..6], &1i32.to_be_bytes());
        assert_eq!(newest[2], 1);
        // modifier count i16 before 1.8 gives 1 extra byte, count i32 vs varint gives 3
        assert_eq!(legacy.len(), modern.len() + 2 + 1);
        assert_eq!(modern.len(), newest.len() + 3);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_roundtrip_every_server_revision() {
        let packet = sample();
        for server in ServerVersion::ALL {
            let versions = VersionPair::native(*server);
            let bytes = encode(&packet, versions).expect("encode");
            let decoded = decode::<UpdateAttributes>(&bytes, versions).expect("decode");
            assert_eq!(decoded.into_packet(), packet, "server {server}");
        }
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let mut packet = sample();
        packet.properties[0].modifiers.clear();
        let versions = VersionPair::native(ServerVersion::V1_12_2);
        let mut bytes = encode(&packet, versions).map(|b| b.to_vec()).unwrap_or_default();
        // Replace the empty modifier list with one modifier carrying operation 7
        bytes.pop();
        bytes.push(1);
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&1.0f64.to_be_bytes());
        bytes.push(7);
        assert!(matches!(
            decode::<UpdateAttributes>(&bytes, versions),
            Err(ProtocolError::InvalidEnumValue { value: 7, .. })
        ));
    }

    #[test]
    fn test_oversized_count_rejected_before_allocation() {
        let mut bytes = vec![0x01];
        bytes.extend_from_slice(&(i32::MAX).to_be_bytes());
        assert!(matches!(
            decode::<UpdateAttributes>(&bytes, VersionPair::native(ServerVersion::V1_12_2)),
            Err(ProtocolError::MalformedPacket { .. })
        ));
    }
}
