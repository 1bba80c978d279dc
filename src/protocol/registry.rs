//! # Packet Registry
//!
//! Opcode routing per client revision.
//!
//! Opcodes move between releases, so each kind registers the opcode it uses
//! starting from a given client revision; a lookup picks the newest
//! registration not newer than the receiving client.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::config::CompatConfig;
use crate::core::codec::RawFrame;
use crate::core::version::{ClientVersion, VersionPair};
use crate::error::{ProtocolError, Result};
use crate::payload::TextComponent;
use crate::protocol::attributes::UpdateAttributes;
use crate::protocol::chat::ChatMessage;
use crate::protocol::packet::{decode, encode, Decoded};

/// Every packet kind this crate knows how to encode and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    ChatMessage,
    UpdateAttributes,
}

/// Opcode table keyed by kind, each list sorted by starting revision.
#[derive(Debug, Clone, Default)]
pub struct PacketRegistry {
    opcodes: HashMap<PacketKind, Vec<(ClientVersion, i32)>>,
}

impl PacketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clientbound play opcodes for the built-in kinds.
    pub fn builtin() -> Self {
        use ClientVersion::*;

        let mut registry = Self::new();
        for (since, opcode) in [
            (V1_7_10, 0x02),
            (V1_9, 0x0F),
            (V1_13, 0x0E),
            (V1_15, 0x0F),
            (V1_16, 0x0E),
            (V1_17, 0x0F),
        ] {
            registry.register(PacketKind::ChatMessage, since, opcode);
        }
        for (since, opcode) in [
            (V1_7_10, 0x20),
            (V1_9, 0x4B),
            (V1_12, 0x4D),
            (V1_12_2, 0x4E),
            (V1_13, 0x52),
            (V1_14, 0x58),
            (V1_15, 0x59),
            (V1_16, 0x58),
            (V1_17, 0x63),
        ] {
            registry.register(PacketKind::UpdateAttributes, since, opcode);
        }
        registry
    }

    /// Register `opcode` for `kind` from `since` onward. Re-registering the
    /// same revision replaces the previous opcode.
    pub fn register(&mut self, kind: PacketKind, since: ClientVersion, opcode: i32) {
        let entries = self.opcodes.entry(kind).or_default();
        match entries.binary_search_by_key(&since, |(v, _)| *v) {
            Ok(i) => entries[i].1 = opcode,
            Err(i) => entries.insert(i, (since, opcode)),
        }
    }

    pub fn opcode(&self, kind: PacketKind, client: ClientVersion) -> Option<i32> {
        self.opcodes
            .get(&kind)?
            .iter()
            .rev()
            .find(|(since, _)| *since <= client)
            .map(|(_, opcode)| *opcode)
    }

    pub fn kind(&self, opcode: i32, client: ClientVersion) -> Option<PacketKind> {
        self.opcodes
            .keys()
            .copied()
            .find(|kind| self.opcode(*kind, client) == Some(opcode))
    }
}

/// A decoded packet of any registered kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyPacket {
    Chat(ChatMessage),
    UpdateAttributes(UpdateAttributes),
}

impl AnyPacket {
    pub fn kind(&self) -> PacketKind {
        match self {
            AnyPacket::Chat(_) => PacketKind::ChatMessage,
            AnyPacket::UpdateAttributes(_) => PacketKind::UpdateAttributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnyPayload {
    Chat(TextComponent),
    None,
}

/// Frame-level codec bound to one version pair.
#[derive(Debug, Clone)]
pub struct VersionedCodec {
    registry: PacketRegistry,
    versions: VersionPair,
}

impl VersionedCodec {
    pub fn new(registry: PacketRegistry, versions: VersionPair) -> Self {
        Self { registry, versions }
    }

    pub fn from_config(config: &CompatConfig) -> Self {
        Self::new(PacketRegistry::builtin(), config.version_pair())
    }

    pub fn versions(&self) -> VersionPair {
        self.versions
    }

    pub fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    #[instrument(level = "trace", skip(self, frame), fields(opcode = frame.opcode))]
    pub fn decode_frame(&self, frame: &RawFrame) -> Result<Decoded<AnyPacket, AnyPayload>> {
        let kind = self
            .registry
            .kind(frame.opcode, self.versions.client)
            .ok_or_else(|| ProtocolError::UnknownPacketKind {
                opcode: frame.opcode,
                version: self.versions.client.to_string(),
            })?;
        debug!(?kind, versions = %self.versions, "Routing frame");

        Ok(match kind {
            PacketKind::ChatMessage => decode::<ChatMessage>(&frame.body, self.versions)?
                .map(AnyPacket::Chat, AnyPayload::Chat),
            PacketKind::UpdateAttributes => decode::<UpdateAttributes>(&frame.body, self.versions)?
                .map(AnyPacket::UpdateAttributes, |()| AnyPayload::None),
        })
    }

    pub fn encode_packet(&self, packet: &AnyPacket) -> Result<RawFrame> {
        let kind = packet.kind();
        let opcode = self
            .registry
            .opcode(kind, self.versions.client)
            .ok_or_else(|| ProtocolError::UnknownPacketKind {
                opcode: -1,
                version: self.versions.client.to_string(),
            })?;
        let body = match packet {
            AnyPacket::Chat(chat) => encode(chat, self.versions)?,
            AnyPacket::UpdateAttributes(update) => encode(update, self.versions)?,
        };
        Ok(RawFrame::new(opcode, body))
    }
}
