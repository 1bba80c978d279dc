#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Exhaustive checks across every (server, client) revision pair.
//!
//! Walks the full lattice product and asserts the field decisions, byte
//! layouts and round-trip behavior each packet kind promises.

use packet_compat::core::field::{plan, FieldShape, Presence, VersionedField};
use packet_compat::core::version::{ClientVersion, ProtocolRevision, ServerVersion, VersionPair};
use packet_compat::error::ProtocolError;
use packet_compat::protocol::attributes::{
    AttributeModifier, AttributeProperty, ModifierOperation, UpdateAttributes,
};
use packet_compat::protocol::chat::{
    ChatMessage, ChatPosition, LEGACY_MESSAGE_LENGTH, MODERN_MESSAGE_LENGTH,
};
use packet_compat::protocol::packet::{decode, encode, PacketCodec};
use packet_compat::protocol::registry::{AnyPacket, PacketKind, PacketRegistry, VersionedCodec};
use uuid::Uuid;

fn every_pair() -> impl Iterator<Item = VersionPair> {
    ServerVersion::ALL.iter().flat_map(|server| {
        ClientVersion::ALL
            .iter()
            .map(move |client| VersionPair::new(*server, *client))
    })
}

fn presence(layout: &[VersionedField], name: &str, versions: VersionPair) -> Presence {
    plan(layout, versions)
        .into_iter()
        .find(|(field, _)| *field == name)
        .map(|(_, presence)| presence)
        .expect("field in layout")
}

// ============================================================================
// CHAT MESSAGE
// ============================================================================

#[test]
fn test_chat_position_follows_either_axis() {
    for versions in every_pair() {
        let expected = versions.server.is_newer_than_or_equals(ServerVersion::V1_8)
            || versions.client.is_newer_than_or_equals(ClientVersion::V1_8);
        assert_eq!(
            presence(ChatMessage::layout(), "position", versions).is_present(),
            expected,
            "position at {versions}"
        );
    }
}

#[test]
fn test_chat_sender_follows_server_only() {
    for versions in every_pair() {
        let expected = versions.server.is_newer_than_or_equals(ServerVersion::V1_16);
        assert_eq!(
            presence(ChatMessage::layout(), "sender", versions).is_present(),
            expected,
            "sender at {versions}"
        );
    }
}

#[test]
fn test_chat_message_limit_switches_at_1_13() {
    for versions in every_pair() {
        let expected = if versions.server.is_newer_than_or_equals(ServerVersion::V1_13) {
            MODERN_MESSAGE_LENGTH
        } else {
            LEGACY_MESSAGE_LENGTH
        };
        assert_eq!(
            presence(ChatMessage::layout(), "message", versions),
            Presence::Present(FieldShape::Text { max_len: expected }),
            "message at {versions}"
        );
    }
}

#[test]
fn test_chat_roundtrip_every_pair() {
    let sender = Uuid::from_u128(42);
    for versions in every_pair() {
        let packet = ChatMessage::new(r#"{"text":"matrix"}"#, ChatPosition::SystemMessage)
            .with_sender(sender);
        let bytes = encode(&packet, versions).expect("encode");
        let decoded = decode::<ChatMessage>(&bytes, versions).expect("decode");
        assert!(decoded.is_complete(), "payload at {versions}");

        let got = decoded.into_packet();
        assert_eq!(got.message, packet.message);

        let position_on_wire = presence(ChatMessage::layout(), "position", versions).is_present();
        let expected_position = if position_on_wire {
            ChatPosition::SystemMessage
        } else {
            ChatPosition::Chat
        };
        assert_eq!(got.position, expected_position, "position at {versions}");

        let sender_on_wire = versions.server.is_newer_than_or_equals(ServerVersion::V1_16);
        assert_eq!(got.sender == sender, sender_on_wire, "sender at {versions}");
    }
}

#[test]
fn test_chat_length_boundary_at_1_13() {
    let at_limit = ChatMessage::new("a".repeat(MODERN_MESSAGE_LENGTH), ChatPosition::Chat);
    let over_limit = ChatMessage::new("a".repeat(MODERN_MESSAGE_LENGTH + 1), ChatPosition::Chat);
    let legacy_over = ChatMessage::new("a".repeat(LEGACY_MESSAGE_LENGTH + 1), ChatPosition::Chat);

    let modern = VersionPair::native(ServerVersion::V1_13);
    let legacy = VersionPair::native(ServerVersion::V1_12_2);

    assert!(encode(&at_limit, modern).is_ok());
    assert!(matches!(
        encode(&over_limit, modern),
        Err(ProtocolError::FieldTooLarge { .. })
    ));
    assert!(encode(&legacy_over, modern).is_ok());
    assert!(matches!(
        encode(&legacy_over, legacy),
        Err(ProtocolError::FieldTooLarge { .. })
    ));

    // A modern-sized message decoded against a legacy pair is malformed
    let bytes = encode(&legacy_over, modern).expect("encode");
    assert!(matches!(
        decode::<ChatMessage>(&bytes, legacy),
        Err(ProtocolError::MalformedPacket {
            length: 32768,
            limit: 32767
        })
    ));

    // VarInt(262145) with no body: over the modern limit on every 1.13+ server
    let declared_over_modern = [0x81, 0x80, 0x10];
    for server in ServerVersion::ALL
        .iter()
        .filter(|s| s.is_newer_than_or_equals(ServerVersion::V1_13))
    {
        assert!(matches!(
            decode::<ChatMessage>(&declared_over_modern, VersionPair::native(*server)),
            Err(ProtocolError::MalformedPacket {
                length: 262145,
                limit: 262144
            })
        ));
    }
}

// ============================================================================
// UPDATE ATTRIBUTES
// ============================================================================

#[test]
fn test_attributes_roundtrip_every_pair() {
    let packet = UpdateAttributes {
        entity_id: 77,
        properties: vec![AttributeProperty::new("generic.attack_damage", 3.5).with_modifier(
            AttributeModifier {
                uuid: Uuid::from_u128(9),
                amount: -1.0,
                operation: ModifierOperation::Add,
            },
        )],
    };
    for versions in every_pair() {
        let bytes = encode(&packet, versions).expect("encode");
        let decoded = decode::<UpdateAttributes>(&bytes, versions).expect("decode");
        assert_eq!(decoded.into_packet(), packet, "at {versions}");
    }
}

#[test]
fn test_attribute_widths_ignore_client_axis() {
    let packet = UpdateAttributes {
        entity_id: 5,
        properties: Vec::new(),
    };
    for server in ServerVersion::ALL {
        let lengths: Vec<usize> = ClientVersion::ALL
            .iter()
            .map(|client| {
                encode(&packet, VersionPair::new(*server, *client))
                    .expect("encode")
                    .len()
            })
            .collect();
        assert!(lengths.windows(2).all(|w| w[0] == w[1]), "server {server}");
    }
}

// ============================================================================
// OPCODE ROUTING
// ============================================================================

#[test]
fn test_every_client_routes_both_kinds() {
    let registry = PacketRegistry::builtin();
    for client in ClientVersion::ALL {
        let chat = registry.opcode(PacketKind::ChatMessage, *client).expect("chat opcode");
        let attributes = registry
            .opcode(PacketKind::UpdateAttributes, *client)
            .expect("attributes opcode");
        assert_ne!(chat, attributes, "client {client}");
        assert_eq!(registry.kind(chat, *client), Some(PacketKind::ChatMessage));
        assert_eq!(registry.kind(attributes, *client), Some(PacketKind::UpdateAttributes));
    }
}

#[test]
fn test_versioned_codec_every_pair() {
    for versions in every_pair() {
        let codec = VersionedCodec::new(PacketRegistry::builtin(), versions);
        let packet = AnyPacket::Chat(ChatMessage::new(r#""plain""#, ChatPosition::Chat));
        let frame = codec.encode_packet(&packet).expect("encode");
        let decoded = codec.decode_frame(&frame).expect("decode");
        assert_eq!(decoded.into_packet(), packet, "at {versions}");
    }
}
