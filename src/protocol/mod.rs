//! # Protocol Layer
//!
//! Packet kinds and the machinery that routes and (de)serializes them.
//!
//! ## Components
//! - `packet`: the [`PacketCodec`] contract and the ordered field cursors
//! - `chat`: clientbound chat message
//! - `attributes`: clientbound entity attribute update
//! - `registry`: opcode routing per client revision

pub mod attributes;
pub mod chat;
pub mod packet;
pub mod registry;

pub use attributes::{AttributeModifier, AttributeProperty, ModifierOperation, UpdateAttributes};
pub use chat::{ChatMessage, ChatPosition};
pub use packet::{decode, encode, Decoded, FieldReader, FieldWriter, PacketCodec};
pub use registry::{AnyPacket, AnyPayload, PacketKind, PacketRegistry, VersionedCodec};
