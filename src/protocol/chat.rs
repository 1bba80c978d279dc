//! Clientbound chat message.
//!
//! ## Wire Layout
//! ```text
//! message   text    max 32767 bytes, 262144 from server 1.13
//! position  i8      when server >= 1.8 OR client >= 1.8
//! sender    uuid    when server >= 1.16
//! ```
//! A 1.7.10 server still sends the position byte to a 1.8 client, hence the
//! OR across both axes.

use uuid::Uuid;

use crate::core::field::{FieldShape, Gate, IntWidth, VersionedField};
use crate::core::version::{ClientVersion, ServerVersion};
use crate::error::{ProtocolError, Result};
use crate::payload::{JsonChat, PayloadError, PayloadFormat, TextComponent};
use crate::protocol::packet::{FieldReader, FieldWriter, PacketCodec};
use crate::protocol::registry::PacketKind;

/// Message limit before server 1.13.
pub const LEGACY_MESSAGE_LENGTH: usize = 32767;

/// Message limit from server 1.13.
pub const MODERN_MESSAGE_LENGTH: usize = 262144;

pub const MESSAGE: VersionedField = VersionedField::new(
    "message",
    FieldShape::Text {
        max_len: LEGACY_MESSAGE_LENGTH,
    },
)
.switch(
    Gate::Server(ServerVersion::V1_13),
    FieldShape::Text {
        max_len: MODERN_MESSAGE_LENGTH,
    },
);

pub const POSITION: VersionedField = VersionedField::new("position", FieldShape::Int(IntWidth::I8))
    .since(Gate::Either(ServerVersion::V1_8, ClientVersion::V1_8));

pub const SENDER: VersionedField = VersionedField::new("sender", FieldShape::Identifier)
    .since(Gate::Server(ServerVersion::V1_16));

static LAYOUT: [VersionedField; 3] = [MESSAGE, POSITION, SENDER];

/// Where the client displays the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChatPosition {
    #[default]
    Chat,
    SystemMessage,
    GameInfo,
}

impl ChatPosition {
    pub const VALUES: [ChatPosition; 3] = [
        ChatPosition::Chat,
        ChatPosition::SystemMessage,
        ChatPosition::GameInfo,
    ];

    pub fn ordinal(self) -> i64 {
        self as i64
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::VALUES.get(i).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Raw JSON component text.
    pub message: String,
    pub position: ChatPosition,
    /// Nil when the wire revision carries no sender.
    pub sender: Uuid,
}

impl ChatMessage {
    pub fn new(message: impl Into<String>, position: ChatPosition) -> Self {
        Self {
            message: message.into(),
            position,
            sender: Uuid::nil(),
        }
    }

    pub fn with_sender(mut self, sender: Uuid) -> Self {
        self.sender = sender;
        self
    }

    /// Build the raw message text from a structured component.
    pub fn from_components(
        component: &TextComponent,
        position: ChatPosition,
    ) -> std::result::Result<Self, PayloadError> {
        Ok(Self::new(JsonChat.build(component)?, position))
    }

    /// Parse the raw message text on demand.
    pub fn components(&self) -> std::result::Result<TextComponent, PayloadError> {
        JsonChat.parse(&self.message)
    }
}

impl PacketCodec for ChatMessage {
    type Payload = TextComponent;

    const KIND: PacketKind = PacketKind::ChatMessage;

    fn layout() -> &'static [VersionedField] {
        &LAYOUT
    }

    fn write_fields(&self, out: &mut FieldWriter<'_>) -> Result<()> {
        out.write_text(&MESSAGE, &self.message)?;
        out.write_int(&POSITION, self.position.ordinal())?;
        out.write_identifier(&SENDER, &self.sender)
    }

    fn read_fields(input: &mut FieldReader<'_, '_>) -> Result<Self> {
        let message = input.require(&MESSAGE, FieldReader::read_text)?;
        let position = match input.read_int(&POSITION)? {
            Some(ordinal) => {
                ChatPosition::from_ordinal(ordinal).ok_or_else(|| ProtocolError::InvalidEnumValue {
                    field: POSITION.name().to_string(),
                    value: ordinal,
                })?
            }
            None => ChatPosition::Chat,
        };
        let sender = input.read_identifier(&SENDER)?.unwrap_or_else(Uuid::nil);
        Ok(Self {
            message,
            position,
            sender,
        })
    }

    fn parse_payload(&self) -> std::result::Result<TextComponent, PayloadError> {
        self.components()
    }
}
