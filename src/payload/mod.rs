//! # Structured Payloads
//!
//! Builder contract for payloads carried as raw text on the wire.
//!
//! The packet layer only ever calls [`PayloadFormat::parse`] and
//! [`PayloadFormat::build`]; it never looks inside the structured value.
//! [`JsonChat`] is the built-in format for chat text components.

pub mod component;

pub use component::{ClickEvent, JsonChat, TextComponent};

use thiserror::Error;

/// Secondary payload parse or build failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PayloadError(pub String);

impl From<PayloadError> for crate::error::ProtocolError {
    fn from(err: PayloadError) -> Self {
        crate::error::ProtocolError::PayloadUnparseable(err.0)
    }
}

/// Converts between raw payload text and its structured form.
pub trait PayloadFormat {
    type Structured;

    fn parse(&self, raw: &str) -> Result<Self::Structured, PayloadError>;

    fn build(&self, structured: &Self::Structured) -> Result<String, PayloadError>;
}
