//! # Core Wire Components
//!
//! Version lattice, primitive wire cursor, versioned field descriptions and
//! stream framing.
//!
//! These modules know nothing about individual packet kinds; the `protocol`
//! module builds packet codecs on top of them.
//!
//! ## Components
//! - **Version**: ordered revisions for the server and client axes
//! - **Cursor**: bounds-checked primitive reads and writes
//! - **Field**: presence and shape decisions per version pair
//! - **Codec**: Tokio codec for `[length][opcode][body]` framing
//!
//! ## Wire Limits
//! - Length-prefixed reads validate the declared length before allocation
//! - Frames are capped at 2097151 bytes by default

pub mod codec;
pub mod cursor;
pub mod field;
pub mod version;
