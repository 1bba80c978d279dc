//! # packet-compat
//!
//! Version-aware packet codecs and lazily resolved native-runtime shims for a
//! protocol whose wire layout and native object model both change across
//! revisions.
//!
//! ## Layers
//! - [`core`]: version lattice, wire cursor, versioned field tables, frame codec
//! - [`protocol`]: packet codec contract, packet kinds, opcode registry
//! - [`payload`]: structured chat payloads behind a parse/build contract
//! - [`capability`]: probe-once strategy resolution
//! - [`runtime`]: native-runtime introspection and an in-memory implementation
//! - [`shim`]: resolver-backed native object access and process-wide state
//! - [`config`], [`utils`]: configuration, logging, metrics
//!
//! ## Example
//! ```rust
//! use packet_compat::core::version::{ClientVersion, ServerVersion, VersionPair};
//! use packet_compat::protocol::{decode, encode, ChatMessage, ChatPosition};
//!
//! // A 1.7.10 server talking to a 1.8 client still sends the position byte
//! let versions = VersionPair::new(ServerVersion::V1_7_10, ClientVersion::V1_8);
//! let packet = ChatMessage::new(r#"{"text":"hello"}"#, ChatPosition::SystemMessage);
//!
//! let bytes = encode(&packet, versions).unwrap();
//! let decoded = decode::<ChatMessage>(&bytes, versions).unwrap();
//! assert_eq!(decoded.packet(), &packet);
//! assert_eq!(decoded.payload().unwrap().text, "hello");
//! ```

pub mod capability;
pub mod config;
pub mod core;
pub mod error;
pub mod payload;
pub mod protocol;
pub mod runtime;
pub mod shim;
pub mod utils;

pub use crate::capability::{Candidate, Capability, Resolution};
pub use crate::config::CompatConfig;
pub use crate::core::codec::{FrameCodec, RawFrame};
pub use crate::core::version::{ClientVersion, ProtocolRevision, ServerVersion, VersionPair};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::{decode, encode, Decoded, PacketCodec};
pub use crate::shim::CompatRuntime;
