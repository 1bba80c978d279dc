//! # Version Lattice
//!
//! Totally ordered protocol revisions for the two independent version axes.
//!
//! The server axis orders server releases, the client axis orders client
//! protocol revisions. Several server releases may share one protocol number
//! (1.8, 1.8.3 and 1.8.8 all speak protocol 47), so ordering is by revision
//! position in the lattice, never by release name or protocol number alone.
//!
//! For clientbound packets the server axis is the sender and the client axis
//! is the receiver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Comparison helpers shared by both version axes.
pub trait ProtocolRevision: Copy + Ord + fmt::Debug {
    /// Release name such as `"1.16.5"`.
    fn release_name(self) -> &'static str;

    /// Wire protocol number announced in the handshake.
    fn protocol_number(self) -> u32;

    fn is_newer_than(self, other: Self) -> bool {
        self > other
    }

    fn is_newer_than_or_equals(self, other: Self) -> bool {
        self >= other
    }

    fn is_older_than(self, other: Self) -> bool {
        self < other
    }

    fn is_older_than_or_equals(self, other: Self) -> bool {
        self <= other
    }
}

macro_rules! version_axis {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => ($release:literal, $protocol:literal)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every known revision, oldest first.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Oldest known revision.
            pub fn oldest() -> Self {
                Self::ALL[0]
            }

            /// Newest known revision.
            pub fn newest() -> Self {
                Self::ALL[Self::ALL.len() - 1]
            }

            /// Look up a revision by release name.
            pub fn from_release_name(name: &str) -> Option<Self> {
                match name {
                    $($release => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl ProtocolRevision for $name {
            fn release_name(self) -> &'static str {
                match self {
                    $($name::$variant => $release),+
                }
            }

            fn protocol_number(self) -> u32 {
                match self {
                    $($name::$variant => $protocol),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.release_name())
            }
        }

        impl FromStr for $name {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_release_name(s.trim()).ok_or_else(|| {
                    ProtocolError::ConfigError(format!(
                        "Unknown {} release: '{}'",
                        stringify!($name),
                        s
                    ))
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = ProtocolError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.release_name().to_string()
            }
        }
    };
}

version_axis! {
    /// Server release revisions (the sender axis for clientbound packets).
    ServerVersion {
        V1_7_10 => ("1.7.10", 5),
        V1_8 => ("1.8", 47),
        V1_8_3 => ("1.8.3", 47),
        V1_8_8 => ("1.8.8", 47),
        V1_9 => ("1.9", 107),
        V1_9_4 => ("1.9.4", 110),
        V1_10 => ("1.10", 210),
        V1_11 => ("1.11", 315),
        V1_12 => ("1.12", 335),
        V1_12_2 => ("1.12.2", 340),
        V1_13 => ("1.13", 393),
        V1_13_2 => ("1.13.2", 404),
        V1_14 => ("1.14", 477),
        V1_15 => ("1.15", 573),
        V1_16 => ("1.16", 735),
        V1_16_5 => ("1.16.5", 754),
        V1_17 => ("1.17", 755),
    }
}

version_axis! {
    /// Client protocol revisions (the receiver axis for clientbound packets).
    ClientVersion {
        V1_7_10 => ("1.7.10", 5),
        V1_8 => ("1.8", 47),
        V1_9 => ("1.9", 107),
        V1_9_4 => ("1.9.4", 110),
        V1_10 => ("1.10", 210),
        V1_11 => ("1.11", 315),
        V1_12 => ("1.12", 335),
        V1_12_2 => ("1.12.2", 340),
        V1_13 => ("1.13", 393),
        V1_13_2 => ("1.13.2", 404),
        V1_14 => ("1.14", 477),
        V1_15 => ("1.15", 573),
        V1_16 => ("1.16", 735),
        V1_16_5 => ("1.16.5", 754),
        V1_17 => ("1.17", 755),
    }
}

impl ClientVersion {
    /// Resolve a handshake protocol number to a known client revision.
    pub fn from_protocol_number(protocol: u32) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.protocol_number() == protocol)
    }
}

impl ServerVersion {
    /// The client revision that speaks this server's own protocol.
    pub fn native_client(self) -> ClientVersion {
        // Every server protocol number has a client counterpart
        ClientVersion::from_protocol_number(self.protocol_number())
            .unwrap_or_else(ClientVersion::newest)
    }
}

/// The (sender, receiver) pair every versioned field decision is made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionPair {
    pub server: ServerVersion,
    pub client: ClientVersion,
}

impl VersionPair {
    pub fn new(server: ServerVersion, client: ClientVersion) -> Self {
        Self { server, client }
    }

    /// A server talking to a client of its own release.
    pub fn native(server: ServerVersion) -> Self {
        Self::new(server, server.native_client())
    }
}

impl fmt::Display for VersionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server {} / client {}", self.server, self.client)
    }
}
