//! # Configuration Management
//!
//! Centralized configuration for the packet compatibility layer.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides (`PACKET_COMPAT_*`)
//!
//! ## Example
//! ```toml
//! [versions]
//! server_version = "1.16.5"
//! client_version = "1.8"
//!
//! [codec]
//! max_frame_size = 2097151
//!
//! [logging]
//! app_name = "packet-compat"
//! log_level = "info"
//! log_to_console = true
//! log_to_file = false
//! json_format = false
//! ```

use crate::core::version::{ClientVersion, ServerVersion, VersionPair};
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Largest frame a three-byte VarInt length prefix can describe.
pub const MAX_FRAME_SIZE: usize = 2_097_151;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "PACKET_COMPAT_";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CompatConfig {
    /// Version pair the codec speaks
    #[serde(default)]
    pub versions: VersionConfig,

    /// Frame codec limits
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

impl CompatConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of defaults.
    ///
    /// Unlike unparseable numbers, an unknown release name is an error: a
    /// silently ignored version would change the wire format.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(server) = env_var("SERVER_VERSION") {
            config.versions.server_version = server.parse()?;
        }

        if let Some(client) = env_var("CLIENT_VERSION") {
            config.versions.client_version = Some(client.parse()?);
        }

        if let Some(size) = env_var("MAX_FRAME_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.codec.max_frame_size = val;
            }
        }

        if let Some(level) = env_var("LOG_LEVEL") {
            if let Ok(val) = level.parse::<Level>() {
                config.logging.log_level = val;
            }
        }

        if let Some(json) = env_var("LOG_JSON") {
            if let Ok(val) = json.parse::<bool>() {
                config.logging.json_format = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    pub fn version_pair(&self) -> VersionPair {
        self.versions.version_pair()
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.versions.validate());
        errors.extend(self.codec.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Sender/receiver revisions
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionConfig {
    /// Server (sender) release
    pub server_version: ServerVersion,

    /// Client (receiver) release; the server's own release when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_version: Option<ClientVersion>,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            server_version: ServerVersion::newest(),
            client_version: None,
        }
    }
}

impl VersionConfig {
    pub fn version_pair(&self) -> VersionPair {
        match self.client_version {
            Some(client) => VersionPair::new(self.server_version, client),
            None => VersionPair::native(self.server_version),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        // Clients newer than the server are normally bridged by a proxy; flag
        // the pair so it is not configured by accident.
        if let Some(client) = self.client_version {
            if client > self.server_version.native_client() {
                errors.push(format!(
                    "WARNING: client {client} is newer than server {}",
                    self.server_version
                ));
            }
        }
        errors
    }
}

/// Frame codec limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodecConfig {
    /// Maximum frame length (opcode and body) in bytes
    pub max_frame_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl CodecConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_frame_size == 0 {
            errors.push("Max frame size cannot be 0".to_string());
        } else if self.max_frame_size > MAX_FRAME_SIZE {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum: {MAX_FRAME_SIZE})",
                self.max_frame_size
            ));
        }
        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("packet-compat"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
