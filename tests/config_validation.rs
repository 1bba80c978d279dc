//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use packet_compat::config::{
    CodecConfig, CompatConfig, LoggingConfig, VersionConfig, MAX_FRAME_SIZE,
};
use packet_compat::core::version::{ClientVersion, ServerVersion, VersionPair};
use packet_compat::error::ProtocolError;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = CompatConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_default_pair_is_newest_native() {
    let config = CompatConfig::default();
    assert_eq!(
        config.version_pair(),
        VersionPair::native(ServerVersion::newest())
    );
}

#[test]
fn test_zero_frame_size() {
    let mut config = CompatConfig::default();
    config.codec.max_frame_size = 0;

    let errors = config.validate();
    assert!(!errors.is_empty());
    assert!(errors.iter().any(|e| e.contains("cannot be 0")));
}

#[test]
fn test_excessive_frame_size() {
    let codec = CodecConfig {
        max_frame_size: MAX_FRAME_SIZE + 1,
    };

    let errors = codec.validate();
    assert!(errors.iter().any(|e| e.contains("too large")));
}

#[test]
fn test_frame_size_at_maximum_is_valid() {
    let codec = CodecConfig {
        max_frame_size: MAX_FRAME_SIZE,
    };
    assert!(codec.validate().is_empty());
}

#[test]
fn test_client_newer_than_server_warns() {
    let versions = VersionConfig {
        server_version: ServerVersion::V1_8_8,
        client_version: Some(ClientVersion::V1_12_2),
    };

    let errors = versions.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("newer than server"));
}

#[test]
fn test_older_client_is_valid() {
    let versions = VersionConfig {
        server_version: ServerVersion::V1_7_10,
        client_version: Some(ClientVersion::V1_7_10),
    };
    assert!(versions.validate().is_empty());
    assert_eq!(
        versions.version_pair(),
        VersionPair::new(ServerVersion::V1_7_10, ClientVersion::V1_7_10)
    );
}

#[test]
fn test_file_logging_without_path() {
    let logging = LoggingConfig {
        log_to_file: true,
        log_file_path: None,
        ..Default::default()
    };

    let errors = logging.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("log_file_path must be specified")));
}

#[test]
fn test_no_logging_output() {
    let logging = LoggingConfig {
        log_to_console: false,
        log_to_file: false,
        ..Default::default()
    };

    let errors = logging.validate();
    assert!(errors.iter().any(|e| e.contains("At least one logging output")));
}

#[test]
fn test_empty_app_name() {
    let config = CompatConfig::default_with_overrides(|c| c.logging.app_name = String::new());

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_multiple_validation_errors() {
    let config = CompatConfig::default_with_overrides(|c| {
        c.codec.max_frame_size = 0;
        c.logging.app_name = String::new();
        c.versions.server_version = ServerVersion::V1_8;
        c.versions.client_version = Some(ClientVersion::V1_17);
    });

    let errors = config.validate();
    assert_eq!(errors.len(), 3, "Should have 3 errors, got: {:?}", errors);
}

#[test]
fn test_validate_strict_joins_errors() {
    let config = CompatConfig::default_with_overrides(|c| c.codec.max_frame_size = 0);

    match config.validate_strict() {
        Err(ProtocolError::ConfigError(message)) => {
            assert!(message.contains("Configuration validation failed"));
            assert!(message.contains("cannot be 0"));
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_toml_parsing() {
    let config = CompatConfig::from_toml(
        r#"
        [versions]
        server_version = "1.7.10"
        client_version = "1.8"

        [codec]
        max_frame_size = 65536

        [logging]
        app_name = "proxy"
        log_level = "debug"
        log_to_console = true
        log_to_file = false
        json_format = true
        "#,
    )
    .expect("parse");

    assert_eq!(
        config.version_pair(),
        VersionPair::new(ServerVersion::V1_7_10, ClientVersion::V1_8)
    );
    assert_eq!(config.codec.max_frame_size, 65536);
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.logging.json_format);
}

#[test]
fn test_toml_sections_default_when_missing() {
    let config =
        CompatConfig::from_toml("[versions]\nserver_version = \"1.12.2\"\n").expect("parse");
    assert_eq!(config.version_pair(), VersionPair::native(ServerVersion::V1_12_2));
    assert_eq!(config.codec.max_frame_size, MAX_FRAME_SIZE);
    assert_eq!(config.logging.log_level, Level::INFO);
}

#[test]
fn test_unknown_release_rejected() {
    let result = CompatConfig::from_toml("[versions]\nserver_version = \"1.99\"\n");
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}

#[test]
fn test_unknown_log_level_rejected() {
    let result = CompatConfig::from_toml(
        "[logging]\napp_name = \"x\"\nlog_level = \"loud\"\nlog_to_console = true\n\
         log_to_file = false\njson_format = false\n",
    );
    assert!(result.is_err());
}

#[test]
fn test_example_config_roundtrip() {
    let example = CompatConfig::example_config();
    assert!(example.contains("[versions]"));

    let parsed = CompatConfig::from_toml(&example).expect("example parses");
    assert!(parsed.validate().is_empty());
    assert_eq!(parsed.version_pair(), CompatConfig::default().version_pair());
}

#[test]
fn test_save_and_load_file() {
    let path = std::env::temp_dir()
        .join(format!("packet-compat-config-{}.toml", std::process::id()));
    let config = CompatConfig::default_with_overrides(|c| {
        c.versions.server_version = ServerVersion::V1_13;
        c.versions.client_version = Some(ClientVersion::V1_9);
        c.codec.max_frame_size = 4096;
    });

    config.save_to_file(&path).expect("save");
    let loaded = CompatConfig::from_file(&path).expect("load");
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.version_pair(), config.version_pair());
    assert_eq!(loaded.codec.max_frame_size, 4096);
}

#[test]
fn test_missing_file_is_config_error() {
    let result = CompatConfig::from_file("/nonexistent/packet-compat.toml");
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}

// The only test that touches the process environment
#[test]
fn test_env_overrides() {
    std::env::set_var("PACKET_COMPAT_SERVER_VERSION", "1.16.5");
    std::env::set_var("PACKET_COMPAT_CLIENT_VERSION", "1.12.2");
    std::env::set_var("PACKET_COMPAT_MAX_FRAME_SIZE", "1024");
    std::env::set_var("PACKET_COMPAT_LOG_LEVEL", "warn");
    std::env::set_var("PACKET_COMPAT_LOG_JSON", "true");

    let config = CompatConfig::from_env().expect("env config");
    assert_eq!(
        config.version_pair(),
        VersionPair::new(ServerVersion::V1_16_5, ClientVersion::V1_12_2)
    );
    assert_eq!(config.codec.max_frame_size, 1024);
    assert_eq!(config.logging.log_level, Level::WARN);
    assert!(config.logging.json_format);

    std::env::set_var("PACKET_COMPAT_SERVER_VERSION", "beta");
    assert!(matches!(
        CompatConfig::from_env(),
        Err(ProtocolError::ConfigError(_))
    ));

    for name in [
        "SERVER_VERSION",
        "CLIENT_VERSION",
        "MAX_FRAME_SIZE",
        "LOG_LEVEL",
        "LOG_JSON",
    ] {
        std::env::remove_var(format!("PACKET_COMPAT_{name}"));
    }
}
