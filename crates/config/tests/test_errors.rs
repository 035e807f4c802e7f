//! Tests for error handling

use std::io;
use vmpilot_config::ConfigError;

#[test]
fn test_io_error_display() {
    let err = ConfigError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
    let display = err.to_string();
    assert!(display.contains("CONFIG IO ERROR"));
    assert!(display.contains("file not found"));
}

#[test]
fn test_json_error_from() {
    let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
    let err: ConfigError = json_err.into();
    assert!(matches!(err, ConfigError::Json(_)));
    assert!(err.to_string().contains("CONFIG PARSE FAILED"));
}
