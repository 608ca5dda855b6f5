//! Error types for the volume attach manager
//!
//! Provides structured error types for descriptor validation, privileged
//! command execution, and device materialization.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for volume operations
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Descriptor Errors
    // =========================================================================
    #[error("Unsupported volume transport: {0}")]
    UnsupportedTransport(String),

    #[error("Connection descriptor for '{transport}' is missing required field: {field}")]
    MissingField { transport: String, field: String },

    // =========================================================================
    // Command Execution Errors
    // =========================================================================
    #[error("Command failed: {command} (exit code {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    // =========================================================================
    // Device Errors
    // =========================================================================
    #[error("iSCSI device not found at {}", .path.display())]
    DeviceNotFound { path: PathBuf },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The exit code of a failed command, if this error carries one.
    ///
    /// Used to distinguish already-in-desired-state signals from fatal
    /// failures when a command is allowed to fail in a known way.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Convenience constructor for a missing descriptor field.
    pub fn missing_field(transport: &str, field: &str) -> Self {
        Error::MissingField {
            transport: transport.to_string(),
            field: field.to_string(),
        }
    }
}

/// Result type alias for volume operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_accessor() {
        let err = Error::CommandFailed {
            command: "iscsiadm -m node".into(),
            exit_code: 21,
            stderr: "no records found".into(),
        };
        assert_eq!(err.exit_code(), Some(21));

        let err = Error::UnsupportedTransport("gluster".into());
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_device_not_found_names_path() {
        let err = Error::DeviceNotFound {
            path: PathBuf::from("/dev/disk/by-path/ip-10.0.0.5:3260-iscsi-iqn.x-lun-0"),
        };
        assert!(err
            .to_string()
            .contains("/dev/disk/by-path/ip-10.0.0.5:3260-iscsi-iqn.x-lun-0"));
    }

    #[test]
    fn test_missing_field_message() {
        let err = Error::missing_field("iscsi", "target_iqn");
        assert_eq!(
            err.to_string(),
            "Connection descriptor for 'iscsi' is missing required field: target_iqn"
        );
    }
}
