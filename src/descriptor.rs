//! Connection descriptors
//!
//! The storage backend hands over a wire-form descriptor: a declared
//! transport type plus an open map of transport-specific fields. The wire
//! form is validated into a typed per-transport variant before any driver
//! touches it, so a missing required field surfaces as a contract violation
//! at the boundary instead of at point of use.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// Wire Form
// =============================================================================

/// Backend-supplied description of how to reach a volume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Transport discriminator (`iscsi`, `rbd`, `nfs`, `local`, `fake`, ...)
    pub driver_volume_type: String,
    /// Transport-specific fields
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    /// Disk serial, passed through to the hypervisor if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
}

impl ConnectionDescriptor {
    pub fn new(driver_volume_type: &str) -> Self {
        Self {
            driver_volume_type: driver_volume_type.to_string(),
            data: BTreeMap::new(),
            serial: None,
        }
    }

    /// Insert a string field into `data` (builder-style, mainly for tests).
    pub fn with_data(mut self, key: &str, value: &str) -> Self {
        self.data
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    fn str_field(&self, key: &str) -> Option<String> {
        self.data.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn require_str(&self, key: &str) -> Result<String> {
        self.str_field(key)
            .ok_or_else(|| Error::missing_field(&self.driver_volume_type, key))
    }

    fn bool_field(&self, key: &str) -> bool {
        self.data.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Integer field tolerating both number and numeric-string encodings.
    /// Out-of-range values are treated as absent, never wrapped.
    fn u32_field(&self, key: &str) -> Option<u32> {
        match self.data.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Validate the open `data` map into the typed per-transport form.
    pub fn parse_data(&self) -> Result<ConnectionData> {
        match self.driver_volume_type.as_str() {
            "local" => Ok(ConnectionData::Local {
                device_path: self.require_str("device_path")?,
            }),
            "fake" => Ok(ConnectionData::Fake),
            "iscsi" => {
                let auth = match self.str_field("auth_method") {
                    Some(method) => Some(IscsiAuth {
                        method,
                        username: self.require_str("auth_username")?,
                        password: self.require_str("auth_password")?,
                    }),
                    None => None,
                };
                Ok(ConnectionData::Iscsi(IscsiConnection {
                    target_portal: self.require_str("target_portal")?,
                    target_iqn: self.require_str("target_iqn")?,
                    target_lun: self.u32_field("target_lun").unwrap_or(0),
                    auth,
                }))
            }
            "nfs" => Ok(ConnectionData::Nfs {
                export: self.require_str("export")?,
                name: self.require_str("name")?,
            }),
            "rbd" | "sheepdog" => Ok(ConnectionData::Network(NetworkConnection {
                name: self.require_str("name")?,
                auth_enabled: self.bool_field("auth_enabled"),
                auth_username: self.str_field("auth_username"),
                secret_type: self.str_field("secret_type"),
                secret_uuid: self.str_field("secret_uuid"),
            })),
            other => Err(Error::UnsupportedTransport(other.to_string())),
        }
    }
}

// =============================================================================
// Typed Transport Data
// =============================================================================

/// Validated, transport-specific connection data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionData {
    Local { device_path: String },
    Fake,
    Network(NetworkConnection),
    Iscsi(IscsiConnection),
    Nfs { export: String, name: String },
}

/// Network-protocol volume parameters (rbd, sheepdog)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConnection {
    /// Backend volume name, used as the source host/image reference
    pub name: String,
    pub auth_enabled: bool,
    pub auth_username: Option<String>,
    pub secret_type: Option<String>,
    pub secret_uuid: Option<String>,
}

/// iSCSI target parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IscsiConnection {
    pub target_portal: String,
    pub target_iqn: String,
    pub target_lun: u32,
    pub auth: Option<IscsiAuth>,
}

/// CHAP credentials pushed into the node record before login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IscsiAuth {
    pub method: String,
    pub username: String,
    pub password: String,
}
