//! Disk descriptors
//!
//! Hypervisor-facing description of a disk device to attach to an instance.
//! Built once per `connect_volume` call: a builder carries the
//! transport-agnostic defaults and is finalized by the driver supplying the
//! source, after which the descriptor is immutable.

use crate::descriptor::ConnectionDescriptor;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// =============================================================================
// Disk Source
// =============================================================================

/// Source of the disk data; exactly one kind per descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "lowercase")]
pub enum DiskSource {
    /// Host block device
    Block { path: PathBuf },
    /// Network protocol the hypervisor speaks directly
    Network { protocol: String, host: String },
    /// File on a mounted filesystem
    File { path: PathBuf },
}

impl DiskSource {
    pub fn source_type(&self) -> &'static str {
        match self {
            DiskSource::Block { .. } => "block",
            DiskSource::Network { .. } => "network",
            DiskSource::File { .. } => "file",
        }
    }

    /// Source path for block and file sources.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            DiskSource::Block { path } | DiskSource::File { path } => Some(path),
            DiskSource::Network { .. } => None,
        }
    }
}

// =============================================================================
// Authentication
// =============================================================================

/// Auth fields for network sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskAuth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_uuid: Option<String>,
}

// =============================================================================
// Disk Descriptor
// =============================================================================

/// Complete disk device description consumed by the hypervisor layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskDescriptor {
    pub driver_name: String,
    pub driver_format: String,
    pub driver_cache: String,
    pub target_dev: String,
    pub target_bus: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(flatten)]
    pub source: DiskSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<DiskAuth>,
}

impl DiskDescriptor {
    pub fn source_type(&self) -> &'static str {
        self.source.source_type()
    }
}

/// Builder holding the defaults shared by every transport
#[derive(Debug, Clone)]
pub struct DiskBuilder {
    driver_name: String,
    driver_format: String,
    driver_cache: String,
    target_dev: String,
    target_bus: String,
    serial: Option<String>,
    auth: Option<DiskAuth>,
}

impl DiskBuilder {
    pub fn auth(mut self, auth: DiskAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Finalize with the transport-specific source.
    pub fn source(self, source: DiskSource) -> DiskDescriptor {
        DiskDescriptor {
            driver_name: self.driver_name,
            driver_format: self.driver_format,
            driver_cache: self.driver_cache,
            target_dev: self.target_dev,
            target_bus: self.target_bus,
            serial: self.serial,
            source,
            auth: self.auth,
        }
    }
}

/// Start a disk descriptor with the transport-agnostic defaults.
///
/// Every driver calls this before filling in its source: raw format,
/// cache disabled, virtio bus, serial passed through from the connection
/// descriptor, driver name picked by whether the backing device is a block
/// device.
pub fn base_disk(
    descriptor: &ConnectionDescriptor,
    target_dev: &str,
    is_block_dev: bool,
) -> DiskBuilder {
    DiskBuilder {
        driver_name: pick_disk_driver_name(is_block_dev).to_string(),
        driver_format: "raw".to_string(),
        driver_cache: "none".to_string(),
        target_dev: target_dev.to_string(),
        target_bus: "virtio".to_string(),
        serial: descriptor.serial.clone(),
        auth: None,
    }
}

/// Hypervisor disk driver for block vs character-device backends.
fn pick_disk_driver_name(is_block_dev: bool) -> &'static str {
    if is_block_dev {
        "phy"
    } else {
        "qemu"
    }
}
