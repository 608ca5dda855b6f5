//! Local-file and fake drivers
//!
//! Stateless transformations with no host-side effects: local volumes hand
//! the backend-provided block device straight to the hypervisor, fake
//! volumes exist for exercising the attach path in tests.

use crate::descriptor::{ConnectionData, ConnectionDescriptor};
use crate::disk::{base_disk, DiskDescriptor, DiskSource};
use crate::drivers::VolumeDriver;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Driver for volumes backed by a local block device
pub struct LocalDriver;

impl LocalDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VolumeDriver for LocalDriver {
    async fn connect_volume(
        &self,
        descriptor: &ConnectionDescriptor,
        target_dev: &str,
    ) -> Result<DiskDescriptor> {
        let ConnectionData::Local { device_path } = descriptor.parse_data()? else {
            return Err(Error::UnsupportedTransport(
                descriptor.driver_volume_type.clone(),
            ));
        };
        Ok(base_disk(descriptor, target_dev, true).source(DiskSource::Block {
            path: PathBuf::from(device_path),
        }))
    }
}

/// Driver attaching fake volumes, for testing only
pub struct FakeDriver;

impl FakeDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VolumeDriver for FakeDriver {
    async fn connect_volume(
        &self,
        descriptor: &ConnectionDescriptor,
        target_dev: &str,
    ) -> Result<DiskDescriptor> {
        descriptor.parse_data()?;
        Ok(
            base_disk(descriptor, target_dev, true).source(DiskSource::Network {
                protocol: "fake".to_string(),
                host: "fake".to_string(),
            }),
        )
    }
}
