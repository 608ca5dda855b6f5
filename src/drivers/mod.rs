//! Transport drivers
//!
//! One driver per volume transport:
//! - Local: host block device handed over directly
//! - Fake: test-only marker volumes
//! - Network: protocols the hypervisor speaks itself (rbd, sheepdog)
//! - iSCSI: session login and device discovery via iscsiadm
//! - NFS: export mounted on the compute host

pub mod iscsi;
pub mod local;
pub mod network;
pub mod nfs;

pub use iscsi::IscsiDriver;
pub use local::{FakeDriver, LocalDriver};
pub use network::NetworkDriver;
pub use nfs::NfsDriver;

use crate::config::VolumeConfig;
use crate::descriptor::ConnectionDescriptor;
use crate::devices::BlockDeviceEnumerator;
use crate::disk::DiskDescriptor;
use crate::error::{Error, Result};
use crate::exec::Executor;
use crate::lock::NamedLocks;
use async_trait::async_trait;
use std::sync::Arc;

/// Attach/detach contract implemented by every transport
#[async_trait]
pub trait VolumeDriver: Send + Sync {
    /// Make the volume reachable on the host and describe it for the
    /// hypervisor.
    async fn connect_volume(
        &self,
        descriptor: &ConnectionDescriptor,
        target_dev: &str,
    ) -> Result<DiskDescriptor>;

    /// Reverse any host-side effects of `connect_volume`.
    ///
    /// Must be safe to call on a volume that never fully connected.
    async fn disconnect_volume(
        &self,
        _descriptor: &ConnectionDescriptor,
        _target_dev: &str,
    ) -> Result<()> {
        Ok(())
    }
}

/// Factory selecting a driver by declared transport type
pub struct DriverFactory;

impl DriverFactory {
    pub fn for_transport(
        transport: &str,
        config: Arc<VolumeConfig>,
        executor: Arc<dyn Executor>,
        locks: Arc<NamedLocks>,
        devices: Arc<dyn BlockDeviceEnumerator>,
    ) -> Result<Arc<dyn VolumeDriver>> {
        match transport {
            "local" => Ok(Arc::new(LocalDriver::new())),
            "fake" => Ok(Arc::new(FakeDriver::new())),
            "rbd" | "sheepdog" => Ok(Arc::new(NetworkDriver::new(config))),
            "iscsi" => Ok(Arc::new(IscsiDriver::new(config, executor, locks, devices))),
            "nfs" => Ok(Arc::new(NfsDriver::new(config, executor))),
            other => Err(Error::UnsupportedTransport(other.to_string())),
        }
    }
}
