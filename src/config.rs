//! Volume driver configuration
//!
//! An explicit configuration struct handed to each driver at construction.
//! Defaults match a stock Linux compute host.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration shared by the volume drivers
#[derive(Debug, Clone)]
pub struct VolumeConfig {
    /// Number of times to rescan an iSCSI target waiting for the device node
    pub num_iscsi_scan_tries: u32,
    /// Base unit for the rescan backoff; attempt n sleeps n^2 units
    pub iscsi_rescan_backoff: Duration,
    /// Directory holding by-path block device links (for testing)
    pub disk_by_path_dir: PathBuf,
    /// Directory where NFS exports are mounted on the compute host
    pub nfs_mount_point_base: PathBuf,
    /// Mount options passed to the NFS client, if any
    pub nfs_mount_options: Option<String>,
    /// RADOS client name for accessing rbd volumes
    pub rbd_user: Option<String>,
    /// Hypervisor secret uuid registered for the rbd user
    pub rbd_secret_uuid: Option<String>,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            num_iscsi_scan_tries: 3,
            iscsi_rescan_backoff: Duration::from_secs(1),
            disk_by_path_dir: PathBuf::from("/dev/disk/by-path"),
            nfs_mount_point_base: PathBuf::from("/var/lib/vm-volume-attach/mnt"),
            nfs_mount_options: None,
            rbd_user: None,
            rbd_secret_uuid: None,
        }
    }
}
