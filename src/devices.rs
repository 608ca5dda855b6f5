//! Block device enumeration
//!
//! Collaborator seam for the shared-LUN detach check: the iSCSI driver asks
//! which block device paths are currently visible as in use, and skips
//! session teardown while any sibling LUN of the target is among them. The
//! attach orchestrator normally supplies its hypervisor's view here.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Reports the block device paths currently in use on this host
pub trait BlockDeviceEnumerator: Send + Sync {
    fn visible_block_devices(&self) -> Result<Vec<PathBuf>>;
}

/// Enumerator listing a by-path directory on the host
///
/// Fallback for callers without a hypervisor view; a missing directory
/// means no devices.
pub struct ByPathEnumerator {
    dir: PathBuf,
}

impl ByPathEnumerator {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

impl BlockDeviceEnumerator for ByPathEnumerator {
    fn visible_block_devices(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut devices = Vec::new();
        for entry in entries {
            devices.push(entry?.path());
        }
        Ok(devices)
    }
}
