//! NFS driver
//!
//! The mount point for an export is derived from a content hash of the
//! export string, so the filesystem itself is the registry of what is
//! mounted: mounting is attempted unconditionally and an "already mounted"
//! failure is success. The host owns the mount lifecycle; disconnect is a
//! no-op.

use crate::config::VolumeConfig;
use crate::descriptor::{ConnectionData, ConnectionDescriptor};
use crate::disk::{base_disk, DiskDescriptor, DiskSource};
use crate::drivers::VolumeDriver;
use crate::error::{Error, Result};
use crate::exec::Executor;
use async_trait::async_trait;
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Driver for volumes on NFS exports
pub struct NfsDriver {
    config: Arc<VolumeConfig>,
    executor: Arc<dyn Executor>,
}

impl NfsDriver {
    pub fn new(config: Arc<VolumeConfig>, executor: Arc<dyn Executor>) -> Self {
        Self { config, executor }
    }

    /// Mount the export if needed and return its mount point.
    async fn ensure_mounted(&self, export: &str) -> Result<PathBuf> {
        let mount_path = self.config.nfs_mount_point_base.join(hash_export(export));
        self.mount_nfs(&mount_path, export).await?;
        Ok(mount_path)
    }

    async fn mount_nfs(&self, mount_path: &Path, export: &str) -> Result<()> {
        if !mount_path.exists() {
            std::fs::create_dir_all(mount_path)?;
        }

        let path_arg = mount_path.display().to_string();
        let mut args = vec!["-t", "nfs"];
        if let Some(options) = &self.config.nfs_mount_options {
            args.extend(["-o", options.as_str()]);
        }
        args.push(export);
        args.push(&path_arg);

        match self.executor.execute("mount", &args, true, &[0]).await {
            Ok(_) => Ok(()),
            Err(Error::CommandFailed { ref stderr, .. }) if stderr.contains("already mounted") => {
                warn!("{} is already mounted", export);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Hex digest naming the mount point for an export.
///
/// md5 is part of the on-host contract: existing mounts made under this
/// scheme must keep resolving to the same directory.
pub fn hash_export(export: &str) -> String {
    hex::encode(Md5::digest(export.as_bytes()))
}

#[async_trait]
impl VolumeDriver for NfsDriver {
    async fn connect_volume(
        &self,
        descriptor: &ConnectionDescriptor,
        target_dev: &str,
    ) -> Result<DiskDescriptor> {
        let ConnectionData::Nfs { export, name } = descriptor.parse_data()? else {
            return Err(Error::UnsupportedTransport(
                descriptor.driver_volume_type.clone(),
            ));
        };

        let mount_path = self.ensure_mounted(&export).await?;
        let path = mount_path.join(name);

        Ok(base_disk(descriptor, target_dev, false).source(DiskSource::File { path }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::mock::MockExecutor;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    const EXPORT: &str = "nfs-host:/export";

    fn descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor::new("nfs")
            .with_data("export", EXPORT)
            .with_data("name", "vol.img")
    }

    struct Harness {
        base: TempDir,
        executor: Arc<MockExecutor>,
        driver: NfsDriver,
    }

    fn harness(mount_options: Option<&str>) -> Harness {
        let base = TempDir::new().unwrap();
        let config = Arc::new(VolumeConfig {
            nfs_mount_point_base: base.path().to_path_buf(),
            nfs_mount_options: mount_options.map(str::to_string),
            ..VolumeConfig::default()
        });
        let executor = Arc::new(MockExecutor::new());
        let driver = NfsDriver::new(config, executor.clone());
        Harness {
            base,
            executor,
            driver,
        }
    }

    #[tokio::test]
    async fn test_connect_mounts_and_composes_path() {
        let h = harness(None);

        let disk = h
            .driver
            .connect_volume(&descriptor(), "/dev/vdb")
            .await
            .unwrap();

        let mount_path = h.base.path().join(hash_export(EXPORT));
        assert_eq!(disk.source_type(), "file");
        assert_eq!(disk.source.path().unwrap(), &mount_path.join("vol.img"));
        // Mount directory was created on demand
        assert!(mount_path.is_dir());

        let lines = h.executor.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            format!("mount -t nfs {} {}", EXPORT, mount_path.display())
        );
        assert!(h.executor.recorded()[0].run_as_root);
    }

    #[tokio::test]
    async fn test_mount_path_is_deterministic() {
        let h = harness(None);

        let first = h
            .driver
            .connect_volume(&descriptor(), "/dev/vdb")
            .await
            .unwrap();
        // Second attach of the same export: the mount command reports the
        // export as already mounted, which is not an error
        h.executor.script(32, "", "mount.nfs: /x is already mounted");
        let second = h
            .driver
            .connect_volume(&descriptor(), "/dev/vdc")
            .await
            .unwrap();

        assert_eq!(first.source.path(), second.source.path());
    }

    #[tokio::test]
    async fn test_hash_matches_known_digest() {
        // md5("nfs-host:/export")
        assert_eq!(hash_export(EXPORT), "32abefc2e639378a3f28f28319e71ab9");
    }

    #[tokio::test]
    async fn test_mount_options_are_appended() {
        let h = harness(Some("vers=4.1,ro"));

        h.driver
            .connect_volume(&descriptor(), "/dev/vdb")
            .await
            .unwrap();

        let lines = h.executor.lines();
        assert!(lines[0].starts_with("mount -t nfs -o vers=4.1,ro "));
    }

    #[tokio::test]
    async fn test_other_mount_failures_propagate() {
        let h = harness(None);
        h.executor.script(32, "", "mount.nfs: access denied by server");

        let err = h
            .driver
            .connect_volume(&descriptor(), "/dev/vdb")
            .await
            .unwrap_err();
        assert_matches!(err, Error::CommandFailed { exit_code: 32, .. });
    }

    #[tokio::test]
    async fn test_disconnect_is_noop() {
        let h = harness(None);
        h.driver
            .disconnect_volume(&descriptor(), "/dev/vdb")
            .await
            .unwrap();
        assert!(h.executor.lines().is_empty());
    }
}
