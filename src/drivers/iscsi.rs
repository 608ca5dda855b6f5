//! iSCSI driver
//!
//! Session state lives in the host's iscsiadm records, never in this
//! process: every operation re-derives the current state before mutating,
//! which keeps connect and disconnect safe to re-run after a crash. All
//! session mutations run under the `connect_volume` named lock so
//! concurrent iscsiadm invocations cannot race on the record store.

use crate::config::VolumeConfig;
use crate::descriptor::{ConnectionData, ConnectionDescriptor, IscsiConnection};
use crate::devices::BlockDeviceEnumerator;
use crate::disk::{base_disk, DiskDescriptor, DiskSource};
use crate::drivers::VolumeDriver;
use crate::error::{Error, Result};
use crate::exec::{CommandOutput, Executor};
use crate::lock::NamedLocks;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Critical-section name shared by connect and disconnect
const LOCK_NAME: &str = "connect_volume";

/// Driver for iSCSI-attached volumes
pub struct IscsiDriver {
    config: Arc<VolumeConfig>,
    executor: Arc<dyn Executor>,
    locks: Arc<NamedLocks>,
    devices: Arc<dyn BlockDeviceEnumerator>,
}

impl IscsiDriver {
    pub fn new(
        config: Arc<VolumeConfig>,
        executor: Arc<dyn Executor>,
        locks: Arc<NamedLocks>,
        devices: Arc<dyn BlockDeviceEnumerator>,
    ) -> Self {
        Self {
            config,
            executor,
            locks,
            devices,
        }
    }

    async fn run_iscsiadm(
        &self,
        props: &IscsiConnection,
        args: &[&str],
        check_exit_codes: &[i32],
    ) -> Result<CommandOutput> {
        let mut argv = vec![
            "-m",
            "node",
            "-T",
            props.target_iqn.as_str(),
            "-p",
            props.target_portal.as_str(),
        ];
        argv.extend_from_slice(args);

        let out = self
            .executor
            .execute("iscsiadm", &argv, true, check_exit_codes)
            .await?;
        debug!(
            "iscsiadm {:?}: stdout={} stderr={}",
            args, out.stdout, out.stderr
        );
        Ok(out)
    }

    async fn iscsiadm_update(
        &self,
        props: &IscsiConnection,
        key: &str,
        value: &str,
        check_exit_codes: &[i32],
    ) -> Result<CommandOutput> {
        self.run_iscsiadm(
            props,
            &["--op", "update", "-n", key, "-v", value],
            check_exit_codes,
        )
        .await
    }

    /// Expected by-path device node for one LUN of the target.
    fn host_device(&self, props: &IscsiConnection) -> PathBuf {
        self.config.disk_by_path_dir.join(format!(
            "ip-{}-iscsi-{}-lun-{}",
            props.target_portal, props.target_iqn, props.target_lun
        ))
    }

    /// LUN-agnostic device-name prefix for the whole target.
    fn device_prefix(props: &IscsiConnection) -> String {
        format!(
            "ip-{}-iscsi-{}-lun-",
            props.target_portal, props.target_iqn
        )
    }

    /// Make sure a node record exists for the target.
    ///
    /// Discovery on a co-located host may already have created it, so probe
    /// first and only `--op new` on the two "no records found" exit codes
    /// (21 since iscsiadm 2.0-871, 255 before). Whether 255 can also mean
    /// other failures is backend-version dependent; the mapping here
    /// mirrors what the tool is observed to do.
    async fn ensure_node_record(&self, props: &IscsiConnection) -> Result<()> {
        match self.run_iscsiadm(props, &[], &[0]).await {
            Ok(_) => Ok(()),
            Err(err) => match err.exit_code() {
                Some(21) | Some(255) => {
                    self.run_iscsiadm(props, &["--op", "new"], &[0]).await?;
                    Ok(())
                }
                _ => Err(err),
            },
        }
    }

    /// Wait for the device node with bounded rescans and quadratic backoff.
    async fn wait_for_device(&self, props: &IscsiConnection, host_device: &Path) -> Result<()> {
        let mut tries: u32 = 0;
        while !host_device.exists() {
            if tries >= self.config.num_iscsi_scan_tries {
                return Err(Error::DeviceNotFound {
                    path: host_device.to_path_buf(),
                });
            }

            warn!(
                "iSCSI volume not yet found at {}, rescanning (try {})",
                host_device.display(),
                tries
            );
            self.run_iscsiadm(props, &["--rescan"], &[0]).await?;

            tries += 1;
            if !host_device.exists() {
                sleep(self.config.iscsi_rescan_backoff * (tries * tries)).await;
            }
        }

        if tries != 0 {
            debug!(
                "Found iSCSI node {} after {} rescans",
                host_device.display(),
                tries
            );
        }
        Ok(())
    }

    fn props(descriptor: &ConnectionDescriptor) -> Result<IscsiConnection> {
        match descriptor.parse_data()? {
            ConnectionData::Iscsi(props) => Ok(props),
            _ => Err(Error::UnsupportedTransport(
                descriptor.driver_volume_type.clone(),
            )),
        }
    }
}

#[async_trait]
impl VolumeDriver for IscsiDriver {
    async fn connect_volume(
        &self,
        descriptor: &ConnectionDescriptor,
        target_dev: &str,
    ) -> Result<DiskDescriptor> {
        let props = Self::props(descriptor)?;
        let _guard = self.locks.lock(LOCK_NAME).await;

        self.ensure_node_record(&props).await?;

        if let Some(auth) = &props.auth {
            self.iscsiadm_update(&props, "node.session.auth.authmethod", &auth.method, &[0])
                .await?;
            self.iscsiadm_update(&props, "node.session.auth.username", &auth.username, &[0])
                .await?;
            self.iscsiadm_update(&props, "node.session.auth.password", &auth.password, &[0])
                .await?;
        }

        // Another LUN on the same target may already hold the session;
        // 255 here is a duplicate login, not a failure
        self.run_iscsiadm(&props, &["--login"], &[0, 255]).await?;

        self.iscsiadm_update(&props, "node.startup", "automatic", &[0])
            .await?;

        // The by-path node is not always present immediately after login
        let host_device = self.host_device(&props);
        self.wait_for_device(&props, &host_device).await?;

        Ok(base_disk(descriptor, target_dev, false).source(DiskSource::Block {
            path: host_device,
        }))
    }

    async fn disconnect_volume(
        &self,
        descriptor: &ConnectionDescriptor,
        _target_dev: &str,
    ) -> Result<()> {
        let props = Self::props(descriptor)?;
        let _guard = self.locks.lock(LOCK_NAME).await;

        // Only tear the session down if no other LUN from this target is in
        // use. The by-path link of the LUN being disconnected stays on the
        // host until the logout decided here, so it must not count as a
        // sibling.
        let prefix = Self::device_prefix(&props);
        let own_name = format!("{}{}", prefix, props.target_lun);
        let in_use = self
            .devices
            .visible_block_devices()?
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .any(|name| name.starts_with(&prefix) && name != own_name);
        if in_use {
            debug!(
                "Target {} still has visible LUNs, leaving session in place",
                props.target_iqn
            );
            return Ok(());
        }

        // Best-effort teardown: the record or session may already be gone
        self.iscsiadm_update(&props, "node.startup", "manual", &[0, 21, 255])
            .await?;
        self.run_iscsiadm(&props, &["--logout"], &[0, 21, 255])
            .await?;
        self.run_iscsiadm(&props, &["--op", "delete"], &[0, 21, 255])
            .await?;
        Ok(())
    }
}
