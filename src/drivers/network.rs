//! Generic network driver
//!
//! For backends the hypervisor talks to directly over a protocol handler
//! (rbd, sheepdog). No host-side effects; the work here is descriptor
//! translation and auth resolution. A cluster-wide rbd secret configured on
//! this host overrides descriptor-provided credentials and forces
//! authentication on.

use crate::config::VolumeConfig;
use crate::descriptor::{ConnectionData, ConnectionDescriptor};
use crate::disk::{base_disk, DiskAuth, DiskDescriptor, DiskSource};
use crate::drivers::VolumeDriver;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Driver for network-protocol volumes
pub struct NetworkDriver {
    config: Arc<VolumeConfig>,
}

impl NetworkDriver {
    pub fn new(config: Arc<VolumeConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl VolumeDriver for NetworkDriver {
    async fn connect_volume(
        &self,
        descriptor: &ConnectionDescriptor,
        target_dev: &str,
    ) -> Result<DiskDescriptor> {
        let ConnectionData::Network(net) = descriptor.parse_data()? else {
            return Err(Error::UnsupportedTransport(
                descriptor.driver_volume_type.clone(),
            ));
        };
        let protocol = descriptor.driver_volume_type.clone();

        let mut builder = base_disk(descriptor, target_dev, false);
        let mut auth = DiskAuth::default();
        let mut auth_enabled = net.auth_enabled;

        if protocol == "rbd" && self.config.rbd_secret_uuid.is_some() {
            auth.secret_uuid = self.config.rbd_secret_uuid.clone();
            // Force authentication locally
            auth_enabled = true;
            if self.config.rbd_user.is_some() {
                auth.username = self.config.rbd_user.clone();
            }
        }

        if auth_enabled {
            // Local overrides win field by field
            auth.username = match auth.username.or(net.auth_username) {
                Some(u) => Some(u),
                None => return Err(Error::missing_field(&protocol, "auth_username")),
            };
            auth.secret_type = Some(
                net.secret_type
                    .ok_or_else(|| Error::missing_field(&protocol, "secret_type"))?,
            );
            auth.secret_uuid = match auth.secret_uuid.or(net.secret_uuid) {
                Some(u) => Some(u),
                None => return Err(Error::missing_field(&protocol, "secret_uuid")),
            };
            builder = builder.auth(auth);
        }

        Ok(builder.source(DiskSource::Network {
            protocol,
            host: net.name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::Value;

    fn rbd_descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor::new("rbd").with_data("name", "pool/vol-0001")
    }

    #[tokio::test]
    async fn test_connect_without_auth() {
        let driver = NetworkDriver::new(Arc::new(VolumeConfig::default()));
        let disk = driver
            .connect_volume(&rbd_descriptor(), "/dev/vdb")
            .await
            .unwrap();

        assert_matches!(disk.source, DiskSource::Network { ref protocol, ref host } => {
            assert_eq!(protocol, "rbd");
            assert_eq!(host, "pool/vol-0001");
        });
        assert!(disk.auth.is_none());
    }

    #[tokio::test]
    async fn test_configured_secret_forces_auth() {
        let config = VolumeConfig {
            rbd_user: Some("cinder".into()),
            rbd_secret_uuid: Some("2a5b08e4-3dca-4ff9-9a1d-40389758d081".into()),
            ..VolumeConfig::default()
        };
        let driver = NetworkDriver::new(Arc::new(config));

        // Descriptor has auth disabled and only a secret type
        let descriptor = rbd_descriptor().with_data("secret_type", "ceph");
        let disk = driver
            .connect_volume(&descriptor, "/dev/vdb")
            .await
            .unwrap();

        let auth = disk.auth.unwrap();
        assert_eq!(auth.username.as_deref(), Some("cinder"));
        assert_eq!(auth.secret_type.as_deref(), Some("ceph"));
        assert_eq!(
            auth.secret_uuid.as_deref(),
            Some("2a5b08e4-3dca-4ff9-9a1d-40389758d081")
        );
    }

    #[tokio::test]
    async fn test_descriptor_auth_when_enabled() {
        let driver = NetworkDriver::new(Arc::new(VolumeConfig::default()));
        let mut descriptor = rbd_descriptor()
            .with_data("auth_username", "client.admin")
            .with_data("secret_type", "ceph")
            .with_data("secret_uuid", "b3b7f863-d843-4268-9f4a-90a096ab0848");
        descriptor
            .data
            .insert("auth_enabled".into(), Value::Bool(true));

        let disk = driver
            .connect_volume(&descriptor, "/dev/vdb")
            .await
            .unwrap();

        let auth = disk.auth.unwrap();
        assert_eq!(auth.username.as_deref(), Some("client.admin"));
        assert_eq!(
            auth.secret_uuid.as_deref(),
            Some("b3b7f863-d843-4268-9f4a-90a096ab0848")
        );
    }

    #[tokio::test]
    async fn test_local_secret_overrides_descriptor_field_by_field() {
        let config = VolumeConfig {
            rbd_secret_uuid: Some("local-uuid".into()),
            ..VolumeConfig::default()
        };
        let driver = NetworkDriver::new(Arc::new(config));

        // No rbd_user configured, so the username must come from the
        // descriptor while the secret uuid stays local.
        let mut descriptor = rbd_descriptor()
            .with_data("auth_username", "client.admin")
            .with_data("secret_type", "ceph")
            .with_data("secret_uuid", "remote-uuid");
        descriptor
            .data
            .insert("auth_enabled".into(), Value::Bool(true));

        let disk = driver
            .connect_volume(&descriptor, "/dev/vdb")
            .await
            .unwrap();

        let auth = disk.auth.unwrap();
        assert_eq!(auth.username.as_deref(), Some("client.admin"));
        assert_eq!(auth.secret_uuid.as_deref(), Some("local-uuid"));
    }

    #[tokio::test]
    async fn test_auth_enabled_without_credentials_fails() {
        let driver = NetworkDriver::new(Arc::new(VolumeConfig::default()));
        let mut descriptor = rbd_descriptor();
        descriptor
            .data
            .insert("auth_enabled".into(), Value::Bool(true));

        let err = driver
            .connect_volume(&descriptor, "/dev/vdb")
            .await
            .unwrap_err();
        assert_matches!(err, Error::MissingField { field, .. } => {
            assert_eq!(field, "auth_username");
        });
    }
}
