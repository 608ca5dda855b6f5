//! VM Volume Attach - transport drivers for instance storage
//!
//! Translates a backend-supplied connection descriptor into a
//! hypervisor-consumable disk descriptor, performing the host-side work
//! (session login, filesystem mount, device-node discovery) needed to make
//! the volume reachable first.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Attach Orchestrator                      │
//! │            (external: supplies ConnectionDescriptor)          │
//! └───────────────────────────────┬──────────────────────────────┘
//!                                 │
//!                       ┌─────────┴─────────┐
//!                       │   DriverFactory   │
//!                       └─────────┬─────────┘
//!         ┌──────────┬────────────┼────────────┬──────────┐
//!         │          │            │            │          │
//!     ┌───┴───┐  ┌───┴───┐  ┌─────┴─────┐  ┌───┴───┐  ┌───┴───┐
//!     │ Local │  │ Fake  │  │  Network  │  │ iSCSI │  │  NFS  │
//!     └───┬───┘  └───┬───┘  └─────┬─────┘  └───┬───┘  └───┬───┘
//!         │          │            │            │          │
//!         └──────────┴────────────┼────────────┴──────────┘
//!                                 │
//!                 ┌───────────────┴───────────────┐
//!                 │  Executor (iscsiadm, mount)   │
//!                 │  NamedLocks (session store)   │
//!                 └───────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`drivers`]: one driver per volume transport plus the factory
//! - [`descriptor`]: connection descriptor wire form and typed variants
//! - [`disk`]: hypervisor-facing disk descriptor
//! - [`exec`]: privileged command execution seam
//! - [`devices`]: block device enumeration seam
//! - [`lock`]: named process-wide locks
//! - [`config`]: driver configuration
//! - [`error`]: error types and handling

pub mod config;
pub mod descriptor;
pub mod devices;
pub mod disk;
pub mod drivers;
pub mod error;
pub mod exec;
pub mod lock;

// Re-export commonly used types
pub use config::VolumeConfig;
pub use descriptor::{ConnectionData, ConnectionDescriptor, IscsiAuth, IscsiConnection};
pub use devices::{BlockDeviceEnumerator, ByPathEnumerator};
pub use disk::{base_disk, DiskAuth, DiskDescriptor, DiskSource};
pub use drivers::{DriverFactory, VolumeDriver};
pub use error::{Error, Result};
pub use exec::{CommandOutput, Executor, SystemExecutor};
pub use lock::NamedLocks;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
