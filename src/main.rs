//! VM Volume Attach CLI
//!
//! Attaches and detaches instance volumes from the command line: reads a
//! connection descriptor (JSON), selects the transport driver, performs the
//! host-side work, and on attach prints the resulting disk descriptor for
//! the hypervisor configuration layer.

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vm_volume_attach::{
    ByPathEnumerator, ConnectionDescriptor, DriverFactory, NamedLocks, Result, SystemExecutor,
    VolumeConfig,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Attach and detach storage volumes for hypervisor instances
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Number of times to rescan an iSCSI target waiting for the device
    #[arg(long, env = "NUM_ISCSI_SCAN_TRIES", default_value = "3")]
    num_iscsi_scan_tries: u32,

    /// Directory where NFS exports are mounted
    #[arg(
        long,
        env = "NFS_MOUNT_POINT_BASE",
        default_value = "/var/lib/vm-volume-attach/mnt"
    )]
    nfs_mount_point_base: PathBuf,

    /// Mount options passed to the NFS client
    #[arg(long, env = "NFS_MOUNT_OPTIONS")]
    nfs_mount_options: Option<String>,

    /// RADOS client name for accessing rbd volumes
    #[arg(long, env = "RBD_USER")]
    rbd_user: Option<String>,

    /// Hypervisor secret uuid registered for the rbd user
    #[arg(long, env = "RBD_SECRET_UUID")]
    rbd_secret_uuid: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect a volume and print the resulting disk descriptor
    Connect {
        /// Connection descriptor JSON file, or '-' for stdin
        #[arg(long)]
        descriptor: String,
        /// Guest device the disk will appear as (e.g. /dev/vdb)
        #[arg(long)]
        target_dev: String,
    },
    /// Disconnect a previously connected volume
    Disconnect {
        /// Connection descriptor JSON file, or '-' for stdin
        #[arg(long)]
        descriptor: String,
        /// Guest device the disk was attached as
        #[arg(long)]
        target_dev: String,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = Arc::new(VolumeConfig {
        num_iscsi_scan_tries: args.num_iscsi_scan_tries,
        iscsi_rescan_backoff: Duration::from_secs(1),
        nfs_mount_point_base: args.nfs_mount_point_base.clone(),
        nfs_mount_options: args.nfs_mount_options.clone(),
        rbd_user: args.rbd_user.clone(),
        rbd_secret_uuid: args.rbd_secret_uuid.clone(),
        ..VolumeConfig::default()
    });
    let executor = Arc::new(SystemExecutor);
    let locks = Arc::new(NamedLocks::new());
    let devices = Arc::new(ByPathEnumerator::new(&config.disk_by_path_dir));

    match &args.command {
        Command::Connect {
            descriptor,
            target_dev,
        } => {
            let descriptor = read_descriptor(descriptor)?;
            let driver = DriverFactory::for_transport(
                &descriptor.driver_volume_type,
                config,
                executor,
                locks,
                devices,
            )?;

            info!(
                "Connecting {} volume as {}",
                descriptor.driver_volume_type, target_dev
            );
            let disk = driver.connect_volume(&descriptor, target_dev).await?;
            println!("{}", serde_json::to_string_pretty(&disk)?);
        }
        Command::Disconnect {
            descriptor,
            target_dev,
        } => {
            let descriptor = read_descriptor(descriptor)?;
            let driver = DriverFactory::for_transport(
                &descriptor.driver_volume_type,
                config,
                executor,
                locks,
                devices,
            )?;

            info!(
                "Disconnecting {} volume from {}",
                descriptor.driver_volume_type, target_dev
            );
            driver.disconnect_volume(&descriptor, target_dev).await?;
        }
    }

    Ok(())
}

fn read_descriptor(source: &str) -> Result<ConnectionDescriptor> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source)?
    };
    Ok(serde_json::from_str(&raw)?)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
