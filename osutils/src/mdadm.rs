use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use log::info;

use crate::{dependencies::Dependency, exe::RunAndCheck};

pub const METADATA_VERSION: &str = "1.2";

/// Creates a RAID array at `raid_path` from `devices` (§4.4.2).
pub fn create(raid_path: &Path, level: &str, devices: &[PathBuf]) -> Result<(), Error> {
    info!("Creating RAID array '{}'", raid_path.display());

    Dependency::Mdadm
        .cmd()
        .arg("--create")
        .arg(raid_path)
        .arg(format!("--level={level}"))
        .arg(format!("--raid-devices={}", devices.len()))
        .args(devices)
        .arg(format!("--metadata={METADATA_VERSION}"))
        .arg("--run")
        .run_and_check()
        .context("Failed to run mdadm --create")
}

/// Stops an existing array. Not an error if the array doesn't exist.
pub fn stop(raid_name: impl AsRef<Path>) -> Result<(), Error> {
    info!("Stopping RAID array '{}'", raid_name.as_ref().display());

    let result = Dependency::Mdadm
        .cmd()
        .arg("--stop")
        .arg(raid_name.as_ref())
        .run_and_check();

    match result {
        Ok(()) => Ok(()),
        Err(e) if !raid_name.as_ref().exists() => {
            // Nothing to stop; this is the idempotent re-run case.
            let _ = e;
            Ok(())
        }
        Err(e) => Err(e.context(format!(
            "Failed to stop RAID array '{}'",
            raid_name.as_ref().display()
        ))),
    }
}

/// Zeroes the RAID superblock on `device`, so a stale array membership
/// record doesn't cause a later `--create` to misdetect the device.
pub fn zero_superblock(device: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Mdadm
        .cmd()
        .arg("--zero-superblock")
        .arg(device.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to zero RAID superblock on '{}'",
                device.as_ref().display()
            )
        })
}
