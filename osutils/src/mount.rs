use std::path::Path;

use anyhow::{Context, Error};

use crate::{dependencies::Dependency, exe::RunAndCheck, files::create_dirs};

/// Mounts `device` at `target`, creating `target` if necessary. Used by the
/// disks stage to stage a filesystem under the stage root before the files
/// stage writes into it (§4.4.5).
pub fn mount(device: impl AsRef<Path>, target: impl AsRef<Path>, fstype: Option<&str>) -> Result<(), Error> {
    create_dirs(target.as_ref())?;

    let mut cmd = Dependency::Mount.cmd();
    if let Some(fstype) = fstype {
        cmd.arg("-t").arg(fstype);
    }
    cmd.arg(device.as_ref()).arg(target.as_ref());

    cmd.run_and_check().with_context(|| {
        format!(
            "Failed to mount '{}' at '{}'",
            device.as_ref().display(),
            target.as_ref().display()
        )
    })
}

/// Unmounts `target`. Not an error if nothing is mounted there.
pub fn umount(target: impl AsRef<Path>) -> Result<(), Error> {
    let result = Dependency::Umount.cmd().arg(target.as_ref()).run_and_check();

    match result {
        Ok(()) => Ok(()),
        Err(e) if !is_mounted(target.as_ref()).unwrap_or(true) => {
            let _ = e;
            Ok(())
        }
        Err(e) => Err(e.context(format!("Failed to unmount '{}'", target.as_ref().display()))),
    }
}

/// Whether `target` appears as a mount point in `/proc/mounts`.
pub fn is_mounted(target: &Path) -> Result<bool, Error> {
    let mounts = std::fs::read_to_string("/proc/mounts").context("Failed to read /proc/mounts")?;
    let target = target.to_string_lossy();
    Ok(mounts
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(target.as_ref())))
}
