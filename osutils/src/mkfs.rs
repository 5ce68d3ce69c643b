use std::path::Path;

use anyhow::{bail, Context, Error};

use crate::{dependencies::Dependency, exe::RunAndCheck};
use sysdefs::filesystems::FilesystemFormat;

/// Formats `device` with `format`, applying `label` and extra mkfs options
/// where the tool's argv supports them (§4.4.4's "mkfs invocation is
/// format-specific").
pub fn run(
    device: impl AsRef<Path>,
    format: FilesystemFormat,
    label: Option<&str>,
    uuid: Option<&str>,
    extra_options: &[String],
) -> Result<(), Error> {
    let device = device.as_ref();

    match format {
        FilesystemFormat::Ext2 | FilesystemFormat::Ext3 | FilesystemFormat::Ext4 => {
            let mut cmd = Dependency::Mke2fs.cmd();
            cmd.arg("-F").arg("-t").arg(format.to_string());
            if let Some(label) = label {
                cmd.arg("-L").arg(label);
            }
            if let Some(uuid) = uuid {
                cmd.arg("-U").arg(uuid);
            }
            cmd.args(extra_options).arg(device);
            cmd.run_and_check()
        }
        FilesystemFormat::Xfs => {
            let mut cmd = Dependency::MkfsXfs.cmd();
            cmd.arg("-f");
            if let Some(label) = label {
                cmd.arg("-L").arg(label);
            }
            if let Some(uuid) = uuid {
                cmd.arg("-m").arg(format!("uuid={uuid}"));
            }
            cmd.args(extra_options).arg(device);
            cmd.run_and_check()
        }
        FilesystemFormat::Btrfs => {
            let mut cmd = Dependency::MkfsBtrfs.cmd();
            cmd.arg("-f");
            if let Some(label) = label {
                cmd.arg("-L").arg(label);
            }
            if let Some(uuid) = uuid {
                cmd.arg("-U").arg(uuid);
            }
            cmd.args(extra_options).arg(device);
            cmd.run_and_check()
        }
        FilesystemFormat::Vfat => {
            let mut cmd = Dependency::MkfsVfat.cmd();
            if let Some(label) = label {
                cmd.arg("-n").arg(label);
            }
            if let Some(uuid) = uuid {
                cmd.arg("-i").arg(uuid.replace('-', ""));
            }
            cmd.args(extra_options).arg(device);
            cmd.run_and_check()
        }
        FilesystemFormat::Swap => {
            let mut cmd = Dependency::Mkswap.cmd();
            if let Some(label) = label {
                cmd.arg("-L").arg(label);
            }
            if let Some(uuid) = uuid {
                cmd.arg("-U").arg(uuid);
            }
            cmd.args(extra_options).arg(device);
            cmd.run_and_check()
        }
        FilesystemFormat::None => bail!("cannot mkfs a filesystem declared as format \"none\""),
    }
    .with_context(|| format!("Failed to format '{}' as {format}", device.display()))
}

/// Updates label/uuid on an already-formatted ext2/3/4 device in place,
/// used by the `preserve, verify label/uuid compatibility` path of
/// §4.4.4 when the declared values differ only cosmetically and the
/// caller has decided they're compatible enough to just stamp.
pub fn tune_ext_labels(device: impl AsRef<Path>, label: Option<&str>, uuid: Option<&str>) -> Result<(), Error> {
    let mut cmd = Dependency::Tune2fs.cmd();
    if let Some(label) = label {
        cmd.arg("-L").arg(label);
    }
    if let Some(uuid) = uuid {
        cmd.arg("-U").arg(uuid);
    }
    cmd.arg(device.as_ref());
    cmd.run_and_check()
        .with_context(|| format!("Failed to tune2fs '{}'", device.as_ref().display()))
}
