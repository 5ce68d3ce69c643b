use std::path::Path;

use log::{info, warn};

use ignition_api::config::Filesystem;
use osutils::{blkid, mkfs};
use sysdefs::filesystems::FilesystemFormat;

use crate::error::IgnitionError;

/// Reconciles one declared filesystem against the signature probed off the
/// device (§4.4.4).
pub fn reconcile(fs: &Filesystem) -> Result<(), IgnitionError> {
    let device = Path::new(&fs.device);
    let signature = blkid::probe(device).map_err(|e| crate::error::wrap_tool_failure("blkid", e))?;
    let declared_format = fs.format.to_string();

    match &signature.format {
        None => return format(fs),
        Some(existing_format) if existing_format == &declared_format => {
            if fs.wipe_filesystem {
                return format(fs);
            }
            let label_ok = fs
                .label
                .as_deref()
                .map(|label| signature.label.as_deref() == Some(label))
                .unwrap_or(true);
            let uuid_ok = fs
                .uuid
                .as_deref()
                .map(|uuid| signature.uuid.as_deref() == Some(uuid))
                .unwrap_or(true);
            if !label_ok || !uuid_ok {
                return Err(IgnitionError::FilesystemMismatch { device: fs.device.clone() });
            }
            info!("preserving existing {} filesystem on '{}'", declared_format, fs.device);
            Ok(())
        }
        Some(_) if fs.wipe_filesystem => format(fs),
        Some(existing_format) if fs.format.has_weak_probe() => {
            // §9's open question: VFAT's probe is known-ambiguous, so a
            // `wipeFilesystem=false` refusal here can't be trusted. We
            // preserve the source's documented (mis)behavior rather than
            // widen it: proceed with mkfs instead of refusing.
            warn!(
                "'{}' probed as '{existing_format}' but format {} has a weak probe; formatting anyway per documented VFAT limitation",
                fs.device, fs.format
            );
            format(fs)
        }
        Some(_) => Err(IgnitionError::FilesystemMismatch { device: fs.device.clone() }),
    }
}

fn format(fs: &Filesystem) -> Result<(), IgnitionError> {
    info!("formatting '{}' as {}", fs.device, fs.format);
    mkfs::run(
        &fs.device,
        fs.format,
        fs.label.as_deref(),
        fs.uuid.as_deref(),
        &fs.options,
    )
    .map_err(|e| crate::error::wrap_tool_failure(mkfs_tool_name(fs.format), e))
}

fn mkfs_tool_name(format: FilesystemFormat) -> &'static str {
    match format {
        FilesystemFormat::Ext2 | FilesystemFormat::Ext3 | FilesystemFormat::Ext4 => "mke2fs",
        FilesystemFormat::Xfs => "mkfs.xfs",
        FilesystemFormat::Btrfs => "mkfs.btrfs",
        FilesystemFormat::Vfat => "mkfs.vfat",
        FilesystemFormat::Swap => "mkswap",
        FilesystemFormat::None => "none",
    }
}
