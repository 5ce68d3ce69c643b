use std::path::Path;

use ignition_api::config::Filesystem;
use osutils::mount;

use crate::error::IgnitionError;

/// Mounts every filesystem that declares a `path`, under `root`, shallowest
/// first so a nested mount point already exists as a real directory by the
/// time its own mount happens (§4.4.5).
pub fn mount_all(filesystems: &[Filesystem], root: &Path) -> Result<(), IgnitionError> {
    for fs in sorted_by_depth(filesystems) {
        let Some(path) = &fs.path else { continue };
        let target = osutils::files::under_root(root, path);
        mount::mount(&fs.device, &target, Some(&fs.format.to_string()))
            .map_err(|e| crate::error::wrap_tool_failure("mount", e))?;
    }
    Ok(())
}

/// Unmounts in reverse (deepest-first) order, the way the files stage does
/// on completion.
pub fn unmount_all(filesystems: &[Filesystem], root: &Path) -> Result<(), IgnitionError> {
    for fs in sorted_by_depth(filesystems).into_iter().rev() {
        let Some(path) = &fs.path else { continue };
        let target = osutils::files::under_root(root, path);
        mount::umount(&target).map_err(|e| crate::error::wrap_tool_failure("umount", e))?;
    }
    Ok(())
}

fn sorted_by_depth(filesystems: &[Filesystem]) -> Vec<&Filesystem> {
    let mut with_paths: Vec<&Filesystem> = filesystems.iter().filter(|fs| fs.path.is_some()).collect();
    with_paths.sort_by_key(|fs| fs.path.as_ref().map(|p| p.matches('/').count()).unwrap_or(0));
    with_paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysdefs::filesystems::FilesystemFormat;

    fn fs(device: &str, path: Option<&str>) -> Filesystem {
        Filesystem {
            device: device.to_string(),
            format: FilesystemFormat::Ext4,
            label: None,
            uuid: None,
            path: path.map(str::to_string),
            wipe_filesystem: false,
            mount_options: vec![],
            options: vec![],
        }
    }

    #[test]
    fn sorts_parents_before_children() {
        let filesystems = vec![fs("/dev/sda2", Some("/var/lib")), fs("/dev/sda1", Some("/"))];
        let sorted = sorted_by_depth(&filesystems);
        assert_eq!(sorted[0].device, "/dev/sda1");
        assert_eq!(sorted[1].device, "/dev/sda2");
    }

    #[test]
    fn swap_without_path_is_excluded() {
        let filesystems = vec![fs("/dev/sda3", None)];
        assert!(sorted_by_depth(&filesystems).is_empty());
    }
}
