use std::path::Path;

use log::{info, warn};

use ignition_api::config::{Directory, File, Link, Node};
use osutils::files as fs_utils;

use crate::error::IgnitionError;
use crate::fetch::{self, Deadlines};

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

pub fn write_directory(root: &Path, dir: &Directory) -> Result<(), IgnitionError> {
    let target = resolve_target(root, &dir.node)?;
    fs_utils::create_dirs(&target).map_err(|e| crate::error::wrap_tool_failure("mkdir", e))?;
    set_mode(&target, dir.mode.unwrap_or(DEFAULT_DIR_MODE))?;
    set_ownership(root, &target, &dir.node)?;
    info!("created directory '{}'", target.display());
    Ok(())
}

pub fn write_file(root: &Path, file: &File, deadlines: Deadlines, ca_bundle: Option<&[u8]>) -> Result<(), IgnitionError> {
    let target = resolve_target(root, &file.node)?;

    let mut contents = Vec::new();
    if let Some(resource) = &file.contents {
        contents = fetch::fetch(resource, deadlines, ca_bundle)
            .map_err(|source| crate::error::wrap_fetch_failure(resource.source.to_string(), source))?;
    }
    for append in &file.append {
        let chunk = fetch::fetch(append, deadlines, ca_bundle)
            .map_err(|source| crate::error::wrap_fetch_failure(append.source.to_string(), source))?;
        contents.extend(chunk);
    }

    fs_utils::write_atomic(&target, &contents, file.mode.unwrap_or(DEFAULT_FILE_MODE))
        .map_err(|e| crate::error::wrap_tool_failure("write-file", e))?;
    set_ownership(root, &target, &file.node)?;
    info!("wrote file '{}' ({} bytes)", target.display(), contents.len());
    Ok(())
}

pub fn write_link(root: &Path, link: &Link) -> Result<(), IgnitionError> {
    let target = resolve_target(root, &link.node)?;

    if link.hard {
        let link_target = osutils::files::under_root(root, &link.target);
        fs_utils::force_hard_link(&link_target, &target).map_err(|e| crate::error::wrap_tool_failure("link", e))?;
    } else {
        fs_utils::force_symlink(&link.target, &target).map_err(|e| crate::error::wrap_tool_failure("symlink", e))?;
    }
    info!("created {} link '{}' -> '{}'", if link.hard { "hard" } else { "sym" }, target.display(), link.target);
    Ok(())
}

/// Canonicalizes `node.path` against `root`, refusing to write through an
/// existing symlink unless `overwrite=true` (§4.5). On an authorized
/// overwrite, the existing node (including a broken symlink) is removed
/// first so the caller always starts from a clean slate.
fn resolve_target(root: &Path, node: &Node) -> Result<std::path::PathBuf, IgnitionError> {
    let target = fs_utils::under_root(root, &node.path);
    let overwrite = node.overwrite.unwrap_or(false);

    let crosses = fs_utils::crosses_symlink(root, &target).map_err(|e| crate::error::wrap_tool_failure("path-safety", e))?;
    if crosses && !overwrite {
        return Err(crate::error::wrap_tool_failure(
            "path-safety",
            anyhow::anyhow!("'{}' crosses an existing symlink and overwrite is not set", node.path),
        ));
    }
    if overwrite {
        fs_utils::remove_any(&target).map_err(|e| crate::error::wrap_tool_failure("path-safety", e))?;
    }

    Ok(target)
}

fn set_mode(path: &Path, mode: u32) -> Result<(), IgnitionError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|source| IgnitionError::IoError {
        path: path.to_path_buf(),
        op: "set mode".to_string(),
        source,
    })
}

/// Applies declared numeric uid/gid. Name-based ownership depends on the
/// user/group already existing, which the identity stage guarantees runs
/// first (§5's "users/groups before unit writes that reference ownership") —
/// resolved against `<root>/etc/passwd`/`<root>/etc/group`, the stage root
/// being provisioned, not the host's own.
fn set_ownership(root: &Path, path: &Path, node: &Node) -> Result<(), IgnitionError> {
    let uid = node.user.id;
    let gid = node.group.id;
    if uid.is_none() && gid.is_none() && node.user.name.is_none() && node.group.name.is_none() {
        return Ok(());
    }

    let resolved_uid = match uid {
        Some(id) => Some(id),
        None => node.user.name.as_deref().and_then(|name| resolve_uid_by_name(root, name)),
    };
    let resolved_gid = match gid {
        Some(id) => Some(id),
        None => node.group.name.as_deref().and_then(|name| resolve_gid_by_name(root, name)),
    };

    if resolved_uid.is_none() && node.user.name.is_some() {
        warn!("could not resolve user '{}' for '{}'", node.user.name.as_deref().unwrap_or(""), path.display());
    }

    nix_chown(path, resolved_uid, resolved_gid)
}

fn resolve_uid_by_name(root: &Path, name: &str) -> Option<u32> {
    std::fs::read_to_string(root.join("etc/passwd")).ok().and_then(|passwd| {
        passwd.lines().find_map(|line| {
            let mut fields = line.split(':');
            if fields.next() == Some(name) {
                fields.nth(1).and_then(|uid| uid.parse().ok())
            } else {
                None
            }
        })
    })
}

fn resolve_gid_by_name(root: &Path, name: &str) -> Option<u32> {
    std::fs::read_to_string(root.join("etc/group")).ok().and_then(|group| {
        group.lines().find_map(|line| {
            let mut fields = line.split(':');
            if fields.next() == Some(name) {
                fields.nth(1).and_then(|gid| gid.parse().ok())
            } else {
                None
            }
        })
    })
}

fn nix_chown(path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), IgnitionError> {
    use std::ffi::CString;
    let c_path = CString::new(path.as_os_str().to_string_lossy().as_bytes())
        .map_err(|e| crate::error::wrap_tool_failure("chown", anyhow::Error::from(e)))?;

    // -1 (the libc sentinel) leaves that half of the ownership unchanged.
    let uid = uid.map(|v| v as i32).unwrap_or(-1);
    let gid = gid.map(|v| v as i32).unwrap_or(-1);

    let result = unsafe { libc::chown(c_path.as_ptr(), uid as libc::uid_t, gid as libc::gid_t) };
    if result != 0 {
        return Err(IgnitionError::IoError {
            path: path.to_path_buf(),
            op: "chown".to_string(),
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}
