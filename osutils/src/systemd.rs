use std::path::{Path, PathBuf};

use anyhow::{Context, Error};

use crate::files::{force_symlink, remove_any, write_atomic};

const UNIT_DIR: &str = "etc/systemd/system";
const NETWORKD_DIR: &str = "etc/systemd/network";
const PRESET_DIR: &str = "etc/systemd/system-preset";
const PRESET_FILE: &str = "20-ignition.preset";

pub fn unit_path(root: &Path, unit_name: &str) -> PathBuf {
    root.join(UNIT_DIR).join(unit_name)
}

pub fn networkd_unit_path(root: &Path, unit_name: &str) -> PathBuf {
    root.join(NETWORKD_DIR).join(unit_name)
}

pub fn dropin_path(root: &Path, unit_name: &str, dropin_name: &str) -> PathBuf {
    root.join(UNIT_DIR).join(format!("{unit_name}.d")).join(dropin_name)
}

pub fn networkd_dropin_path(root: &Path, unit_name: &str, dropin_name: &str) -> PathBuf {
    root.join(NETWORKD_DIR).join(format!("{unit_name}.d")).join(dropin_name)
}

/// Writes a unit file's full contents (§4.5's systemd_units handling).
/// `None` contents leaves an existing on-disk unit alone, used for units that
/// only carry dropins or enable/mask state.
pub fn write_unit(path: &Path, contents: &str) -> Result<(), Error> {
    write_atomic(path, contents.as_bytes(), 0o644).with_context(|| format!("Failed to write unit '{}'", path.display()))
}

pub fn write_dropin(path: &Path, contents: &str) -> Result<(), Error> {
    write_atomic(path, contents.as_bytes(), 0o644)
        .with_context(|| format!("Failed to write unit dropin '{}'", path.display()))
}

/// Masks a unit by pointing its path at `/dev/null`, the same trick systemd
/// itself uses for `systemctl mask` — done directly since systemd isn't
/// running in the stage root to do it for us.
pub fn mask_unit(path: &Path) -> Result<(), Error> {
    force_symlink("/dev/null", path).with_context(|| format!("Failed to mask unit at '{}'", path.display()))
}

/// Removes a mask symlink left by a previous run, so a later `enabled=true`
/// isn't shadowed by a stale `/dev/null` link.
pub fn unmask_unit(path: &Path) -> Result<(), Error> {
    let is_mask = std::fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
        && std::fs::read_link(path).map(|target| target == Path::new("/dev/null")).unwrap_or(false);

    if is_mask {
        remove_any(path)?;
    }
    Ok(())
}

/// Records an enable/disable decision in the Ignition-owned preset file
/// rather than creating `.wants/` symlinks directly, so a later
/// `systemctl preset-all` (or systemd's own first-boot preset pass) stays in
/// sync with what Ignition decided.
pub fn write_preset(root: &Path, lines: &[String]) -> Result<(), Error> {
    let path = root.join(PRESET_DIR).join(PRESET_FILE);
    let mut contents = lines.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    write_atomic(&path, contents.as_bytes(), 0o644)
        .with_context(|| format!("Failed to write preset file '{}'", path.display()))
}

pub fn preset_line(unit_name: &str, enabled: bool) -> String {
    if enabled {
        format!("enable {unit_name}")
    } else {
        format!("disable {unit_name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn preset_line_formats_enable_and_disable() {
        assert_eq!(preset_line("sshd.service", true), "enable sshd.service");
        assert_eq!(preset_line("sshd.service", false), "disable sshd.service");
    }

    #[test]
    fn mask_unit_points_at_dev_null() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foo.service");
        mask_unit(&path).unwrap();
        assert_eq!(std::fs::read_link(&path).unwrap(), Path::new("/dev/null"));
    }

    #[test]
    fn write_preset_joins_lines_with_newline() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(PRESET_DIR)).unwrap();
        write_preset(dir.path(), &["enable a.service".to_string(), "disable b.service".to_string()]).unwrap();
        let contents = std::fs::read_to_string(dir.path().join(PRESET_DIR).join(PRESET_FILE)).unwrap();
        assert_eq!(contents, "enable a.service\ndisable b.service\n");
    }
}
