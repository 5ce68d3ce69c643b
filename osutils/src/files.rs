use std::{
    fs::{self, File},
    io::Write,
    os::unix::fs::{symlink, PermissionsExt},
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};
use tempfile::NamedTempFile;

/// Creates all directories in a path if they don't exist.
pub fn create_dirs(path: impl AsRef<Path>) -> Result<(), Error> {
    fs::create_dir_all(path.as_ref())
        .with_context(|| format!("Failed to create directory '{}'", path.as_ref().display()))
}

/// Writes `contents` to `path` via a temp-file-then-rename so a reader never
/// observes a partially written file (§4.5's "atomic write-then-rename").
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8], mode: u32) -> Result<(), Error> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or_else(|| Path::new("/"));
    create_dirs(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in '{}'", parent.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("Failed to write to temporary file for '{}'", path.display()))?;
    tmp.flush().context("Failed to flush temporary file")?;
    fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set mode on '{}'", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to persist '{}'", path.display()))?;
    Ok(())
}

/// Creates a symlink at `path` pointing at `target`, removing any existing
/// node at `path` first (the caller decides whether that removal was
/// authorized via `overwrite`).
pub fn force_symlink(target: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    remove_any(path)?;
    if let Some(parent) = path.parent() {
        create_dirs(parent)?;
    }
    symlink(target.as_ref(), path)
        .with_context(|| format!("Failed to create symlink at '{}'", path.display()))
}

/// Creates a hard link at `path` pointing at `target`. Per §4.5, if `target`
/// is itself a symlink, the new link points at the symlink node, not
/// whatever it resolves to — so this must not follow symlinks.
pub fn force_hard_link(target: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    remove_any(path)?;
    if let Some(parent) = path.parent() {
        create_dirs(parent)?;
    }
    fs::hard_link(target.as_ref(), path)
        .with_context(|| format!("Failed to create hard link at '{}'", path.display()))
}

/// Removes whatever is at `path`, including a broken symlink (for which
/// `Path::exists` returns false, since it follows the link).
pub fn remove_any(path: &Path) -> Result<(), Error> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory '{}'", path.display())),
        Ok(_) => fs::remove_file(path)
            .with_context(|| format!("Failed to remove '{}'", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to stat '{}'", path.display())),
    }
}

/// Returns true if any component of `path` strictly between `root` and the
/// leaf is an existing symlink. Used to enforce §4.5's "refuse to cross an
/// existing symlink unless overwrite=true".
pub fn crosses_symlink(root: &Path, path: &Path) -> Result<bool, Error> {
    let relative = path
        .strip_prefix(root)
        .unwrap_or(path)
        .components()
        .collect::<Vec<_>>();

    let mut probe = root.to_path_buf();
    // The leaf itself is allowed to be a symlink (that's what overwrite
    // governs); only intermediate components must be real directories.
    for component in &relative[..relative.len().saturating_sub(1)] {
        probe.push(component);
        if let Ok(meta) = fs::symlink_metadata(&probe) {
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

pub fn open_create(path: impl AsRef<Path>) -> Result<File, Error> {
    if let Some(parent) = path.as_ref().parent() {
        create_dirs(parent)?;
    }
    File::create(path.as_ref())
        .with_context(|| format!("Failed to create file '{}'", path.as_ref().display()))
}

/// Joins a stage-root with a config-declared absolute path, the way every
/// files-stage write target is computed.
pub fn under_root(root: &Path, declared_path: &str) -> PathBuf {
    root.join(declared_path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_atomic_creates_parents_and_sets_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        write_atomic(&path, b"hello", 0o600).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn remove_any_is_idempotent_on_missing_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist");
        remove_any(&path).unwrap();
    }

    #[test]
    fn force_symlink_replaces_existing_node() {
        let dir = tempdir().unwrap();
        let target_a = dir.path().join("a");
        let target_b = dir.path().join("b");
        fs::write(&target_a, b"a").unwrap();
        fs::write(&target_b, b"b").unwrap();
        let link = dir.path().join("link");
        force_symlink(&target_a, &link).unwrap();
        force_symlink(&target_b, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), target_b);
    }

    #[test]
    fn crosses_symlink_detects_intermediate_symlink() {
        let dir = tempdir().unwrap();
        let real_dir = dir.path().join("real");
        fs::create_dir(&real_dir).unwrap();
        let link_dir = dir.path().join("linked");
        symlink(&real_dir, &link_dir).unwrap();
        let leaf = link_dir.join("file.txt");
        assert!(crosses_symlink(dir.path(), &leaf).unwrap());
    }

    #[test]
    fn under_root_joins_absolute_path() {
        let root = Path::new("/sysroot");
        assert_eq!(under_root(root, "/etc/hostname"), Path::new("/sysroot/etc/hostname"));
    }
}
