use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};

use crate::{dependencies::Dependency, exe::RunAndCheck, files::write_atomic};

/// Arguments for creating or modifying a Linux user account (§4.5's "users
/// are materialized via useradd/usermod, never by hand-editing /etc/passwd").
#[derive(Debug, Clone, Default)]
pub struct UserArgs {
    pub name: String,
    pub uid: Option<u32>,
    pub gecos: Option<String>,
    pub home_dir: Option<String>,
    pub no_create_home: bool,
    pub primary_group: Option<String>,
    pub groups: Vec<String>,
    pub no_user_group: bool,
    pub system: bool,
    pub no_log_init: bool,
    pub shell: Option<String>,
}

/// Arguments for creating a group via groupadd.
#[derive(Debug, Clone, Default)]
pub struct GroupArgs {
    pub name: String,
    pub gid: Option<u32>,
    pub system: bool,
}

/// Checks `<root>/etc/passwd`, the node being provisioned, never the host's.
pub fn user_exists(root: &Path, name: &str) -> bool {
    fs::read_to_string(root.join("etc/passwd"))
        .map(|passwd| passwd.lines().any(|line| line.split(':').next() == Some(name)))
        .unwrap_or(false)
}

/// Checks `<root>/etc/group`, the node being provisioned, never the host's.
pub fn group_exists(root: &Path, name: &str) -> bool {
    fs::read_to_string(root.join("etc/group"))
        .map(|group| group.lines().any(|line| line.split(':').next() == Some(name)))
        .unwrap_or(false)
}

/// Creates a user via useradd if it doesn't already exist; otherwise adjusts
/// it in place via usermod, per §4.5's "users/groups are reconciled, not
/// blindly recreated". Both tools are invoked with `--root <root>` (§4.5) so
/// they operate on the stage root being provisioned, not the host running
/// this process.
pub fn ensure_user(root: &Path, args: &UserArgs) -> Result<(), Error> {
    if user_exists(root, &args.name) {
        return modify_user(root, args);
    }

    let mut cmd = Dependency::Useradd.cmd();
    cmd.arg("--root").arg(root);
    if let Some(uid) = args.uid {
        cmd.arg("-u").arg(uid.to_string());
    }
    if let Some(gecos) = &args.gecos {
        cmd.arg("-c").arg(gecos);
    }
    if let Some(home) = &args.home_dir {
        cmd.arg("-d").arg(home);
    }
    if args.no_create_home {
        cmd.arg("-M");
    } else {
        cmd.arg("-m");
    }
    if let Some(group) = &args.primary_group {
        cmd.arg("-g").arg(group);
    }
    if !args.groups.is_empty() {
        cmd.arg("-G").arg(args.groups.join(","));
    }
    if args.no_user_group {
        cmd.arg("-N");
    }
    if args.system {
        cmd.arg("-r");
    }
    if args.no_log_init {
        cmd.arg("-l");
    }
    if let Some(shell) = &args.shell {
        cmd.arg("-s").arg(shell);
    }
    cmd.arg(&args.name);

    cmd.run_and_check()
        .with_context(|| format!("Failed to add user '{}'", args.name))
}

fn modify_user(root: &Path, args: &UserArgs) -> Result<(), Error> {
    let mut cmd = Dependency::Usermod.cmd();
    cmd.arg("--root").arg(root);
    if let Some(uid) = args.uid {
        cmd.arg("-u").arg(uid.to_string());
    }
    if let Some(gecos) = &args.gecos {
        cmd.arg("-c").arg(gecos);
    }
    if let Some(home) = &args.home_dir {
        cmd.arg("-d").arg(home);
    }
    if let Some(group) = &args.primary_group {
        cmd.arg("-g").arg(group);
    }
    if !args.groups.is_empty() {
        cmd.arg("-G").arg(args.groups.join(","));
    }
    if let Some(shell) = &args.shell {
        cmd.arg("-s").arg(shell);
    }
    cmd.arg(&args.name);

    cmd.run_and_check()
        .with_context(|| format!("Failed to modify user '{}'", args.name))
}

/// Sets a user's password hash directly, bypassing interactive passwd(1).
pub fn set_password_hash(root: &Path, name: &str, hash: &str) -> Result<(), Error> {
    Dependency::Usermod
        .cmd()
        .arg("--root")
        .arg(root)
        .arg("-p")
        .arg(hash)
        .arg(name)
        .run_and_check()
        .with_context(|| format!("Failed to set password hash for '{name}'"))
}

pub fn ensure_group(root: &Path, args: &GroupArgs) -> Result<(), Error> {
    if group_exists(root, &args.name) {
        return Ok(());
    }

    let mut cmd = Dependency::Groupadd.cmd();
    cmd.arg("--root").arg(root);
    if let Some(gid) = args.gid {
        cmd.arg("-g").arg(gid.to_string());
    }
    if args.system {
        cmd.arg("-r");
    }
    cmd.arg(&args.name);

    cmd.run_and_check()
        .with_context(|| format!("Failed to add group '{}'", args.name))
}

pub fn set_group_password_hash(name: &str, hash: &str) -> Result<(), Error> {
    Dependency::Gpasswd
        .cmd()
        .arg(name)
        .arg("-P")
        .arg(hash)
        .run_and_check()
        .with_context(|| format!("Failed to set password hash for group '{name}'"))
}

/// Writes an SSH authorized key block for `name` under their `.ssh` dir
/// (§4.5's ssh_authorized_keys handling), atomically. Written as a drop-in
/// under `authorized_keys.d/` rather than the flat `authorized_keys` file, so
/// it composes with keys from other sources instead of clobbering them.
pub fn write_authorized_keys(home_dir: &Path, keys: &[String]) -> Result<PathBuf, Error> {
    let path = home_dir.join(".ssh").join("authorized_keys.d").join("ignition");

    let mut contents = keys.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    write_atomic(&path, contents.as_bytes(), 0o600).context("Failed to write authorized_keys")?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_authorized_keys_joins_with_newlines() {
        let dir = tempdir().unwrap();
        let keys = vec!["ssh-ed25519 AAAA... a@b".to_string(), "ssh-ed25519 BBBB... c@d".to_string()];
        let path = write_authorized_keys(dir.path(), &keys).unwrap();
        assert!(path.ends_with(".ssh/authorized_keys.d/ignition"));
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents, "ssh-ed25519 AAAA... a@b\nssh-ed25519 BBBB... c@d\n");
    }

    #[test]
    fn write_authorized_keys_empty_list_writes_empty_file() {
        let dir = tempdir().unwrap();
        let path = write_authorized_keys(dir.path(), &[]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }
}
