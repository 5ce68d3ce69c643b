use std::path::Path;

use log::info;

use ignition_api::config::{Group, User};
use osutils::useradd::{self, GroupArgs, UserArgs};

use crate::error::IgnitionError;

/// Materializes declared groups, then users (§4.5's "passwd" section), via
/// useradd/usermod/groupadd — never by hand-editing `/etc/passwd` directly.
/// Groups run first since a user's `primaryGroup`/`groups` may name one.
pub fn apply(root: &Path, groups: &[Group], users: &[User]) -> Result<(), IgnitionError> {
    for group in groups {
        if !group.should_exist() {
            continue;
        }
        ensure_group(root, group)?;
    }
    for user in users {
        if !user.should_exist() {
            continue;
        }
        ensure_user(root, user)?;
    }
    Ok(())
}

fn ensure_group(root: &Path, group: &Group) -> Result<(), IgnitionError> {
    useradd::ensure_group(
        root,
        &GroupArgs {
            name: group.name.clone(),
            gid: group.gid,
            system: group.system,
        },
    )
    .map_err(|e| crate::error::wrap_tool_failure("groupadd", e))?;

    if let Some(hash) = &group.password_hash {
        useradd::set_group_password_hash(&group.name, hash).map_err(|e| crate::error::wrap_tool_failure("gpasswd", e))?;
    }
    info!("reconciled group '{}'", group.name);
    Ok(())
}

fn ensure_user(root: &Path, user: &User) -> Result<(), IgnitionError> {
    let args = UserArgs {
        name: user.name.clone(),
        uid: user.uid,
        gecos: user.gecos.clone(),
        home_dir: user.home_dir.clone(),
        no_create_home: user.no_create_home,
        primary_group: user.primary_group.clone(),
        groups: user.groups.clone(),
        no_user_group: user.no_user_group,
        system: user.system,
        no_log_init: user.no_log_init,
        shell: user.shell.clone(),
    };
    useradd::ensure_user(root, &args).map_err(|e| crate::error::wrap_tool_failure("useradd", e))?;

    if let Some(hash) = &user.password_hash {
        useradd::set_password_hash(root, &user.name, hash).map_err(|e| crate::error::wrap_tool_failure("usermod", e))?;
    }

    if !user.ssh_authorized_keys.is_empty() {
        let home_dir = user
            .home_dir
            .clone()
            .unwrap_or_else(|| format!("/home/{}", user.name));
        let home = osutils::files::under_root(root, &home_dir);
        useradd::write_authorized_keys(&home, &user.ssh_authorized_keys)
            .map_err(|e| crate::error::wrap_tool_failure("authorized_keys", e))?;
    }

    info!("reconciled user '{}'", user.name);
    Ok(())
}
