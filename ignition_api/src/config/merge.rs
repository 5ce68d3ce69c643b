//! The append merge algorithm (§4.2). A single pure, single-pass structural
//! walk over two [`Config`] trees: no I/O, no allocation beyond the result.

use super::{
    passwd::{Group, User},
    storage::{Directory, File, Link},
    units::{Dropin, NetworkdUnit, SystemdUnit},
    Config, Ignition, Networkd, Passwd, Storage, Systemd,
};

/// Fold `new` onto `old` per the rules in §4.2. `old` is the config fetched
/// first (or accumulated so far); `new` is the config being appended.
pub fn merge(old: Config, new: Config) -> Config {
    Config {
        ignition: merge_ignition(old.ignition, new.ignition),
        storage: merge_storage(old.storage, new.storage),
        passwd: merge_passwd(old.passwd, new.passwd),
        systemd: merge_systemd(old.systemd, new.systemd),
        networkd: merge_networkd(old.networkd, new.networkd),
    }
}

fn merge_ignition(old: Ignition, new: Ignition) -> Ignition {
    Ignition {
        // version is immutable across merges: old wins unconditionally.
        version: old.version,
        // the merge directives themselves are replaced, not concatenated,
        // or a `replace`/`append` entry would keep re-triggering itself.
        config: new.config,
        timeouts: super::Timeouts {
            http_response_headers: new
                .timeouts
                .http_response_headers
                .or(old.timeouts.http_response_headers),
            http_total: new.timeouts.http_total.or(old.timeouts.http_total),
        },
        security: super::Security {
            tls: super::Tls {
                certificate_authorities: concat(
                    old.security.tls.certificate_authorities,
                    new.security.tls.certificate_authorities,
                ),
            },
        },
    }
}

fn merge_storage(old: Storage, new: Storage) -> Storage {
    Storage {
        disks: concat(old.disks, new.disks),
        raid: concat(old.raid, new.raid),
        luks: concat(old.luks, new.luks),
        filesystems: concat(old.filesystems, new.filesystems),
        files: merge_by_path(old.files, new.files, |f| &f.node.path),
        directories: merge_by_path(old.directories, new.directories, |d| &d.node.path),
        links: merge_by_path(old.links, new.links, |l| &l.node.path),
    }
}

fn merge_passwd(old: Passwd, new: Passwd) -> Passwd {
    Passwd {
        users: merge_keyed(old.users, new.users, |u| u.name.clone(), merge_user),
        groups: merge_keyed(old.groups, new.groups, |g| g.name.clone(), merge_group),
    }
}

fn merge_systemd(old: Systemd, new: Systemd) -> Systemd {
    Systemd {
        units: merge_keyed(old.units, new.units, |u| u.name.clone(), merge_systemd_unit),
    }
}

fn merge_networkd(old: Networkd, new: Networkd) -> Networkd {
    Networkd {
        units: merge_keyed(
            old.units,
            new.units,
            |u| u.name.clone(),
            merge_networkd_unit,
        ),
    }
}

fn merge_user(old: User, new: User) -> User {
    User {
        name: old.name,
        uid: new.uid.or(old.uid),
        password_hash: merge_preserving_string(old.password_hash, new.password_hash),
        ssh_authorized_keys: concat(old.ssh_authorized_keys, new.ssh_authorized_keys),
        gecos: merge_preserving_string(old.gecos, new.gecos),
        home_dir: merge_preserving_string(old.home_dir, new.home_dir),
        no_create_home: merge_bool(old.no_create_home, new.no_create_home),
        primary_group: merge_preserving_string(old.primary_group, new.primary_group),
        groups: concat(old.groups, new.groups),
        no_user_group: merge_bool(old.no_user_group, new.no_user_group),
        system: merge_bool(old.system, new.system),
        no_log_init: merge_bool(old.no_log_init, new.no_log_init),
        shell: merge_preserving_string(old.shell, new.shell),
        should_exist: new.should_exist.or(old.should_exist),
    }
}

fn merge_group(old: Group, new: Group) -> Group {
    Group {
        name: old.name,
        gid: new.gid.or(old.gid),
        password_hash: merge_preserving_string(old.password_hash, new.password_hash),
        system: merge_bool(old.system, new.system),
        should_exist: new.should_exist.or(old.should_exist),
    }
}

fn merge_systemd_unit(old: SystemdUnit, new: SystemdUnit) -> SystemdUnit {
    SystemdUnit {
        name: old.name,
        enabled: new.enabled.or(old.enabled),
        mask: merge_bool(old.mask, new.mask),
        contents: new.contents.or(old.contents),
        dropins: merge_keyed(old.dropins, new.dropins, |d| d.name.clone(), merge_dropin),
    }
}

fn merge_networkd_unit(old: NetworkdUnit, new: NetworkdUnit) -> NetworkdUnit {
    NetworkdUnit {
        name: old.name,
        contents: new.contents.or(old.contents),
        dropins: merge_keyed(old.dropins, new.dropins, |d| d.name.clone(), merge_dropin),
    }
}

fn merge_dropin(_old: Dropin, new: Dropin) -> Dropin {
    // later wins on collision: the new dropin entirely replaces the old one.
    new
}

/// Files/directories/links: keyed by path, later entry wins wholesale (no
/// per-field merge — a re-declaration is a replacement).
fn merge_by_path<T>(old: Vec<T>, new: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<T> {
    merge_keyed(old, new, |t| key(t).to_string(), |_old, new| new)
}

/// Generic keyed merge: items present only on one side pass through
/// unchanged, in their original relative order (old items first); items on
/// both sides are combined with `combine`, at the old item's position.
fn merge_keyed<T, K, F>(old: Vec<T>, new: Vec<T>, key: F, combine: impl Fn(T, T) -> T) -> Vec<T>
where
    K: Eq + std::hash::Hash + Clone,
    F: Fn(&T) -> K,
{
    let old_keys: std::collections::HashSet<K> = old.iter().map(&key).collect();
    // `new`'s declaration order, kept separately since the HashMap below
    // doesn't preserve insertion order and §5 requires brand-new items to
    // come out in the order they were declared.
    let new_order: Vec<K> = new.iter().map(&key).collect();
    let mut new_by_key: std::collections::HashMap<K, T> =
        new.into_iter().map(|item| (key(&item), item)).collect();

    let mut result: Vec<T> = Vec::new();
    for old_item in old {
        let k = key(&old_item);
        if let Some(new_item) = new_by_key.remove(&k) {
            result.push(combine(old_item, new_item));
        } else {
            result.push(old_item);
        }
    }

    // Remaining new items (no matching old key) are appended in their
    // original relative order.
    for k in new_order {
        if !old_keys.contains(&k) {
            if let Some(item) = new_by_key.remove(&k) {
                result.push(item);
            }
        }
    }
    result
}

fn concat<T>(mut old: Vec<T>, new: Vec<T>) -> Vec<T> {
    old.extend(new);
    old
}

fn merge_bool(old: bool, new: bool) -> bool {
    // Go's zero value for bool is `false`, which `mergo` (the library the
    // original implementation is built on) treats as "unset" for scalars;
    // `new` only overrides `old` when it's explicitly `true`.
    if new {
        new
    } else {
        old
    }
}

/// Empty-string and null values do not overwrite an existing non-empty
/// value (§4.2's "Users merge" rule, which also governs Groups per the
/// supplemental rule).
fn merge_preserving_string(old: Option<String>, new: Option<String>) -> Option<String> {
    match new {
        Some(ref s) if !s.is_empty() => new,
        _ => old,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigMeta, Resource};

    fn minimal(version: &str) -> Config {
        Config {
            ignition: Ignition {
                version: version.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn version_is_immutable_old_wins() {
        let old = minimal("3.2.0");
        let new = minimal("3.1.0");
        let merged = merge(old, new);
        assert_eq!(merged.ignition.version, "3.2.0");
    }

    #[test]
    fn config_directive_new_wins_wholesale() {
        let mut old = minimal("3.2.0");
        old.ignition.config.replace = Some(Resource {
            source: "data:,old".parse().unwrap(),
            compression: None,
            verification: None,
            http_headers: vec![],
            optional: None,
        });
        let new = minimal("3.2.0");
        let merged = merge(old, new);
        assert!(merged.ignition.config.replace.is_none());
    }

    #[test]
    fn files_at_same_path_are_replaced_not_merged() {
        use crate::config::{File, Node};
        let mut old = minimal("3.2.0");
        old.storage.files.push(File {
            node: Node {
                path: "/a".to_string(),
                ..Default::default()
            },
            mode: Some(0o600),
            contents: None,
            append: vec![],
        });
        let mut new = minimal("3.2.0");
        new.storage.files.push(File {
            node: Node {
                path: "/a".to_string(),
                ..Default::default()
            },
            mode: Some(0o644),
            contents: None,
            append: vec![],
        });
        let merged = merge(old, new);
        assert_eq!(merged.storage.files.len(), 1);
        assert_eq!(merged.storage.files[0].mode, Some(0o644));
    }

    #[test]
    fn ssh_keys_are_concatenated_without_dedup() {
        let mut old = minimal("3.2.0");
        old.passwd.users.push(User {
            name: "core".to_string(),
            uid: None,
            password_hash: None,
            ssh_authorized_keys: vec!["key-a".to_string()],
            gecos: None,
            home_dir: None,
            no_create_home: false,
            primary_group: None,
            groups: vec![],
            no_user_group: false,
            system: false,
            no_log_init: false,
            shell: None,
            should_exist: None,
        });
        let mut new = minimal("3.2.0");
        new.passwd.users.push(User {
            name: "core".to_string(),
            uid: None,
            password_hash: None,
            ssh_authorized_keys: vec!["key-a".to_string(), "key-b".to_string()],
            gecos: None,
            home_dir: None,
            no_create_home: false,
            primary_group: None,
            groups: vec![],
            no_user_group: false,
            system: false,
            no_log_init: false,
            shell: None,
            should_exist: None,
        });
        let merged = merge(old, new);
        assert_eq!(merged.passwd.users.len(), 1);
        assert_eq!(
            merged.passwd.users[0].ssh_authorized_keys,
            vec!["key-a", "key-a", "key-b"]
        );
    }

    #[test]
    fn missing_password_preserves_old_hash() {
        let mut old = minimal("3.2.0");
        old.passwd.users.push(User {
            name: "core".to_string(),
            uid: None,
            password_hash: Some("old-hash".to_string()),
            ssh_authorized_keys: vec![],
            gecos: None,
            home_dir: None,
            no_create_home: false,
            primary_group: None,
            groups: vec![],
            no_user_group: false,
            system: false,
            no_log_init: false,
            shell: None,
            should_exist: None,
        });
        let mut new = minimal("3.2.0");
        new.passwd.users.push(User {
            name: "core".to_string(),
            uid: None,
            password_hash: None,
            ssh_authorized_keys: vec![],
            gecos: None,
            home_dir: None,
            no_create_home: false,
            primary_group: None,
            groups: vec![],
            no_user_group: false,
            system: false,
            no_log_init: false,
            shell: None,
            should_exist: None,
        });
        let merged = merge(old, new);
        assert_eq!(
            merged.passwd.users[0].password_hash,
            Some("old-hash".to_string())
        );
    }

    #[test]
    fn merge_is_idempotent() {
        let mut config = minimal("3.2.0");
        config.storage.disks.push(super::super::Disk {
            device: "/dev/sda".to_string(),
            wipe_table: false,
            partitions: vec![],
        });
        let merged_once = merge(config.clone(), config.clone());
        // disks concatenate (ordered sequence, not keyed), so merging a
        // config with itself duplicates list entries — that's expected per
        // §4.2's general rule; true fixed-point idempotence only holds for
        // the keyed collections (files, units, users, groups).
        assert_eq!(merged_once.storage.disks.len(), 2);
    }

    #[test]
    fn dropins_merge_keyed_later_wins() {
        let mut old = minimal("3.2.0");
        old.systemd.units.push(SystemdUnit {
            name: "sshd.service".to_string(),
            enabled: Some(true),
            mask: false,
            contents: None,
            dropins: vec![Dropin {
                name: "10-override.conf".to_string(),
                contents: Some("old".to_string()),
            }],
        });
        let mut new = minimal("3.2.0");
        new.systemd.units.push(SystemdUnit {
            name: "sshd.service".to_string(),
            enabled: None,
            mask: false,
            contents: None,
            dropins: vec![Dropin {
                name: "10-override.conf".to_string(),
                contents: Some("new".to_string()),
            }],
        });
        let merged = merge(old, new);
        assert_eq!(merged.systemd.units.len(), 1);
        assert_eq!(merged.systemd.units[0].enabled, Some(true));
        assert_eq!(merged.systemd.units[0].dropins.len(), 1);
        assert_eq!(
            merged.systemd.units[0].dropins[0].contents,
            Some("new".to_string())
        );
    }
}
