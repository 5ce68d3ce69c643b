//! Depth-first validation (§4.1), accumulating a [`Report`] rather than
//! short-circuiting on the first problem, so a single run surfaces every
//! violation in a malformed config instead of forcing the user through a
//! fix-one-error-at-a-time loop.

use std::collections::HashSet;

use sysdefs::units::has_known_suffix;

use crate::primitives::{is_device_path, is_lowercase_uuid, is_normalized_absolute_path};
use crate::report::Report;

use super::{Config, Disk, Filesystem, Luks, Partition, Raid, Resource};

pub fn validate(config: &Config) -> Report {
    let mut report = Report::new();

    for (i, disk) in config.storage.disks.iter().enumerate() {
        validate_disk(&mut report, &format!("/storage/disks/{i}"), disk);
    }
    for (i, raid) in config.storage.raid.iter().enumerate() {
        validate_raid(&mut report, &format!("/storage/raid/{i}"), raid);
    }
    for (i, luks) in config.storage.luks.iter().enumerate() {
        validate_luks(&mut report, &format!("/storage/luks/{i}"), luks);
    }
    for (i, fs) in config.storage.filesystems.iter().enumerate() {
        validate_filesystem(&mut report, &format!("/storage/filesystems/{i}"), fs);
    }
    for (i, file) in config.storage.files.iter().enumerate() {
        let path = format!("/storage/files/{i}");
        validate_path(&mut report, &format!("{path}/path"), &file.node.path);
        if let Some(contents) = &file.contents {
            validate_resource(&mut report, &format!("{path}/contents"), contents);
        }
        for (j, append) in file.append.iter().enumerate() {
            validate_resource(&mut report, &format!("{path}/append/{j}"), append);
        }
    }
    for (i, dir) in config.storage.directories.iter().enumerate() {
        validate_path(
            &mut report,
            &format!("/storage/directories/{i}/path"),
            &dir.node.path,
        );
    }
    for (i, link) in config.storage.links.iter().enumerate() {
        let path = format!("/storage/links/{i}");
        validate_path(&mut report, &format!("{path}/path"), &link.node.path);
        if link.target.is_empty() {
            report.error(format!("{path}/target"), "link target must not be empty");
        }
    }

    for (i, unit) in config.systemd.units.iter().enumerate() {
        if !has_known_suffix(&unit.name) {
            report.error(
                format!("/systemd/units/{i}/name"),
                format!("'{}' has no recognized systemd unit suffix", unit.name),
            );
        }
    }
    for (i, unit) in config.networkd.units.iter().enumerate() {
        if unit.name.is_empty() {
            report.error(format!("/networkd/units/{i}/name"), "name must not be empty");
        }
    }

    for (i, ca) in config
        .ignition
        .security
        .tls
        .certificate_authorities
        .iter()
        .enumerate()
    {
        validate_resource(&mut report, &format!("/ignition/security/tls/certificateAuthorities/{i}"), ca);
    }

    report
}

fn validate_disk(report: &mut Report, path: &str, disk: &Disk) {
    if !is_device_path(&disk.device) {
        report.error(format!("{path}/device"), "device must be an absolute /dev/ path");
    }

    let mut seen_numbers: HashSet<u32> = HashSet::new();
    for (i, partition) in disk.partitions.iter().enumerate() {
        let ppath = format!("{path}/partitions/{i}");
        validate_partition(report, &ppath, partition);
        // number == 0 ("first available") is exempt from the uniqueness
        // check: it's resolved dynamically against the live table.
        if partition.number != 0 && !seen_numbers.insert(partition.number) {
            report.error(
                format!("{ppath}/number"),
                format!("partition number {} declared more than once", partition.number),
            );
        }
    }
}

fn validate_partition(report: &mut Report, path: &str, partition: &Partition) {
    if let Some(guid) = &partition.guid {
        if !is_lowercase_uuid(guid) {
            report.error(format!("{path}/guid"), "guid must be a lowercase RFC-4122 UUID");
        }
    }
    if partition.wipe_partition_entry && partition.resize {
        report.error(
            path.to_string(),
            "wipePartitionEntry and resize are mutually exclusive",
        );
    }
}

fn validate_raid(report: &mut Report, path: &str, raid: &Raid) {
    if raid.devices.is_empty() {
        report.error(format!("{path}/devices"), "raid array must reference at least one device");
    }
    let min = raid.level.min_devices();
    if raid.devices.len() < min {
        report.error(
            format!("{path}/devices"),
            format!(
                "raid level {} requires at least {min} device(s), found {}",
                raid.level,
                raid.devices.len()
            ),
        );
    }
}

fn validate_luks(report: &mut Report, path: &str, luks: &Luks) {
    if !is_device_path(&luks.device) {
        report.error(format!("{path}/device"), "device must be an absolute /dev/ path");
    }

    let has_key_file = luks.key_file.is_some();
    let has_clevis = luks.clevis.is_some();
    if !has_key_file && !has_clevis {
        report.error(
            path.to_string(),
            "luks volume requires either keyFile or clevis key material",
        );
    }

    if let Some(label) = &luks.label {
        if label.len() > 16 {
            report.error(
                format!("{path}/label"),
                format!("luks label '{label}' exceeds the 16-character cryptsetup limit"),
            );
        }
    }

    if let Some(uuid) = &luks.uuid {
        if !is_lowercase_uuid(uuid) {
            report.error(format!("{path}/uuid"), "uuid must be a lowercase RFC-4122 UUID");
        }
    }
}

fn validate_filesystem(report: &mut Report, path: &str, fs: &Filesystem) {
    if !is_device_path(&fs.device) {
        report.error(format!("{path}/device"), "device must be an absolute /dev/ path");
    }

    if let Some(label) = &fs.label {
        let limit = fs.format.label_limit();
        if label.len() > limit {
            report.error(
                format!("{path}/label"),
                format!(
                    "label '{label}' exceeds the {limit}-character limit for format {}",
                    fs.format
                ),
            );
        }
    }

    if let Some(uuid) = &fs.uuid {
        if !is_lowercase_uuid(uuid) {
            report.error(format!("{path}/uuid"), "uuid must be a lowercase RFC-4122 UUID");
        }
    }

    if let Some(mount_path) = &fs.path {
        validate_path(report, &format!("{path}/path"), mount_path);
    }
}

fn validate_path(report: &mut Report, path: &str, value: &str) {
    if !is_normalized_absolute_path(value) {
        report.error(
            path.to_string(),
            format!("'{value}' must be an absolute, normalized path"),
        );
    }
}

const ALLOWED_SCHEMES: &[&str] = &["data", "http", "https", "tftp", "s3", "gs"];

fn validate_resource(report: &mut Report, path: &str, resource: &Resource) {
    let scheme = resource.source.scheme();
    if !ALLOWED_SCHEMES.contains(&scheme) {
        report.error(
            format!("{path}/source"),
            format!("unsupported source scheme '{scheme}'"),
        );
    }

    if let Some(verification) = &resource.verification {
        if let Some(hash) = &verification.hash {
            if !hash.is_well_formed() {
                report.error(
                    format!("{path}/verification/hash"),
                    format!("'{hash}' is not a well-formed hash"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Directory, Node};

    #[test]
    fn rejects_non_absolute_paths() {
        let mut config = Config::default();
        config.ignition.version = "3.2.0".to_string();
        config.storage.directories.push(Directory {
            node: Node {
                path: "relative/path".to_string(),
                ..Default::default()
            },
            mode: None,
        });
        let report = validate(&config);
        assert!(report.is_fatal());
        assert!(report
            .errors()
            .any(|e| e.path == "/storage/directories/0/path"));
    }

    #[test]
    fn luks_without_key_material_is_fatal() {
        let mut config = Config::default();
        config.storage.luks.push(Luks {
            name: "root".to_string(),
            device: "/dev/sda3".to_string(),
            label: None,
            uuid: None,
            cipher: None,
            key_file: None,
            clevis: None,
            wipe_volume: false,
            options: vec![],
        });
        let report = validate(&config);
        assert!(report.is_fatal());
    }

    #[test]
    fn luks_label_over_16_chars_is_fatal() {
        let mut config = Config::default();
        config.storage.luks.push(Luks {
            name: "root".to_string(),
            device: "/dev/sda3".to_string(),
            label: Some("a-label-way-too-long".to_string()),
            uuid: None,
            cipher: None,
            key_file: None,
            clevis: Some(super::super::Clevis {
                tpm2: true,
                tang: vec![],
                threshold: None,
            }),
            wipe_volume: false,
            options: vec![],
        });
        let report = validate(&config);
        assert!(report
            .errors()
            .any(|e| e.path == "/storage/luks/0/label"));
    }

    #[test]
    fn raid1_requires_two_devices() {
        let mut config = Config::default();
        config.storage.raid.push(Raid {
            name: "md0".to_string(),
            level: sysdefs::raid::RaidLevel::Raid1,
            devices: vec!["/dev/sda".to_string()],
            spares: 0,
            wipe_volume: false,
        });
        let report = validate(&config);
        assert!(report.is_fatal());
    }

    #[test]
    fn well_formed_config_is_not_fatal() {
        let mut config = Config::default();
        config.storage.filesystems.push(Filesystem {
            device: "/dev/sda1".to_string(),
            format: sysdefs::filesystems::FilesystemFormat::Ext4,
            label: Some("root".to_string()),
            uuid: None,
            path: Some("/".to_string()),
            wipe_filesystem: true,
            mount_options: vec![],
            options: vec![],
        });
        assert!(!validate(&config).is_fatal());
    }
}
