use std::path::Path;

use anyhow::{Context, Error};
use regex::Regex;

use crate::{dependencies::Dependency, exe::RunAndCheck};

/// A partition as it currently exists on disk, read back from `sgdisk -p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingPartition {
    pub number: u32,
    pub start_mib: u64,
    pub end_mib: u64,
    pub type_guid: String,
}

/// A partition to create, as computed by the disks stage's reconciliation
/// plan (§4.4.1).
#[derive(Debug, Clone)]
pub struct NewPartition {
    pub number: u32,
    pub start_mib: u64,
    /// `0` means "use the rest of the disk".
    pub size_mib: u64,
    pub type_guid: Option<String>,
    pub guid: Option<String>,
    pub label: Option<String>,
}

/// Reads the current GPT partition table of `device`.
///
/// `sgdisk -p` prints a fixed-width table; lines for numbered partitions
/// look like:
/// ```text
///    1            2048         1050623   512.0 MiB   8300  boot
/// ```
pub fn read_table(device: impl AsRef<Path>) -> Result<Vec<ExistingPartition>, Error> {
    let output = Dependency::Sgdisk
        .cmd()
        .arg("-p")
        .arg(device.as_ref())
        .output_and_check()
        .with_context(|| format!("Failed to read partition table of '{}'", device.as_ref().display()))?;

    parse_table(&output)
}

fn parse_table(output: &str) -> Result<Vec<ExistingPartition>, Error> {
    let row = Regex::new(r"^\s*(\d+)\s+(\d+)\s+(\d+)\s+\S+\s+\S+\s+([0-9A-Fa-f]{4})")
        .expect("static regex is valid");

    let mut partitions = Vec::new();
    let mut in_table = false;
    for line in output.lines() {
        if line.trim_start().starts_with("Number") {
            in_table = true;
            continue;
        }
        if !in_table {
            continue;
        }
        if let Some(caps) = row.captures(line) {
            let number: u32 = caps[1].parse().context("Failed to parse partition number")?;
            let start_sector: u64 = caps[2].parse().context("Failed to parse start sector")?;
            let end_sector: u64 = caps[3].parse().context("Failed to parse end sector")?;
            partitions.push(ExistingPartition {
                number,
                start_mib: sectors_to_mib(start_sector),
                end_mib: sectors_to_mib(end_sector),
                type_guid: caps[4].to_lowercase(),
            });
        }
    }
    Ok(partitions)
}

fn sectors_to_mib(sectors: u64) -> u64 {
    sectors * 512 / (1024 * 1024)
}

/// Creates one new partition per the plan, via `sgdisk --new`.
pub fn create(device: impl AsRef<Path>, partition: &NewPartition) -> Result<(), Error> {
    let end = if partition.size_mib == 0 {
        "0".to_string()
    } else {
        format!("+{}M", partition.size_mib)
    };

    let mut cmd = Dependency::Sgdisk.cmd();
    cmd.arg(format!(
        "--new={}:{}M:{}",
        partition.number, partition.start_mib, end
    ))
    .arg(device.as_ref());

    if let Some(type_guid) = &partition.type_guid {
        cmd.arg(format!("--typecode={}:{}", partition.number, type_guid));
    }
    if let Some(guid) = &partition.guid {
        cmd.arg(format!("--partition-guid={}:{}", partition.number, guid));
    }
    if let Some(label) = &partition.label {
        cmd.arg(format!("--change-name={}:{}", partition.number, label));
    }

    cmd.run_and_check().with_context(|| {
        format!(
            "Failed to create partition {} on '{}'",
            partition.number,
            device.as_ref().display()
        )
    })
}

/// Deletes the given partition number.
pub fn delete(device: impl AsRef<Path>, number: u32) -> Result<(), Error> {
    Dependency::Sgdisk
        .cmd()
        .arg(format!("--delete={number}"))
        .arg(device.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to delete partition {number} on '{}'",
                device.as_ref().display()
            )
        })
}

/// Destroys the whole partition table (disk-wide `wipeTable=true`).
pub fn clear_table(device: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Sgdisk
        .cmd()
        .arg("--zap-all")
        .arg(device.as_ref())
        .run_and_check()
        .with_context(|| format!("Failed to clear partition table on '{}'", device.as_ref().display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_OUTPUT: &str = "\
Disk /dev/sda: 20971520 sectors, 10.0 GiB
Sector size (logical): 512 bytes
Disk identifier (GUID): 11111111-1111-1111-1111-111111111111
Partition table holds up to 128 entries
Main partition table begins at sector 2 and ends at sector 33

Number  Start (sector)    End (sector)  Size       Code  Name
   1            2048         1050623   512.0 MiB   8300  boot
   2         1050624        20971486   9.5 GiB     8300  root
";

    #[test]
    fn parses_sample_sgdisk_output() {
        let partitions = parse_table(SAMPLE_OUTPUT).unwrap();
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].number, 1);
        assert_eq!(partitions[0].start_mib, 1);
        assert_eq!(partitions[0].type_guid, "8300");
        assert_eq!(partitions[1].number, 2);
    }

    #[test]
    fn parses_empty_table() {
        let output = "Disk /dev/sda: 20971520 sectors, 10.0 GiB\nNumber  Start (sector)    End (sector)  Size       Code  Name\n";
        assert!(parse_table(output).unwrap().is_empty());
    }
}
