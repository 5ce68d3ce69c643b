use std::collections::HashSet;
use std::path::Path;

use log::info;

use ignition_api::config::{Disk, Partition};
use osutils::sgdisk::{self, ExistingPartition, NewPartition};

use crate::error::IgnitionError;

/// Reconciles one declared disk's partition table against what's actually on
/// the device (§4.4.1).
pub fn reconcile(disk: &Disk) -> Result<(), IgnitionError> {
    let device = Path::new(&disk.device);

    let mut existing = if disk.wipe_table {
        info!("wiping partition table on '{}'", disk.device);
        sgdisk::clear_table(device).map_err(|e| crate::error::wrap_tool_failure("sgdisk", e))?;
        Vec::new()
    } else {
        sgdisk::read_table(device).map_err(|e| crate::error::wrap_tool_failure("sgdisk", e))?
    };

    for partition in &disk.partitions {
        // `number == 0` ("first available", §4.1.1) never matches a live
        // slot by construction: the entries pushed below always carry the
        // number sgdisk actually assigned, never a literal `0`. So two
        // `number == 0` partitions on the same disk each take this branch
        // and create their own slot instead of colliding on a phantom one.
        let slot = existing.iter().position(|e| e.number == partition.number);

        if !partition.should_exist() {
            if let Some(idx) = slot {
                sgdisk::delete(device, existing[idx].number).map_err(|e| crate::error::wrap_tool_failure("sgdisk", e))?;
                existing.remove(idx);
            }
            continue;
        }

        match slot {
            None => {
                let known: HashSet<u32> = existing.iter().map(|e| e.number).collect();
                let created = create(device, partition, &known)?;
                existing.push(created);
            }
            Some(idx) => {
                if partition_matches(partition, &existing[idx]) {
                    // no-op
                } else if partition.wipe_partition_entry {
                    sgdisk::delete(device, existing[idx].number).map_err(|e| crate::error::wrap_tool_failure("sgdisk", e))?;
                    let known: HashSet<u32> = existing.iter().map(|e| e.number).collect();
                    existing[idx] = create(device, partition, &known)?;
                } else if partition.resize && partition_resizable(partition, &existing[idx]) {
                    info!("resizing partition {} on '{}'", partition.number, disk.device);
                    sgdisk::delete(device, existing[idx].number).map_err(|e| crate::error::wrap_tool_failure("sgdisk", e))?;
                    let known: HashSet<u32> = existing.iter().map(|e| e.number).collect();
                    existing[idx] = create(device, partition, &known)?;
                } else {
                    return Err(IgnitionError::PartitionMismatch {
                        device: disk.device.clone(),
                        number: partition.number,
                    });
                }
            }
        }
    }

    Ok(())
}

/// Creates one partition via sgdisk and reads back the table to learn the
/// number it actually assigned. Required for `number == 0` ("first
/// available"): sgdisk picks the number itself, and the caller needs the
/// real value to track this slot in `existing` going forward (§4.4.1).
fn create(device: &Path, partition: &Partition, known_numbers: &HashSet<u32>) -> Result<ExistingPartition, IgnitionError> {
    info!("creating partition {} on '{}'", partition.number, device.display());
    sgdisk::create(
        device,
        &NewPartition {
            number: partition.number,
            start_mib: partition.start_mi_b,
            size_mib: partition.size_mi_b,
            type_guid: partition.type_guid.clone(),
            guid: partition.guid.clone(),
            label: partition.label.clone(),
        },
    )
    .map_err(|e| crate::error::wrap_tool_failure("sgdisk", e))?;

    let table = sgdisk::read_table(device).map_err(|e| crate::error::wrap_tool_failure("sgdisk", e))?;

    let found = if partition.number == 0 {
        table.into_iter().find(|e| !known_numbers.contains(&e.number))
    } else {
        table.into_iter().find(|e| e.number == partition.number)
    };

    found.ok_or_else(|| {
        crate::error::wrap_tool_failure(
            "sgdisk",
            anyhow::anyhow!("could not find newly created partition on '{}' after creation", device.display()),
        )
    })
}

/// "Matches" per §4.4.1 step 4: same start/size (`0` is a wildcard meaning
/// "use defaults"), same type GUID if declared. We don't compare the
/// partition GUID or label against the live table — `sgdisk -p` doesn't
/// surface them without a second, per-partition invocation.
fn partition_matches(declared: &Partition, existing: &ExistingPartition) -> bool {
    let start_ok = declared.start_mi_b == 0 || declared.start_mi_b == existing.start_mib;
    let size_ok = declared.size_mi_b == 0 || {
        let existing_size = existing.end_mib.saturating_sub(existing.start_mib);
        declared.size_mi_b == existing_size
    };
    let type_ok = declared
        .type_guid
        .as_ref()
        .map(|guid| guid.to_lowercase() == existing.type_guid)
        .unwrap_or(true);

    start_ok && size_ok && type_ok
}

/// Whether `declared` describes an in-place grow of `existing` (§3.2's
/// supplemental `resize` rule): same start and type, strictly larger size.
/// Anything else that differs (start, type, or a shrink) isn't a resize —
/// that falls back to `wipePartitionEntry` or a fatal mismatch.
fn partition_resizable(declared: &Partition, existing: &ExistingPartition) -> bool {
    let start_ok = declared.start_mi_b == 0 || declared.start_mi_b == existing.start_mib;
    let type_ok = declared
        .type_guid
        .as_ref()
        .map(|guid| guid.to_lowercase() == existing.type_guid)
        .unwrap_or(true);
    let existing_size = existing.end_mib.saturating_sub(existing.start_mib);
    let grows = declared.size_mi_b == 0 || declared.size_mi_b > existing_size;

    start_ok && type_ok && grows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing(number: u32, start: u64, end: u64) -> ExistingPartition {
        ExistingPartition {
            number,
            start_mib: start,
            end_mib: end,
            type_guid: "8300".to_string(),
        }
    }

    #[test]
    fn wildcard_start_and_size_match_anything() {
        let declared = Partition {
            number: 1,
            start_mi_b: 0,
            size_mi_b: 0,
            ..Default::default()
        };
        assert!(partition_matches(&declared, &existing(1, 2048, 4096)));
    }

    #[test]
    fn differing_size_does_not_match() {
        let declared = Partition {
            number: 1,
            start_mi_b: 1,
            size_mi_b: 100,
            ..Default::default()
        };
        assert!(!partition_matches(&declared, &existing(1, 1, 50)));
    }

    #[test]
    fn larger_size_same_start_is_resizable() {
        let declared = Partition {
            number: 1,
            start_mi_b: 1,
            size_mi_b: 200,
            resize: true,
            ..Default::default()
        };
        assert!(partition_resizable(&declared, &existing(1, 1, 101)));
    }

    #[test]
    fn smaller_size_is_not_resizable() {
        let declared = Partition {
            number: 1,
            start_mi_b: 1,
            size_mi_b: 50,
            resize: true,
            ..Default::default()
        };
        assert!(!partition_resizable(&declared, &existing(1, 1, 101)));
    }

    #[test]
    fn differing_start_is_not_resizable() {
        let declared = Partition {
            number: 1,
            start_mi_b: 5,
            size_mi_b: 200,
            resize: true,
            ..Default::default()
        };
        assert!(!partition_resizable(&declared, &existing(1, 1, 101)));
    }
}
