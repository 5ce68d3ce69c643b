use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Filesystem formats Ignition knows how to create and probe.
///
/// `None` is a valid declared format: it tells the disks stage to leave the
/// device's filesystem alone entirely (no probing, no mkfs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FilesystemFormat {
    Ext2,
    Ext3,
    Ext4,
    Xfs,
    Btrfs,
    Swap,
    Vfat,
    None,
}

impl FilesystemFormat {
    /// Label length limit in bytes, per mkfs tool.
    pub fn label_limit(self) -> usize {
        match self {
            FilesystemFormat::Vfat => 11,
            FilesystemFormat::Swap => 15,
            FilesystemFormat::Xfs => 12,
            FilesystemFormat::Btrfs => 256,
            FilesystemFormat::Ext2 | FilesystemFormat::Ext3 | FilesystemFormat::Ext4 => 16,
            FilesystemFormat::None => 0,
        }
    }

    /// Whether this format's `wipeFilesystem=false` probe is known-ambiguous.
    ///
    /// VFAT headers are hard to distinguish from an unformatted device, so a
    /// `false` probe here is not trusted to refuse a mismatched reformat; see
    /// the disks stage filesystem reconciliation logic.
    pub fn has_weak_probe(self) -> bool {
        matches!(self, FilesystemFormat::Vfat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_limits_match_known_tool_constraints() {
        assert_eq!(FilesystemFormat::Vfat.label_limit(), 11);
        assert_eq!(FilesystemFormat::Swap.label_limit(), 15);
        assert_eq!(FilesystemFormat::Ext4.label_limit(), 16);
    }

    #[test]
    fn vfat_is_the_only_weak_probe() {
        assert!(FilesystemFormat::Vfat.has_weak_probe());
        assert!(!FilesystemFormat::Ext4.has_weak_probe());
        assert!(!FilesystemFormat::Swap.has_weak_probe());
    }
}
