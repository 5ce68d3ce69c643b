use std::process::Command;

use strum_macros::{Display, IntoStaticStr};

/// External binaries the disks and files stages shell out to (§6's "External
/// tool contract"). Centralizing them here means a stage executor never
/// writes a bare `Command::new("literal")` — it asks for a `Dependency` and
/// gets a `Command` preloaded with the right program name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Dependency {
    Blkid,
    Clevis,
    Cryptsetup,
    Gpasswd,
    Groupadd,
    Mdadm,
    Mkswap,
    Mke2fs,
    #[strum(serialize = "mkfs.btrfs")]
    MkfsBtrfs,
    #[strum(serialize = "mkfs.vfat")]
    MkfsVfat,
    #[strum(serialize = "mkfs.xfs")]
    MkfsXfs,
    Mount,
    Sgdisk,
    Systemctl,
    Tune2fs,
    Umount,
    Useradd,
    Usermod,
    Wipefs,
}

impl Dependency {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether the binary is present on `$PATH`. Stage executors check this
    /// before attempting the first invocation of a given tool so a missing
    /// dependency surfaces as a clear error instead of an opaque ENOENT deep
    /// in a `Command::output()` call.
    pub fn is_available(self) -> bool {
        which::which(self.name()).is_ok()
    }

    pub fn cmd(self) -> Command {
        Command::new(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_tool_names_render_with_dots() {
        assert_eq!(Dependency::MkfsBtrfs.name(), "mkfs.btrfs");
        assert_eq!(Dependency::MkfsVfat.name(), "mkfs.vfat");
        assert_eq!(Dependency::MkfsXfs.name(), "mkfs.xfs");
    }

    #[test]
    fn simple_tool_names_are_kebab_case() {
        assert_eq!(Dependency::Cryptsetup.name(), "cryptsetup");
        assert_eq!(Dependency::Sgdisk.name(), "sgdisk");
    }

    #[test]
    fn cmd_builds_a_command_with_the_right_program() {
        let cmd = Dependency::Wipefs.cmd();
        assert_eq!(cmd.get_program().to_str(), Some("wipefs"));
    }
}
