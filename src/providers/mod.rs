//! OEM provider registry (§6, §9 "Polymorphism over providers"). A provider
//! is a capability set `fetch_config() -> bytes | not present`, selected by
//! platform id. Implementations here are intentionally minimal — the full
//! set of cloud-metadata/disk-label providers is out of this crate's scope
//! (§1 Non-goals); this module specifies and exercises the registry contract
//! with the providers that are pure kernel-cmdline/local-file reads.

mod cmdline;
mod file;

use anyhow::Error;

use crate::fetch::Deadlines;

/// A source of the root user configuration, keyed by platform id.
///
/// Returns `Ok(None)` when the platform genuinely has no offline-reachable
/// config (a legitimate outcome for `fetch-offline`, not an error).
pub trait Provider {
    fn fetch_config(&self, deadlines: Deadlines) -> Result<Option<Vec<u8>>, Error>;
}

/// Resolves a platform id to its provider. Unknown platform ids fall back to
/// [`cmdline::CmdlineUrlProvider`], which is the lowest common denominator
/// every platform supports (a `ignition.config.url=` kernel parameter).
pub fn resolve(platform_id: &str) -> Box<dyn Provider> {
    match platform_id {
        "file" => Box::new(file::FileProvider::default()),
        _ => Box::new(cmdline::CmdlineUrlProvider::default()),
    }
}

/// Reads `ignition.platform.id=<id>` from the kernel command line, per §6's
/// "`--platform`, if omitted, read from kernel cmdline".
pub fn platform_id_from_cmdline() -> Option<String> {
    let cmdline = std::fs::read_to_string("/proc/cmdline").ok()?;
    find_cmdline_value(&cmdline, "ignition.platform.id")
}

pub(crate) fn find_cmdline_value(cmdline: &str, key: &str) -> Option<String> {
    cmdline
        .split_whitespace()
        .find_map(|arg| arg.strip_prefix(key).and_then(|rest| rest.strip_prefix('=')))
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_platform_id_among_other_args() {
        let cmdline = "root=/dev/sda1 ignition.platform.id=qemu console=ttyS0";
        assert_eq!(find_cmdline_value(cmdline, "ignition.platform.id"), Some("qemu".to_string()));
    }

    #[test]
    fn returns_none_when_absent() {
        let cmdline = "root=/dev/sda1 console=ttyS0";
        assert_eq!(find_cmdline_value(cmdline, "ignition.platform.id"), None);
    }
}
