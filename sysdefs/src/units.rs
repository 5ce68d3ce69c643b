/// Suffixes systemd recognizes as unit types. A `SystemdUnit.name` that
/// doesn't end in one of these is rejected by validation.
pub const KNOWN_UNIT_SUFFIXES: &[&str] = &[
    ".service",
    ".socket",
    ".device",
    ".mount",
    ".automount",
    ".swap",
    ".target",
    ".path",
    ".timer",
    ".slice",
    ".scope",
];

pub fn has_known_suffix(name: &str) -> bool {
    KNOWN_UNIT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_service_and_mount_units() {
        assert!(has_known_suffix("sshd.service"));
        assert!(has_known_suffix("var-lib.mount"));
        assert!(!has_known_suffix("sshd.conf"));
    }
}
