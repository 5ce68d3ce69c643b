//! The typed configuration tree (§3 of the specification) plus the two
//! operations that act on it as a whole: [`merge`](merge::merge) and
//! [`validate`](validate::validate).
//!
//! The tree is built once per stage from the cached bytes ([`Config::parse`]),
//! validated, and from then on treated as read-only — nothing here ever
//! mutates a `Config` in place after construction.

mod merge;
mod passwd;
mod storage;
mod units;
mod unknown_fields;
mod validate;

pub use merge::merge;
pub use passwd::{Group, User};
pub use storage::{
    Clevis, ClevisTang, Compression, Directory, Disk, File, Filesystem, HttpHeader, Link, Luks,
    Node, NodeGroup, NodeUser, Partition, Raid, Resource, Verification,
};
pub use units::{Dropin, NetworkdUnit, SystemdUnit};
pub use validate::validate;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::report::Report;

/// Versions this build knows how to parse. Anything else is
/// [`ConfigError::UnsupportedVersion`].
pub const SUPPORTED_VERSIONS: &[&str] = &["3.2.0", "3.2.0-experimental", "3.1.0", "3.0.0"];

/// The root of the effective configuration tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    pub ignition: Ignition,
    pub storage: Storage,
    pub passwd: Passwd,
    pub systemd: Systemd,
    pub networkd: Networkd,
}

impl Config {
    /// Decode JSON bytes into a `Config`, checking only that the declared
    /// version is one this build supports. Does not run [`validate`] —
    /// callers that need a fully-validated tree should call that
    /// separately, since some callers (e.g. the merger, which operates on
    /// configs that aren't independently valid yet) only need the parse.
    ///
    /// Every recognized object rejects unknown fields (§4.1): most of the
    /// tree does so via `#[serde(deny_unknown_fields)]` on the typed parse
    /// below, but `File`/`Directory`/`Link` can't carry that attribute
    /// themselves (see `unknown_fields`), so those three are checked against
    /// the raw JSON first.
    pub fn parse(bytes: &[u8]) -> Result<Self, ConfigError> {
        let raw: serde_json::Value = serde_json::from_slice(bytes).map_err(ConfigError::Parse)?;
        unknown_fields::check(&raw)?;

        let config: Config = serde_json::from_value(raw).map_err(ConfigError::Parse)?;
        if !SUPPORTED_VERSIONS.contains(&config.ignition.version.as_str()) {
            return Err(ConfigError::UnsupportedVersion {
                version: config.ignition.version.clone(),
            });
        }
        Ok(config)
    }

    /// Parse and validate in one step, the form every stage actually wants.
    pub fn parse_and_validate(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config = Self::parse(bytes)?;
        let report = validate(&config);
        if report.is_fatal() {
            return Err(ConfigError::Validate(report));
        }
        Ok(config)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // A Config that was itself constructed by parse/merge is always
        // representable as JSON; the only failure modes of serde_json's
        // serializer are non-string map keys and the like, neither of
        // which this tree contains.
        serde_json::to_vec(self).expect("Config is always JSON-serializable")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Ignition {
    pub version: String,
    pub config: ConfigMeta,
    pub timeouts: Timeouts,
    pub security: Security,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ConfigMeta {
    pub replace: Option<Resource>,
    pub append: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Timeouts {
    pub http_response_headers: Option<u32>,
    pub http_total: Option<u32>,
}

impl Timeouts {
    /// Per-attempt response-headers deadline, in seconds. Defaults applied
    /// here rather than baked into the struct, so the merger can tell an
    /// explicit value from an absent one.
    pub fn response_headers_secs(&self) -> u32 {
        self.http_response_headers.unwrap_or(10)
    }

    /// Overall fetch deadline, in seconds. `0` means "no deadline" — this is
    /// also the default, so an absent field and an explicit `0` behave
    /// identically.
    pub fn total_secs(&self) -> u32 {
        self.http_total.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Security {
    pub tls: Tls,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Tls {
    pub certificate_authorities: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Storage {
    pub disks: Vec<Disk>,
    pub raid: Vec<Raid>,
    pub luks: Vec<Luks>,
    pub filesystems: Vec<Filesystem>,
    pub files: Vec<File>,
    pub directories: Vec<Directory>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Passwd {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Systemd {
    pub units: Vec<SystemdUnit>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Networkd {
    pub units: Vec<NetworkdUnit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_unknown_version() {
        let bytes = br#"{"ignition":{"version":"99.0.0"}}"#;
        let err = Config::parse(bytes).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { .. }));
    }

    #[test]
    fn parse_accepts_minimal_config() {
        let bytes = br#"{"ignition":{"version":"3.2.0"}}"#;
        let config = Config::parse(bytes).unwrap();
        assert_eq!(config.ignition.version, "3.2.0");
        assert!(config.storage.files.is_empty());
    }

    #[test]
    fn default_timeouts_match_original_source() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.response_headers_secs(), 10);
        assert_eq!(timeouts.total_secs(), 0);
    }
}
