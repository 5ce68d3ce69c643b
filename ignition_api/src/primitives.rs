use std::fmt::{self, Display, Formatter};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A `sha256-<hex>` or `sha512-<hex>` hash, as carried by a
/// `Resource.verification.hash` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Hash {
    Sha256(String),
    Sha512(String),
}

impl Hash {
    pub fn algorithm(&self) -> &'static str {
        match self {
            Hash::Sha256(_) => "sha256",
            Hash::Sha512(_) => "sha512",
        }
    }

    pub fn hex(&self) -> &str {
        match self {
            Hash::Sha256(hex) | Hash::Sha512(hex) => hex,
        }
    }

    pub fn expected_hex_len(&self) -> usize {
        match self {
            Hash::Sha256(_) => 64,
            Hash::Sha512(_) => 128,
        }
    }

    /// Parse a `sha{256,512}-<hex>` string, without checking hex length or
    /// content; that's the validator's job so it can attach a path to the
    /// complaint instead of failing opaquely at parse time.
    pub fn parse(s: &str) -> Result<Self, HashParseError> {
        match s.split_once('-') {
            Some(("sha256", hex)) => Ok(Hash::Sha256(hex.to_string())),
            Some(("sha512", hex)) => Ok(Hash::Sha512(hex.to_string())),
            _ => Err(HashParseError {
                value: s.to_string(),
            }),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        let hex = self.hex();
        hex.len() == self.expected_hex_len() && hex.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.algorithm(), self.hex())
    }
}

impl From<Hash> for String {
    fn from(hash: Hash) -> Self {
        hash.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("'{value}' is not a sha256-<hex> or sha512-<hex> hash")]
pub struct HashParseError {
    pub value: String,
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// `path` must be absolute and normalized: no `..` components, and no
/// trailing slash except for the root itself.
pub fn is_normalized_absolute_path(path: &str) -> bool {
    let p = Path::new(path);
    if !p.is_absolute() {
        return false;
    }
    if path.len() > 1 && path.ends_with('/') {
        return false;
    }
    !p.components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
}

/// `device` must be an absolute path under `/dev/`.
pub fn is_device_path(path: &str) -> bool {
    path.starts_with("/dev/") && is_normalized_absolute_path(path)
}

/// RFC-4122 UUID, lowercase hex with hyphens in the canonical positions.
pub fn is_lowercase_uuid(s: &str) -> bool {
    uuid::Uuid::parse_str(s).is_ok() && s.chars().all(|c| !c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sha512_hash() {
        let hash = Hash::parse("sha512-abcd").unwrap();
        assert_eq!(hash.algorithm(), "sha512");
        assert_eq!(hash.hex(), "abcd");
    }

    #[test]
    fn rejects_unknown_algorithm() {
        assert!(Hash::parse("md5-abcd").is_err());
    }

    #[test]
    fn well_formed_checks_hex_length() {
        let short = Hash::Sha256("ab".to_string());
        assert!(!short.is_well_formed());
        let full = Hash::Sha256("a".repeat(64));
        assert!(full.is_well_formed());
    }

    #[test]
    fn path_normalization_rules() {
        assert!(is_normalized_absolute_path("/"));
        assert!(is_normalized_absolute_path("/foo/bar"));
        assert!(!is_normalized_absolute_path("foo/bar"));
        assert!(!is_normalized_absolute_path("/foo/bar/"));
        assert!(!is_normalized_absolute_path("/foo/../bar"));
    }

    #[test]
    fn device_paths_must_live_under_dev() {
        assert!(is_device_path("/dev/sda1"));
        assert!(!is_device_path("/mnt/sda1"));
    }

    #[test]
    fn uuid_must_be_lowercase() {
        assert!(is_lowercase_uuid("123e4567-e89b-12d3-a456-426614174000"));
        assert!(!is_lowercase_uuid("123E4567-E89B-12D3-A456-426614174000"));
        assert!(!is_lowercase_uuid("not-a-uuid"));
    }
}
