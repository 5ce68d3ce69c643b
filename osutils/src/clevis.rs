use std::path::Path;

use anyhow::{Context, Error};
use serde::Serialize;

use crate::{dependencies::Dependency, exe::RunAndCheck};

/// A Clevis Shamir's-Secret-Sharing policy: `{pins: {...}, t: threshold}`
/// (§4.4.3 step 4). `tpm2` is represented as presence of an empty object,
/// matching how the original source serializes the TPM2 pin.
#[derive(Debug, Clone, Serialize)]
pub struct SssPolicy {
    pub pins: Pins,
    pub t: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Pins {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tpm2: Option<Tpm2Pin>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tang: Vec<TangPin>,
}

/// Empty object: the presence of the key is the policy, not its contents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Tpm2Pin {}

#[derive(Debug, Clone, Serialize)]
pub struct TangPin {
    pub url: String,
    pub thp: String,
}

/// Binds a LUKS device to a Clevis policy via `clevis luks bind`, unlocked
/// for the duration of the bind by `key_file`.
pub fn luks_bind(device: impl AsRef<Path>, key_file: impl AsRef<Path>, policy: &SssPolicy) -> Result<(), Error> {
    let policy_json = serde_json::to_string(policy).context("Failed to serialize Clevis policy")?;

    Dependency::Clevis
        .cmd()
        .arg("luks")
        .arg("bind")
        .arg("-d")
        .arg(device.as_ref())
        .arg("-k")
        .arg(key_file.as_ref())
        .arg("-y")
        .arg("sss")
        .arg(policy_json)
        .run_and_check()
        .with_context(|| format!("Failed to bind Clevis policy to '{}'", device.as_ref().display()))
}

/// Unlocks `device` as `name` via the bound Clevis policy, with no key file
/// needed — used to verify a binding actually works (§4.4.3 step 5).
pub fn luks_unlock(device: impl AsRef<Path>, name: &str) -> Result<(), Error> {
    Dependency::Clevis
        .cmd()
        .arg("luks")
        .arg("unlock")
        .arg("-d")
        .arg(device.as_ref())
        .arg("-n")
        .arg(name)
        .run_and_check()
        .with_context(|| format!("Failed to unlock '{}' via Clevis", device.as_ref().display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tpm2_only_policy_serializes_empty_object() {
        let policy = SssPolicy {
            pins: Pins {
                tpm2: Some(Tpm2Pin {}),
                tang: vec![],
            },
            t: 1,
        };
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"{"pins":{"tpm2":{}},"t":1}"#);
    }

    #[test]
    fn tang_pins_serialize_url_and_thumbprint() {
        let policy = SssPolicy {
            pins: Pins {
                tpm2: None,
                tang: vec![TangPin {
                    url: "https://tang.example".to_string(),
                    thp: "abcd1234".to_string(),
                }],
            },
            t: 1,
        };
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains(r#""url":"https://tang.example""#));
        assert!(!json.contains("tpm2"));
    }
}
