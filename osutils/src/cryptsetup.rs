use std::path::Path;

use anyhow::{Context, Error};

use crate::{dependencies::Dependency, exe::RunAndCheck};

/// Formats `device` as a fresh LUKS2 volume, keyed by the material at
/// `key_file` (§4.4.3 step 2).
#[allow(clippy::too_many_arguments)]
pub fn luks_format(
    device: impl AsRef<Path>,
    key_file: impl AsRef<Path>,
    cipher: Option<&str>,
    label: Option<&str>,
    uuid: Option<&str>,
    extra_options: &[String],
) -> Result<(), Error> {
    let mut cmd = Dependency::Cryptsetup.cmd();
    cmd.arg("luksFormat")
        .arg("--type")
        .arg("luks2")
        .arg("--batch-mode")
        .arg("--key-file")
        .arg(key_file.as_ref());

    if let Some(cipher) = cipher {
        cmd.arg("--cipher").arg(cipher);
    }
    if let Some(label) = label {
        cmd.arg("--label").arg(label);
    }
    if let Some(uuid) = uuid {
        cmd.arg("--uuid").arg(uuid);
    }
    cmd.args(extra_options);
    cmd.arg(device.as_ref());

    cmd.run_and_check()
        .with_context(|| format!("Failed to luksFormat '{}'", device.as_ref().display()))
}

/// Opens `device` as `name`, unlocking with `key_file`.
pub fn luks_open(device: impl AsRef<Path>, key_file: impl AsRef<Path>, name: &str) -> Result<(), Error> {
    Dependency::Cryptsetup
        .cmd()
        .arg("luksOpen")
        .arg("--key-file")
        .arg(key_file.as_ref())
        .arg(device.as_ref())
        .arg(name)
        .run_and_check()
        .with_context(|| format!("Failed to open '{}' as '{}'", device.as_ref().display(), name))
}

/// Closes a mapped device by its mapper `name`, e.g. `/dev/mapper/<name>`.
pub fn luks_close(name: &str) -> Result<(), Error> {
    Dependency::Cryptsetup
        .cmd()
        .arg("luksClose")
        .arg(name)
        .run_and_check()
        .with_context(|| format!("Failed to close mapped device '{name}'"))
}

/// Removes the key slot unlocked by `key_file` (§4.4.3 step 6: dropping the
/// Ignition-generated slot once a Clevis binding can unlock the volume
/// independently).
pub fn luks_remove_key(device: impl AsRef<Path>, key_file: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Cryptsetup
        .cmd()
        .arg("luksRemoveKey")
        .arg(device.as_ref())
        .arg(key_file.as_ref())
        .run_and_check()
        .with_context(|| format!("Failed to remove LUKS key from '{}'", device.as_ref().display()))
}

/// Number of active key slots, used to verify §8 property 7 ("the key slot
/// count equals exactly one").
pub fn luks_slot_count(device: impl AsRef<Path>) -> Result<usize, Error> {
    let output = Dependency::Cryptsetup
        .cmd()
        .arg("luksDump")
        .arg(device.as_ref())
        .output_and_check()
        .with_context(|| format!("Failed to dump LUKS header of '{}'", device.as_ref().display()))?;

    Ok(output
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            trimmed.starts_with(|c: char| c.is_ascii_digit())
                && trimmed.contains(": luks2")
        })
        .count())
}
