use std::path::Path;

use anyhow::{Context, Error};

use crate::{dependencies::Dependency, exe::RunAndCheck};

/// The on-disk signature the disks stage probes before deciding whether to
/// preserve, mkfs, or refuse a device (§4.4.4's "Signature").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilesystemSignature {
    pub format: Option<String>,
    pub label: Option<String>,
    pub uuid: Option<String>,
}

fn run(device: impl AsRef<Path>, tag: &str) -> Result<Option<String>, Error> {
    let output = Dependency::Blkid
        .cmd()
        .arg("-o")
        .arg("value")
        .arg("-s")
        .arg(tag)
        .arg(device.as_ref())
        .output_and_check();

    match output {
        Ok(value) => {
            let trimmed = value.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        // blkid exits non-zero when the device has no recognizable
        // signature at all, which is the expected "none" case, not a
        // tool failure.
        Err(_) => Ok(None),
    }
}

/// Probes `device` for an existing filesystem signature. A device with no
/// recognizable filesystem returns `FilesystemSignature::default()`.
pub fn probe(device: impl AsRef<Path>) -> Result<FilesystemSignature, Error> {
    Ok(FilesystemSignature {
        format: run(device.as_ref(), "TYPE")
            .with_context(|| format!("Failed to probe filesystem type of '{}'", device.as_ref().display()))?,
        label: run(device.as_ref(), "LABEL")
            .with_context(|| format!("Failed to probe filesystem label of '{}'", device.as_ref().display()))?,
        uuid: run(device.as_ref(), "UUID")
            .with_context(|| format!("Failed to probe filesystem uuid of '{}'", device.as_ref().display()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_signature_has_no_format() {
        assert_eq!(FilesystemSignature::default().format, None);
    }
}
