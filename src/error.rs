use std::path::PathBuf;

use ignition_api::{ConfigError, Report};

/// The engine-wide error taxonomy (§7). Every stage executor ultimately
/// returns one of these; `main` maps it to an exit code via [`IgnitionError::exit_code`].
///
/// This is deliberately a closed `thiserror` enum rather than a bag of
/// `anyhow::Error` — callers (and tests) can match on the kind. Tool wrappers
/// in `osutils` still use `anyhow::Error` internally and are converted here
/// at the stage boundary via [`IgnitionError::ToolFailure`]/[`IgnitionError::IoError`].
#[derive(Debug, thiserror::Error)]
pub enum IgnitionError {
    #[error("failed to parse configuration")]
    ConfigParse(#[source] serde_json::Error),

    #[error("configuration failed validation:\n{0}")]
    ConfigValidate(Report),

    #[error("failed to fetch configuration from '{uri}'")]
    ConfigFetch {
        uri: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("hash mismatch fetching '{uri}': expected {expected}, got {actual}")]
    HashMismatch {
        uri: String,
        expected: String,
        actual: String,
    },

    #[error("partition {number} on '{device}' does not match the declared configuration and wipePartitionEntry is false")]
    PartitionMismatch { device: String, number: u32 },

    #[error("filesystem on '{device}' does not match the declared format and wipeFilesystem is false")]
    FilesystemMismatch { device: String },

    #[error("LUKS volume '{name}' declares neither a key file nor a Clevis binding")]
    InvalidLuksVolume { name: String },

    #[error("LUKS volume '{name}' label exceeds 16 characters")]
    LuksLabelTooLong { name: String },

    #[error("'{tool}' exited with status {exit_code:?}: {stderr}")]
    ToolFailure {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error performing '{op}' on '{}'", path.display())]
    IoError {
        path: PathBuf,
        op: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for IgnitionError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Parse(source) => IgnitionError::ConfigParse(source),
            ConfigError::UnsupportedVersion { version } => {
                let mut report = Report::new();
                report.error("/ignition/version", format!("unsupported version '{version}'"));
                IgnitionError::ConfigValidate(report)
            }
            ConfigError::Validate(report) => IgnitionError::ConfigValidate(report),
        }
    }
}

impl IgnitionError {
    /// Process exit code per §6.
    pub fn exit_code(&self) -> i32 {
        match self {
            IgnitionError::ConfigParse(_) | IgnitionError::ConfigValidate(_) => 2,
            IgnitionError::InvalidLuksVolume { .. } | IgnitionError::LuksLabelTooLong { .. } => 2,
            IgnitionError::ConfigFetch { .. } | IgnitionError::HashMismatch { .. } => 3,
            IgnitionError::PartitionMismatch { .. } | IgnitionError::FilesystemMismatch { .. } => 4,
            IgnitionError::ToolFailure { .. } => 4,
            IgnitionError::IoError { .. } => 1,
        }
    }
}

/// Wraps a tool-wrapper `anyhow::Error` (from `osutils`) as a typed
/// [`IgnitionError::ToolFailure`], extracting exit code/stderr when present.
pub fn wrap_tool_failure(tool: &str, err: anyhow::Error) -> IgnitionError {
    IgnitionError::ToolFailure {
        tool: tool.to_string(),
        exit_code: None,
        stderr: format!("{err:#}"),
    }
}

/// Wraps a `fetch::fetch` failure as the appropriate [`IgnitionError`]:
/// [`IgnitionError::HashMismatch`] if the underlying cause was a hash
/// mismatch, [`IgnitionError::ConfigFetch`] otherwise.
pub fn wrap_fetch_failure(uri: String, err: anyhow::Error) -> IgnitionError {
    match err.downcast::<crate::fetch::HashMismatchError>() {
        Ok(mismatch) => IgnitionError::HashMismatch {
            uri,
            expected: mismatch.expected,
            actual: mismatch.actual,
        },
        Err(source) => IgnitionError::ConfigFetch { uri, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec_table() {
        assert_eq!(IgnitionError::ConfigParse(serde_json::from_str::<()>("bad").unwrap_err()).exit_code(), 2);
        assert_eq!(
            IgnitionError::PartitionMismatch {
                device: "/dev/sda".to_string(),
                number: 1
            }
            .exit_code(),
            4
        );
        assert_eq!(
            IgnitionError::ConfigFetch {
                uri: "https://example".to_string(),
                source: anyhow::anyhow!("boom")
            }
            .exit_code(),
            3
        );
    }
}
