use crate::report::Report;

/// Errors produced while turning raw bytes into a validated [`crate::Config`].
///
/// This is deliberately narrower than the engine-wide error taxonomy (see
/// `ignition::error::IgnitionError` in the orchestrator crate): this crate
/// only ever fails at parse time or validation time, never at tool-execution
/// time, so it doesn't need the full taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration as JSON")]
    Parse(#[source] serde_json::Error),

    #[error("unsupported configuration version '{version}'")]
    UnsupportedVersion { version: String },

    #[error("unknown field '{field}' at '{pointer}'")]
    UnknownField { pointer: String, field: String },

    #[error("configuration failed validation")]
    Validate(Report),
}

impl ConfigError {
    /// The [`Report`] attached to a [`ConfigError::Validate`], if any.
    pub fn report(&self) -> Option<&Report> {
        match self {
            ConfigError::Validate(report) => Some(report),
            _ => None,
        }
    }
}
