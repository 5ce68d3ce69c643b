//! Per-stage executors (§2, §4.6). Each function here is what the
//! orchestrator dispatches to once the CLI has selected a stage.

pub mod disks;
pub mod files;
pub mod fetch;
pub mod fetch_offline;

use std::path::Path;

use log::debug;

use crate::error::IgnitionError;

/// Reads the cached effective config, if any. Absence is not an error; it's
/// up to the caller to decide whether that's fatal for their stage.
pub fn read_cache(path: &Path) -> Result<Option<Vec<u8>>, IgnitionError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(IgnitionError::IoError {
            path: path.to_path_buf(),
            op: "read cache".to_string(),
            source: e,
        }),
    }
}

pub fn write_cache(path: &Path, bytes: &[u8]) -> Result<(), IgnitionError> {
    osutils::files::write_atomic(path, bytes, 0o600).map_err(|source| crate::error::wrap_tool_failure("write-cache", source))?;
    debug!("wrote {} bytes to cache '{}'", bytes.len(), path.display());
    Ok(())
}

pub fn clear_cache(path: &Path) -> Result<(), IgnitionError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(IgnitionError::IoError {
            path: path.to_path_buf(),
            op: "clear cache".to_string(),
            source: e,
        }),
    }
}
