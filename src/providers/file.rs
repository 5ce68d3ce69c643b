use std::path::PathBuf;

use anyhow::{Context, Error};

use super::Provider;
use crate::fetch::Deadlines;

const DEFAULT_PATH: &str = "/usr/lib/ignition/user.ign";

/// The `file` platform: config lives at a fixed local path, already placed
/// there by whatever built the image. No network, no retry — a missing file
/// is "not present", not an error.
pub struct FileProvider {
    path: PathBuf,
}

impl Default for FileProvider {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
        }
    }
}

impl Provider for FileProvider {
    fn fetch_config(&self, _deadlines: Deadlines) -> Result<Option<Vec<u8>>, Error> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read config from '{}'", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_is_not_present() {
        let provider = FileProvider {
            path: PathBuf::from("/nonexistent/path/for/test"),
        };
        assert!(provider.fetch_config(Deadlines { response_headers: Default::default(), total: Default::default() }).unwrap().is_none());
    }

    #[test]
    fn reads_existing_file() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"hello").unwrap();
        let provider = FileProvider { path: tmp.path().to_path_buf() };
        let deadlines = Deadlines { response_headers: Default::default(), total: Default::default() };
        assert_eq!(provider.fetch_config(deadlines).unwrap(), Some(b"hello".to_vec()));
    }
}
