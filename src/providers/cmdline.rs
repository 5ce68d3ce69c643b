use anyhow::Error;

use super::{find_cmdline_value, Provider};
use crate::fetch::{self, Deadlines};
use ignition_api::config::Resource;

/// Reads a `ignition.config.url=<url>` kernel parameter and fetches it via
/// the ordinary [`fetch`] pipeline, so `data:`/`http(s):` both work here the
/// same as they do for file contents.
#[derive(Default)]
pub struct CmdlineUrlProvider {
    cmdline_path: Option<&'static str>,
}

impl Provider for CmdlineUrlProvider {
    fn fetch_config(&self, deadlines: Deadlines) -> Result<Option<Vec<u8>>, Error> {
        let cmdline = std::fs::read_to_string(self.cmdline_path.unwrap_or("/proc/cmdline")).unwrap_or_default();

        let Some(url) = find_cmdline_value(&cmdline, "ignition.config.url") else {
            return Ok(None);
        };

        let resource = Resource {
            source: url::Url::parse(&url)?,
            compression: None,
            verification: None,
            http_headers: vec![],
            optional: None,
        };

        fetch::fetch(&resource, deadlines, None).map(Some)
    }
}
