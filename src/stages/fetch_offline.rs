use log::{info, warn};

use crate::cli::Cli;
use crate::config_resolve;
use crate::error::IgnitionError;
use crate::fetch;
use crate::providers;

/// Attempts to obtain the user config without network I/O (§2's
/// `fetch-offline`). A provider returning "not present", or erroring, just
/// defers to the network-capable `fetch` stage — neither is fatal here.
pub fn execute(cli: &Cli) -> Result<(), IgnitionError> {
    if cli.clear_cache {
        super::clear_cache(&cli.config_cache)?;
    }

    let platform_id = cli
        .platform
        .clone()
        .or_else(providers::platform_id_from_cmdline)
        .unwrap_or_else(|| "none".to_string());

    let provider = providers::resolve(&platform_id);
    let deadlines = fetch::default_deadlines();

    match provider.fetch_config(deadlines) {
        Ok(Some(bytes)) => {
            let config = config_resolve::resolve_and_validate(&bytes, deadlines, None)?;
            super::write_cache(&cli.config_cache, &config.to_bytes())?;
            info!("fetch-offline: wrote cache from platform '{platform_id}'");
        }
        Ok(None) => {
            info!("fetch-offline: no offline config available for platform '{platform_id}'");
        }
        Err(e) => {
            warn!("fetch-offline: provider error for platform '{platform_id}', deferring to fetch stage: {e:#}");
        }
    }

    Ok(())
}
