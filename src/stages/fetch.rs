use log::info;

use crate::cli::Cli;
use crate::config_resolve;
use crate::error::IgnitionError;
use crate::fetch;
use crate::providers;

/// Completes config acquisition, using the network if needed, and writes the
/// canonical cached config (§2's `fetch`). A no-op if `fetch-offline` already
/// populated the cache.
pub fn execute(cli: &Cli) -> Result<(), IgnitionError> {
    if cli.clear_cache {
        super::clear_cache(&cli.config_cache)?;
    }

    if super::read_cache(&cli.config_cache)?.is_some() {
        info!("fetch: cache already populated by fetch-offline, nothing to do");
        return Ok(());
    }

    let platform_id = cli
        .platform
        .clone()
        .or_else(providers::platform_id_from_cmdline)
        .unwrap_or_else(|| "none".to_string());

    let provider = providers::resolve(&platform_id);
    let deadlines = fetch::default_deadlines();

    let bytes = provider
        .fetch_config(deadlines)
        .map_err(|source| crate::error::wrap_fetch_failure(platform_id.clone(), source))?
        .ok_or_else(|| IgnitionError::ConfigFetch {
            uri: platform_id.clone(),
            source: anyhow::anyhow!("no config available from platform '{platform_id}'"),
        })?;

    let config = config_resolve::resolve_and_validate(&bytes, deadlines, None)?;
    super::write_cache(&cli.config_cache, &config.to_bytes())?;
    info!("fetch: wrote cache from platform '{platform_id}'");

    Ok(())
}
