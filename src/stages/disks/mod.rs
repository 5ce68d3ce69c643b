//! The `disks` stage (§4.4): partition → raid → luks → filesystem → mount,
//! each layer fully completed before the next (§5's ordering guarantee).

mod filesystem;
mod luks;
pub(crate) mod mount;
mod partition;
mod raid;

use log::info;

use crate::cli::Cli;
use crate::config_resolve;
use crate::error::IgnitionError;
use crate::fetch;

pub fn execute(cli: &Cli) -> Result<(), IgnitionError> {
    let bytes = super::read_cache(&cli.config_cache)?.ok_or_else(|| IgnitionError::ConfigFetch {
        uri: cli.config_cache.display().to_string(),
        source: anyhow::anyhow!("no cached config; run fetch-offline/fetch first"),
    })?;

    let config = config_resolve::resolve_and_validate(&bytes, fetch::default_deadlines(), None)?;
    let deadlines = fetch::Deadlines::from_timeouts(&config.ignition.timeouts);

    for disk in &config.storage.disks {
        info!("reconciling disk '{}'", disk.device);
        partition::reconcile(disk)?;
    }
    for raid in &config.storage.raid {
        raid::reconcile(raid)?;
    }
    for luks_volume in &config.storage.luks {
        luks::reconcile(luks_volume, deadlines, None)?;
    }
    for fs in &config.storage.filesystems {
        filesystem::reconcile(fs)?;
    }

    mount::mount_all(&config.storage.filesystems, &cli.root)?;

    Ok(())
}
