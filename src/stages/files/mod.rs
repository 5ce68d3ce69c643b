//! The `files` stage (§4.5): directories, then files, then links, then
//! passwd, then systemd/networkd units, then unmount everything the `disks`
//! stage mounted (§5's ordering guarantee).

mod identity;
mod nodes;
mod units;

use log::info;

use crate::cli::Cli;
use crate::config_resolve;
use crate::error::IgnitionError;
use crate::fetch;
use crate::stages::disks::mount as disk_mount;

pub fn execute(cli: &Cli) -> Result<(), IgnitionError> {
    let bytes = super::read_cache(&cli.config_cache)?.ok_or_else(|| IgnitionError::ConfigFetch {
        uri: cli.config_cache.display().to_string(),
        source: anyhow::anyhow!("no cached config; run fetch-offline/fetch first"),
    })?;

    let config = config_resolve::resolve_and_validate(&bytes, fetch::default_deadlines(), None)?;
    let deadlines = fetch::Deadlines::from_timeouts(&config.ignition.timeouts);

    for dir in &config.storage.directories {
        nodes::write_directory(&cli.root, dir)?;
    }
    for file in &config.storage.files {
        nodes::write_file(&cli.root, file, deadlines, None)?;
    }
    for link in &config.storage.links {
        nodes::write_link(&cli.root, link)?;
    }

    identity::apply(&cli.root, &config.passwd.groups, &config.passwd.users)?;

    units::apply_systemd(&cli.root, &config.systemd.units)?;
    units::apply_networkd(&cli.root, &config.networkd.units)?;

    disk_mount::unmount_all(&config.storage.filesystems, &cli.root)?;
    info!("files stage complete");

    Ok(())
}
