use std::path::{Path, PathBuf};

use log::info;

use ignition_api::config::Raid;
use osutils::mdadm;

use crate::error::IgnitionError;

/// Stops any existing array of the same name, zeroes superblocks when
/// requested (or when the array doesn't already exist), then creates it
/// (§4.4.2). Degraded/resyncing arrays are left as-is; we don't wait.
pub fn reconcile(raid: &Raid) -> Result<(), IgnitionError> {
    let array_path = array_path(&raid.name);

    mdadm::stop(&array_path).map_err(|e| crate::error::wrap_tool_failure("mdadm", e))?;

    let devices: Vec<PathBuf> = raid.devices.iter().map(PathBuf::from).collect();
    let needs_zero = raid.wipe_volume || !array_path.exists();
    if needs_zero {
        for device in &devices {
            mdadm::zero_superblock(device).map_err(|e| crate::error::wrap_tool_failure("mdadm", e))?;
        }
    }

    info!("creating raid array '{}' ({})", raid.name, raid.level);
    mdadm::create(&array_path, &raid.level.to_string(), &devices).map_err(|e| crate::error::wrap_tool_failure("mdadm", e))
}

fn array_path(name: &str) -> PathBuf {
    Path::new("/dev/md").join(name)
}
