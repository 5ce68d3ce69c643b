use std::path::Path;

use log::info;

use ignition_api::config::{NetworkdUnit, SystemdUnit};
use osutils::systemd;

use crate::error::IgnitionError;

/// Materializes systemd units and their dropins, then writes the
/// Ignition-owned preset file recording every enable/disable decision in one
/// pass (§4.5's "systemd" section). Mask wins over enable/disable, the way
/// `systemctl` itself treats the two as mutually exclusive.
pub fn apply_systemd(root: &Path, units: &[SystemdUnit]) -> Result<(), IgnitionError> {
    let mut preset_lines = Vec::new();

    for unit in units {
        let path = systemd::unit_path(root, &unit.name);

        if unit.mask {
            systemd::mask_unit(&path).map_err(|e| crate::error::wrap_tool_failure("mask-unit", e))?;
        } else {
            systemd::unmask_unit(&path).map_err(|e| crate::error::wrap_tool_failure("unmask-unit", e))?;
            if let Some(contents) = &unit.contents {
                systemd::write_unit(&path, contents).map_err(|e| crate::error::wrap_tool_failure("write-unit", e))?;
            }
            if let Some(enabled) = unit.enabled {
                preset_lines.push(systemd::preset_line(&unit.name, enabled));
            }
        }

        for dropin in &unit.dropins {
            let dropin_path = systemd::dropin_path(root, &unit.name, &dropin.name);
            match &dropin.contents {
                Some(contents) => {
                    systemd::write_dropin(&dropin_path, contents).map_err(|e| crate::error::wrap_tool_failure("write-dropin", e))?
                }
                None => osutils::files::remove_any(&dropin_path).map_err(|e| crate::error::wrap_tool_failure("remove-dropin", e))?,
            }
        }

        info!("reconciled systemd unit '{}'", unit.name);
    }

    if !preset_lines.is_empty() {
        systemd::write_preset(root, &preset_lines).map_err(|e| crate::error::wrap_tool_failure("write-preset", e))?;
    }

    Ok(())
}

/// Materializes networkd units and their dropins (§4.5's "networkd"
/// section). networkd has no enable/mask concept of its own; presence under
/// `/etc/systemd/network` is enough.
pub fn apply_networkd(root: &Path, units: &[NetworkdUnit]) -> Result<(), IgnitionError> {
    for unit in units {
        if let Some(contents) = &unit.contents {
            let path = systemd::networkd_unit_path(root, &unit.name);
            systemd::write_unit(&path, contents).map_err(|e| crate::error::wrap_tool_failure("write-networkd-unit", e))?;
        }

        for dropin in &unit.dropins {
            let dropin_path = systemd::networkd_dropin_path(root, &unit.name, &dropin.name);
            match &dropin.contents {
                Some(contents) => {
                    systemd::write_dropin(&dropin_path, contents).map_err(|e| crate::error::wrap_tool_failure("write-networkd-dropin", e))?
                }
                None => osutils::files::remove_any(&dropin_path).map_err(|e| crate::error::wrap_tool_failure("remove-networkd-dropin", e))?,
            }
        }

        info!("reconciled networkd unit '{}'", unit.name);
    }
    Ok(())
}
