use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// RAID levels `mdadm --create` accepts, and the minimum device count each
/// level requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RaidLevel {
    Linear,
    Raid0,
    Raid1,
    Raid4,
    Raid5,
    Raid6,
    Raid10,
    Stripe,
}

impl RaidLevel {
    pub fn min_devices(self) -> usize {
        match self {
            RaidLevel::Linear | RaidLevel::Stripe | RaidLevel::Raid0 => 1,
            RaidLevel::Raid1 | RaidLevel::Raid10 => 2,
            RaidLevel::Raid4 | RaidLevel::Raid5 => 3,
            RaidLevel::Raid6 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_devices_match_mdadm_requirements() {
        assert_eq!(RaidLevel::Raid1.min_devices(), 2);
        assert_eq!(RaidLevel::Raid5.min_devices(), 3);
        assert_eq!(RaidLevel::Raid6.min_devices(), 4);
    }
}
