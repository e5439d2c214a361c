use crate::config::Config;
use crate::yields::{SeedType, YieldData};

/// Crop rotation: harvesting a plot gives seeds of every other colour a
/// chance to move up one tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeModel {
    // Chance for a tier 1, 2 and 3 seed to be promoted.
    chances: [f64; 3],
}

impl UpgradeModel {
    pub const fn new(t1: f64, t2: f64, t3: f64) -> Self {
        Self {
            chances: [t1, t2, t3],
        }
    }

    pub const fn none() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.t1_upgrade_chance,
            config.t2_upgrade_chance,
            config.t3_upgrade_chance,
        )
    }

    /// Expected composition of `source` after a plot of type `target` was
    /// harvested. Plots of the harvested colour are untouched.
    pub fn upgrade(&self, source: &YieldData, target: SeedType) -> YieldData {
        if source.kind == target {
            return *source;
        }

        let [c1, c2, c3] = self.chances;
        let [t1, t2, t3, t4] = source.tiers;
        YieldData::new(
            target,
            [
                t1 * (1.0 - c1),
                t2 * (1.0 - c2) + t1 * c1,
                t3 * (1.0 - c3) + t2 * c2,
                t4 + t3 * c3,
            ],
        )
    }
}
