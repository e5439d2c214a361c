use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "conf.toml";

/// Tunables for valuation, rotation and pairing. Every field is optional in
/// `conf.toml`; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// League whose prices are used.
    pub league: String,
    /// How old a price snapshot may get before it counts as stale.
    pub price_refresh_minutes: u32,

    // Lifeforce dropped per seed of each tier.
    pub seeds_per_t1_plant: f64,
    pub seeds_per_t2_plant: f64,
    pub seeds_per_t3_plant: f64,
    pub seeds_per_t4_plant: f64,
    /// Chance for a tier 4 seed to also drop a Sacred lifeforce stack.
    pub t4_sacred_chance: f64,

    pub t1_upgrade_chance: f64,
    pub t2_upgrade_chance: f64,
    pub t3_upgrade_chance: f64,

    /// Cap on harvest orders examined per planning pass.
    pub max_permutations: u64,
    /// Plots farther apart than this are not considered a pair.
    pub max_pair_distance: f64,
    /// Log per-depth search statistics after each pass.
    pub log_detailed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            league: "Standard".to_string(),
            price_refresh_minutes: 15,
            seeds_per_t1_plant: 0.0,
            seeds_per_t2_plant: 5.0,
            seeds_per_t3_plant: 100.0,
            seeds_per_t4_plant: 500.0,
            t4_sacred_chance: 0.1,
            t1_upgrade_chance: 0.33,
            t2_upgrade_chance: 0.33,
            t3_upgrade_chance: 0.33,
            max_permutations: 50_000,
            max_pair_distance: 85.0,
            log_detailed: false,
        }
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "config not found; using default values");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let multipliers = [
            self.seeds_per_t1_plant,
            self.seeds_per_t2_plant,
            self.seeds_per_t3_plant,
            self.seeds_per_t4_plant,
        ];
        if multipliers.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(Error::InvalidConfig(
                "seeds per plant must be non-negative".into(),
            ));
        }

        let chances = [
            ("t4_sacred_chance", self.t4_sacred_chance),
            ("t1_upgrade_chance", self.t1_upgrade_chance),
            ("t2_upgrade_chance", self.t2_upgrade_chance),
            ("t3_upgrade_chance", self.t3_upgrade_chance),
        ];
        for (name, chance) in chances {
            if !(0.0..=1.0).contains(&chance) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be between 0.0 and 1.0, got {chance}"
                )));
            }
        }

        if !self.max_pair_distance.is_finite() || self.max_pair_distance < 0.0 {
            return Err(Error::InvalidConfig(
                "max_pair_distance must be non-negative".into(),
            ));
        }
        if self.price_refresh_minutes == 0 {
            return Err(Error::InvalidConfig(
                "price_refresh_minutes must be positive".into(),
            ));
        }

        Ok(())
    }

    pub fn tier_multipliers(&self) -> [f64; 4] {
        [
            self.seeds_per_t1_plant,
            self.seeds_per_t2_plant,
            self.seeds_per_t3_plant,
            self.seeds_per_t4_plant,
        ]
    }
}
