//! Controller tuning knobs.
//!
//! Every field has a default, so a config file only needs to list what it
//! changes:
//!
//! ```ron
//! (
//!     seed: 42,
//!     scout_quota: 2,
//!     army_composition: [Ranger, Knight],
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::UnitKind;
use crate::error::{BotError, Result};

/// Per-match controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Seed for random walks and launch destinations.
    pub seed: u64,
    /// Number of scouts kept alive.
    pub scout_quota: usize,
    /// Kind drafted as scouts.
    pub scout_kind: UnitKind,
    /// Most workers on one project in one tick.
    pub project_worker_cap: u32,
    /// Most projects waiting for a blueprint at once.
    pub max_planned_projects: usize,
    /// Factories (built or planned) to aim for.
    pub factory_target: usize,
    /// Rockets (built or planned) to aim for once rockets are unlocked.
    pub rocket_target: usize,
    /// First round rockets are planned.
    pub rocket_from_round: u32,
    /// First round squads are sent to board rockets.
    pub embark_from_round: u32,
    /// Rocket occupancy that triggers a launch. Must be at least 1 and no
    /// more than a rocket holds (8 in the sandbox), or `Embark` never ends.
    pub launch_threshold: usize,
    /// Squared radius around an attack target searched for enemies.
    pub attack_sense_radius_sq: u32,
    /// Factories produce workers until this many exist.
    pub min_workers: usize,
    /// Soldier kinds produced in rotation once workers are covered.
    pub army_composition: Vec<UnitKind>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            scout_quota: 4,
            scout_kind: UnitKind::Ranger,
            project_worker_cap: 4,
            max_planned_projects: 1,
            factory_target: 2,
            rocket_target: 2,
            rocket_from_round: 100,
            embark_from_round: 150,
            launch_threshold: 2,
            attack_sense_radius_sq: 4,
            min_workers: 6,
            army_composition: vec![UnitKind::Ranger, UnitKind::Ranger, UnitKind::Healer],
        }
    }
}

impl BotConfig {
    /// Load a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BotError::ConfigNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse a config from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Reject values the allocators cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.army_composition.is_empty() {
            return Err(BotError::InvalidConfig("army_composition is empty".into()));
        }
        if let Some(kind) = self.army_composition.iter().find(|k| !k.is_soldier()) {
            return Err(BotError::InvalidConfig(format!(
                "army_composition contains non-soldier {kind:?}"
            )));
        }
        if !self.scout_kind.is_soldier() {
            return Err(BotError::InvalidConfig(format!(
                "scout_kind must be a soldier, got {:?}",
                self.scout_kind
            )));
        }
        if self.project_worker_cap == 0 {
            return Err(BotError::InvalidConfig("project_worker_cap must be positive".into()));
        }
        if self.launch_threshold == 0 {
            return Err(BotError::InvalidConfig("launch_threshold must be positive".into()));
        }
        Ok(())
    }
}
