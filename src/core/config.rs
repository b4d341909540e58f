//! Battle configuration with documented defaults
//!
//! Every tunable number the rules engine reads lives here. The config is
//! passed explicitly to the engines; there is no process-wide instance.
//! Each section defaults independently, so a partial TOML file only needs
//! to mention what it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::LoadError;

/// Combat resolution tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Probability of a critical hit before tech bonuses (0.0 to 1.0)
    pub base_crit_chance: f32,

    /// Attack bonus when an ally sits opposite the attacker
    pub flank_bonus: i32,

    /// Attack bonus when attacking from a hill onto lower ground
    pub high_ground_bonus: i32,

    /// Attack bonus when a differently-typed ally is adjacent to the attacker
    pub combined_arms_bonus: i32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            base_crit_chance: 0.05,
            flank_bonus: 1,
            high_ground_bonus: 1,
            combined_arms_bonus: 1,
        }
    }
}

/// Fog of war tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// An attacker's tile becomes visible to the defending team
    pub reveal_on_attack: bool,

    /// Vision never drops below this, whatever terrain and weather say
    pub min_vision: u32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            reveal_on_attack: true,
            min_vision: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// When set, tiles held by enemy units cannot be moved through
    pub enemies_block_traversal: bool,
}

/// Artillery economy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtilleryConfig {
    pub starting_points: u32,

    /// Points accrued at each turn advance
    pub points_per_turn: u32,

    /// Map-level prerequisite. Some missions forbid fire support entirely.
    pub allowed: bool,
}

impl Default for ArtilleryConfig {
    fn default() -> Self {
        Self {
            starting_points: 150,
            points_per_turn: 25,
            allowed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementConfig {
    pub starting_points: u32,
}

impl Default for ReinforcementConfig {
    fn default() -> Self {
        Self {
            starting_points: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleRules {
    /// The battle is a draw once this many turns have been played
    pub max_turns: u32,
}

impl Default for BattleRules {
    fn default() -> Self {
        Self { max_turns: 30 }
    }
}

/// Complete battle configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub combat: CombatConfig,
    pub visibility: VisibilityConfig,
    pub movement: MovementConfig,
    pub artillery: ArtilleryConfig,
    pub reinforcements: ReinforcementConfig,
    pub battle: BattleRules,
}

impl BattleConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, LoadError> {
        let config: BattleConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate that values are within sensible ranges
    pub fn validate(&self) -> Result<(), LoadError> {
        if !(0.0..=1.0).contains(&self.combat.base_crit_chance) {
            return Err(LoadError::Invalid(format!(
                "combat.base_crit_chance must be in [0, 1], got {}",
                self.combat.base_crit_chance
            )));
        }

        if self.visibility.min_vision < 1 {
            return Err(LoadError::Invalid(
                "visibility.min_vision must be at least 1".into(),
            ));
        }

        if self.battle.max_turns == 0 {
            return Err(LoadError::Invalid("battle.max_turns must be positive".into()));
        }

        Ok(())
    }
}
