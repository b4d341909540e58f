//! AI personality configuration loaded from TOML
//!
//! Personalities define behavior tendencies, decision weights and
//! difficulty modifiers.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::LoadError;

/// Behavioral tendencies (0.0 to 1.0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Tendency to attack vs defend (0.0 = defensive, 1.0 = aggressive)
    pub aggression: f32,
    /// Tendency to avoid risks (0.0 = reckless, 1.0 = cautious)
    pub caution: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            aggression: 0.5,
            caution: 0.5,
        }
    }
}

/// Decision weights for evaluating options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    /// Aggression needed before offensive abilities are used
    pub ability_threshold: f32,
    /// Caution at which ranged units hold at weapon range instead of closing
    pub standoff_threshold: f32,
    /// Health fraction below which a unit falls back
    pub retreat_threshold: f32,
    /// Own / visible enemy hit point ratio below which the side counts as outnumbered
    pub outnumbered_ratio: f32,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            ability_threshold: 0.4,
            standoff_threshold: 0.6,
            retreat_threshold: 0.3,
            outnumbered_ratio: 0.6,
        }
    }
}

/// Difficulty modifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Whether AI ignores fog of war when planning movement
    pub ignores_fog_of_war: bool,
    /// Mistake probability (0.0 = perfect, 1.0 = always mistakes)
    pub mistake_chance: f32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            ignores_fog_of_war: false,
            mistake_chance: 0.1,
        }
    }
}

/// Complete AI personality configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiPersonality {
    /// Name of this personality (set from filename)
    #[serde(default)]
    pub name: String,
    /// Behavioral tendencies
    #[serde(default)]
    pub behavior: BehaviorConfig,
    /// Decision weights
    #[serde(default)]
    pub weights: WeightConfig,
    /// Difficulty modifiers
    #[serde(default)]
    pub difficulty: DifficultyConfig,
}

impl Default for AiPersonality {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            behavior: BehaviorConfig::default(),
            weights: WeightConfig::default(),
            difficulty: DifficultyConfig::default(),
        }
    }
}

impl AiPersonality {
    pub fn from_toml_str(contents: &str) -> Result<Self, LoadError> {
        let personality: AiPersonality = toml::from_str(contents)?;
        personality.validate()?;
        Ok(personality)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// All tendencies, thresholds and chances are fractions
    pub fn validate(&self) -> Result<(), LoadError> {
        let fractions = [
            ("behavior.aggression", self.behavior.aggression),
            ("behavior.caution", self.behavior.caution),
            ("weights.ability_threshold", self.weights.ability_threshold),
            ("weights.standoff_threshold", self.weights.standoff_threshold),
            ("weights.retreat_threshold", self.weights.retreat_threshold),
            ("weights.outnumbered_ratio", self.weights.outnumbered_ratio),
            ("difficulty.mistake_chance", self.difficulty.mistake_chance),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(LoadError::Invalid(format!(
                    "personality '{}': {} must be within 0..=1, got {}",
                    self.name, field, value
                )));
            }
        }
        Ok(())
    }
}

/// Load personality from TOML file
///
/// Loads from `data/ai_personalities/{name}.toml`
pub fn load_personality(name: &str) -> Result<AiPersonality, LoadError> {
    let path = personality_path(name);
    let mut personality = AiPersonality::load(&path)?;
    personality.name = name.to_string();
    tracing::debug!(name, path = %path.display(), "loaded AI personality");
    Ok(personality)
}

/// Get path to personality file
fn personality_path(name: &str) -> PathBuf {
    PathBuf::from("data/ai_personalities").join(format!("{}.toml", name))
}
