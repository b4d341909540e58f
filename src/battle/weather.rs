//! Battlefield weather
//!
//! Weather is a per-mission (or per-turn) global modifier on vision,
//! movement and weapon reach.

use serde::{Deserialize, Serialize};

use crate::battle::terrain::TerrainType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Clear,
    Overcast,
    Rain,
    Fog,
    Storm,
}

impl Weather {
    /// Added to every unit's vision range
    pub fn vision_modifier(&self) -> i32 {
        match self {
            Weather::Clear | Weather::Overcast => 0,
            Weather::Rain => -1,
            Weather::Fog | Weather::Storm => -2,
        }
    }

    /// Extra movement cost for entering the given terrain
    pub fn movement_surcharge(&self, terrain: TerrainType) -> u32 {
        match self {
            Weather::Rain | Weather::Storm => match terrain {
                TerrainType::Mud | TerrainType::Crater => 1,
                _ => 0,
            },
            _ => 0,
        }
    }

    pub fn all() -> [Weather; 5] {
        [Weather::Clear, Weather::Overcast, Weather::Rain, Weather::Fog, Weather::Storm]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Weather::Clear => "clear",
            Weather::Overcast => "overcast",
            Weather::Rain => "rain",
            Weather::Fog => "fog",
            Weather::Storm => "storm",
        }
    }

    pub fn from_name(name: &str) -> Option<Weather> {
        Weather::all().into_iter().find(|w| w.name() == name)
    }

    /// Reduction of maximum weapon range for units that fire beyond adjacency
    pub fn range_penalty(&self) -> u32 {
        match self {
            Weather::Fog | Weather::Storm => 1,
            _ => 0,
        }
    }
}
