//! Battle terrain types and their static modifiers
//!
//! Values are ADDITIVE integers. Terrain is fixed for a mission except for
//! craters left by artillery (see `BattleMap::add_crater`).

use serde::{Deserialize, Serialize};

/// Terrain type for a battle tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TerrainType {
    #[default]
    Plain,    // No modifiers
    Road,     // Exposed, fast
    Mud,      // Slow, exposed
    Forest,   // Slow, cover, blocks LOS
    Trench,   // Strong cover, limits vision
    Crater,   // Shell hole: slow, light cover
    Hill,     // High ground: light cover, extends vision
    Ruins,    // Cover, blocks LOS
    Wire,     // Barbed wire: very slow, exposed
    Water,    // Impassable unless the unit type permits
    Mountain, // Impassable unless the unit type permits, blocks LOS
}

impl TerrainType {
    /// Movement points to enter this tile, None if impassable by default
    pub fn movement_cost(&self) -> Option<u32> {
        match self {
            TerrainType::Plain | TerrainType::Road | TerrainType::Trench => Some(1),
            TerrainType::Mud
            | TerrainType::Forest
            | TerrainType::Crater
            | TerrainType::Hill
            | TerrainType::Ruins => Some(2),
            TerrainType::Wire => Some(3),
            TerrainType::Water | TerrainType::Mountain => None,
        }
    }

    /// Movement cost for units allowed to cross otherwise impassable terrain
    pub fn crossing_cost(&self) -> u32 {
        match self {
            TerrainType::Water => 3,
            TerrainType::Mountain => 3,
            _ => self.movement_cost().unwrap_or(1),
        }
    }

    /// Defense bonus for a unit standing here
    pub fn defense_bonus(&self) -> i32 {
        match self {
            TerrainType::Trench => 2,
            TerrainType::Forest | TerrainType::Crater | TerrainType::Hill | TerrainType::Ruins => 1,
            _ => 0,
        }
    }

    /// Exposed tiles offer no concealment (camouflage has no effect)
    pub fn is_exposed(&self) -> bool {
        matches!(
            self,
            TerrainType::Road | TerrainType::Mud | TerrainType::Wire | TerrainType::Water
        )
    }

    /// Vision modifier for a unit standing here (negative = penalty)
    pub fn vision_modifier(&self) -> i32 {
        match self {
            TerrainType::Hill => 1,
            TerrainType::Forest | TerrainType::Trench => -1,
            _ => 0,
        }
    }

    /// Does this terrain block line of sight?
    pub fn blocks_los(&self) -> bool {
        matches!(
            self,
            TerrainType::Forest | TerrainType::Ruins | TerrainType::Mountain
        )
    }

    pub fn is_high_ground(&self) -> bool {
        matches!(self, TerrainType::Hill)
    }

    /// Can an artillery crater replace this terrain?
    pub fn can_crater(&self) -> bool {
        !matches!(self, TerrainType::Water | TerrainType::Mountain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_costs_one() {
        assert_eq!(TerrainType::Plain.movement_cost(), Some(1));
    }

    #[test]
    fn test_mud_and_forest_cost_more() {
        assert!(TerrainType::Mud.movement_cost() > TerrainType::Plain.movement_cost());
        assert!(TerrainType::Forest.movement_cost() > TerrainType::Plain.movement_cost());
    }

    #[test]
    fn test_water_and_mountain_impassable() {
        assert_eq!(TerrainType::Water.movement_cost(), None);
        assert_eq!(TerrainType::Mountain.movement_cost(), None);
    }

    #[test]
    fn test_trench_defense() {
        assert_eq!(TerrainType::Trench.defense_bonus(), 2);
        assert_eq!(TerrainType::Plain.defense_bonus(), 0);
    }

    #[test]
    fn test_forest_blocks_los() {
        assert!(TerrainType::Forest.blocks_los());
        assert!(!TerrainType::Trench.blocks_los());
    }

    #[test]
    fn test_hill_is_high_ground_with_vision_bonus() {
        assert!(TerrainType::Hill.is_high_ground());
        assert!(TerrainType::Hill.vision_modifier() > 0);
    }

    #[test]
    fn test_craters_not_in_water() {
        assert!(!TerrainType::Water.can_crater());
        assert!(TerrainType::Plain.can_crater());
    }
}
