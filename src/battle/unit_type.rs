//! Unit types and their default properties
//!
//! The stat table is the single source of base values; everything else
//! (rank, status effects, auras, doctrine, tech) is layered on at query time.

use serde::{Deserialize, Serialize};

use crate::battle::terrain::TerrainType;

/// Type of military unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    // Line troops
    Infantry,      // Riflemen, the backbone
    MachineGunner, // Area denial, slow
    Sniper,        // Long reach, fragile

    // Support
    Medic,    // Heals, weak in a fight
    Engineer, // Bridges water, smoke, anti-tank charges
    Scout,    // Fast, sees far, crosses mountains
    Officer,  // Command aura

    // Heavy
    Cavalry, // Fast shock troops
    Tank,    // Armoured, crushes wire
    Mortar,  // Indirect fire, cannot shoot adjacent
}

/// Default properties for a unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitProperties {
    pub max_hp: u32,
    pub attack: i32,
    pub defense: i32,
    pub armor: i32,
    pub min_range: u32,
    pub range: u32,
    pub movement: u32,
    pub vision: u32,
}

impl UnitType {
    /// Get default properties for this unit type
    pub fn default_properties(&self) -> UnitProperties {
        match self {
            UnitType::Infantry => UnitProperties {
                max_hp: 5,
                attack: 3,
                defense: 1,
                armor: 0,
                min_range: 1,
                range: 1,
                movement: 3,
                vision: 4,
            },
            UnitType::MachineGunner => UnitProperties {
                max_hp: 4,
                attack: 4,
                defense: 1,
                armor: 0,
                min_range: 1,
                range: 2,
                movement: 2,
                vision: 4,
            },
            UnitType::Sniper => UnitProperties {
                max_hp: 3,
                attack: 4,
                defense: 0,
                armor: 0,
                min_range: 2,
                range: 4,
                movement: 3,
                vision: 6,
            },
            UnitType::Medic => UnitProperties {
                max_hp: 3,
                attack: 1,
                defense: 0,
                armor: 0,
                min_range: 1,
                range: 1,
                movement: 3,
                vision: 3,
            },
            UnitType::Engineer => UnitProperties {
                max_hp: 4,
                attack: 2,
                defense: 1,
                armor: 0,
                min_range: 1,
                range: 1,
                movement: 3,
                vision: 3,
            },
            UnitType::Scout => UnitProperties {
                max_hp: 3,
                attack: 2,
                defense: 0,
                armor: 0,
                min_range: 1,
                range: 1,
                movement: 5,
                vision: 6,
            },
            UnitType::Officer => UnitProperties {
                max_hp: 4,
                attack: 2,
                defense: 1,
                armor: 0,
                min_range: 1,
                range: 2,
                movement: 3,
                vision: 5,
            },
            UnitType::Cavalry => UnitProperties {
                max_hp: 5,
                attack: 4,
                defense: 1,
                armor: 0,
                min_range: 1,
                range: 1,
                movement: 5,
                vision: 5,
            },
            UnitType::Tank => UnitProperties {
                max_hp: 8,
                attack: 5,
                defense: 2,
                armor: 2,
                min_range: 1,
                range: 2,
                movement: 3,
                vision: 3,
            },
            UnitType::Mortar => UnitProperties {
                max_hp: 3,
                attack: 4,
                defense: 0,
                armor: 0,
                min_range: 2,
                range: 5,
                movement: 2,
                vision: 3,
            },
        }
    }

    /// All unit types, in declaration order
    pub fn all() -> [UnitType; 10] {
        [
            UnitType::Infantry,
            UnitType::MachineGunner,
            UnitType::Sniper,
            UnitType::Medic,
            UnitType::Engineer,
            UnitType::Scout,
            UnitType::Officer,
            UnitType::Cavalry,
            UnitType::Tank,
            UnitType::Mortar,
        ]
    }

    /// Stable content name (matches the serde representation)
    pub fn name(&self) -> &'static str {
        match self {
            UnitType::Infantry => "infantry",
            UnitType::MachineGunner => "machine_gunner",
            UnitType::Sniper => "sniper",
            UnitType::Medic => "medic",
            UnitType::Engineer => "engineer",
            UnitType::Scout => "scout",
            UnitType::Officer => "officer",
            UnitType::Cavalry => "cavalry",
            UnitType::Tank => "tank",
            UnitType::Mortar => "mortar",
        }
    }

    /// Resolve a content name; None means the mission data is malformed
    pub fn from_name(name: &str) -> Option<UnitType> {
        UnitType::all().into_iter().find(|t| t.name() == name)
    }

    /// Movement cost to enter terrain for this unit type, None if impassable
    pub fn movement_cost(&self, terrain: TerrainType) -> Option<u32> {
        match (self, terrain) {
            (UnitType::Engineer, TerrainType::Water) => Some(terrain.crossing_cost()),
            (UnitType::Scout, TerrainType::Mountain) => Some(terrain.crossing_cost()),
            (UnitType::Tank, TerrainType::Wire) => Some(1),
            (UnitType::Tank, TerrainType::Forest) => None,
            (UnitType::Cavalry, TerrainType::Wire) => None,
            _ => terrain.movement_cost(),
        }
    }

    pub fn can_enter(&self, terrain: TerrainType) -> bool {
        self.movement_cost(terrain).is_some()
    }

    /// Fires beyond adjacency (subject to weather range penalties)
    pub fn is_ranged(&self) -> bool {
        self.default_properties().range > 1
    }

    /// Spots for artillery
    pub fn is_spotter(&self) -> bool {
        matches!(self, UnitType::Officer | UnitType::Scout)
    }
}

/// Attack bonus when `attacker` engages `defender`
pub fn type_matchup_bonus(attacker: UnitType, defender: UnitType) -> i32 {
    use UnitType::*;
    match (attacker, defender) {
        (Engineer, Tank) => 2,
        (MachineGunner, Cavalry) => 2,
        (Tank, Infantry | MachineGunner | Sniper | Medic | Scout | Officer | Mortar) => 1,
        (Cavalry, Sniper | Mortar) => 1,
        (Sniper, Officer) => 1,
        _ => 0,
    }
}
