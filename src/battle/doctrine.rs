//! Nations, doctrines and researched technology
//!
//! A team's profile contributes the "faction" and "tech" line items of the
//! combat formula and gates which reinforcement packages it may call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nation {
    #[default]
    British,
    French,
    German,
    American,
}

impl Nation {
    pub fn all() -> [Nation; 4] {
        [Nation::British, Nation::French, Nation::German, Nation::American]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Nation::British => "british",
            Nation::French => "french",
            Nation::German => "german",
            Nation::American => "american",
        }
    }

    pub fn from_name(name: &str) -> Option<Nation> {
        Nation::all().into_iter().find(|n| n.name() == name)
    }

    /// National doctrine bonuses
    pub fn doctrine(&self) -> Doctrine {
        match self {
            Nation::British => Doctrine::default(),
            Nation::French => Doctrine {
                attack: 0,
                defense: 1,
            },
            Nation::German => Doctrine {
                attack: 1,
                defense: 0,
            },
            Nation::American => Doctrine::default(),
        }
    }
}

/// Faction-wide flat bonuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Doctrine {
    pub attack: i32,
    pub defense: i32,
}

/// Campaign technology carried into a battle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TechBonuses {
    pub attack: i32,
    pub defense: i32,
    /// Subtracted from the defender's armor
    pub armor_piercing: i32,
    /// Added to the base critical chance
    pub crit_chance: f32,
}

/// Everything a team brings to the combat formula besides its units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamProfile {
    pub nation: Nation,
    pub doctrine: Doctrine,
    pub tech: TechBonuses,
}

impl TeamProfile {
    pub fn for_nation(nation: Nation) -> Self {
        Self {
            nation,
            doctrine: nation.doctrine(),
            tech: TechBonuses::default(),
        }
    }

    pub fn with_tech(mut self, tech: TechBonuses) -> Self {
        self.tech = tech;
        self
    }
}
