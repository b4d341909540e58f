//! Ability definitions
//!
//! Definitions are static content keyed by unit type + ability id. The effect
//! of every ability is one variant of a closed tagged union, and every
//! definition is validated when the catalog is built, so combinations such as
//! a passive heal or a charge aimed at a tile never reach the engine.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::battle_map::TerrainEffectKind;
use crate::battle::unit_type::UnitType;
use crate::battle::units::StatusKind;
use crate::core::error::LoadError;

/// Ability identifier, unique within a unit type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(pub String);

impl AbilityId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AbilityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Active,
    /// Always on, never activated
    Passive,
}

/// What an ability may be aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    SelfOnly,
    Ally,
    Enemy,
    Tile,
}

/// Stat modified by a passive aura
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuraStat {
    Attack,
    Defense,
    Movement,
    Vision,
    /// Hp restored to nearby allies at each turn advance
    Healing,
}

/// Closed set of ability effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbilityEffect {
    /// Status on the user
    SelfBuff {
        status: StatusKind,
        #[serde(default)]
        magnitude: i32,
        duration: u32,
    },
    /// Restores hp to the target, and to allies within `radius` of it
    Heal { amount: u32, radius: u32 },
    /// Fixed damage to every enemy within `radius` (Manhattan) of the tile
    AreaDamage {
        damage: u32,
        radius: u32,
        #[serde(default)]
        suppress: bool,
    },
    /// Timed terrain effect centred on the tile
    TerrainEffect {
        effect: TerrainEffectKind,
        radius: u32,
        duration: u32,
    },
    /// Melee hit that shoves the target away from the user
    Push { damage: u32, distance: u32 },
    /// Camouflage: enemies must close to `engagement_range` to engage
    Stealth { engagement_range: u32, duration: u32 },
    /// Passive bonus to allies within `radius` (Chebyshev) of the user
    Aura {
        stat: AuraStat,
        amount: i32,
        radius: u32,
    },
    /// Straight-line run to the target followed by an attack
    Charge { attack_bonus: i32 },
}

impl AbilityEffect {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AbilityEffect::SelfBuff { .. } => "self_buff",
            AbilityEffect::Heal { .. } => "heal",
            AbilityEffect::AreaDamage { .. } => "area_damage",
            AbilityEffect::TerrainEffect { .. } => "terrain_effect",
            AbilityEffect::Push { .. } => "push",
            AbilityEffect::Stealth { .. } => "stealth",
            AbilityEffect::Aura { .. } => "aura",
            AbilityEffect::Charge { .. } => "charge",
        }
    }

    /// Offensive effects are the ones the AI considers before a plain attack
    pub fn is_offensive(&self) -> bool {
        matches!(
            self,
            AbilityEffect::AreaDamage { .. } | AbilityEffect::Push { .. } | AbilityEffect::Charge { .. }
        )
    }
}

/// Static definition of one ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDef {
    pub id: AbilityId,
    pub name: String,
    pub unit_type: UnitType,
    #[serde(default)]
    pub activation: Activation,
    pub target: TargetKind,
    /// Maximum Chebyshev distance to the target
    #[serde(default)]
    pub range: u32,
    #[serde(default)]
    pub min_range: u32,
    /// Turns before the ability can be used again
    #[serde(default)]
    pub cooldown: u32,
    /// Cannot be used after moving this turn
    #[serde(default)]
    pub requires_stationary: bool,
    pub effect: AbilityEffect,
}

impl AbilityDef {
    pub fn is_passive(&self) -> bool {
        self.activation == Activation::Passive
    }

    /// Reject definitions the engine could not apply meaningfully
    pub fn validate(&self) -> Result<(), LoadError> {
        let invalid = |reason: &str| {
            Err(LoadError::Invalid(format!(
                "ability '{}' ({}): {}",
                self.id,
                self.unit_type.name(),
                reason
            )))
        };

        if self.min_range > self.range {
            return invalid("min_range exceeds range");
        }

        let is_aura = matches!(self.effect, AbilityEffect::Aura { .. });
        if self.is_passive() != is_aura {
            return invalid("only aura effects may be passive, and auras must be passive");
        }

        let target_ok = match &self.effect {
            AbilityEffect::SelfBuff { .. }
            | AbilityEffect::Stealth { .. }
            | AbilityEffect::Aura { .. } => self.target == TargetKind::SelfOnly,
            AbilityEffect::Heal { .. } => {
                matches!(self.target, TargetKind::Ally | TargetKind::SelfOnly)
            }
            AbilityEffect::AreaDamage { .. } | AbilityEffect::TerrainEffect { .. } => {
                self.target == TargetKind::Tile
            }
            AbilityEffect::Push { .. } | AbilityEffect::Charge { .. } => {
                self.target == TargetKind::Enemy
            }
        };
        if !target_ok {
            return invalid(&format!(
                "{:?} target is incompatible with a {} effect",
                self.target,
                self.effect.kind_name()
            ));
        }

        match &self.effect {
            AbilityEffect::SelfBuff { duration, .. }
            | AbilityEffect::TerrainEffect { duration, .. }
            | AbilityEffect::Stealth { duration, .. }
                if *duration == 0 =>
            {
                invalid("duration must be positive")
            }
            AbilityEffect::Heal { amount: 0, .. } => invalid("heal amount must be positive"),
            AbilityEffect::Push { distance: 0, .. } => invalid("push distance must be positive"),
            AbilityEffect::Charge { .. } if self.range < 2 => {
                invalid("charge needs a range of at least 2")
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AbilityFile {
    #[serde(default, rename = "ability")]
    abilities: Vec<AbilityDef>,
}

/// All ability definitions available in a battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityCatalog {
    abilities: Vec<AbilityDef>,
}

impl Default for AbilityCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AbilityCatalog {
    /// Build a catalog, validating every definition
    pub fn new(abilities: Vec<AbilityDef>) -> Result<Self, LoadError> {
        let mut seen = BTreeSet::new();
        for def in &abilities {
            def.validate()?;
            if !seen.insert((def.unit_type, def.id.clone())) {
                return Err(LoadError::Invalid(format!(
                    "duplicate ability '{}' for {}",
                    def.id,
                    def.unit_type.name()
                )));
            }
        }
        Ok(Self { abilities })
    }

    /// Parse a TOML document made of `[[ability]]` tables
    pub fn from_toml_str(contents: &str) -> Result<Self, LoadError> {
        let file: AbilityFile = toml::from_str(contents)?;
        Self::new(file.abilities)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn get(&self, unit_type: UnitType, id: &AbilityId) -> Option<&AbilityDef> {
        self.abilities
            .iter()
            .find(|a| a.unit_type == unit_type && &a.id == id)
    }

    /// Is the id defined for any unit type?
    pub fn knows(&self, id: &AbilityId) -> bool {
        self.abilities.iter().any(|a| &a.id == id)
    }

    pub fn for_type(&self, unit_type: UnitType) -> impl Iterator<Item = &AbilityDef> {
        self.abilities.iter().filter(move |a| a.unit_type == unit_type)
    }

    /// Passive auras carried by a unit type
    pub fn auras(&self, unit_type: UnitType) -> impl Iterator<Item = (AuraStat, i32, u32)> + '_ {
        self.for_type(unit_type).filter_map(|a| match a.effect {
            AbilityEffect::Aura {
                stat,
                amount,
                radius,
            } => Some((stat, amount, radius)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    /// The stock ability set
    pub fn builtin() -> Self {
        use AbilityEffect::*;

        fn def(
            unit_type: UnitType,
            id: &str,
            name: &str,
            target: TargetKind,
            (min_range, range): (u32, u32),
            cooldown: u32,
            effect: AbilityEffect,
        ) -> AbilityDef {
            let activation = if matches!(effect, AbilityEffect::Aura { .. }) {
                Activation::Passive
            } else {
                Activation::Active
            };
            AbilityDef {
                id: AbilityId::new(id),
                name: name.to_string(),
                unit_type,
                activation,
                target,
                range,
                min_range,
                cooldown,
                requires_stationary: false,
                effect,
            }
        }

        fn stationary(mut def: AbilityDef) -> AbilityDef {
            def.requires_stationary = true;
            def
        }

        let abilities = vec![
            // Infantry
            stationary(def(
                UnitType::Infantry,
                "dig_in",
                "Dig In",
                TargetKind::SelfOnly,
                (0, 0),
                3,
                SelfBuff {
                    status: StatusKind::Entrenched,
                    magnitude: 2,
                    duration: 2,
                },
            )),
            def(
                UnitType::Infantry,
                "grenade",
                "Grenade",
                TargetKind::Tile,
                (2, 3),
                3,
                AreaDamage {
                    damage: 1,
                    radius: 1,
                    suppress: false,
                },
            ),
            // Machine gunner
            stationary(def(
                UnitType::MachineGunner,
                "suppressing_fire",
                "Suppressing Fire",
                TargetKind::Tile,
                (1, 3),
                2,
                AreaDamage {
                    damage: 1,
                    radius: 1,
                    suppress: true,
                },
            )),
            // Sniper
            stationary(def(
                UnitType::Sniper,
                "aimed_shot",
                "Aimed Shot",
                TargetKind::SelfOnly,
                (0, 0),
                3,
                SelfBuff {
                    status: StatusKind::AimedShot,
                    magnitude: 0,
                    duration: 2,
                },
            )),
            def(
                UnitType::Sniper,
                "camouflage",
                "Camouflage",
                TargetKind::SelfOnly,
                (0, 0),
                4,
                Stealth {
                    engagement_range: 2,
                    duration: 2,
                },
            ),
            // Medic
            def(
                UnitType::Medic,
                "field_dressing",
                "Field Dressing",
                TargetKind::Ally,
                (0, 1),
                2,
                Heal {
                    amount: 2,
                    radius: 0,
                },
            ),
            def(
                UnitType::Medic,
                "triage",
                "Triage",
                TargetKind::SelfOnly,
                (0, 0),
                4,
                Heal {
                    amount: 1,
                    radius: 1,
                },
            ),
            def(
                UnitType::Medic,
                "aid_post",
                "Aid Post",
                TargetKind::SelfOnly,
                (0, 0),
                0,
                Aura {
                    stat: AuraStat::Healing,
                    amount: 1,
                    radius: 1,
                },
            ),
            // Engineer
            def(
                UnitType::Engineer,
                "smoke_screen",
                "Smoke Screen",
                TargetKind::Tile,
                (0, 3),
                4,
                TerrainEffect {
                    effect: TerrainEffectKind::Smoke,
                    radius: 1,
                    duration: 2,
                },
            ),
            def(
                UnitType::Engineer,
                "field_works",
                "Field Works",
                TargetKind::SelfOnly,
                (0, 0),
                0,
                Aura {
                    stat: AuraStat::Defense,
                    amount: 1,
                    radius: 1,
                },
            ),
            // Scout
            def(
                UnitType::Scout,
                "spotter",
                "Spotter",
                TargetKind::SelfOnly,
                (0, 0),
                0,
                Aura {
                    stat: AuraStat::Vision,
                    amount: 1,
                    radius: 2,
                },
            ),
            def(
                UnitType::Scout,
                "pathfinder",
                "Pathfinder",
                TargetKind::SelfOnly,
                (0, 0),
                0,
                Aura {
                    stat: AuraStat::Movement,
                    amount: 1,
                    radius: 1,
                },
            ),
            // Officer
            def(
                UnitType::Officer,
                "rally",
                "Rally",
                TargetKind::SelfOnly,
                (0, 0),
                0,
                Aura {
                    stat: AuraStat::Attack,
                    amount: 1,
                    radius: 2,
                },
            ),
            // Cavalry
            def(
                UnitType::Cavalry,
                "charge",
                "Charge",
                TargetKind::Enemy,
                (2, 4),
                3,
                Charge { attack_bonus: 2 },
            ),
            def(
                UnitType::Cavalry,
                "envelop",
                "Envelop",
                TargetKind::SelfOnly,
                (0, 0),
                3,
                SelfBuff {
                    status: StatusKind::Encircling,
                    magnitude: 0,
                    duration: 1,
                },
            ),
            // Tank
            def(
                UnitType::Tank,
                "ram",
                "Ram",
                TargetKind::Enemy,
                (1, 1),
                2,
                Push {
                    damage: 2,
                    distance: 1,
                },
            ),
        ];

        Self { abilities }
    }
}
