//! Units and the roster arena
//!
//! Units are never removed from the roster: "alive" is a query (`hp > 0`),
//! so ids stay stable for log correlation across a whole battle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::abilities::AbilityId;
use crate::battle::constants::{ELITE_XP, REGULAR_XP, VETERAN_XP};
use crate::battle::grid::GridCoord;
use crate::battle::unit_type::UnitType;

/// Stable unit identifier (index into the roster arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Side of the battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Player,
    Enemy,
}

impl Team {
    pub fn opponent(&self) -> Team {
        match self {
            Team::Player => Team::Enemy,
            Team::Enemy => Team::Player,
        }
    }

    pub fn both() -> [Team; 2] {
        [Team::Player, Team::Enemy]
    }
}

/// Tagged status effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// +magnitude defense
    Entrenched,
    /// +magnitude attack
    Inspired,
    /// Next attack is a guaranteed critical hit (consumed on attack)
    AimedShot,
    /// Can only be engaged from within `magnitude` tiles
    Camouflaged,
    /// -magnitude attack and movement
    Suppressed,
    /// Flanking attacks ignore the defender's defense
    Encircling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub magnitude: i32,
    pub turns_remaining: u32,
}

/// Per-turn action flags, reset by the turn controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionFlags {
    pub moved: bool,
    pub attacked: bool,
    pub used_ability: bool,
}

impl ActionFlags {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Veterancy rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    #[default]
    Recruit,
    Regular,
    Veteran,
    Elite,
}

impl Rank {
    pub fn from_xp(xp: u32) -> Rank {
        if xp >= ELITE_XP {
            Rank::Elite
        } else if xp >= VETERAN_XP {
            Rank::Veteran
        } else if xp >= REGULAR_XP {
            Rank::Regular
        } else {
            Rank::Recruit
        }
    }

    pub fn attack_bonus(&self) -> i32 {
        match self {
            Rank::Veteran | Rank::Elite => 1,
            _ => 0,
        }
    }

    pub fn defense_bonus(&self) -> i32 {
        match self {
            Rank::Elite => 1,
            _ => 0,
        }
    }

    /// The veteran vision bonus
    pub fn vision_bonus(&self) -> i32 {
        match self {
            Rank::Veteran | Rank::Elite => 1,
            _ => 0,
        }
    }
}

/// Permanent per-unit bonuses on top of the type's base stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatBonus {
    pub attack: i32,
    pub defense: i32,
    pub range: i32,
    pub movement: i32,
}

/// A unit on the battlefield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleUnit {
    pub id: UnitId,
    pub unit_type: UnitType,
    pub team: Team,
    pub position: GridCoord,

    pub hp: u32,
    pub max_hp: u32,
    pub bonus: StatBonus,

    // Veterancy
    pub rank: Rank,
    pub xp: u32,
    pub kills: u32,

    pub statuses: Vec<StatusEffect>,
    pub cooldowns: BTreeMap<AbilityId, u32>,
    pub flags: ActionFlags,
}

impl BattleUnit {
    pub fn new(id: UnitId, unit_type: UnitType, team: Team, position: GridCoord) -> Self {
        let props = unit_type.default_properties();
        Self {
            id,
            unit_type,
            team,
            position,
            hp: props.max_hp,
            max_hp: props.max_hp,
            bonus: StatBonus::default(),
            rank: Rank::Recruit,
            xp: 0,
            kills: 0,
            statuses: Vec::new(),
            cooldowns: BTreeMap::new(),
            flags: ActionFlags::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.statuses.iter().any(|s| s.kind == kind && s.turns_remaining > 0)
    }

    /// Strongest active magnitude of a status kind (0 if absent)
    pub fn status_magnitude(&self, kind: StatusKind) -> i32 {
        self.statuses
            .iter()
            .filter(|s| s.kind == kind && s.turns_remaining > 0)
            .map(|s| s.magnitude)
            .max()
            .unwrap_or(0)
    }

    /// Add a status, refreshing an existing one of the same kind
    pub fn add_status(&mut self, kind: StatusKind, magnitude: i32, turns: u32) {
        if turns == 0 {
            return;
        }
        if let Some(existing) = self.statuses.iter_mut().find(|s| s.kind == kind) {
            existing.magnitude = existing.magnitude.max(magnitude);
            existing.turns_remaining = existing.turns_remaining.max(turns);
        } else {
            self.statuses.push(StatusEffect {
                kind,
                magnitude,
                turns_remaining: turns,
            });
        }
    }

    pub fn remove_status(&mut self, kind: StatusKind) {
        self.statuses.retain(|s| s.kind != kind);
    }

    /// Age statuses by one turn, dropping expired ones
    pub fn tick_statuses(&mut self) {
        for status in &mut self.statuses {
            status.turns_remaining = status.turns_remaining.saturating_sub(1);
        }
        self.statuses.retain(|s| s.turns_remaining > 0);
    }

    /// Apply damage, clamping hp at 0. Returns damage actually taken.
    pub fn take_damage(&mut self, damage: u32) -> u32 {
        let taken = damage.min(self.hp);
        self.hp -= taken;
        taken
    }

    /// Restore hp up to max. Returns hp actually restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let restored = amount.min(self.max_hp.saturating_sub(self.hp));
        self.hp += restored;
        restored
    }

    /// Add experience; returns the new rank if this promoted the unit
    pub fn gain_xp(&mut self, xp: u32) -> Option<Rank> {
        self.xp = self.xp.saturating_add(xp);
        let rank = Rank::from_xp(self.xp);
        if rank > self.rank {
            self.rank = rank;
            Some(rank)
        } else {
            None
        }
    }

    pub fn cooldown(&self, ability: &AbilityId) -> u32 {
        self.cooldowns.get(ability).copied().unwrap_or(0)
    }
}

/// Arena of every unit that has taken part in the battle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitRoster {
    units: Vec<BattleUnit>,
}

impl UnitRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a unit at full strength and return its id
    pub fn spawn(&mut self, unit_type: UnitType, team: Team, position: GridCoord) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push(BattleUnit::new(id, unit_type, team, position));
        id
    }

    pub fn get(&self, id: UnitId) -> Option<&BattleUnit> {
        self.units.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut BattleUnit> {
        self.units.get_mut(id.0 as usize)
    }

    /// A living unit by id
    pub fn get_living(&self, id: UnitId) -> Option<&BattleUnit> {
        self.get(id).filter(|u| u.is_alive())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BattleUnit> {
        self.units.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BattleUnit> {
        self.units.iter_mut()
    }

    pub fn living(&self) -> impl Iterator<Item = &BattleUnit> {
        self.units.iter().filter(|u| u.is_alive())
    }

    pub fn living_on(&self, team: Team) -> impl Iterator<Item = &BattleUnit> {
        self.living().filter(move |u| u.team == team)
    }

    /// The living unit standing on a tile, if any
    pub fn unit_at(&self, coord: GridCoord) -> Option<&BattleUnit> {
        self.living().find(|u| u.position == coord)
    }

    pub fn is_occupied(&self, coord: GridCoord) -> bool {
        self.unit_at(coord).is_some()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
