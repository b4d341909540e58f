//! Stat queries
//!
//! Effective stats are folded together at query time from the type table,
//! permanent bonuses, rank, statuses and auras of nearby allies. Nothing here
//! is cached, so an ally moving away or dying is reflected at the next query.

use crate::battle::abilities::{aura_bonus, AuraStat};
use crate::battle::execution::{Battlefield, Rules};
use crate::battle::units::{BattleUnit, StatusKind};
use crate::battle::weather::Weather;

/// Type attack + permanent bonus + rank
pub fn base_attack(unit: &BattleUnit) -> i32 {
    unit.unit_type.default_properties().attack + unit.bonus.attack + unit.rank.attack_bonus()
}

/// Type defense + permanent bonus + rank
pub fn base_defense(unit: &BattleUnit) -> i32 {
    unit.unit_type.default_properties().defense + unit.bonus.defense + unit.rank.defense_bonus()
}

pub fn armor(unit: &BattleUnit) -> i32 {
    unit.unit_type.default_properties().armor
}

/// Attack contributed by statuses (Inspired minus Suppressed)
pub fn status_attack(unit: &BattleUnit) -> i32 {
    unit.status_magnitude(StatusKind::Inspired) - unit.status_magnitude(StatusKind::Suppressed)
}

/// Defense contributed by statuses
pub fn status_defense(unit: &BattleUnit) -> i32 {
    unit.status_magnitude(StatusKind::Entrenched)
}

/// Attack before any situational combat modifiers
pub fn effective_attack(unit: &BattleUnit, field: &Battlefield, rules: &Rules) -> i32 {
    base_attack(unit) + status_attack(unit) + aura_bonus(unit, field, rules, AuraStat::Attack)
}

/// Defense of the unit where it stands, before tech and doctrine
pub fn effective_defense(unit: &BattleUnit, field: &Battlefield, rules: &Rules) -> i32 {
    base_defense(unit)
        + status_defense(unit)
        + aura_bonus(unit, field, rules, AuraStat::Defense)
        + field.map.defense_bonus(unit.position)
}

/// Movement points available this turn
pub fn effective_movement(unit: &BattleUnit, field: &Battlefield, rules: &Rules) -> u32 {
    let movement = unit.unit_type.default_properties().movement as i32
        + unit.bonus.movement
        + aura_bonus(unit, field, rules, AuraStat::Movement)
        - unit.status_magnitude(StatusKind::Suppressed);
    movement.max(0) as u32
}

/// Inclusive (min, max) weapon reach in Chebyshev tiles.
///
/// Weather shortens the reach of ranged weapons. When the maximum drops below
/// the minimum the unit has nothing it can shoot at.
pub fn weapon_range(unit: &BattleUnit, weather: Weather) -> (u32, u32) {
    let props = unit.unit_type.default_properties();
    let mut max = (props.range as i32 + unit.bonus.range).max(0) as u32;
    if unit.unit_type.is_ranged() {
        max = max.saturating_sub(weather.range_penalty());
    }
    (props.min_range, max)
}
