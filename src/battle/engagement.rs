//! Engagement geometry
//!
//! Situational attack modifiers that depend on where units stand relative to
//! each other: flanking, combined arms and high ground.

use crate::battle::battle_map::BattleMap;
use crate::battle::constants::{COMBINED_ARMS_RANGE, FLANK_ALLY_RANGE};
use crate::battle::grid::GridCoord;
use crate::battle::units::{BattleUnit, UnitId, UnitRoster};

/// Do `a` and `b` sit on opposite sides of `center` along some axis?
fn opposite_sides(center: GridCoord, a: GridCoord, b: GridCoord) -> bool {
    let opposed = |sa: i32, sb: i32| sa != 0 && sb != 0 && sa != sb;
    opposed((a.x - center.x).signum(), (b.x - center.x).signum())
        || opposed((a.y - center.y).signum(), (b.y - center.y).signum())
}

/// Ally of the attacker that flanks the defender, if any
///
/// A living ally within Chebyshev distance 2 of the defender must sit on the
/// opposite side of it from the attacker on at least one axis. Proximity
/// alone is not enough.
pub fn flanking_partner(attacker: &BattleUnit, defender: &BattleUnit, units: &UnitRoster) -> Option<UnitId> {
    units
        .living_on(attacker.team)
        .filter(|ally| ally.id != attacker.id)
        .filter(|ally| ally.position.chebyshev(&defender.position) <= FLANK_ALLY_RANGE)
        .find(|ally| opposite_sides(defender.position, attacker.position, ally.position))
        .map(|ally| ally.id)
}

pub fn is_flanking(attacker: &BattleUnit, defender: &BattleUnit, units: &UnitRoster) -> bool {
    flanking_partner(attacker, defender, units).is_some()
}

/// Adjacent living ally of a different type, if any
pub fn combined_arms_partner(attacker: &BattleUnit, units: &UnitRoster) -> Option<UnitId> {
    units
        .living_on(attacker.team)
        .filter(|ally| ally.id != attacker.id && ally.unit_type != attacker.unit_type)
        .find(|ally| ally.position.chebyshev(&attacker.position) <= COMBINED_ARMS_RANGE)
        .map(|ally| ally.id)
}

/// Attacker stands on high ground and the defender does not
pub fn high_ground(attacker: &BattleUnit, defender: &BattleUnit, map: &BattleMap) -> bool {
    let high = |coord| map.terrain_at(coord).is_some_and(|t| t.is_high_ground());
    high(attacker.position) && !high(defender.position)
}
