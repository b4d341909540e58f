//! Attack target selection
//!
//! A unit may attack a living enemy whose tile is currently visible to its
//! team, not covered by smoke, and within its weapon reach measured in
//! Chebyshev distance. Camouflaged units off exposed ground can only be
//! engaged from close by.

use crate::battle::execution::{Battlefield, Rules};
use crate::battle::grid::GridCoord;
use crate::battle::stats::weapon_range;
use crate::battle::units::{BattleUnit, StatusKind, UnitId};
use crate::battle::visibility::VisibilityGrid;
use crate::core::error::{BattleError, Result};

/// Check whether `attacker` may attack `defender` right now
pub fn can_target(
    attacker: &BattleUnit,
    defender: &BattleUnit,
    field: &Battlefield,
    _rules: &Rules,
    fog: &VisibilityGrid,
) -> Result<()> {
    if !attacker.is_alive() {
        return Err(BattleError::InvalidUnitState(format!(
            "unit {} is dead",
            attacker.id.0
        )));
    }
    if !defender.is_alive() {
        return Err(BattleError::InvalidTarget(format!(
            "unit {} is dead",
            defender.id.0
        )));
    }
    if defender.team == attacker.team {
        return Err(BattleError::InvalidTarget(format!(
            "unit {} is friendly",
            defender.id.0
        )));
    }

    let distance = attacker.position.chebyshev(&defender.position);
    let (min_range, max_range) = weapon_range(attacker, field.weather);
    if distance < min_range {
        return Err(BattleError::InvalidTarget(format!(
            "unit {} is inside minimum range {}",
            defender.id.0, min_range
        )));
    }
    if distance > max_range {
        return Err(BattleError::InvalidTarget(format!(
            "unit {} is out of range ({} > {})",
            defender.id.0, distance, max_range
        )));
    }

    if !fog.is_visible(defender.position) {
        return Err(BattleError::InvalidTarget(format!(
            "unit {} is not visible",
            defender.id.0
        )));
    }
    check_concealment(attacker.position, defender, field)?;

    Ok(())
}

/// Smoke and camouflage checks shared by attacks and close-assault abilities
///
/// `from` is where the engagement is launched from; camouflage is tested
/// against the Chebyshev distance from there.
pub fn check_concealment(from: GridCoord, defender: &BattleUnit, field: &Battlefield) -> Result<()> {
    if field.map.is_smoked(defender.position) {
        return Err(BattleError::InvalidTarget(format!(
            "unit {} is covered by smoke",
            defender.id.0
        )));
    }

    if defender.has_status(StatusKind::Camouflaged) {
        let exposed = field
            .map
            .terrain_at(defender.position)
            .is_some_and(|t| t.is_exposed());
        let engagement_range = defender.status_magnitude(StatusKind::Camouflaged).max(0) as u32;
        if !exposed && from.chebyshev(&defender.position) > engagement_range {
            return Err(BattleError::InvalidTarget(format!(
                "unit {} is camouflaged",
                defender.id.0
            )));
        }
    }

    Ok(())
}

/// Every enemy the unit could attack right now, in id order
pub fn compute_targets(
    unit: &BattleUnit,
    field: &Battlefield,
    rules: &Rules,
    fog: &VisibilityGrid,
) -> Vec<UnitId> {
    if !unit.is_alive() {
        return Vec::new();
    }

    field
        .units
        .living_on(unit.team.opponent())
        .filter(|enemy| can_target(unit, enemy, field, rules, fog).is_ok())
        .map(|enemy| enemy.id)
        .collect()
}
