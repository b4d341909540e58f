//! AI's filtered view of the battle state
//!
//! Respects fog of war unless ignores_fog is true. Targeting always uses the
//! team's real visibility since the controller enforces it.

use std::collections::BTreeSet;

use crate::battle::execution::{BattleState, Battlefield, Rules};
use crate::battle::grid::GridCoord;
use crate::battle::movement::compute_reachable;
use crate::battle::targeting::compute_targets;
use crate::battle::units::{BattleUnit, Team, UnitId};
use crate::battle::visibility::VisibilityGrid;
use crate::core::types::Turn;

/// AI's decision-making context
pub struct DecisionContext<'a> {
    pub team: Team,
    pub field: &'a Battlefield,
    pub rules: &'a Rules,
    pub visibility: &'a VisibilityGrid,
    pub turn: Turn,
    ignores_fog: bool,
}

impl<'a> DecisionContext<'a> {
    pub fn new(state: &'a BattleState, team: Team, ignores_fog: bool) -> Self {
        Self {
            team,
            field: &state.field,
            rules: &state.rules,
            visibility: &state.side(team).visibility,
            turn: state.turn,
            ignores_fog,
        }
    }

    /// Get all living own units
    pub fn own_units(&self) -> Vec<&'a BattleUnit> {
        self.field.units.living_on(self.team).collect()
    }

    /// Get enemy units that are visible (or all if ignoring fog)
    pub fn visible_enemy_units(&self) -> Vec<&'a BattleUnit> {
        self.field
            .units
            .living_on(self.team.opponent())
            .filter(|u| self.is_visible(u.position))
            .collect()
    }

    /// Get a specific living own unit by ID
    pub fn get_own_unit(&self, unit_id: UnitId) -> Option<&'a BattleUnit> {
        self.field
            .units
            .get_living(unit_id)
            .filter(|u| u.team == self.team)
    }

    /// Check if a position is visible
    pub fn is_visible(&self, pos: GridCoord) -> bool {
        self.ignores_fog || self.visibility.is_visible(pos)
    }

    /// Enemies the unit may attack right now
    pub fn targets_for(&self, unit: &BattleUnit) -> Vec<UnitId> {
        compute_targets(unit, self.field, self.rules, self.visibility)
    }

    pub fn reachable_for(&self, unit: &BattleUnit) -> BTreeSet<GridCoord> {
        compute_reachable(unit, self.field, self.rules)
    }

    /// Find closest visible enemy to a position (ties go to the lowest id)
    pub fn closest_enemy_to(&self, pos: GridCoord) -> Option<&'a BattleUnit> {
        self.visible_enemy_units()
            .into_iter()
            .min_by_key(|u| (u.position.manhattan(&pos), u.id))
    }

    /// Closest objective the team does not control
    pub fn closest_open_objective(&self, pos: GridCoord) -> Option<GridCoord> {
        self.field
            .map
            .objectives
            .iter()
            .filter(|o| o.controlled_by != Some(self.team))
            .map(|o| o.coord)
            .min_by_key(|c| (c.manhattan(&pos), *c))
    }

    /// Where the enemy came from: the centre of its deployment zone, or the
    /// middle of the far edge when the map has none
    pub fn enemy_rear(&self) -> GridCoord {
        let zone = match self.team {
            Team::Player => &self.field.map.enemy_deployment,
            Team::Enemy => &self.field.map.player_deployment,
        };
        if !zone.is_empty() {
            let n = zone.len() as i32;
            let (sx, sy) = zone.iter().fold((0, 0), |(x, y), c| (x + c.x, y + c.y));
            return GridCoord::new(sx / n, sy / n);
        }
        let mid_x = self.field.map.width as i32 / 2;
        match self.team {
            Team::Player => GridCoord::new(mid_x, self.field.map.height as i32 - 1),
            Team::Enemy => GridCoord::new(mid_x, 0),
        }
    }

    /// Total hit points of own units
    pub fn own_effective_strength(&self) -> u32 {
        self.own_units().iter().map(|u| u.hp).sum()
    }

    /// Total hit points of visible enemies
    pub fn visible_enemy_strength(&self) -> u32 {
        self.visible_enemy_units().iter().map(|u| u.hp).sum()
    }

    /// Calculate strength ratio (own / enemy)
    /// Returns f32::MAX if no visible enemies
    pub fn strength_ratio(&self) -> f32 {
        let enemy_strength = self.visible_enemy_strength();
        if enemy_strength == 0 {
            return f32::MAX;
        }
        self.own_effective_strength() as f32 / enemy_strength as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::battle_map::BattleMap;
    use crate::battle::terrain::TerrainType;
    use crate::battle::unit_type::UnitType;

    fn state() -> BattleState {
        let mut field = Battlefield::new(BattleMap::new(12, 12));
        field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(1, 1));
        field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(2, 2));
        field.units.spawn(UnitType::Tank, Team::Enemy, GridCoord::new(11, 11));
        BattleState::new(field, Rules::default(), 1)
    }

    #[test]
    fn test_fog_filters_enemies() {
        let state = state();
        let context = DecisionContext::new(&state, Team::Player, false);
        let visible: Vec<UnitId> = context.visible_enemy_units().iter().map(|u| u.id).collect();
        assert_eq!(visible, vec![UnitId(1)]);
    }

    #[test]
    fn test_ignoring_fog_sees_everything() {
        let state = state();
        let context = DecisionContext::new(&state, Team::Player, true);
        assert_eq!(context.visible_enemy_units().len(), 2);
        assert!(context.is_visible(GridCoord::new(11, 11)));
    }

    #[test]
    fn test_own_units_and_strength_ratio() {
        let state = state();
        let context = DecisionContext::new(&state, Team::Player, false);
        assert_eq!(context.own_units().len(), 1);
        assert!(context.get_own_unit(UnitId(1)).is_none());
        let expected = context.own_effective_strength() as f32 / context.visible_enemy_strength() as f32;
        assert_eq!(context.strength_ratio(), expected);
    }

    #[test]
    fn test_strength_ratio_without_visible_enemies() {
        let mut state = state();
        state.field.map.fill(GridCoord::new(0, 3), GridCoord::new(11, 3), TerrainType::Forest);
        state.field.units.get_mut(UnitId(1)).unwrap().position = GridCoord::new(5, 8);
        let mut grid = VisibilityGrid::new(12, 12);
        crate::battle::visibility::update_visibility(&mut grid, Team::Player, &state.field, &state.rules);
        state.player.visibility = grid;

        let context = DecisionContext::new(&state, Team::Player, false);
        assert!(context.visible_enemy_units().is_empty());
        assert_eq!(context.strength_ratio(), f32::MAX);
    }

    #[test]
    fn test_enemy_rear_defaults_to_far_edge() {
        let state = state();
        let context = DecisionContext::new(&state, Team::Player, false);
        assert_eq!(context.enemy_rear(), GridCoord::new(6, 11));
        let context = DecisionContext::new(&state, Team::Enemy, false);
        assert_eq!(context.enemy_rear(), GridCoord::new(6, 0));
    }
}
