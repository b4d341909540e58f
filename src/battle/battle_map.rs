//! Battle map: terrain grid, objectives, craters and timed terrain effects
//!
//! Base terrain is immutable for a mission. Two kinds of override exist:
//! permanent craters left by artillery and timed effects (smoke) placed by
//! abilities or barrages. Both are exported as `TerrainOverrides` for saves.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::battle::grid::{tile_count, GridCoord};
use crate::battle::terrain::TerrainType;
use crate::battle::units::Team;

/// Kind of timed terrain effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainEffectKind {
    /// Blocks line of sight and targeting
    Smoke,
}

/// A timed effect covering every tile within `radius` (Manhattan) of `center`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainEffect {
    pub kind: TerrainEffectKind,
    pub center: GridCoord,
    pub radius: u32,
    pub turns_remaining: u32,
}

impl TerrainEffect {
    pub fn covers(&self, coord: GridCoord) -> bool {
        self.turns_remaining > 0 && self.center.manhattan(&coord) <= self.radius
    }
}

/// Capturable objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub coord: GridCoord,
    pub name: String,
    pub controlled_by: Option<Team>,
}

/// Mutable parts of the terrain, persisted separately from the mission map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainOverrides {
    pub craters: Vec<GridCoord>,
    pub effects: Vec<TerrainEffect>,
}

/// The full battle map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleMap {
    pub width: u32,
    pub height: u32,
    tiles: Vec<TerrainType>,
    craters: BTreeSet<GridCoord>,
    pub effects: Vec<TerrainEffect>,
    pub objectives: Vec<Objective>,
    pub player_deployment: Vec<GridCoord>,
    pub enemy_deployment: Vec<GridCoord>,
}

impl BattleMap {
    /// Create a new battle map of open plain
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![TerrainType::Plain; tile_count(width, height)],
            craters: BTreeSet::new(),
            effects: Vec::new(),
            objectives: Vec::new(),
            player_deployment: Vec::new(),
            enemy_deployment: Vec::new(),
        }
    }

    /// Check if coordinate is within map bounds
    pub fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && coord.x < self.width as i32
            && coord.y < self.height as i32
    }

    fn index(&self, coord: GridCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(coord.y as usize * self.width as usize + coord.x as usize)
        } else {
            None
        }
    }

    /// Effective terrain at a coordinate (craters override the base tile)
    pub fn terrain_at(&self, coord: GridCoord) -> Option<TerrainType> {
        let idx = self.index(coord)?;
        if self.craters.contains(&coord) {
            Some(TerrainType::Crater)
        } else {
            Some(self.tiles[idx])
        }
    }

    /// Set base terrain at a coordinate
    pub fn set_terrain(&mut self, coord: GridCoord, terrain: TerrainType) {
        if let Some(idx) = self.index(coord) {
            self.tiles[idx] = terrain;
        }
    }

    /// Fill a rectangle (inclusive corners) with a terrain type
    pub fn fill(&mut self, from: GridCoord, to: GridCoord, terrain: TerrainType) {
        for y in from.y.min(to.y)..=from.y.max(to.y) {
            for x in from.x.min(to.x)..=from.x.max(to.x) {
                self.set_terrain(GridCoord::new(x, y), terrain);
            }
        }
    }

    /// Leave a permanent crater. Returns false if out of bounds or not craterable.
    pub fn add_crater(&mut self, coord: GridCoord) -> bool {
        match self.index(coord) {
            Some(idx) if self.tiles[idx].can_crater() => {
                self.craters.insert(coord);
                true
            }
            _ => false,
        }
    }

    pub fn is_crater(&self, coord: GridCoord) -> bool {
        self.craters.contains(&coord)
    }

    pub fn add_objective(&mut self, coord: GridCoord, name: &str) {
        self.objectives.push(Objective {
            coord,
            name: name.to_string(),
            controlled_by: None,
        });
    }

    /// Number of objectives currently held by a team
    pub fn objectives_held_by(&self, team: Team) -> u32 {
        self.objectives
            .iter()
            .filter(|o| o.controlled_by == Some(team))
            .count() as u32
    }

    /// Place a timed terrain effect
    pub fn place_effect(&mut self, kind: TerrainEffectKind, center: GridCoord, radius: u32, turns: u32) {
        if turns == 0 {
            return;
        }
        self.effects.push(TerrainEffect {
            kind,
            center,
            radius,
            turns_remaining: turns,
        });
    }

    /// Is this tile covered by smoke?
    pub fn is_smoked(&self, coord: GridCoord) -> bool {
        self.effects
            .iter()
            .any(|e| e.kind == TerrainEffectKind::Smoke && e.covers(coord))
    }

    /// Age timed effects by one turn, dropping expired ones
    pub fn tick_effects(&mut self) {
        for effect in &mut self.effects {
            effect.turns_remaining = effect.turns_remaining.saturating_sub(1);
        }
        self.effects.retain(|e| e.turns_remaining > 0);
    }

    /// Defense bonus of the tile (0 off-map)
    pub fn defense_bonus(&self, coord: GridCoord) -> i32 {
        self.terrain_at(coord).map(|t| t.defense_bonus()).unwrap_or(0)
    }

    /// Does this tile block line of sight (opaque terrain or smoke)?
    pub fn blocks_los(&self, coord: GridCoord) -> bool {
        self.terrain_at(coord).is_some_and(|t| t.blocks_los()) || self.is_smoked(coord)
    }

    /// Check line of sight between two tiles with a Bresenham walk
    pub fn has_line_of_sight(&self, from: GridCoord, to: GridCoord) -> bool {
        let line = from.line_to(&to);

        // Check all tiles except start and end
        for coord in line.iter().skip(1).take(line.len().saturating_sub(2)) {
            if self.blocks_los(*coord) {
                return false;
            }
        }

        true
    }

    /// Export craters and timed effects
    pub fn overrides(&self) -> TerrainOverrides {
        TerrainOverrides {
            craters: self.craters.iter().copied().collect(),
            effects: self.effects.clone(),
        }
    }

    /// Replace craters and timed effects with a saved set
    pub fn apply_overrides(&mut self, overrides: &TerrainOverrides) {
        self.craters.clear();
        for coord in &overrides.craters {
            self.add_crater(*coord);
        }
        self.effects = overrides.effects.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battle_map_creation() {
        let map = BattleMap::new(10, 8);
        assert_eq!(map.width, 10);
        assert_eq!(map.height, 8);
        assert_eq!(map.terrain_at(GridCoord::new(9, 7)), Some(TerrainType::Plain));
    }

    #[test]
    fn test_battle_map_out_of_bounds() {
        let map = BattleMap::new(10, 10);
        assert_eq!(map.terrain_at(GridCoord::new(10, 0)), None);
        assert_eq!(map.terrain_at(GridCoord::new(-1, 3)), None);
    }

    #[test]
    fn test_line_of_sight_open() {
        let map = BattleMap::new(10, 10);
        assert!(map.has_line_of_sight(GridCoord::new(0, 0), GridCoord::new(5, 0)));
    }

    #[test]
    fn test_line_of_sight_blocked_by_forest() {
        let mut map = BattleMap::new(10, 10);
        map.set_terrain(GridCoord::new(2, 0), TerrainType::Forest);
        assert!(!map.has_line_of_sight(GridCoord::new(0, 0), GridCoord::new(5, 0)));
    }

    #[test]
    fn test_forest_endpoint_does_not_block() {
        let mut map = BattleMap::new(10, 10);
        map.set_terrain(GridCoord::new(5, 0), TerrainType::Forest);
        assert!(map.has_line_of_sight(GridCoord::new(0, 0), GridCoord::new(5, 0)));
    }

    #[test]
    fn test_smoke_blocks_los_until_it_clears() {
        let mut map = BattleMap::new(10, 10);
        map.place_effect(TerrainEffectKind::Smoke, GridCoord::new(3, 0), 0, 1);
        assert!(!map.has_line_of_sight(GridCoord::new(0, 0), GridCoord::new(5, 0)));

        map.tick_effects();
        assert!(map.effects.is_empty());
        assert!(map.has_line_of_sight(GridCoord::new(0, 0), GridCoord::new(5, 0)));
    }

    #[test]
    fn test_crater_overrides_terrain() {
        let mut map = BattleMap::new(5, 5);
        assert!(map.add_crater(GridCoord::new(2, 2)));
        assert_eq!(map.terrain_at(GridCoord::new(2, 2)), Some(TerrainType::Crater));
        assert_eq!(map.defense_bonus(GridCoord::new(2, 2)), 1);
    }

    #[test]
    fn test_crater_rejected_off_map_and_in_water() {
        let mut map = BattleMap::new(5, 5);
        map.set_terrain(GridCoord::new(1, 1), TerrainType::Water);
        assert!(!map.add_crater(GridCoord::new(1, 1)));
        assert!(!map.add_crater(GridCoord::new(9, 9)));
    }

    #[test]
    fn test_overrides_round_trip() {
        let mut map = BattleMap::new(6, 6);
        map.add_crater(GridCoord::new(1, 2));
        map.place_effect(TerrainEffectKind::Smoke, GridCoord::new(3, 3), 1, 2);
        let saved = map.overrides();

        let mut fresh = BattleMap::new(6, 6);
        fresh.apply_overrides(&saved);
        assert_eq!(fresh, map);
    }

    #[test]
    fn test_objectives_held() {
        let mut map = BattleMap::new(6, 6);
        map.add_objective(GridCoord::new(3, 3), "Farmhouse");
        assert_eq!(map.objectives_held_by(Team::Player), 0);
        map.objectives[0].controlled_by = Some(Team::Player);
        assert_eq!(map.objectives_held_by(Team::Player), 1);
    }
}
