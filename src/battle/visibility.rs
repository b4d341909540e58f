//! Per-team visibility (fog of war)
//!
//! Each team keeps its own grid of hidden / revealed / visible tiles. The grid
//! is rebuilt from scratch every update: visible tiles are demoted to revealed,
//! then every living unit marks the tiles it can currently see.

use serde::{Deserialize, Serialize};

use crate::battle::abilities::{aura_bonus, AuraStat};
use crate::battle::execution::{Battlefield, Rules};
use crate::battle::grid::{tile_count, GridCoord};
use crate::battle::units::{BattleUnit, Team};

/// Visibility state of a single tile for one team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Never seen
    #[default]
    Hidden,
    /// Seen before, not currently in sight
    Revealed,
    /// Currently in sight
    Visible,
}

/// Row-major visibility grid for one team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityGrid {
    pub width: u32,
    pub height: u32,
    cells: Vec<Visibility>,
}

impl VisibilityGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Visibility::Hidden; tile_count(width, height)],
        }
    }

    fn index(&self, coord: GridCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 || coord.x >= self.width as i32 || coord.y >= self.height as i32 {
            return None;
        }
        Some(coord.y as usize * self.width as usize + coord.x as usize)
    }

    /// State of a tile (off-map tiles are always hidden)
    pub fn get(&self, coord: GridCoord) -> Visibility {
        self.index(coord)
            .map(|idx| self.cells[idx])
            .unwrap_or(Visibility::Hidden)
    }

    pub fn set(&mut self, coord: GridCoord, state: Visibility) {
        if let Some(idx) = self.index(coord) {
            self.cells[idx] = state;
        }
    }

    pub fn is_visible(&self, coord: GridCoord) -> bool {
        self.get(coord) == Visibility::Visible
    }

    pub fn count(&self, state: Visibility) -> usize {
        self.cells.iter().filter(|&&c| c == state).count()
    }

    /// Demote every visible tile to revealed
    pub fn demote(&mut self) {
        for cell in &mut self.cells {
            if *cell == Visibility::Visible {
                *cell = Visibility::Revealed;
            }
        }
    }
}

/// Vision range of a unit where it currently stands
///
/// Type base + rank bonus + terrain modifier + weather modifier + spotter
/// aura, never below the configured minimum.
pub fn unit_vision_range(unit: &BattleUnit, field: &Battlefield, rules: &Rules) -> u32 {
    let terrain = field
        .map
        .terrain_at(unit.position)
        .map(|t| t.vision_modifier())
        .unwrap_or(0);

    let range = unit.unit_type.default_properties().vision as i32
        + unit.rank.vision_bonus()
        + terrain
        + field.weather.vision_modifier()
        + aura_bonus(unit, field, rules, AuraStat::Vision);

    range.max(rules.config.visibility.min_vision as i32) as u32
}

/// Tiles one unit can see right now
pub fn visible_from(unit: &BattleUnit, field: &Battlefield, rules: &Rules) -> Vec<GridCoord> {
    if !unit.is_alive() {
        return Vec::new();
    }
    let range = unit_vision_range(unit, field, rules);
    unit.position
        .tiles_within_manhattan(range)
        .into_iter()
        .filter(|&coord| field.map.in_bounds(coord) && field.map.has_line_of_sight(unit.position, coord))
        .collect()
}

/// Rebuild a team's visibility grid from its living units
pub fn update_visibility(grid: &mut VisibilityGrid, team: Team, field: &Battlefield, rules: &Rules) {
    if grid.width != field.map.width || grid.height != field.map.height {
        *grid = VisibilityGrid::new(field.map.width, field.map.height);
    }

    grid.demote();

    for unit in field.units.living_on(team) {
        for coord in visible_from(unit, field, rules) {
            grid.set(coord, Visibility::Visible);
        }
    }

    tracing::trace!(
        ?team,
        visible = grid.count(Visibility::Visible),
        "visibility updated"
    );
}

/// An attacker gives away its position to the team it shot at
pub fn reveal_attacker(grid: &mut VisibilityGrid, attacker_position: GridCoord) {
    grid.set(attacker_position, Visibility::Visible);
}
