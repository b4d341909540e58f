//! Movement resolver: reachable tiles and paths
//!
//! Reachability is a cost-limited Dijkstra expansion over the 4-neighbourhood.
//! Tiles holding a living unit are never destinations, but units can be walked
//! through unless the config says enemies block traversal.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use ahash::AHashMap;

use crate::battle::execution::{Battlefield, Rules};
use crate::battle::grid::GridCoord;
use crate::battle::stats::effective_movement;
use crate::battle::units::BattleUnit;

/// Cost for `unit` to step onto `coord`, None if it cannot
pub fn step_cost(unit: &BattleUnit, field: &Battlefield, rules: &Rules, coord: GridCoord) -> Option<u32> {
    let terrain = field.map.terrain_at(coord)?;
    let cost = unit.unit_type.movement_cost(terrain)?;

    if rules.config.movement.enemies_block_traversal {
        if let Some(other) = field.units.unit_at(coord) {
            if other.team != unit.team {
                return None;
            }
        }
    }

    Some(cost + field.weather.movement_surcharge(terrain))
}

/// Cheapest cost to every tile within the unit's movement allowance
fn movement_costs(unit: &BattleUnit, field: &Battlefield, rules: &Rules, budget: u32) -> AHashMap<GridCoord, u32> {
    let mut costs: AHashMap<GridCoord, u32> = AHashMap::new();
    let mut open = BinaryHeap::new();

    costs.insert(unit.position, 0);
    open.push(Reverse((0u32, unit.position)));

    while let Some(Reverse((cost, coord))) = open.pop() {
        if costs.get(&coord).is_some_and(|&best| cost > best) {
            continue;
        }

        for neighbor in coord.neighbors() {
            let Some(step) = step_cost(unit, field, rules, neighbor) else {
                continue;
            };
            let total = cost + step;
            if total > budget {
                continue;
            }
            if costs.get(&neighbor).map_or(true, |&best| total < best) {
                costs.insert(neighbor, total);
                open.push(Reverse((total, neighbor)));
            }
        }
    }

    costs
}

/// Tiles the unit can end its move on this turn
///
/// Excludes the unit's own tile and any tile holding a living unit. Dead
/// units reach nothing.
pub fn compute_reachable(unit: &BattleUnit, field: &Battlefield, rules: &Rules) -> BTreeSet<GridCoord> {
    if !unit.is_alive() {
        return BTreeSet::new();
    }

    let budget = effective_movement(unit, field, rules);
    let reachable: BTreeSet<GridCoord> = movement_costs(unit, field, rules, budget)
        .into_keys()
        .filter(|&coord| coord != unit.position && !field.units.is_occupied(coord))
        .collect();

    tracing::trace!(unit = unit.id.0, budget, count = reachable.len(), "computed reachable tiles");
    reachable
}

/// Find the cheapest path from the unit to `goal` using A*
///
/// Ignores the movement allowance; the AI follows it towards distant goals.
/// The goal itself may be occupied. Returns the full path including start and
/// goal, or None if the goal cannot be reached at all.
pub fn find_path(
    unit: &BattleUnit,
    field: &Battlefield,
    rules: &Rules,
    goal: GridCoord,
) -> Option<Vec<GridCoord>> {
    let start = unit.position;
    if start == goal {
        return Some(vec![start]);
    }
    if !field.map.in_bounds(goal) {
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut came_from: AHashMap<GridCoord, GridCoord> = AHashMap::new();
    let mut g_scores: AHashMap<GridCoord, u32> = AHashMap::new();

    g_scores.insert(start, 0);
    open.push(Reverse((start.manhattan(&goal), start)));

    while let Some(Reverse((_, current))) = open.pop() {
        if current == goal {
            return Some(reconstruct_path(&came_from, current));
        }

        let current_g = g_scores.get(&current).copied().unwrap_or(u32::MAX);

        for neighbor in current.neighbors() {
            let step = if neighbor == goal {
                // The goal tile may hold the unit we are heading for
                field
                    .map
                    .terrain_at(neighbor)
                    .and_then(|t| unit.unit_type.movement_cost(t))
            } else {
                step_cost(unit, field, rules, neighbor)
            };
            let Some(step) = step else {
                continue;
            };

            let tentative_g = current_g.saturating_add(step);
            if tentative_g < g_scores.get(&neighbor).copied().unwrap_or(u32::MAX) {
                came_from.insert(neighbor, current);
                g_scores.insert(neighbor, tentative_g);
                open.push(Reverse((tentative_g + neighbor.manhattan(&goal), neighbor)));
            }
        }
    }

    None
}

/// Reconstruct path from came_from map
fn reconstruct_path(came_from: &AHashMap<GridCoord, GridCoord>, mut current: GridCoord) -> Vec<GridCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
