//! AI Commander - main battle AI implementation
//!
//! Plays one unit at a time: fall back when badly hurt, otherwise use an
//! ability, attack the weakest target in reach, or close on the nearest enemy
//! (an open objective or the enemy rear when nothing is in sight).
//!
//! The visible strength ratio shifts the personality: an outnumbered side
//! withdraws earlier and spends offensive abilities less readily.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::abilities::{can_use, AbilityDef, AbilityEffect, AbilityTarget, TargetKind};
use crate::battle::ai::decision_context::DecisionContext;
use crate::battle::ai::personality::AiPersonality;
use crate::battle::ai::BattleAI;
use crate::battle::execution::Action;
use crate::battle::grid::GridCoord;
use crate::battle::movement::find_path;
use crate::battle::stats::weapon_range;
use crate::battle::units::{BattleUnit, UnitId};

/// AI Commander implementing BattleAI trait
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiCommander {
    personality: AiPersonality,
    rng: ChaCha8Rng,
}

impl AiCommander {
    /// Create a new AI commander with default seed
    pub fn new(personality: AiPersonality) -> Self {
        Self::with_seed(personality, 42)
    }

    /// Create with specific RNG seed for deterministic behavior
    pub fn with_seed(personality: AiPersonality, seed: u64) -> Self {
        Self {
            personality,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Roll for making a mistake based on difficulty settings
    fn makes_mistake(&mut self) -> bool {
        self.rng.gen::<f32>() < self.personality.difficulty.mistake_chance
    }

    fn is_outnumbered(&self, strength_ratio: f32) -> bool {
        strength_ratio < self.personality.weights.outnumbered_ratio
    }

    /// Health fraction below which a unit falls back, raised by caution when outnumbered
    fn retreat_threshold(&self, strength_ratio: f32) -> f32 {
        let base = self.personality.weights.retreat_threshold;
        if self.is_outnumbered(strength_ratio) {
            (base + self.personality.behavior.caution * 0.5).min(1.0)
        } else {
            base
        }
    }

    /// Aggression scaled down by the odds when outnumbered
    fn effective_aggression(&self, strength_ratio: f32) -> f32 {
        let aggression = self.personality.behavior.aggression;
        if self.is_outnumbered(strength_ratio) {
            aggression * (strength_ratio / self.personality.weights.outnumbered_ratio).max(0.0)
        } else {
            aggression
        }
    }

    fn should_retreat(&self, unit: &BattleUnit, strength_ratio: f32) -> bool {
        unit.max_hp > 0 && (unit.hp as f32 / unit.max_hp as f32) < self.retreat_threshold(strength_ratio)
    }

    /// Manhattan distance the unit wants to keep from its target
    fn standoff(&self, unit: &BattleUnit, context: &DecisionContext) -> u32 {
        if unit.unit_type.is_ranged() && self.personality.behavior.caution >= self.personality.weights.standoff_threshold {
            weapon_range(unit, context.field.weather).1.max(1)
        } else {
            1
        }
    }

    /// Candidate targets worth trying for one ability, best first
    fn ability_targets(
        &self,
        unit: &BattleUnit,
        def: &AbilityDef,
        context: &DecisionContext,
        strength_ratio: f32,
    ) -> Vec<AbilityTarget> {
        let enemies = context.visible_enemy_units();

        match &def.effect {
            effect if effect.is_offensive() => {
                if self.effective_aggression(strength_ratio) < self.personality.weights.ability_threshold {
                    return Vec::new();
                }
                match def.target {
                    // The controller only accepts visible unit targets
                    TargetKind::Enemy => enemies
                        .iter()
                        .filter(|e| context.visibility.is_visible(e.position))
                        .map(|e| AbilityTarget::Unit(e.id))
                        .collect(),
                    TargetKind::Tile => enemies.iter().map(|e| AbilityTarget::Tile(e.position)).collect(),
                    TargetKind::SelfOnly | TargetKind::Ally => vec![AbilityTarget::Caster],
                }
            }
            AbilityEffect::Heal { radius, .. } => match def.target {
                TargetKind::Ally => context
                    .own_units()
                    .iter()
                    .filter(|u| u.hp < u.max_hp)
                    .map(|u| AbilityTarget::Unit(u.id))
                    .collect(),
                _ => {
                    let wounded_nearby = context
                        .own_units()
                        .iter()
                        .any(|u| u.hp < u.max_hp && u.position.manhattan(&unit.position) <= *radius);
                    if wounded_nearby {
                        vec![AbilityTarget::Caster]
                    } else {
                        Vec::new()
                    }
                }
            },
            // Buffs only when something is already in reach
            AbilityEffect::SelfBuff { .. } | AbilityEffect::Stealth { .. } => {
                if context.targets_for(unit).is_empty() {
                    Vec::new()
                } else {
                    vec![AbilityTarget::Caster]
                }
            }
            _ => Vec::new(),
        }
    }

    fn choose_ability(&self, unit: &BattleUnit, context: &DecisionContext, strength_ratio: f32) -> Option<Action> {
        for def in context.rules.abilities.for_type(unit.unit_type) {
            if def.is_passive() || unit.cooldown(&def.id) > 0 {
                continue;
            }
            for target in self.ability_targets(unit, def, context, strength_ratio) {
                if can_use(unit, &def.id, &target, context.field, context.rules).is_ok() {
                    return Some(Action::UseAbility {
                        unit: unit.id,
                        ability: def.id.clone(),
                        target,
                    });
                }
            }
        }
        None
    }

    /// Attack the weakest enemy in reach
    fn choose_attack(&self, unit: &BattleUnit, context: &DecisionContext) -> Option<Action> {
        context
            .targets_for(unit)
            .into_iter()
            .filter_map(|id| context.field.units.get(id))
            .min_by_key(|target| (target.hp, target.id))
            .map(|target| Action::Attack {
                attacker: unit.id,
                defender: target.id,
            })
    }

    fn choose_retreat(&self, unit: &BattleUnit, context: &DecisionContext) -> Option<Action> {
        let threat = context.closest_enemy_to(unit.position)?;
        let current = unit.position.manhattan(&threat.position);
        let best = context
            .reachable_for(unit)
            .into_iter()
            .max_by_key(|c| c.manhattan(&threat.position))?;

        (best.manhattan(&threat.position) > current).then_some(Action::Move {
            unit: unit.id,
            to: best,
        })
    }

    fn choose_advance(&self, unit: &BattleUnit, context: &DecisionContext) -> Option<Action> {
        let (goal, standoff) = match context.closest_enemy_to(unit.position) {
            Some(enemy) => (enemy.position, self.standoff(unit, context)),
            None => (
                context
                    .closest_open_objective(unit.position)
                    .unwrap_or_else(|| context.enemy_rear()),
                0,
            ),
        };
        let reachable = context.reachable_for(unit);

        // Follow the cheapest route while still outside the standoff distance
        if unit.position.manhattan(&goal) > standoff {
            let along_route = find_path(unit, context.field, context.rules, goal).and_then(|path| {
                path.into_iter()
                    .skip(1)
                    .filter(|c| c.manhattan(&goal) >= standoff)
                    .filter(|c| reachable.contains(c))
                    .last()
            });
            if let Some(to) = along_route {
                return Some(Action::Move { unit: unit.id, to });
            }
        }

        let score = |c: &GridCoord| c.manhattan(&goal).abs_diff(standoff);
        let best = reachable.into_iter().min_by_key(|c| (score(c), *c))?;

        (score(&best) < score(&unit.position)).then_some(Action::Move {
            unit: unit.id,
            to: best,
        })
    }
}

impl BattleAI for AiCommander {
    fn decide(&mut self, context: &DecisionContext, unit_id: UnitId) -> Option<Action> {
        let unit = context.get_own_unit(unit_id)?;

        if self.makes_mistake() {
            tracing::trace!(unit = unit_id.0, "AI hesitates");
            return None;
        }

        let strength_ratio = context.strength_ratio();
        let can_move = !unit.flags.moved && !unit.flags.attacked;
        if can_move && self.should_retreat(unit, strength_ratio) {
            if let Some(action) = self.choose_retreat(unit, context) {
                return Some(action);
            }
        }

        if !unit.flags.used_ability {
            if let Some(action) = self.choose_ability(unit, context, strength_ratio) {
                return Some(action);
            }
        }

        if !unit.flags.attacked {
            if let Some(action) = self.choose_attack(unit, context) {
                return Some(action);
            }
        }

        if can_move {
            return self.choose_advance(unit, context);
        }
        None
    }

    fn personality(&self) -> &AiPersonality {
        &self.personality
    }

    fn ignores_fog_of_war(&self) -> bool {
        self.personality.difficulty.ignores_fog_of_war
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::AbilityId;
    use crate::battle::battle_map::BattleMap;
    use crate::battle::execution::{BattleState, Battlefield, Rules};
    use crate::battle::terrain::TerrainType;
    use crate::battle::unit_type::UnitType;
    use crate::battle::units::Team;

    fn steady() -> AiCommander {
        let mut personality = AiPersonality::default();
        personality.difficulty.mistake_chance = 0.0; // No mistakes for deterministic test
        AiCommander::new(personality)
    }

    fn state_with(units: &[(UnitType, Team, GridCoord)]) -> BattleState {
        let mut field = Battlefield::new(BattleMap::new(12, 12));
        for &(unit_type, team, position) in units {
            field.units.spawn(unit_type, team, position);
        }
        BattleState::new(field, Rules::default(), 3)
    }

    #[test]
    fn test_commander_creation() {
        let commander = AiCommander::new(AiPersonality::default());
        assert!(!commander.ignores_fog_of_war());
        assert_eq!(commander.personality().name, "default");
    }

    #[test]
    fn test_attacks_weakest_target() {
        let mut state = state_with(&[
            (UnitType::Infantry, Team::Player, GridCoord::new(5, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(6, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(5, 6)),
        ]);
        state.field.units.get_mut(UnitId(0)).unwrap().flags.used_ability = true;
        state.field.units.get_mut(UnitId(2)).unwrap().hp = 2;

        let mut commander = steady();
        let context = DecisionContext::new(&state, Team::Player, false);
        assert_eq!(
            commander.decide(&context, UnitId(0)),
            Some(Action::Attack {
                attacker: UnitId(0),
                defender: UnitId(2)
            })
        );
    }

    #[test]
    fn test_digs_in_when_in_contact() {
        let state = state_with(&[
            (UnitType::Infantry, Team::Player, GridCoord::new(5, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(6, 5)),
        ]);
        let mut commander = steady();
        let context = DecisionContext::new(&state, Team::Player, false);
        assert_eq!(
            commander.decide(&context, UnitId(0)),
            Some(Action::UseAbility {
                unit: UnitId(0),
                ability: AbilityId::new("dig_in"),
                target: AbilityTarget::Caster
            })
        );
    }

    #[test]
    fn test_advances_toward_visible_enemy() {
        let state = state_with(&[
            (UnitType::Infantry, Team::Player, GridCoord::new(0, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(4, 5)),
        ]);
        let mut commander = steady();
        let context = DecisionContext::new(&state, Team::Player, false);
        assert_eq!(
            commander.decide(&context, UnitId(0)),
            Some(Action::Move {
                unit: UnitId(0),
                to: GridCoord::new(3, 5)
            })
        );
    }

    #[test]
    fn test_hurt_unit_falls_back() {
        let mut state = state_with(&[
            (UnitType::Infantry, Team::Player, GridCoord::new(5, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(5, 7)),
        ]);
        state.field.units.get_mut(UnitId(0)).unwrap().hp = 1;

        let mut commander = steady();
        let context = DecisionContext::new(&state, Team::Player, false);
        match commander.decide(&context, UnitId(0)) {
            Some(Action::Move { to, .. }) => assert!(to.manhattan(&GridCoord::new(5, 7)) > 2),
            other => panic!("expected a retreat, got {:?}", other),
        }
    }

    #[test]
    fn test_heads_for_objective_when_nothing_in_sight() {
        let mut state = state_with(&[
            (UnitType::Infantry, Team::Player, GridCoord::new(5, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(11, 11)),
        ]);
        state.field.map.add_objective(GridCoord::new(5, 0), "Church");

        let mut commander = steady();
        let context = DecisionContext::new(&state, Team::Player, false);
        assert_eq!(
            commander.decide(&context, UnitId(0)),
            Some(Action::Move {
                unit: UnitId(0),
                to: GridCoord::new(5, 2)
            })
        );
    }

    #[test]
    fn test_advance_follows_route_around_wall() {
        let mut map = BattleMap::new(12, 12);
        map.fill(GridCoord::new(4, 0), GridCoord::new(4, 10), TerrainType::Water);
        map.add_objective(GridCoord::new(8, 2), "Mill");
        let mut field = Battlefield::new(map);
        field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(2, 2));
        field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(11, 11));
        let state = BattleState::new(field, Rules::default(), 3);

        let mut commander = steady();
        let context = DecisionContext::new(&state, Team::Player, false);
        match commander.decide(&context, UnitId(0)) {
            // Three steps along the detour through the gap at (4, 11)
            Some(Action::Move { to, .. }) => assert_eq!(to.manhattan(&GridCoord::new(4, 11)), 8),
            other => panic!("expected a move, got {:?}", other),
        }
    }

    #[test]
    fn test_outnumbered_unit_falls_back_earlier() {
        let mut state = state_with(&[
            (UnitType::Infantry, Team::Player, GridCoord::new(5, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(5, 7)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(4, 7)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(6, 7)),
        ]);
        // 40% health is above the base retreat threshold
        state.field.units.get_mut(UnitId(0)).unwrap().hp = 2;

        let mut commander = steady();
        let context = DecisionContext::new(&state, Team::Player, false);
        assert!(context.strength_ratio() < 0.6);
        match commander.decide(&context, UnitId(0)) {
            Some(Action::Move { to, .. }) => assert!(to.manhattan(&GridCoord::new(5, 7)) > 2),
            other => panic!("expected a retreat, got {:?}", other),
        }
    }

    #[test]
    fn test_even_odds_unit_holds_ground() {
        let mut state = state_with(&[
            (UnitType::Infantry, Team::Player, GridCoord::new(5, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(5, 7)),
        ]);
        state.field.units.get_mut(UnitId(0)).unwrap().hp = 2;
        state.field.units.get_mut(UnitId(1)).unwrap().hp = 2;

        let mut commander = steady();
        let context = DecisionContext::new(&state, Team::Player, false);
        assert_eq!(
            commander.decide(&context, UnitId(0)),
            Some(Action::UseAbility {
                unit: UnitId(0),
                ability: AbilityId::new("grenade"),
                target: AbilityTarget::Tile(GridCoord::new(5, 7))
            })
        );
    }

    #[test]
    fn test_outnumbered_unit_saves_offensive_abilities() {
        let state = state_with(&[
            (UnitType::Infantry, Team::Player, GridCoord::new(5, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(5, 7)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(4, 7)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(6, 7)),
        ]);

        let mut commander = steady();
        let context = DecisionContext::new(&state, Team::Player, false);
        match commander.decide(&context, UnitId(0)) {
            Some(Action::Move { .. }) => {}
            other => panic!("expected an advance, got {:?}", other),
        }
    }

    #[test]
    fn test_certain_mistake_does_nothing() {
        let state = state_with(&[
            (UnitType::Infantry, Team::Player, GridCoord::new(5, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(6, 5)),
        ]);
        let mut personality = AiPersonality::default();
        personality.difficulty.mistake_chance = 1.0;
        let mut commander = AiCommander::new(personality);
        let context = DecisionContext::new(&state, Team::Player, false);
        assert_eq!(commander.decide(&context, UnitId(0)), None);
    }

    #[test]
    fn test_ignores_units_of_other_team() {
        let state = state_with(&[
            (UnitType::Infantry, Team::Player, GridCoord::new(5, 5)),
            (UnitType::Infantry, Team::Enemy, GridCoord::new(6, 5)),
        ]);
        let mut commander = steady();
        let context = DecisionContext::new(&state, Team::Player, false);
        assert_eq!(commander.decide(&context, UnitId(1)), None);
    }
}
