//! Ability engine
//!
//! `can_use` runs every gate in a fixed order and `apply_ability` only mutates
//! after all of them pass, so an ability either takes full effect (effect,
//! cooldown, action flag) or changes nothing.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::abilities::catalog::{AbilityDef, AbilityEffect, AbilityId, AuraStat, TargetKind};
use crate::battle::battle_map::TerrainEffectKind;
use crate::battle::constants::SUPPRESS_TURNS;
use crate::battle::execution::{Battlefield, Rules};
use crate::battle::grid::GridCoord;
use crate::battle::movement::step_cost;
use crate::battle::resolution::{apply_attack, resolve_attack, AttackResolution, CombatContext};
use crate::battle::targeting::check_concealment;
use crate::battle::units::{BattleUnit, StatusKind, UnitId};
use crate::core::error::{BattleError, Result};

/// What an ability is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum AbilityTarget {
    /// The user itself
    Caster,
    Unit(UnitId),
    Tile(GridCoord),
}

/// Observable result of an ability, for the battle log and presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum AppliedEffect {
    StatusApplied {
        unit: UnitId,
        status: StatusKind,
        turns: u32,
    },
    Healed {
        unit: UnitId,
        amount: u32,
    },
    Damaged {
        unit: UnitId,
        amount: u32,
        killed: bool,
    },
    TerrainPlaced {
        kind: TerrainEffectKind,
        center: GridCoord,
        radius: u32,
        turns: u32,
    },
    Pushed {
        unit: UnitId,
        from: GridCoord,
        to: GridCoord,
    },
    Moved {
        unit: UnitId,
        from: GridCoord,
        to: GridCoord,
    },
    Attack(AttackResolution),
}

/// Strongest aura of `stat` reaching the unit from a living ally
///
/// Auras of the same stat do not stack. Recomputed on every call.
pub fn aura_bonus(unit: &BattleUnit, field: &Battlefield, rules: &Rules, stat: AuraStat) -> i32 {
    field
        .units
        .living_on(unit.team)
        .filter(|ally| ally.id != unit.id)
        .flat_map(|ally| {
            let distance = ally.position.chebyshev(&unit.position);
            rules
                .abilities
                .auras(ally.unit_type)
                .filter(move |&(s, _, radius)| s == stat && distance <= radius)
                .map(|(_, amount, _)| amount)
        })
        .max()
        .unwrap_or(0)
}

fn lookup<'a>(unit: &BattleUnit, ability: &AbilityId, rules: &'a Rules) -> Result<&'a AbilityDef> {
    match rules.abilities.get(unit.unit_type, ability) {
        Some(def) => Ok(def),
        None if rules.abilities.knows(ability) => Err(BattleError::InvalidUnitState(format!(
            "{} has no ability '{}'",
            unit.unit_type.name(),
            ability
        ))),
        None => Err(BattleError::DataIntegrity(format!("unknown ability '{}'", ability))),
    }
}

/// Where the ability lands
fn target_coord(target: &AbilityTarget, unit: &BattleUnit, field: &Battlefield) -> Result<GridCoord> {
    match *target {
        AbilityTarget::Caster => Ok(unit.position),
        AbilityTarget::Unit(id) => field
            .units
            .get_living(id)
            .map(|u| u.position)
            .ok_or_else(|| BattleError::InvalidTarget(format!("unit {} is missing or dead", id.0))),
        AbilityTarget::Tile(coord) if field.map.in_bounds(coord) => Ok(coord),
        AbilityTarget::Tile(coord) => Err(BattleError::InvalidTarget(format!(
            "tile ({}, {}) is off the map",
            coord.x, coord.y
        ))),
    }
}

fn check_target_kind(def: &AbilityDef, target: &AbilityTarget, unit: &BattleUnit, field: &Battlefield) -> Result<()> {
    let target_team = match target {
        AbilityTarget::Unit(id) => field.units.get_living(*id).map(|u| (u.id, u.team)),
        _ => None,
    };

    let ok = match def.target {
        TargetKind::SelfOnly => match target {
            AbilityTarget::Caster => true,
            AbilityTarget::Unit(id) => *id == unit.id,
            AbilityTarget::Tile(_) => false,
        },
        TargetKind::Ally => target_team.is_some_and(|(_, team)| team == unit.team),
        TargetKind::Enemy => target_team.is_some_and(|(_, team)| team != unit.team),
        TargetKind::Tile => matches!(target, AbilityTarget::Tile(_)),
    };

    if ok {
        Ok(())
    } else {
        Err(BattleError::InvalidTarget(format!(
            "'{}' needs a {:?} target",
            def.id, def.target
        )))
    }
}

/// Tile a charge ends on: the last tile before the target along a straight,
/// clear lane
fn charge_lane_end(unit: &BattleUnit, target: GridCoord, field: &Battlefield, rules: &Rules) -> Result<GridCoord> {
    let blocked = || BattleError::InvalidTarget("no straight charge lane to the target".into());

    let direction = unit.position.straight_direction_to(&target).ok_or_else(blocked)?;
    let (dx, dy) = direction.step();

    let mut current = unit.position;
    loop {
        let next = current.offset(dx, dy);
        if next == target {
            return Ok(current);
        }
        if field.units.is_occupied(next) || step_cost(unit, field, rules, next).is_none() {
            return Err(blocked());
        }
        current = next;
    }
}

/// Run every gate for using `ability` on `target`
///
/// Order: actor state, ability exists for the type, off cooldown, active,
/// range, stationary requirement, action economy for assaults, target kind,
/// then effect-specific checks.
pub fn can_use(
    unit: &BattleUnit,
    ability: &AbilityId,
    target: &AbilityTarget,
    field: &Battlefield,
    rules: &Rules,
) -> Result<()> {
    if !unit.is_alive() {
        return Err(BattleError::InvalidUnitState(format!("unit {} is dead", unit.id.0)));
    }
    if unit.flags.used_ability {
        return Err(BattleError::InvalidUnitState(format!(
            "unit {} already used an ability this turn",
            unit.id.0
        )));
    }

    let def = lookup(unit, ability, rules)?;

    let cooldown = unit.cooldown(ability);
    if cooldown > 0 {
        return Err(BattleError::InvalidUnitState(format!(
            "'{}' is on cooldown for {} more turns",
            ability, cooldown
        )));
    }

    if def.is_passive() {
        return Err(BattleError::InvalidUnitState(format!("'{}' is passive", ability)));
    }

    let coord = target_coord(target, unit, field)?;
    let distance = unit.position.chebyshev(&coord);
    if distance < def.min_range || distance > def.range {
        return Err(BattleError::InvalidTarget(format!(
            "'{}' reaches {}-{} tiles, target is {} away",
            ability, def.min_range, def.range, distance
        )));
    }

    if def.requires_stationary && unit.flags.moved {
        return Err(BattleError::InvalidUnitState(format!(
            "'{}' cannot be used after moving",
            ability
        )));
    }

    let assault = matches!(def.effect, AbilityEffect::Charge { .. } | AbilityEffect::Push { .. });
    if assault && unit.flags.attacked {
        return Err(BattleError::InvalidUnitState(format!(
            "unit {} already attacked this turn",
            unit.id.0
        )));
    }
    if matches!(def.effect, AbilityEffect::Charge { .. }) && unit.flags.moved {
        return Err(BattleError::InvalidUnitState(format!(
            "unit {} cannot charge after moving",
            unit.id.0
        )));
    }

    check_target_kind(def, target, unit, field)?;

    if assault {
        if let AbilityTarget::Unit(id) = *target {
            if let Some(defender) = field.units.get_living(id) {
                check_concealment(unit.position, defender, field)?;
            }
        }
    }

    if let AbilityEffect::Charge { .. } = def.effect {
        charge_lane_end(unit, coord, field, rules)?;
    }

    Ok(())
}

/// Validate and apply an ability
///
/// On success the cooldown is set, the unit is flagged as having used an
/// ability and the individual effects are returned. On error nothing changed.
pub fn apply_ability<R: Rng>(
    unit_id: UnitId,
    ability: &AbilityId,
    target: &AbilityTarget,
    field: &mut Battlefield,
    rules: &Rules,
    rng: &mut R,
) -> Result<Vec<AppliedEffect>> {
    let unit = field
        .units
        .get(unit_id)
        .ok_or_else(|| BattleError::InvalidUnitState(format!("unit {} does not exist", unit_id.0)))?;
    can_use(unit, ability, target, field, rules)?;

    let def = lookup(unit, ability, rules)?.clone();
    let coord = target_coord(target, unit, field)?;
    let (team, origin) = (unit.team, unit.position);
    let mut effects = Vec::new();

    match def.effect {
        AbilityEffect::SelfBuff {
            status,
            magnitude,
            duration,
        } => {
            if let Some(unit) = field.units.get_mut(unit_id) {
                unit.add_status(status, magnitude, duration);
            }
            effects.push(AppliedEffect::StatusApplied {
                unit: unit_id,
                status,
                turns: duration,
            });
        }

        AbilityEffect::Heal { amount, radius } => {
            let patients: Vec<UnitId> = if radius == 0 {
                match target {
                    AbilityTarget::Unit(id) => vec![*id],
                    _ => vec![unit_id],
                }
            } else {
                field
                    .units
                    .living_on(team)
                    .filter(|u| u.position.manhattan(&coord) <= radius)
                    .map(|u| u.id)
                    .collect()
            };
            for id in patients {
                if let Some(patient) = field.units.get_mut(id) {
                    let restored = patient.heal(amount);
                    effects.push(AppliedEffect::Healed {
                        unit: id,
                        amount: restored,
                    });
                }
            }
        }

        AbilityEffect::AreaDamage {
            damage,
            radius,
            suppress,
        } => {
            let victims: Vec<UnitId> = field
                .units
                .living_on(team.opponent())
                .filter(|u| u.position.manhattan(&coord) <= radius)
                .map(|u| u.id)
                .collect();
            let mut kills = 0;
            for id in victims {
                if let Some(victim) = field.units.get_mut(id) {
                    let dealt = victim.take_damage(damage);
                    let killed = !victim.is_alive();
                    if killed {
                        kills += 1;
                    } else if suppress {
                        victim.add_status(StatusKind::Suppressed, 1, SUPPRESS_TURNS);
                    }
                    effects.push(AppliedEffect::Damaged {
                        unit: id,
                        amount: dealt,
                        killed,
                    });
                }
            }
            if let Some(unit) = field.units.get_mut(unit_id) {
                unit.kills += kills;
            }
        }

        AbilityEffect::TerrainEffect {
            effect,
            radius,
            duration,
        } => {
            field.map.place_effect(effect, coord, radius, duration);
            effects.push(AppliedEffect::TerrainPlaced {
                kind: effect,
                center: coord,
                radius,
                turns: duration,
            });
        }

        AbilityEffect::Push { damage, distance } => {
            if let AbilityTarget::Unit(target_id) = *target {
                let dx = (coord.x - origin.x).signum();
                let dy = (coord.y - origin.y).signum();

                let (dealt, killed, pushed_to) = {
                    let victim = field.units.get(target_id);
                    let alive_after = victim.is_some_and(|v| v.hp > damage);
                    let mut to = coord;
                    if alive_after {
                        if let Some(victim) = victim {
                            for _ in 0..distance {
                                let next = to.offset(dx, dy);
                                let open = field
                                    .map
                                    .terrain_at(next)
                                    .is_some_and(|t| victim.unit_type.can_enter(t))
                                    && !field.units.is_occupied(next);
                                if !open {
                                    break;
                                }
                                to = next;
                            }
                        }
                    }
                    let dealt = victim.map(|v| damage.min(v.hp)).unwrap_or(0);
                    (dealt, !alive_after, to)
                };

                if let Some(victim) = field.units.get_mut(target_id) {
                    victim.take_damage(dealt);
                    victim.position = pushed_to;
                }
                if let Some(unit) = field.units.get_mut(unit_id) {
                    unit.flags.attacked = true;
                }
                effects.push(AppliedEffect::Damaged {
                    unit: target_id,
                    amount: dealt,
                    killed,
                });
                if pushed_to != coord {
                    effects.push(AppliedEffect::Pushed {
                        unit: target_id,
                        from: coord,
                        to: pushed_to,
                    });
                }
                if killed {
                    if let Some(unit) = field.units.get_mut(unit_id) {
                        unit.kills += 1;
                    }
                }
            }
        }

        AbilityEffect::Stealth {
            engagement_range,
            duration,
        } => {
            if let Some(unit) = field.units.get_mut(unit_id) {
                unit.add_status(StatusKind::Camouflaged, engagement_range as i32, duration);
            }
            effects.push(AppliedEffect::StatusApplied {
                unit: unit_id,
                status: StatusKind::Camouflaged,
                turns: duration,
            });
        }

        // Passive, rejected by can_use
        AbilityEffect::Aura { .. } => {}

        AbilityEffect::Charge { attack_bonus } => {
            if let AbilityTarget::Unit(target_id) = *target {
                let end = match field.units.get(unit_id) {
                    Some(unit) => charge_lane_end(unit, coord, field, rules)?,
                    None => origin,
                };
                if let Some(unit) = field.units.get_mut(unit_id) {
                    unit.position = end;
                    unit.flags.moved = true;
                }
                effects.push(AppliedEffect::Moved {
                    unit: unit_id,
                    from: origin,
                    to: end,
                });

                if let (Some(attacker), Some(defender)) =
                    (field.units.get(unit_id), field.units.get(target_id))
                {
                    let context =
                        CombatContext::gather(attacker, defender, field, rules).with_ability_bonus(attack_bonus);
                    let resolution = resolve_attack(attacker, defender, &context, &rules.config.combat, rng);
                    apply_attack(&resolution, &mut field.units);
                    effects.push(AppliedEffect::Attack(resolution));
                }
            }
        }
    }

    if let Some(unit) = field.units.get_mut(unit_id) {
        if def.cooldown > 0 {
            unit.cooldowns.insert(def.id.clone(), def.cooldown);
        }
        unit.flags.used_ability = true;
    }

    tracing::debug!(unit = unit_id.0, ability = %def.id, effects = effects.len(), "ability applied");
    Ok(effects)
}

/// Count every cooldown down by one turn, never below zero
pub fn tick_cooldowns(unit: &mut BattleUnit) {
    for remaining in unit.cooldowns.values_mut() {
        *remaining = remaining.saturating_sub(1);
    }
    unit.cooldowns.retain(|_, remaining| *remaining > 0);
}

/// Age status effects by one turn
pub fn tick_status_effects(unit: &mut BattleUnit) {
    unit.tick_statuses();
}

/// Heal every wounded living unit covered by an ally's healing aura
pub fn healing_aura_pass(field: &mut Battlefield, rules: &Rules) -> Vec<AppliedEffect> {
    let heals: Vec<(UnitId, u32)> = field
        .units
        .living()
        .filter(|u| u.hp < u.max_hp)
        .filter_map(|u| {
            let amount = aura_bonus(u, field, rules, AuraStat::Healing);
            (amount > 0).then_some((u.id, amount as u32))
        })
        .collect();

    let mut effects = Vec::new();
    for (id, amount) in heals {
        if let Some(unit) = field.units.get_mut(id) {
            let restored = unit.heal(amount);
            effects.push(AppliedEffect::Healed {
                unit: id,
                amount: restored,
            });
        }
    }
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::battle_map::BattleMap;
    use crate::battle::terrain::TerrainType;
    use crate::battle::unit_type::UnitType;
    use crate::battle::units::Team;
    use rand::rngs::mock::StepRng;

    fn setup() -> (Battlefield, Rules) {
        (Battlefield::new(BattleMap::new(10, 10)), Rules::default())
    }

    fn id(s: &str) -> AbilityId {
        AbilityId::new(s)
    }

    #[test]
    fn test_dig_in_applies_status_and_cooldown() {
        let (mut field, rules) = setup();
        let rifle = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(3, 3));

        let effects = apply_ability(
            rifle,
            &id("dig_in"),
            &AbilityTarget::Caster,
            &mut field,
            &rules,
            &mut StepRng::new(0, 1),
        )
        .unwrap();

        assert_eq!(effects.len(), 1);
        let unit = field.units.get(rifle).unwrap();
        assert_eq!(unit.status_magnitude(StatusKind::Entrenched), 2);
        assert_eq!(unit.cooldown(&id("dig_in")), 3);
        assert!(unit.flags.used_ability);
    }

    #[test]
    fn test_unknown_ability_is_data_integrity() {
        let (mut field, rules) = setup();
        let rifle = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(3, 3));
        let result = can_use(
            field.units.get(rifle).unwrap(),
            &id("orbital_strike"),
            &AbilityTarget::Caster,
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::DataIntegrity(_))));
    }

    #[test]
    fn test_ability_of_another_type_rejected() {
        let (mut field, rules) = setup();
        let rifle = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(3, 3));
        let result = can_use(
            field.units.get(rifle).unwrap(),
            &id("camouflage"),
            &AbilityTarget::Caster,
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidUnitState(_))));
    }

    #[test]
    fn test_cooldown_blocks_and_ticks_down() {
        let (mut field, rules) = setup();
        let rifle = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(3, 3));
        {
            let unit = field.units.get_mut(rifle).unwrap();
            unit.cooldowns.insert(id("dig_in"), 1);
        }
        let blocked = can_use(
            field.units.get(rifle).unwrap(),
            &id("dig_in"),
            &AbilityTarget::Caster,
            &field,
            &rules,
        );
        assert!(matches!(blocked, Err(BattleError::InvalidUnitState(_))));

        tick_cooldowns(field.units.get_mut(rifle).unwrap());
        tick_cooldowns(field.units.get_mut(rifle).unwrap());
        assert_eq!(field.units.get(rifle).unwrap().cooldown(&id("dig_in")), 0);
        assert!(can_use(
            field.units.get(rifle).unwrap(),
            &id("dig_in"),
            &AbilityTarget::Caster,
            &field,
            &rules
        )
        .is_ok());
    }

    #[test]
    fn test_passive_cannot_be_activated() {
        let (mut field, rules) = setup();
        let officer = field.units.spawn(UnitType::Officer, Team::Player, GridCoord::new(3, 3));
        let result = can_use(
            field.units.get(officer).unwrap(),
            &id("rally"),
            &AbilityTarget::Caster,
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidUnitState(_))));
    }

    #[test]
    fn test_grenade_min_range() {
        let (mut field, rules) = setup();
        let rifle = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(3, 3));
        let result = can_use(
            field.units.get(rifle).unwrap(),
            &id("grenade"),
            &AbilityTarget::Tile(GridCoord::new(4, 3)),
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidTarget(_))));
    }

    #[test]
    fn test_stationary_requirement() {
        let (mut field, rules) = setup();
        let mg = field.units.spawn(UnitType::MachineGunner, Team::Player, GridCoord::new(3, 3));
        field.units.get_mut(mg).unwrap().flags.moved = true;
        let result = can_use(
            field.units.get(mg).unwrap(),
            &id("suppressing_fire"),
            &AbilityTarget::Tile(GridCoord::new(5, 3)),
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidUnitState(_))));
    }

    #[test]
    fn test_wrong_target_kind() {
        let (mut field, rules) = setup();
        let medic = field.units.spawn(UnitType::Medic, Team::Player, GridCoord::new(3, 3));
        let enemy = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(4, 3));
        let result = can_use(
            field.units.get(medic).unwrap(),
            &id("field_dressing"),
            &AbilityTarget::Unit(enemy),
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidTarget(_))));
    }

    #[test]
    fn test_field_dressing_heals_ally() {
        let (mut field, rules) = setup();
        let medic = field.units.spawn(UnitType::Medic, Team::Player, GridCoord::new(3, 3));
        let rifle = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(4, 3));
        field.units.get_mut(rifle).unwrap().hp = 2;

        let effects = apply_ability(
            medic,
            &id("field_dressing"),
            &AbilityTarget::Unit(rifle),
            &mut field,
            &rules,
            &mut StepRng::new(0, 1),
        )
        .unwrap();
        assert_eq!(effects, vec![AppliedEffect::Healed { unit: rifle, amount: 2 }]);
        assert_eq!(field.units.get(rifle).unwrap().hp, 4);
    }

    #[test]
    fn test_suppressing_fire_hits_enemies_only() {
        let (mut field, rules) = setup();
        let mg = field.units.spawn(UnitType::MachineGunner, Team::Player, GridCoord::new(2, 5));
        let friend = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(5, 4));
        let foe = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(5, 5));
        let far = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(5, 7));

        apply_ability(
            mg,
            &id("suppressing_fire"),
            &AbilityTarget::Tile(GridCoord::new(5, 5)),
            &mut field,
            &rules,
            &mut StepRng::new(0, 1),
        )
        .unwrap();

        assert_eq!(field.units.get(friend).unwrap().hp, 5);
        assert_eq!(field.units.get(foe).unwrap().hp, 4);
        assert!(field.units.get(foe).unwrap().has_status(StatusKind::Suppressed));
        assert_eq!(field.units.get(far).unwrap().hp, 5);
    }

    #[test]
    fn test_smoke_screen_places_effect() {
        let (mut field, rules) = setup();
        let eng = field.units.spawn(UnitType::Engineer, Team::Player, GridCoord::new(2, 2));
        apply_ability(
            eng,
            &id("smoke_screen"),
            &AbilityTarget::Tile(GridCoord::new(4, 4)),
            &mut field,
            &rules,
            &mut StepRng::new(0, 1),
        )
        .unwrap();
        assert!(field.map.is_smoked(GridCoord::new(4, 5)));
        assert!(!field.map.is_smoked(GridCoord::new(5, 5)));
    }

    #[test]
    fn test_ram_pushes_target_back() {
        let (mut field, rules) = setup();
        let tank = field.units.spawn(UnitType::Tank, Team::Player, GridCoord::new(3, 3));
        let foe = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(4, 3));

        let effects = apply_ability(
            tank,
            &id("ram"),
            &AbilityTarget::Unit(foe),
            &mut field,
            &rules,
            &mut StepRng::new(0, 1),
        )
        .unwrap();

        let foe_unit = field.units.get(foe).unwrap();
        assert_eq!(foe_unit.hp, 3);
        assert_eq!(foe_unit.position, GridCoord::new(5, 3));
        assert!(effects.iter().any(|e| matches!(e, AppliedEffect::Pushed { .. })));
    }

    #[test]
    fn test_ram_into_water_does_not_move() {
        let (mut field, rules) = setup();
        field.map.set_terrain(GridCoord::new(5, 3), TerrainType::Water);
        let tank = field.units.spawn(UnitType::Tank, Team::Player, GridCoord::new(3, 3));
        let foe = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(4, 3));

        apply_ability(
            tank,
            &id("ram"),
            &AbilityTarget::Unit(foe),
            &mut field,
            &rules,
            &mut StepRng::new(0, 1),
        )
        .unwrap();
        assert_eq!(field.units.get(foe).unwrap().position, GridCoord::new(4, 3));
    }

    #[test]
    fn test_charge_moves_and_attacks() {
        let (mut field, rules) = setup();
        let cav = field.units.spawn(UnitType::Cavalry, Team::Player, GridCoord::new(1, 5));
        let foe = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(4, 5));

        let effects = apply_ability(
            cav,
            &id("charge"),
            &AbilityTarget::Unit(foe),
            &mut field,
            &rules,
            &mut StepRng::new(u64::MAX, 0),
        )
        .unwrap();

        assert_eq!(field.units.get(cav).unwrap().position, GridCoord::new(3, 5));
        let resolution = effects
            .iter()
            .find_map(|e| match e {
                AppliedEffect::Attack(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        // 4 base + 2 charge vs 1 defense
        assert_eq!(resolution.raw_attack, 6);
        assert_eq!(resolution.damage, 5);
        assert!(resolution.killed);
    }

    #[test]
    fn test_charge_needs_clear_straight_lane() {
        let (mut field, rules) = setup();
        let cav = field.units.spawn(UnitType::Cavalry, Team::Player, GridCoord::new(1, 5));
        let foe = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(4, 6));
        let result = can_use(
            field.units.get(cav).unwrap(),
            &id("charge"),
            &AbilityTarget::Unit(foe),
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidTarget(_))));

        field.units.get_mut(foe).unwrap().position = GridCoord::new(4, 5);
        field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(2, 5));
        let before = field.clone();
        let result = apply_ability(
            cav,
            &id("charge"),
            &AbilityTarget::Unit(foe),
            &mut field,
            &rules,
            &mut StepRng::new(0, 1),
        );
        assert!(result.is_err());
        assert_eq!(field, before);
    }

    #[test]
    fn test_charge_rejected_after_attacking() {
        let (mut field, rules) = setup();
        let cav = field.units.spawn(UnitType::Cavalry, Team::Player, GridCoord::new(1, 5));
        let foe = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(4, 5));
        field.units.get_mut(cav).unwrap().flags.attacked = true;

        let result = can_use(
            field.units.get(cav).unwrap(),
            &id("charge"),
            &AbilityTarget::Unit(foe),
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidUnitState(_))));
    }

    #[test]
    fn test_charge_rejected_after_moving() {
        let (mut field, rules) = setup();
        let cav = field.units.spawn(UnitType::Cavalry, Team::Player, GridCoord::new(1, 5));
        let foe = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(4, 5));
        field.units.get_mut(cav).unwrap().flags.moved = true;

        let result = can_use(
            field.units.get(cav).unwrap(),
            &id("charge"),
            &AbilityTarget::Unit(foe),
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidUnitState(_))));
    }

    #[test]
    fn test_ram_rejected_after_attacking_and_marks_attack() {
        let (mut field, rules) = setup();
        let tank = field.units.spawn(UnitType::Tank, Team::Player, GridCoord::new(3, 3));
        let foe = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(4, 3));

        apply_ability(
            tank,
            &id("ram"),
            &AbilityTarget::Unit(foe),
            &mut field,
            &rules,
            &mut StepRng::new(0, 1),
        )
        .unwrap();
        assert!(field.units.get(tank).unwrap().flags.attacked);

        let tank_unit = field.units.get_mut(tank).unwrap();
        tank_unit.flags.used_ability = false;
        tank_unit.cooldowns.clear();
        field.units.get_mut(foe).unwrap().position = GridCoord::new(4, 3);
        let result = can_use(
            field.units.get(tank).unwrap(),
            &id("ram"),
            &AbilityTarget::Unit(foe),
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidUnitState(_))));
    }

    #[test]
    fn test_charge_cannot_reach_camouflaged_target() {
        let (mut field, rules) = setup();
        let cav = field.units.spawn(UnitType::Cavalry, Team::Player, GridCoord::new(1, 5));
        let foe = field.units.spawn(UnitType::Sniper, Team::Enemy, GridCoord::new(4, 5));
        field
            .units
            .get_mut(foe)
            .unwrap()
            .add_status(StatusKind::Camouflaged, 2, 2);

        let result = can_use(
            field.units.get(cav).unwrap(),
            &id("charge"),
            &AbilityTarget::Unit(foe),
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidTarget(_))));
    }

    #[test]
    fn test_ram_cannot_reach_into_smoke() {
        let (mut field, rules) = setup();
        let tank = field.units.spawn(UnitType::Tank, Team::Player, GridCoord::new(3, 3));
        let foe = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(4, 3));
        field.map.place_effect(TerrainEffectKind::Smoke, GridCoord::new(4, 3), 0, 2);

        let result = can_use(
            field.units.get(tank).unwrap(),
            &id("ram"),
            &AbilityTarget::Unit(foe),
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidTarget(_))));
    }

    #[test]
    fn test_one_ability_per_turn() {
        let (mut field, rules) = setup();
        let cav = field.units.spawn(UnitType::Cavalry, Team::Player, GridCoord::new(1, 5));
        apply_ability(
            cav,
            &id("envelop"),
            &AbilityTarget::Caster,
            &mut field,
            &rules,
            &mut StepRng::new(0, 1),
        )
        .unwrap();
        let result = can_use(
            field.units.get(cav).unwrap(),
            &id("charge"),
            &AbilityTarget::Caster,
            &field,
            &rules,
        );
        assert!(matches!(result, Err(BattleError::InvalidUnitState(_))));
    }

    #[test]
    fn test_healing_aura_pass() {
        let (mut field, rules) = setup();
        field.units.spawn(UnitType::Medic, Team::Player, GridCoord::new(3, 3));
        let near = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(4, 4));
        let far = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(7, 7));
        let foe = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(3, 4));
        for id in [near, far, foe] {
            field.units.get_mut(id).unwrap().hp = 2;
        }

        let effects = healing_aura_pass(&mut field, &rules);
        assert_eq!(effects.len(), 1);
        assert_eq!(field.units.get(near).unwrap().hp, 3);
        assert_eq!(field.units.get(far).unwrap().hp, 2);
        assert_eq!(field.units.get(foe).unwrap().hp, 2);
    }

    #[test]
    fn test_aura_does_not_stack() {
        let (mut field, rules) = setup();
        let rifle = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(5, 5));
        field.units.spawn(UnitType::Officer, Team::Player, GridCoord::new(4, 4));
        field.units.spawn(UnitType::Officer, Team::Player, GridCoord::new(6, 6));
        assert_eq!(
            aura_bonus(field.units.get(rifle).unwrap(), &field, &rules, AuraStat::Attack),
            1
        );
    }
}
