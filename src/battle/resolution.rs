//! Combat resolution
//!
//! One canonical formula:
//!
//! ```text
//! raw_attack        = base + status + aura + flank + high ground + matchup
//!                     + tech + doctrine + combined arms + ability
//! effective_defense = max(0, base + terrain + status + aura + tech + doctrine)
//!                     (0 when an encircling attacker flanks)
//! armor_reduction   = max(0, armor - attacker armor piercing)
//! damage            = max(1, raw_attack - effective_defense - armor_reduction)
//!                     x2 on a critical hit
//! ```
//!
//! Every term is kept as a `ModifierLine` so a resolved attack can be
//! explained and replayed. The single random draw (critical hit) goes through
//! the caller's generator.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::abilities::{aura_bonus, AuraStat};
use crate::battle::constants::{CRITICAL_MULTIPLIER, XP_CRITICAL, XP_FLANKING, XP_HIT, XP_KILL};
use crate::battle::doctrine::TeamProfile;
use crate::battle::engagement::{combined_arms_partner, high_ground, is_flanking};
use crate::battle::execution::{Battlefield, Rules};
use crate::battle::stats::{armor, base_attack, base_defense, status_attack, status_defense};
use crate::battle::unit_type::type_matchup_bonus;
use crate::battle::units::{BattleUnit, Rank, StatusKind, UnitId, UnitRoster};
use crate::core::config::CombatConfig;

/// Where a modifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierSource {
    /// Type stat + permanent bonus + rank
    Base,
    Status,
    Aura,
    Terrain,
    Flanking,
    HighGround,
    TypeMatchup,
    Tech,
    Doctrine,
    CombinedArms,
    /// Extra attack granted by the ability that triggered the attack
    Ability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierLine {
    pub source: ModifierSource,
    pub value: i32,
}

/// Situational inputs to an attack, gathered from the battlefield
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatContext {
    pub flanking: bool,
    pub high_ground: bool,
    pub combined_arms: bool,
    pub attack_aura: i32,
    pub defense_aura: i32,
    pub terrain_defense: i32,
    pub ability_bonus: i32,
    pub attacker_profile: TeamProfile,
    pub defender_profile: TeamProfile,
}

impl CombatContext {
    pub fn gather(attacker: &BattleUnit, defender: &BattleUnit, field: &Battlefield, rules: &Rules) -> Self {
        Self {
            flanking: is_flanking(attacker, defender, &field.units),
            high_ground: high_ground(attacker, defender, &field.map),
            combined_arms: combined_arms_partner(attacker, &field.units).is_some(),
            attack_aura: aura_bonus(attacker, field, rules, AuraStat::Attack),
            defense_aura: aura_bonus(defender, field, rules, AuraStat::Defense),
            terrain_defense: field.map.defense_bonus(defender.position),
            ability_bonus: 0,
            attacker_profile: *field.profile(attacker.team),
            defender_profile: *field.profile(defender.team),
        }
    }

    pub fn with_ability_bonus(mut self, bonus: i32) -> Self {
        self.ability_bonus = bonus;
        self
    }
}

/// Fully itemised outcome of one attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackResolution {
    pub attacker: UnitId,
    pub defender: UnitId,
    pub attack_lines: Vec<ModifierLine>,
    pub defense_lines: Vec<ModifierLine>,
    pub raw_attack: i32,
    pub effective_defense: i32,
    /// Defense forced to zero by an encircling flank
    pub defense_negated: bool,
    pub armor_reduction: i32,
    pub damage: u32,
    pub critical: bool,
    pub killed: bool,
    pub flanking: bool,
    pub xp_gain: u32,
}

fn push_line(lines: &mut Vec<ModifierLine>, source: ModifierSource, value: i32) {
    if value != 0 || source == ModifierSource::Base {
        lines.push(ModifierLine { source, value });
    }
}

/// Resolve an attack without touching any state
///
/// Draws exactly one random number for the critical roll.
pub fn resolve_attack<R: Rng>(
    attacker: &BattleUnit,
    defender: &BattleUnit,
    context: &CombatContext,
    config: &CombatConfig,
    rng: &mut R,
) -> AttackResolution {
    let mut attack_lines = Vec::new();
    push_line(&mut attack_lines, ModifierSource::Base, base_attack(attacker));
    push_line(&mut attack_lines, ModifierSource::Status, status_attack(attacker));
    push_line(&mut attack_lines, ModifierSource::Aura, context.attack_aura);
    if context.flanking {
        push_line(&mut attack_lines, ModifierSource::Flanking, config.flank_bonus);
    }
    if context.high_ground {
        push_line(&mut attack_lines, ModifierSource::HighGround, config.high_ground_bonus);
    }
    push_line(
        &mut attack_lines,
        ModifierSource::TypeMatchup,
        type_matchup_bonus(attacker.unit_type, defender.unit_type),
    );
    push_line(&mut attack_lines, ModifierSource::Tech, context.attacker_profile.tech.attack);
    push_line(&mut attack_lines, ModifierSource::Doctrine, context.attacker_profile.doctrine.attack);
    if context.combined_arms {
        push_line(&mut attack_lines, ModifierSource::CombinedArms, config.combined_arms_bonus);
    }
    push_line(&mut attack_lines, ModifierSource::Ability, context.ability_bonus);

    let mut defense_lines = Vec::new();
    push_line(&mut defense_lines, ModifierSource::Base, base_defense(defender));
    push_line(&mut defense_lines, ModifierSource::Terrain, context.terrain_defense);
    push_line(&mut defense_lines, ModifierSource::Status, status_defense(defender));
    push_line(&mut defense_lines, ModifierSource::Aura, context.defense_aura);
    push_line(&mut defense_lines, ModifierSource::Tech, context.defender_profile.tech.defense);
    push_line(&mut defense_lines, ModifierSource::Doctrine, context.defender_profile.doctrine.defense);

    let raw_attack: i32 = attack_lines.iter().map(|l| l.value).sum();
    let defense_negated = context.flanking && attacker.has_status(StatusKind::Encircling);
    let effective_defense = if defense_negated {
        0
    } else {
        defense_lines.iter().map(|l| l.value).sum::<i32>().max(0)
    };
    let armor_reduction = (armor(defender) - context.attacker_profile.tech.armor_piercing).max(0);

    let base_damage = (raw_attack - effective_defense - armor_reduction).max(1) as u32;

    let crit_chance = config.base_crit_chance + context.attacker_profile.tech.crit_chance;
    let roll: f32 = rng.gen();
    let critical = attacker.has_status(StatusKind::AimedShot) || roll < crit_chance;
    let damage = if critical {
        base_damage * CRITICAL_MULTIPLIER
    } else {
        base_damage
    };

    let killed = damage >= defender.hp;
    let mut xp_gain = if killed { XP_KILL } else { XP_HIT };
    if context.flanking {
        xp_gain += XP_FLANKING;
    }
    if critical {
        xp_gain += XP_CRITICAL;
    }

    AttackResolution {
        attacker: attacker.id,
        defender: defender.id,
        attack_lines,
        defense_lines,
        raw_attack,
        effective_defense,
        defense_negated,
        armor_reduction,
        damage,
        critical,
        killed,
        flanking: context.flanking,
        xp_gain,
    }
}

/// Commit a resolved attack to the roster
///
/// Damage clamps hp at 0. The attacker earns XP (and a kill), is marked as
/// having attacked and spends any aimed shot. Returns the attacker's new rank
/// if it was promoted.
pub fn apply_attack(resolution: &AttackResolution, units: &mut UnitRoster) -> Option<Rank> {
    if let Some(defender) = units.get_mut(resolution.defender) {
        defender.take_damage(resolution.damage);
    }

    let attacker = units.get_mut(resolution.attacker)?;
    attacker.flags.attacked = true;
    attacker.remove_status(StatusKind::AimedShot);
    if resolution.killed {
        attacker.kills += 1;
    }
    attacker.gain_xp(resolution.xp_gain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::battle_map::BattleMap;
    use crate::battle::doctrine::{Nation, TechBonuses};
    use crate::battle::grid::GridCoord;
    use crate::battle::terrain::TerrainType;
    use crate::battle::unit_type::UnitType;
    use crate::battle::units::Team;
    use rand::rngs::mock::StepRng;

    fn no_crit() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn duel(defender_hp: u32) -> (UnitRoster, UnitId, UnitId) {
        let mut units = UnitRoster::new();
        let a = units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(2, 4));
        let d = units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(3, 4));
        units.get_mut(d).unwrap().hp = defender_hp;
        (units, a, d)
    }

    #[test]
    fn test_plain_infantry_exchange() {
        let (mut units, a, d) = duel(3);
        let result = resolve_attack(
            units.get(a).unwrap(),
            units.get(d).unwrap(),
            &CombatContext::default(),
            &CombatConfig::default(),
            &mut no_crit(),
        );

        assert_eq!(result.raw_attack, 3);
        assert_eq!(result.effective_defense, 1);
        assert_eq!(result.damage, 2);
        assert!(!result.critical);
        assert!(!result.killed);
        assert_eq!(result.xp_gain, 25);

        apply_attack(&result, &mut units);
        assert_eq!(units.get(d).unwrap().hp, 1);
        assert!(units.get(a).unwrap().flags.attacked);
    }

    #[test]
    fn test_flanking_into_trench() {
        let (units, a, d) = duel(2);
        let context = CombatContext {
            flanking: true,
            terrain_defense: TerrainType::Trench.defense_bonus(),
            ..Default::default()
        };
        let result = resolve_attack(
            units.get(a).unwrap(),
            units.get(d).unwrap(),
            &context,
            &CombatConfig::default(),
            &mut no_crit(),
        );

        assert_eq!(result.raw_attack, 4);
        assert_eq!(result.effective_defense, 3);
        assert_eq!(result.damage, 1);
        assert!(!result.killed);
        assert_eq!(result.xp_gain, 40);
        assert!(result
            .attack_lines
            .contains(&ModifierLine { source: ModifierSource::Flanking, value: 1 }));
    }

    #[test]
    fn test_minimum_damage_is_one() {
        let mut units = UnitRoster::new();
        let medic = units.spawn(UnitType::Medic, Team::Player, GridCoord::new(0, 0));
        let tank = units.spawn(UnitType::Tank, Team::Enemy, GridCoord::new(1, 0));
        let result = resolve_attack(
            units.get(medic).unwrap(),
            units.get(tank).unwrap(),
            &CombatContext::default(),
            &CombatConfig::default(),
            &mut no_crit(),
        );
        assert_eq!(result.armor_reduction, 2);
        assert_eq!(result.damage, 1);
    }

    #[test]
    fn test_armor_piercing_tech() {
        let mut units = UnitRoster::new();
        let eng = units.spawn(UnitType::Engineer, Team::Player, GridCoord::new(0, 0));
        let tank = units.spawn(UnitType::Tank, Team::Enemy, GridCoord::new(1, 0));
        let context = CombatContext {
            attacker_profile: TeamProfile::default().with_tech(TechBonuses {
                armor_piercing: 3,
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = resolve_attack(
            units.get(eng).unwrap(),
            units.get(tank).unwrap(),
            &context,
            &CombatConfig::default(),
            &mut no_crit(),
        );
        // 2 base + 2 matchup vs 2 defense, armor fully pierced
        assert_eq!(result.raw_attack, 4);
        assert_eq!(result.armor_reduction, 0);
        assert_eq!(result.damage, 2);
    }

    #[test]
    fn test_critical_doubles_damage() {
        let (units, a, d) = duel(5);
        let result = resolve_attack(
            units.get(a).unwrap(),
            units.get(d).unwrap(),
            &CombatContext::default(),
            &CombatConfig::default(),
            &mut StepRng::new(0, 0),
        );
        assert!(result.critical);
        assert_eq!(result.damage, 4);
        assert_eq!(result.xp_gain, 35);
    }

    #[test]
    fn test_aimed_shot_guarantees_crit_and_is_consumed() {
        let (mut units, a, d) = duel(5);
        units.get_mut(a).unwrap().add_status(StatusKind::AimedShot, 0, 2);
        let result = resolve_attack(
            units.get(a).unwrap(),
            units.get(d).unwrap(),
            &CombatContext::default(),
            &CombatConfig::default(),
            &mut no_crit(),
        );
        assert!(result.critical);

        apply_attack(&result, &mut units);
        assert!(!units.get(a).unwrap().has_status(StatusKind::AimedShot));
    }

    #[test]
    fn test_encircling_flank_ignores_defense() {
        let (mut units, a, d) = duel(5);
        units.get_mut(a).unwrap().add_status(StatusKind::Encircling, 0, 1);
        let context = CombatContext {
            flanking: true,
            terrain_defense: 2,
            ..Default::default()
        };
        let result = resolve_attack(
            units.get(a).unwrap(),
            units.get(d).unwrap(),
            &context,
            &CombatConfig::default(),
            &mut no_crit(),
        );
        assert!(result.defense_negated);
        assert_eq!(result.effective_defense, 0);
        assert_eq!(result.damage, 4);
    }

    #[test]
    fn test_kill_awards_xp_and_kill_count() {
        let (mut units, a, d) = duel(1);
        let result = resolve_attack(
            units.get(a).unwrap(),
            units.get(d).unwrap(),
            &CombatContext::default(),
            &CombatConfig::default(),
            &mut no_crit(),
        );
        assert!(result.killed);
        assert_eq!(result.xp_gain, 75);

        apply_attack(&result, &mut units);
        assert_eq!(units.get(d).unwrap().hp, 0);
        assert_eq!(units.get(a).unwrap().kills, 1);
    }

    #[test]
    fn test_context_gathers_doctrine_and_high_ground() {
        let mut map = BattleMap::new(8, 8);
        map.set_terrain(GridCoord::new(2, 2), TerrainType::Hill);
        let mut field = Battlefield::new(map);
        field.enemy_profile = TeamProfile::for_nation(Nation::German);
        let rules = Rules::default();

        let german = field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(2, 2));
        let target = field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(3, 2));

        let context = CombatContext::gather(
            field.units.get(german).unwrap(),
            field.units.get(target).unwrap(),
            &field,
            &rules,
        );
        assert!(context.high_ground);
        assert!(!context.flanking);

        let result = resolve_attack(
            field.units.get(german).unwrap(),
            field.units.get(target).unwrap(),
            &context,
            &rules.config.combat,
            &mut no_crit(),
        );
        // 3 base + 1 high ground + 1 doctrine
        assert_eq!(result.raw_attack, 5);
    }
}
