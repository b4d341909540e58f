//! Artillery scheduler
//!
//! Strikes are bought with points and go through a fixed lifecycle:
//! requested -> pending (while `delay` turns pass) -> active (for `duration`
//! turns) -> expired. Each team owns one `ArtilleryState`; the turn controller
//! advances it once per turn and applies damage for every active strike.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::battle_map::TerrainEffectKind;
use crate::battle::constants::SUPPRESS_TURNS;
use crate::battle::execution::Battlefield;
use crate::battle::grid::GridCoord;
use crate::battle::units::{StatusKind, Team, UnitId};
use crate::core::config::ArtilleryConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::Turn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeType {
    LightBarrage,
    HeavyBarrage,
    CreepingBarrage,
    SmokeBarrage,
}

impl StrikeType {
    pub fn all() -> [StrikeType; 4] {
        [
            StrikeType::LightBarrage,
            StrikeType::HeavyBarrage,
            StrikeType::CreepingBarrage,
            StrikeType::SmokeBarrage,
        ]
    }
}

/// Side effects of a strike beyond damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeTag {
    /// Leaves a permanent crater at the impact tile
    Crater,
    /// Survivors hit are suppressed
    Suppress,
    /// Lays smoke over the impact area when it lands
    Smoke,
}

/// Static definition of a strike type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeDef {
    pub strike_type: StrikeType,
    pub name: String,
    pub cost: u32,
    pub cooldown: u32,
    /// Turns between request and impact
    pub delay: u32,
    /// Turns the strike stays active once landed
    pub duration: u32,
    pub damage_min: u32,
    pub damage_max: u32,
    /// Manhattan radius
    pub radius: u32,
    /// Probability a unit in the radius is actually hit
    pub accuracy: f32,
    /// Relocates one row per turn while active
    pub creeping: bool,
    pub tags: Vec<StrikeTag>,
    /// A living officer or scout must be on the field to call it
    pub requires_spotter: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeCatalog {
    strikes: Vec<StrikeDef>,
}

impl Default for StrikeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StrikeCatalog {
    pub fn new(strikes: Vec<StrikeDef>) -> Self {
        Self { strikes }
    }

    pub fn get(&self, strike_type: StrikeType) -> Option<&StrikeDef> {
        self.strikes.iter().find(|s| s.strike_type == strike_type)
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            StrikeDef {
                strike_type: StrikeType::LightBarrage,
                name: "Light Barrage".into(),
                cost: 50,
                cooldown: 2,
                delay: 1,
                duration: 1,
                damage_min: 1,
                damage_max: 2,
                radius: 1,
                accuracy: 0.85,
                creeping: false,
                tags: Vec::new(),
                requires_spotter: false,
            },
            StrikeDef {
                strike_type: StrikeType::HeavyBarrage,
                name: "Heavy Barrage".into(),
                cost: 100,
                cooldown: 4,
                delay: 2,
                duration: 1,
                damage_min: 2,
                damage_max: 4,
                radius: 2,
                accuracy: 0.75,
                creeping: false,
                tags: vec![StrikeTag::Crater, StrikeTag::Suppress],
                requires_spotter: true,
            },
            StrikeDef {
                strike_type: StrikeType::CreepingBarrage,
                name: "Creeping Barrage".into(),
                cost: 120,
                cooldown: 5,
                delay: 1,
                duration: 3,
                damage_min: 1,
                damage_max: 3,
                radius: 1,
                accuracy: 0.7,
                creeping: true,
                tags: vec![StrikeTag::Suppress],
                requires_spotter: true,
            },
            StrikeDef {
                strike_type: StrikeType::SmokeBarrage,
                name: "Smoke Barrage".into(),
                cost: 30,
                cooldown: 2,
                delay: 0,
                duration: 2,
                damage_min: 0,
                damage_max: 0,
                radius: 2,
                accuracy: 1.0,
                creeping: false,
                tags: vec![StrikeTag::Smoke],
                requires_spotter: false,
            },
        ])
    }
}

/// A requested strike, pending or active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strike {
    pub id: u32,
    pub strike_type: StrikeType,
    pub team: Team,
    pub target: GridCoord,
    pub requested_turn: Turn,
    pub impact_turn: Turn,
    pub turns_remaining: u32,
    pub damage_min: u32,
    pub damage_max: u32,
    pub radius: u32,
    pub accuracy: f32,
    pub creeping: bool,
    pub tags: Vec<StrikeTag>,
}

impl Strike {
    pub fn has_tag(&self, tag: StrikeTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Rows a creeping barrage advances per turn: towards the enemy side
    pub fn creep_step(&self) -> i32 {
        match self.team {
            Team::Player => 1,
            Team::Enemy => -1,
        }
    }
}

/// Lifecycle notifications produced by `advance_turn`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StrikeEvent {
    StrikeLanded {
        id: u32,
        strike_type: StrikeType,
        target: GridCoord,
    },
    BarrageMoved {
        id: u32,
        from: GridCoord,
        to: GridCoord,
    },
    BarrageEnded {
        id: u32,
    },
}

/// Outcome of a strike for one unit position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeHit {
    OutOfRadius,
    NearMiss,
    Hit(u32),
}

impl StrikeHit {
    pub fn damage(&self) -> u32 {
        match self {
            StrikeHit::Hit(d) => *d,
            _ => 0,
        }
    }
}

/// One team's artillery economy and strike queues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtilleryState {
    pub team: Team,
    pub points: u32,
    pub points_per_turn: u32,
    pub cooldowns: BTreeMap<StrikeType, u32>,
    pub pending: Vec<Strike>,
    pub active: Vec<Strike>,
    pub current_turn: Turn,
    pub next_id: u32,
}

impl ArtilleryState {
    pub fn new(team: Team, config: &ArtilleryConfig) -> Self {
        Self {
            team,
            points: config.starting_points,
            points_per_turn: config.points_per_turn,
            cooldowns: BTreeMap::new(),
            pending: Vec::new(),
            active: Vec::new(),
            current_turn: 1,
            next_id: 0,
        }
    }

    pub fn cooldown(&self, strike_type: StrikeType) -> u32 {
        self.cooldowns.get(&strike_type).copied().unwrap_or(0)
    }
}

/// Request a strike on `target`
///
/// Gates run before anything changes: map permits artillery, strike type is
/// known, target on the map, off cooldown, enough points, spotter present.
/// On success points and cooldown are spent together and the strike is
/// queued (or made active at once when it has no delay).
pub fn request_strike(
    state: &mut ArtilleryState,
    strike_type: StrikeType,
    target: GridCoord,
    catalog: &StrikeCatalog,
    config: &ArtilleryConfig,
    field: &Battlefield,
) -> Result<Strike> {
    if !config.allowed {
        return Err(BattleError::InvalidTarget(
            "artillery support is not available on this map".into(),
        ));
    }

    let def = catalog
        .get(strike_type)
        .ok_or_else(|| BattleError::DataIntegrity(format!("no definition for {:?}", strike_type)))?;

    if !field.map.in_bounds(target) {
        return Err(BattleError::InvalidTarget(format!(
            "strike target ({}, {}) is off the map",
            target.x, target.y
        )));
    }

    let cooldown = state.cooldown(strike_type);
    if cooldown > 0 {
        return Err(BattleError::InsufficientResources(format!(
            "{} is on cooldown for {} more turns",
            def.name, cooldown
        )));
    }

    if state.points < def.cost {
        return Err(BattleError::InsufficientResources(format!(
            "{} costs {} points, {} available",
            def.name, def.cost, state.points
        )));
    }

    if def.requires_spotter && !field.units.living_on(state.team).any(|u| u.unit_type.is_spotter()) {
        return Err(BattleError::InvalidUnitState(format!(
            "{} needs a living officer or scout to spot",
            def.name
        )));
    }

    state.points -= def.cost;
    if def.cooldown > 0 {
        state.cooldowns.insert(strike_type, def.cooldown);
    }

    let strike = Strike {
        id: state.next_id,
        strike_type,
        team: state.team,
        target,
        requested_turn: state.current_turn,
        impact_turn: state.current_turn + def.delay,
        turns_remaining: def.duration,
        damage_min: def.damage_min,
        damage_max: def.damage_max,
        radius: def.radius,
        accuracy: def.accuracy,
        creeping: def.creeping,
        tags: def.tags.clone(),
    };
    state.next_id += 1;

    if def.delay == 0 {
        state.active.push(strike.clone());
    } else {
        state.pending.push(strike.clone());
    }

    tracing::debug!(
        team = ?state.team,
        strike = ?strike_type,
        x = target.x,
        y = target.y,
        impact_turn = strike.impact_turn,
        "strike requested"
    );
    Ok(strike)
}

/// Advance the scheduler to the next turn
///
/// Active strikes count down first: expired ones are removed, creeping ones
/// still running move one row. Then pending strikes due this turn land.
/// Finally cooldowns tick and points accrue.
pub fn advance_turn(state: &mut ArtilleryState) -> Vec<StrikeEvent> {
    state.current_turn += 1;
    let mut events = Vec::new();

    let mut still_active = Vec::with_capacity(state.active.len());
    for mut strike in std::mem::take(&mut state.active) {
        strike.turns_remaining = strike.turns_remaining.saturating_sub(1);
        if strike.turns_remaining == 0 {
            events.push(StrikeEvent::BarrageEnded { id: strike.id });
            continue;
        }
        if strike.creeping {
            let from = strike.target;
            strike.target = from.offset(0, strike.creep_step());
            events.push(StrikeEvent::BarrageMoved {
                id: strike.id,
                from,
                to: strike.target,
            });
        }
        still_active.push(strike);
    }

    let (landing, waiting): (Vec<Strike>, Vec<Strike>) = std::mem::take(&mut state.pending)
        .into_iter()
        .partition(|s| s.impact_turn <= state.current_turn);
    state.pending = waiting;

    for strike in landing {
        tracing::info!(team = ?strike.team, strike = ?strike.strike_type, "strike landed");
        events.push(StrikeEvent::StrikeLanded {
            id: strike.id,
            strike_type: strike.strike_type,
            target: strike.target,
        });
        still_active.push(strike);
    }
    state.active = still_active;

    for remaining in state.cooldowns.values_mut() {
        *remaining = remaining.saturating_sub(1);
    }
    state.cooldowns.retain(|_, remaining| *remaining > 0);
    state.points = state.points.saturating_add(state.points_per_turn);

    events
}

/// Damage a strike deals to a unit standing at `position`
///
/// Units outside the Manhattan radius are untouched and draw nothing. Inside
/// it an accuracy roll decides hit or near miss; a hit rolls base damage in
/// [min, max] and scales it linearly down with distance:
/// `round(base * (1 - d / (radius + 1)))`, at least 1.
pub fn damage_at<R: Rng>(position: GridCoord, strike: &Strike, rng: &mut R) -> StrikeHit {
    let distance = position.manhattan(&strike.target);
    if distance > strike.radius {
        return StrikeHit::OutOfRadius;
    }

    let accuracy_roll: f32 = rng.gen();
    if accuracy_roll >= strike.accuracy {
        return StrikeHit::NearMiss;
    }

    if strike.damage_max == 0 {
        return StrikeHit::Hit(0);
    }

    let spread = strike.damage_max.saturating_sub(strike.damage_min) + 1;
    let damage_roll: f32 = rng.gen();
    let base = (strike.damage_min + (damage_roll * spread as f32) as u32).min(strike.damage_max);

    let falloff = 1.0 - distance as f32 / (strike.radius + 1) as f32;
    let damage = ((base as f32) * falloff).round() as u32;
    StrikeHit::Hit(damage.max(1))
}

/// What a strike did to one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikeImpact {
    pub strike_id: u32,
    pub unit: UnitId,
    pub hit: StrikeHit,
    pub killed: bool,
}

/// Apply one turn of a strike to the battlefield
///
/// Friendly fire is real: every living unit in the radius is rolled for.
/// Units are visited in id order so the generator is consumed identically on
/// replay. A strike whose target has drifted off the map does nothing.
pub fn apply_strike<R: Rng>(strike: &Strike, landed: bool, field: &mut Battlefield, rng: &mut R) -> Vec<StrikeImpact> {
    if !field.map.in_bounds(strike.target) {
        return Vec::new();
    }

    if landed && strike.has_tag(StrikeTag::Smoke) {
        field.map.place_effect(
            TerrainEffectKind::Smoke,
            strike.target,
            strike.radius,
            strike.turns_remaining,
        );
    }
    if landed && strike.has_tag(StrikeTag::Crater) {
        field.map.add_crater(strike.target);
    }

    let in_radius: Vec<(UnitId, GridCoord)> = field
        .units
        .living()
        .filter(|u| u.position.manhattan(&strike.target) <= strike.radius)
        .map(|u| (u.id, u.position))
        .collect();

    let mut impacts = Vec::new();
    for (id, position) in in_radius {
        let hit = damage_at(position, strike, rng);
        let Some(unit) = field.units.get_mut(id) else {
            continue;
        };
        unit.take_damage(hit.damage());
        let killed = !unit.is_alive();
        if !killed && hit.damage() > 0 && strike.has_tag(StrikeTag::Suppress) {
            unit.add_status(StatusKind::Suppressed, 1, SUPPRESS_TURNS);
        }
        impacts.push(StrikeImpact {
            strike_id: strike.id,
            unit: id,
            hit,
            killed,
        });
    }
    impacts
}
