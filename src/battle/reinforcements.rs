//! Reinforcement economy
//!
//! Points are earned from battlefield events through a fixed reward table and
//! spent on packages of units. A call passes every gate before points,
//! cooldown and history change together.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::doctrine::Nation;
use crate::battle::grid::GridCoord;
use crate::battle::unit_type::UnitType;
use crate::battle::units::Team;
use crate::core::config::ReinforcementConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::Turn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageId {
    RifleSquad,
    MachineGunTeam,
    SupportSection,
    Armor,
    CavalryTroop,
}

impl PackageId {
    pub fn all() -> [PackageId; 5] {
        [
            PackageId::RifleSquad,
            PackageId::MachineGunTeam,
            PackageId::SupportSection,
            PackageId::Armor,
            PackageId::CavalryTroop,
        ]
    }
}

/// Static definition of a callable package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinforcementPackage {
    pub id: PackageId,
    pub name: String,
    pub units: Vec<UnitType>,
    pub cost: u32,
    pub cooldown: u32,
    /// Earliest turn the package can be called
    pub min_turn: Turn,
    /// Objectives the caller must hold
    pub min_objectives: u32,
    /// Nations allowed to call it; empty means everyone
    pub nations: Vec<Nation>,
}

impl ReinforcementPackage {
    pub fn allows(&self, nation: Nation) -> bool {
        self.nations.is_empty() || self.nations.contains(&nation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCatalog {
    packages: Vec<ReinforcementPackage>,
}

impl Default for PackageCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PackageCatalog {
    pub fn new(packages: Vec<ReinforcementPackage>) -> Self {
        Self { packages }
    }

    pub fn get(&self, id: PackageId) -> Option<&ReinforcementPackage> {
        self.packages.iter().find(|p| p.id == id)
    }

    pub fn builtin() -> Self {
        use UnitType::*;
        let package = |id, name: &str, units: Vec<UnitType>, cost, cooldown, min_turn, min_objectives, nations| {
            ReinforcementPackage {
                id,
                name: name.to_string(),
                units,
                cost,
                cooldown,
                min_turn,
                min_objectives,
                nations,
            }
        };

        Self::new(vec![
            package(
                PackageId::RifleSquad,
                "Rifle Squad",
                vec![Infantry, Infantry, Infantry],
                60,
                2,
                1,
                0,
                Vec::new(),
            ),
            package(
                PackageId::MachineGunTeam,
                "Machine Gun Team",
                vec![MachineGunner, Infantry],
                70,
                3,
                2,
                0,
                Vec::new(),
            ),
            package(
                PackageId::SupportSection,
                "Support Section",
                vec![Medic, Engineer],
                50,
                3,
                1,
                0,
                Vec::new(),
            ),
            package(
                PackageId::Armor,
                "Armor",
                vec![Tank],
                150,
                5,
                5,
                1,
                vec![Nation::British, Nation::French, Nation::American],
            ),
            package(
                PackageId::CavalryTroop,
                "Cavalry Troop",
                vec![Cavalry, Cavalry],
                90,
                4,
                3,
                0,
                vec![Nation::British, Nation::French, Nation::German],
            ),
        ])
    }
}

/// One accepted call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub turn: Turn,
    pub package: PackageId,
    pub position: GridCoord,
}

/// A unit the caller should place on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnDescriptor {
    pub unit_type: UnitType,
    pub team: Team,
    /// Requested tile; may be off-map or blocked, the caller clamps it
    pub position: GridCoord,
}

/// Offsets around the deploy point, in placement order
const SPAWN_OFFSETS: [(i32, i32); 9] = [
    (0, 0),
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

/// Battlefield events that earn reinforcement points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", content = "unit_type", rename_all = "snake_case")]
pub enum RewardEvent {
    Kill(UnitType),
    ObjectiveCaptured,
    ObjectiveHeld,
    TurnSurvived,
    MissionComplete,
}

impl RewardEvent {
    /// Stable event name, e.g. `kill_tank` or `objective_held`
    pub fn name(&self) -> String {
        match self {
            RewardEvent::Kill(unit_type) => format!("kill_{}", unit_type.name()),
            RewardEvent::ObjectiveCaptured => "objective_captured".into(),
            RewardEvent::ObjectiveHeld => "objective_held".into(),
            RewardEvent::TurnSurvived => "turn_survived".into(),
            RewardEvent::MissionComplete => "mission_complete".into(),
        }
    }

    pub fn from_name(name: &str) -> Option<RewardEvent> {
        match name {
            "objective_captured" => Some(RewardEvent::ObjectiveCaptured),
            "objective_held" => Some(RewardEvent::ObjectiveHeld),
            "turn_survived" => Some(RewardEvent::TurnSurvived),
            "mission_complete" => Some(RewardEvent::MissionComplete),
            _ => name
                .strip_prefix("kill_")
                .and_then(UnitType::from_name)
                .map(RewardEvent::Kill),
        }
    }
}

/// Points awarded for an event
pub fn reward_for(event: RewardEvent) -> u32 {
    match event {
        RewardEvent::Kill(unit_type) => match unit_type {
            UnitType::Infantry | UnitType::Medic | UnitType::Scout => 10,
            UnitType::Engineer => 12,
            UnitType::MachineGunner | UnitType::Sniper => 15,
            UnitType::Cavalry | UnitType::Mortar => 20,
            UnitType::Officer => 25,
            UnitType::Tank => 40,
        },
        RewardEvent::ObjectiveCaptured => 30,
        RewardEvent::ObjectiveHeld => 10,
        RewardEvent::TurnSurvived => 5,
        RewardEvent::MissionComplete => 100,
    }
}

/// Reward for an event given by name; unknown names are a content error
pub fn reward_for_name(name: &str) -> Result<u32> {
    RewardEvent::from_name(name)
        .map(reward_for)
        .ok_or_else(|| BattleError::DataIntegrity(format!("unknown reward event '{}'", name)))
}

/// One team's reinforcement economy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinforcementState {
    pub team: Team,
    pub nation: Nation,
    pub points: u32,
    pub cooldowns: BTreeMap<PackageId, u32>,
    pub history: Vec<CallRecord>,
    pub current_turn: Turn,
}

impl ReinforcementState {
    pub fn new(team: Team, nation: Nation, config: &ReinforcementConfig) -> Self {
        Self {
            team,
            nation,
            points: config.starting_points,
            cooldowns: BTreeMap::new(),
            history: Vec::new(),
            current_turn: 1,
        }
    }

    pub fn cooldown(&self, package: PackageId) -> u32 {
        self.cooldowns.get(&package).copied().unwrap_or(0)
    }

    /// Credit the reward for an event, returning the points earned
    pub fn earn(&mut self, event: RewardEvent) -> u32 {
        let reward = reward_for(event);
        self.points = self.points.saturating_add(reward);
        reward
    }
}

/// Check every gate for calling `package`
///
/// Order: package known, nation allowed, minimum turn, objectives held,
/// cooldown, cost.
pub fn is_available(
    state: &ReinforcementState,
    package: PackageId,
    catalog: &PackageCatalog,
    objectives_held: u32,
) -> Result<()> {
    let def = catalog
        .get(package)
        .ok_or_else(|| BattleError::DataIntegrity(format!("no definition for {:?}", package)))?;

    if !def.allows(state.nation) {
        return Err(BattleError::InsufficientResources(format!(
            "{} is not available to {:?}",
            def.name, state.nation
        )));
    }
    if state.current_turn < def.min_turn {
        return Err(BattleError::InsufficientResources(format!(
            "{} is available from turn {}",
            def.name, def.min_turn
        )));
    }
    if objectives_held < def.min_objectives {
        return Err(BattleError::InsufficientResources(format!(
            "{} needs {} objectives held, {} held",
            def.name, def.min_objectives, objectives_held
        )));
    }
    let cooldown = state.cooldown(package);
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
    Ok(())
}

/// Call a package to `deploy`
///
/// Returns one spawn descriptor per unit, laid out around the deploy point.
pub fn call(
    state: &mut ReinforcementState,
    package: PackageId,
    deploy: GridCoord,
    catalog: &PackageCatalog,
    objectives_held: u32,
) -> Result<Vec<SpawnDescriptor>> {
    is_available(state, package, catalog, objectives_held)?;
    let def = catalog
        .get(package)
        .ok_or_else(|| BattleError::DataIntegrity(format!("no definition for {:?}", package)))?;

    state.points -= def.cost;
    if def.cooldown > 0 {
        state.cooldowns.insert(package, def.cooldown);
    }
    state.history.push(CallRecord {
        turn: state.current_turn,
        package,
        position: deploy,
    });

    let spawns = def
        .units
        .iter()
        .zip(SPAWN_OFFSETS.iter().cycle())
        .map(|(&unit_type, &(dx, dy))| SpawnDescriptor {
            unit_type,
            team: state.team,
            position: deploy.offset(dx, dy),
        })
        .collect();

    tracing::info!(team = ?state.team, package = ?package, "reinforcements called");
    Ok(spawns)
}

/// Advance to the next turn, ticking package cooldowns
pub fn advance_turn(state: &mut ReinforcementState) {
    state.current_turn += 1;
    for remaining in state.cooldowns.values_mut() {
        *remaining = remaining.saturating_sub(1);
    }
    state.cooldowns.retain(|_, remaining| *remaining > 0);
}
