//! Turn controller
//!
//! A turn is a strict sequence: player actions (each fully resolved before
//! the next is accepted) -> end turn -> enemy AI actions through the same
//! entry points -> turn-advance hooks -> next player turn.
//!
//! Hook order: cooldowns and statuses, timed terrain effects, artillery,
//! reinforcement cooldowns, healing auras, objectives, action flags,
//! turn-survived rewards, visibility, battle end.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::abilities::{
    apply_ability, healing_aura_pass, tick_cooldowns, tick_status_effects, AbilityCatalog, AbilityId,
    AbilityTarget, AppliedEffect, TargetKind,
};
use crate::battle::ai::{AiCommander, BattleAI, DecisionContext};
use crate::battle::artillery::{self, ArtilleryState, Strike, StrikeCatalog, StrikeEvent, StrikeImpact, StrikeType};
use crate::battle::battle_map::BattleMap;
use crate::battle::constants::{AI_STEPS_PER_UNIT, SAVE_VERSION, SPAWN_SEARCH_RADIUS, UNDO_DEPTH};
use crate::battle::doctrine::TeamProfile;
use crate::battle::grid::GridCoord;
use crate::battle::movement::compute_reachable;
use crate::battle::reinforcements::{self, PackageCatalog, PackageId, ReinforcementState, RewardEvent};
use crate::battle::resolution::{apply_attack, resolve_attack, AttackResolution, CombatContext};
use crate::battle::targeting::can_target;
use crate::battle::unit_type::UnitType;
use crate::battle::units::{Rank, Team, UnitId, UnitRoster};
use crate::battle::visibility::{reveal_attacker, update_visibility, VisibilityGrid};
use crate::battle::weather::Weather;
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, ErrorCategory, LoadError, Result};
use crate::core::types::{Seed, Turn};

/// Everything physically on the battlefield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battlefield {
    pub map: BattleMap,
    pub units: UnitRoster,
    pub weather: Weather,
    pub player_profile: TeamProfile,
    pub enemy_profile: TeamProfile,
}

impl Battlefield {
    pub fn new(map: BattleMap) -> Self {
        Self {
            map,
            units: UnitRoster::new(),
            weather: Weather::default(),
            player_profile: TeamProfile::default(),
            enemy_profile: TeamProfile::default(),
        }
    }

    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = weather;
        self
    }

    pub fn profile(&self, team: Team) -> &TeamProfile {
        match team {
            Team::Player => &self.player_profile,
            Team::Enemy => &self.enemy_profile,
        }
    }
}

/// Configuration and content catalogs for a battle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rules {
    pub config: BattleConfig,
    pub abilities: AbilityCatalog,
    pub strikes: StrikeCatalog,
    pub packages: PackageCatalog,
}

impl Rules {
    pub fn with_config(config: BattleConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }
}

/// Per-team state owned by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideState {
    pub team: Team,
    pub visibility: VisibilityGrid,
    pub artillery: ArtilleryState,
    pub reinforcements: ReinforcementState,
}

impl SideState {
    fn new(team: Team, field: &Battlefield, config: &BattleConfig) -> Self {
        Self {
            team,
            visibility: VisibilityGrid::new(field.map.width, field.map.height),
            artillery: ArtilleryState::new(team, &config.artillery),
            reinforcements: ReinforcementState::new(team, field.profile(team).nation, &config.reinforcements),
        }
    }
}

/// Battle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattlePhase {
    #[default]
    PlayerTurn,
    EnemyTurn,
    Finished,
}

/// Battle outcome, from the player's side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    #[default]
    Undecided,
    Victory,
    Defeat,
    Draw,
}

/// Log entry for battle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub turn: Turn,
    pub event_type: BattleEventType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleEventType {
    BattleStarted,
    TurnStarted,
    UnitMoved {
        unit: UnitId,
        from: GridCoord,
        to: GridCoord,
    },
    AttackResolved {
        resolution: AttackResolution,
    },
    AbilityUsed {
        unit: UnitId,
        ability: AbilityId,
        effects: Vec<AppliedEffect>,
    },
    UnitKilled {
        unit: UnitId,
        unit_type: UnitType,
    },
    UnitPromoted {
        unit: UnitId,
        rank: Rank,
    },
    StrikeRequested {
        team: Team,
        strike_id: u32,
        strike_type: StrikeType,
        target: GridCoord,
        impact_turn: Turn,
    },
    Strike {
        team: Team,
        event: StrikeEvent,
    },
    StrikeImpact {
        impact: StrikeImpact,
    },
    ReinforcementsCalled {
        team: Team,
        package: PackageId,
    },
    UnitSpawned {
        unit: UnitId,
        unit_type: UnitType,
        position: GridCoord,
    },
    Healed {
        unit: UnitId,
        amount: u32,
    },
    ObjectiveCaptured {
        name: String,
        team: Team,
    },
    PointsEarned {
        team: Team,
        event: RewardEvent,
        points: u32,
    },
    ActionRejected {
        category: ErrorCategory,
        reason: String,
    },
    BattleEnded {
        outcome: BattleOutcome,
    },
}

/// Everything a player (or AI) can ask the controller to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Move {
        unit: UnitId,
        to: GridCoord,
    },
    Attack {
        attacker: UnitId,
        defender: UnitId,
    },
    UseAbility {
        unit: UnitId,
        ability: AbilityId,
        target: AbilityTarget,
    },
    RequestStrike {
        team: Team,
        strike_type: StrikeType,
        target: GridCoord,
    },
    CallReinforcements {
        team: Team,
        package: PackageId,
        deploy: GridCoord,
    },
    EndTurn,
}

/// What an accepted action did
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Moved { from: GridCoord, to: GridCoord },
    Attacked(AttackResolution),
    AbilityUsed(Vec<AppliedEffect>),
    StrikeRequested(Strike),
    Reinforced(Vec<UnitId>),
    TurnEnded,
}

/// State restored by `undo`
#[derive(Debug, Clone)]
struct Snapshot {
    turn: Turn,
    phase: BattlePhase,
    outcome: BattleOutcome,
    field: Battlefield,
    player: SideState,
    enemy: SideState,
    rng: ChaCha8Rng,
    log: Vec<BattleEvent>,
    action_log: Vec<Action>,
}

/// Complete battle state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleState {
    // Time
    pub turn: Turn,
    pub phase: BattlePhase,
    pub outcome: BattleOutcome,

    // Core state
    pub field: Battlefield,
    pub rules: Rules,
    pub player: SideState,
    pub enemy: SideState,

    /// Controller for the enemy side, driven during end of turn
    pub enemy_ai: Option<AiCommander>,

    rng: ChaCha8Rng,

    // Logs
    pub log: Vec<BattleEvent>,
    pub action_log: Vec<Action>,

    #[serde(skip)]
    undo_stack: Vec<Snapshot>,
}

/// Versioned save envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveGame {
    pub version: u32,
    pub state: BattleState,
}

impl BattleState {
    pub fn new(field: Battlefield, rules: Rules, seed: Seed) -> Self {
        let player = SideState::new(Team::Player, &field, &rules.config);
        let enemy = SideState::new(Team::Enemy, &field, &rules.config);
        let mut state = Self {
            turn: 1,
            phase: BattlePhase::PlayerTurn,
            outcome: BattleOutcome::Undecided,
            field,
            rules,
            player,
            enemy,
            enemy_ai: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            log: Vec::new(),
            action_log: Vec::new(),
            undo_stack: Vec::new(),
        };
        state.refresh_visibility();
        state.log_event(BattleEventType::BattleStarted, "Battle has begun!".into());
        state
    }

    pub fn with_enemy_ai(mut self, ai: AiCommander) -> Self {
        self.enemy_ai = Some(ai);
        self
    }

    /// Is the battle finished?
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, BattlePhase::Finished)
    }

    /// Team allowed to act in the current phase
    pub fn active_team(&self) -> Option<Team> {
        match self.phase {
            BattlePhase::PlayerTurn => Some(Team::Player),
            BattlePhase::EnemyTurn => Some(Team::Enemy),
            BattlePhase::Finished => None,
        }
    }

    pub fn side(&self, team: Team) -> &SideState {
        match team {
            Team::Player => &self.player,
            Team::Enemy => &self.enemy,
        }
    }

    fn side_mut(&mut self, team: Team) -> &mut SideState {
        match team {
            Team::Player => &mut self.player,
            Team::Enemy => &mut self.enemy,
        }
    }

    /// Log a battle event
    pub fn log_event(&mut self, event_type: BattleEventType, description: String) {
        self.log.push(BattleEvent {
            turn: self.turn,
            event_type,
            description,
        });
    }

    fn end_battle(&mut self, outcome: BattleOutcome) {
        self.phase = BattlePhase::Finished;
        self.outcome = outcome;
        tracing::info!(?outcome, turn = self.turn, "battle ended");
        self.log_event(
            BattleEventType::BattleEnded { outcome },
            format!("Battle ended: {:?}", outcome),
        );

        let winner = match outcome {
            BattleOutcome::Victory => Some(Team::Player),
            BattleOutcome::Defeat => Some(Team::Enemy),
            _ => None,
        };
        if let Some(team) = winner {
            self.earn(team, RewardEvent::MissionComplete);
        }
    }

    fn refresh_visibility(&mut self) {
        update_visibility(&mut self.player.visibility, Team::Player, &self.field, &self.rules);
        update_visibility(&mut self.enemy.visibility, Team::Enemy, &self.field, &self.rules);
    }

    fn earn(&mut self, team: Team, event: RewardEvent) {
        let points = self.side_mut(team).reinforcements.earn(event);
        self.log_event(
            BattleEventType::PointsEarned { team, event, points },
            format!("{:?} earned {} points ({})", team, points, event.name()),
        );
    }

    /// Log a death and reward the team that caused it, if it was an enemy
    fn record_kill(&mut self, victim: UnitId, by: Option<Team>) {
        let Some(unit) = self.field.units.get(victim) else {
            return;
        };
        let (unit_type, victim_team) = (unit.unit_type, unit.team);
        self.log_event(
            BattleEventType::UnitKilled { unit: victim, unit_type },
            format!("{} {} was killed", unit_type.name(), victim.0),
        );
        if let Some(team) = by.filter(|&t| t != victim_team) {
            self.earn(team, RewardEvent::Kill(unit_type));
        }
    }

    /// Outcome implied by the current roster and turn
    pub fn evaluate_outcome(&self) -> BattleOutcome {
        let player_alive = self.field.units.living_on(Team::Player).next().is_some();
        let enemy_alive = self.field.units.living_on(Team::Enemy).next().is_some();
        match (player_alive, enemy_alive) {
            (false, false) => BattleOutcome::Draw,
            (false, true) => BattleOutcome::Defeat,
            (true, false) => BattleOutcome::Victory,
            (true, true) if self.turn > self.rules.config.battle.max_turns => BattleOutcome::Draw,
            (true, true) => BattleOutcome::Undecided,
        }
    }

    fn check_battle_end(&mut self) {
        if self.is_finished() {
            return;
        }
        let outcome = self.evaluate_outcome();
        if outcome != BattleOutcome::Undecided {
            self.end_battle(outcome);
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            turn: self.turn,
            phase: self.phase,
            outcome: self.outcome,
            field: self.field.clone(),
            player: self.player.clone(),
            enemy: self.enemy.clone(),
            rng: self.rng.clone(),
            log: self.log.clone(),
            action_log: self.action_log.clone(),
        }
    }

    /// Restore the state from before the last accepted action of this turn
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        self.turn = snapshot.turn;
        self.phase = snapshot.phase;
        self.outcome = snapshot.outcome;
        self.field = snapshot.field;
        self.player = snapshot.player;
        self.enemy = snapshot.enemy;
        self.rng = snapshot.rng;
        self.log = snapshot.log;
        self.action_log = snapshot.action_log;
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Submit an action
    ///
    /// The action is appended to the action log whether or not it is
    /// accepted, so the log replays exactly. Rejections are logged as
    /// `ActionRejected` and change nothing else.
    pub fn apply_action(&mut self, action: Action) -> Result<ActionOutcome> {
        let snapshot = self.snapshot();
        self.action_log.push(action.clone());

        let outcome = self.execute(&action)?;
        if matches!(action, Action::EndTurn) {
            self.undo_stack.clear();
        } else {
            self.undo_stack.push(snapshot);
            if self.undo_stack.len() > UNDO_DEPTH {
                self.undo_stack.remove(0);
            }
        }
        Ok(outcome)
    }

    /// Dispatch without touching the action log; rejections are logged here
    fn execute(&mut self, action: &Action) -> Result<ActionOutcome> {
        let result = match action {
            Action::Move { unit, to } => self.move_unit(*unit, *to),
            Action::Attack { attacker, defender } => {
                self.perform_attack(*attacker, *defender).map(ActionOutcome::Attacked)
            }
            Action::UseAbility {
                unit,
                ability,
                target,
            } => self.use_ability(*unit, ability, target).map(ActionOutcome::AbilityUsed),
            Action::RequestStrike {
                team,
                strike_type,
                target,
            } => self
                .request_strike(*team, *strike_type, *target)
                .map(ActionOutcome::StrikeRequested),
            Action::CallReinforcements { team, package, deploy } => self
                .call_reinforcements(*team, *package, *deploy)
                .map(ActionOutcome::Reinforced),
            Action::EndTurn => self.end_turn().map(|_| ActionOutcome::TurnEnded),
        };

        if let Err(err) = &result {
            if err.category() == ErrorCategory::DataIntegrity {
                tracing::warn!(reason = err.reason(), "action degraded to no-op");
            } else {
                tracing::debug!(%err, "action rejected");
            }
            self.log_event(
                BattleEventType::ActionRejected {
                    category: err.category(),
                    reason: err.reason().to_string(),
                },
                err.to_string(),
            );
        }
        result
    }

    fn check_can_act(&self, team: Team) -> Result<()> {
        match self.active_team() {
            None => Err(BattleError::InvalidUnitState("the battle is over".into())),
            Some(active) if active != team => Err(BattleError::InvalidUnitState(format!(
                "it is not {:?}'s turn",
                team
            ))),
            Some(_) => Ok(()),
        }
    }

    fn acting_unit_team(&self, unit: UnitId) -> Result<Team> {
        let unit = self
            .field
            .units
            .get(unit)
            .ok_or_else(|| BattleError::InvalidUnitState(format!("unit {} does not exist", unit.0)))?;
        if !unit.is_alive() {
            return Err(BattleError::InvalidUnitState(format!("unit {} is dead", unit.id.0)));
        }
        self.check_can_act(unit.team)?;
        Ok(unit.team)
    }

    fn move_unit(&mut self, unit_id: UnitId, to: GridCoord) -> Result<ActionOutcome> {
        let team = self.acting_unit_team(unit_id)?;
        let unit = self
            .field
            .units
            .get(unit_id)
            .ok_or_else(|| BattleError::InvalidUnitState(format!("unit {} does not exist", unit_id.0)))?;

        if unit.flags.moved {
            return Err(BattleError::InvalidUnitState(format!("unit {} already moved", unit_id.0)));
        }
        if unit.flags.attacked {
            return Err(BattleError::InvalidUnitState(format!(
                "unit {} cannot move after attacking",
                unit_id.0
            )));
        }
        if !compute_reachable(unit, &self.field, &self.rules).contains(&to) {
            return Err(BattleError::InvalidTarget(format!(
                "({}, {}) is not reachable",
                to.x, to.y
            )));
        }

        let from = unit.position;
        if let Some(unit) = self.field.units.get_mut(unit_id) {
            unit.position = to;
            unit.flags.moved = true;
        }
        self.refresh_team_visibility(team);

        tracing::debug!(unit = unit_id.0, from = ?from, to = ?to, "unit moved");
        self.log_event(
            BattleEventType::UnitMoved { unit: unit_id, from, to },
            format!("Unit {} moved to ({}, {})", unit_id.0, to.x, to.y),
        );
        Ok(ActionOutcome::Moved { from, to })
    }

    fn side_mut_visibility(&mut self, team: Team) -> &mut VisibilityGrid {
        &mut self.side_mut(team).visibility
    }

    fn refresh_team_visibility(&mut self, team: Team) {
        let grid = match team {
            Team::Player => &mut self.player.visibility,
            Team::Enemy => &mut self.enemy.visibility,
        };
        update_visibility(grid, team, &self.field, &self.rules);
    }

    /// Resolve and apply an attack
    ///
    /// Direct entry point for callers that keep their own record; it is not
    /// added to the action log or the undo stack.
    pub fn perform_attack(&mut self, attacker_id: UnitId, defender_id: UnitId) -> Result<AttackResolution> {
        let team = self.acting_unit_team(attacker_id)?;
        let attacker = self
            .field
            .units
            .get(attacker_id)
            .ok_or_else(|| BattleError::InvalidUnitState(format!("unit {} does not exist", attacker_id.0)))?;
        if attacker.flags.attacked {
            return Err(BattleError::InvalidUnitState(format!(
                "unit {} already attacked this turn",
                attacker_id.0
            )));
        }
        let defender = self
            .field
            .units
            .get(defender_id)
            .ok_or_else(|| BattleError::InvalidTarget(format!("unit {} does not exist", defender_id.0)))?;

        can_target(attacker, defender, &self.field, &self.rules, &self.side(team).visibility)?;

        let context = CombatContext::gather(attacker, defender, &self.field, &self.rules);
        let resolution = resolve_attack(attacker, defender, &context, &self.rules.config.combat, &mut self.rng);
        let attacker_position = attacker.position;

        self.commit_attack(team, attacker_position, &resolution);
        self.check_battle_end();
        Ok(resolution)
    }

    fn commit_attack(&mut self, team: Team, attacker_position: GridCoord, resolution: &AttackResolution) {
        let promoted = apply_attack(resolution, &mut self.field.units);

        if self.rules.config.visibility.reveal_on_attack {
            reveal_attacker(self.side_mut_visibility(team.opponent()), attacker_position);
        }

        tracing::debug!(
            attacker = resolution.attacker.0,
            defender = resolution.defender.0,
            raw_attack = resolution.raw_attack,
            defense = resolution.effective_defense,
            damage = resolution.damage,
            critical = resolution.critical,
            "attack resolved"
        );
        self.log_event(
            BattleEventType::AttackResolved {
                resolution: resolution.clone(),
            },
            format!(
                "Unit {} hit unit {} for {}{}",
                resolution.attacker.0,
                resolution.defender.0,
                resolution.damage,
                if resolution.critical { " (critical)" } else { "" }
            ),
        );

        if resolution.killed {
            self.record_kill(resolution.defender, Some(team));
        }
        if let Some(rank) = promoted {
            self.log_event(
                BattleEventType::UnitPromoted {
                    unit: resolution.attacker,
                    rank,
                },
                format!("Unit {} promoted to {:?}", resolution.attacker.0, rank),
            );
        }
    }

    fn use_ability(&mut self, unit_id: UnitId, ability: &AbilityId, target: &AbilityTarget) -> Result<Vec<AppliedEffect>> {
        let team = self.acting_unit_team(unit_id)?;
        let unit_type = self.field.units.get(unit_id).map(|u| u.unit_type);

        // Enemy-targeted abilities respect fog of war like plain attacks
        let targets_enemy = unit_type
            .and_then(|t| self.rules.abilities.get(t, ability))
            .is_some_and(|def| def.target == TargetKind::Enemy);
        if targets_enemy {
            if let AbilityTarget::Unit(target_id) = target {
                let visible = self
                    .field
                    .units
                    .get(*target_id)
                    .is_some_and(|t| self.side(team).visibility.is_visible(t.position));
                if !visible {
                    return Err(BattleError::InvalidTarget(format!(
                        "unit {} is not visible",
                        target_id.0
                    )));
                }
            }
        }

        let origin = self.field.units.get(unit_id).map(|u| u.position).unwrap_or_default();
        let effects = apply_ability(unit_id, ability, target, &mut self.field, &self.rules, &mut self.rng)?;

        self.log_event(
            BattleEventType::AbilityUsed {
                unit: unit_id,
                ability: ability.clone(),
                effects: effects.clone(),
            },
            format!("Unit {} used {}", unit_id.0, ability),
        );

        for effect in &effects {
            match effect {
                AppliedEffect::Damaged { unit, killed: true, .. } => self.record_kill(*unit, Some(team)),
                AppliedEffect::Attack(resolution) => {
                    if self.rules.config.visibility.reveal_on_attack {
                        reveal_attacker(self.side_mut_visibility(team.opponent()), origin);
                    }
                    if resolution.killed {
                        self.record_kill(resolution.defender, Some(team));
                    }
                }
                _ => {}
            }
        }

        self.refresh_team_visibility(team);
        self.check_battle_end();
        Ok(effects)
    }

    fn request_strike(&mut self, team: Team, strike_type: StrikeType, target: GridCoord) -> Result<Strike> {
        self.check_can_act(team)?;

        let side = match team {
            Team::Player => &mut self.player,
            Team::Enemy => &mut self.enemy,
        };
        let strike = artillery::request_strike(
            &mut side.artillery,
            strike_type,
            target,
            &self.rules.strikes,
            &self.rules.config.artillery,
            &self.field,
        )?;

        self.log_event(
            BattleEventType::StrikeRequested {
                team,
                strike_id: strike.id,
                strike_type,
                target,
                impact_turn: strike.impact_turn,
            },
            format!("{:?} requested {:?} on ({}, {})", team, strike_type, target.x, target.y),
        );

        if strike.impact_turn == self.turn {
            self.resolve_strike(&strike, true);
            self.check_battle_end();
        }
        Ok(strike)
    }

    fn resolve_strike(&mut self, strike: &Strike, landed: bool) {
        let impacts = artillery::apply_strike(strike, landed, &mut self.field, &mut self.rng);
        for impact in impacts {
            let killed = impact.killed.then_some(impact.unit);
            self.log_event(
                BattleEventType::StrikeImpact { impact: impact.clone() },
                format!("Strike {} on unit {}: {:?}", impact.strike_id, impact.unit.0, impact.hit),
            );
            if let Some(victim) = killed {
                self.record_kill(victim, Some(strike.team));
            }
        }
    }

    fn call_reinforcements(&mut self, team: Team, package: PackageId, deploy: GridCoord) -> Result<Vec<UnitId>> {
        self.check_can_act(team)?;

        let zone = match team {
            Team::Player => &self.field.map.player_deployment,
            Team::Enemy => &self.field.map.enemy_deployment,
        };
        let deploy_ok = if zone.is_empty() {
            self.field.map.in_bounds(deploy)
        } else {
            zone.contains(&deploy)
        };
        if !deploy_ok {
            return Err(BattleError::InvalidTarget(format!(
                "({}, {}) is not a deployment tile",
                deploy.x, deploy.y
            )));
        }

        let objectives = self.field.map.objectives_held_by(team);
        let before = self.side(team).reinforcements.clone();
        let state = match team {
            Team::Player => &mut self.player.reinforcements,
            Team::Enemy => &mut self.enemy.reinforcements,
        };
        let spawns = reinforcements::call(
            state,
            package,
            deploy,
            &self.rules.packages,
            objectives,
        )?;

        // Place every unit or none
        let mut placements = Vec::with_capacity(spawns.len());
        for spawn in &spawns {
            match self.placement_for(spawn.unit_type, spawn.position, &placements) {
                Some(coord) => placements.push(coord),
                None => {
                    self.side_mut(team).reinforcements = before;
                    return Err(BattleError::InvalidTarget(format!(
                        "no room to deploy {:?} near ({}, {})",
                        package, deploy.x, deploy.y
                    )));
                }
            }
        }

        self.log_event(
            BattleEventType::ReinforcementsCalled { team, package },
            format!("{:?} called {:?}", team, package),
        );

        let mut spawned = Vec::with_capacity(spawns.len());
        for (spawn, position) in spawns.iter().zip(placements) {
            let id = self.field.units.spawn(spawn.unit_type, team, position);
            if let Some(unit) = self.field.units.get_mut(id) {
                // Fresh arrivals act from next turn
                unit.flags.moved = true;
                unit.flags.attacked = true;
                unit.flags.used_ability = true;
            }
            self.log_event(
                BattleEventType::UnitSpawned {
                    unit: id,
                    unit_type: spawn.unit_type,
                    position,
                },
                format!("{} {} arrived at ({}, {})", spawn.unit_type.name(), id.0, position.x, position.y),
            );
            spawned.push(id);
        }

        self.refresh_team_visibility(team);
        Ok(spawned)
    }

    /// Nearest free tile to `desired` the unit type can stand on
    fn placement_for(&self, unit_type: UnitType, desired: GridCoord, taken: &[GridCoord]) -> Option<GridCoord> {
        (0..=SPAWN_SEARCH_RADIUS).find_map(|radius| {
            desired
                .tiles_within_chebyshev(radius)
                .into_iter()
                .filter(|c| c.chebyshev(&desired) == radius)
                .find(|&c| {
                    self.field
                        .map
                        .terrain_at(c)
                        .is_some_and(|t| unit_type.can_enter(t))
                        && !self.field.units.is_occupied(c)
                        && !taken.contains(&c)
                })
        })
    }

    /// End the current team's turn
    ///
    /// Ending the player turn hands over to the enemy; if an AI drives the
    /// enemy it plays immediately and the turn advances.
    fn end_turn(&mut self) -> Result<()> {
        match self.phase {
            BattlePhase::Finished => Err(BattleError::InvalidUnitState("the battle is over".into())),
            BattlePhase::PlayerTurn => {
                self.phase = BattlePhase::EnemyTurn;
                if let Some(mut ai) = self.enemy_ai.take() {
                    self.drive_ai(&mut ai, Team::Enemy, false);
                    self.enemy_ai = Some(ai);
                    if !self.is_finished() {
                        self.advance_turn();
                    }
                }
                Ok(())
            }
            BattlePhase::EnemyTurn => {
                self.advance_turn();
                Ok(())
            }
        }
    }

    /// Let an AI play every living unit of `team` once
    fn drive_ai<A: BattleAI>(&mut self, ai: &mut A, team: Team, record: bool) {
        let unit_ids: Vec<UnitId> = self.field.units.living_on(team).map(|u| u.id).collect();
        tracing::debug!(?team, personality = %ai.personality().name, units = unit_ids.len(), "AI playing turn");

        for unit_id in unit_ids {
            for _ in 0..AI_STEPS_PER_UNIT {
                if self.is_finished() {
                    return;
                }
                let action = {
                    let context = DecisionContext::new(self, team, ai.ignores_fog_of_war());
                    ai.decide(&context, unit_id)
                };
                let Some(action) = action else {
                    break;
                };
                let accepted = if record {
                    self.apply_action(action).is_ok()
                } else {
                    self.execute(&action).is_ok()
                };
                if !accepted {
                    break;
                }
            }
        }
    }

    /// Play the current turn of `team` with an AI, recording its actions
    ///
    /// Used for AI-controlled player sides; the actions land in the action log
    /// so the battle replays without the AI.
    pub fn play_ai_turn<A: BattleAI>(&mut self, ai: &mut A, team: Team) {
        if self.active_team() == Some(team) {
            self.drive_ai(ai, team, true);
        }
    }

    /// Turn-advance hooks, then hand the next turn to the player
    fn advance_turn(&mut self) {
        self.turn += 1;
        tracing::info!(turn = self.turn, "turn started");
        self.log_event(BattleEventType::TurnStarted, format!("Turn {} begins", self.turn));

        for unit in self.field.units.iter_mut() {
            tick_cooldowns(unit);
            tick_status_effects(unit);
        }
        self.field.map.tick_effects();

        for team in Team::both() {
            let events = artillery::advance_turn(&mut self.side_mut(team).artillery);
            let landed: Vec<u32> = events
                .iter()
                .filter_map(|e| match e {
                    StrikeEvent::StrikeLanded { id, .. } => Some(*id),
                    _ => None,
                })
                .collect();
            for event in events {
                self.log_event(
                    BattleEventType::Strike { team, event: event.clone() },
                    format!("{:?} artillery: {:?}", team, event),
                );
            }
            let active = self.side(team).artillery.active.clone();
            for strike in &active {
                self.resolve_strike(strike, landed.contains(&strike.id));
            }
            reinforcements::advance_turn(&mut self.side_mut(team).reinforcements);
        }

        for effect in healing_aura_pass(&mut self.field, &self.rules) {
            if let AppliedEffect::Healed { unit, amount } = effect {
                if amount > 0 {
                    self.log_event(
                        BattleEventType::Healed { unit, amount },
                        format!("Unit {} recovered {} hp", unit.0, amount),
                    );
                }
            }
        }

        self.update_objectives();

        for unit in self.field.units.iter_mut() {
            unit.flags.reset();
        }

        for team in Team::both() {
            if self.field.units.living_on(team).next().is_some() {
                self.earn(team, RewardEvent::TurnSurvived);
            }
        }

        self.refresh_visibility();
        self.phase = BattlePhase::PlayerTurn;
        self.check_battle_end();
    }

    fn update_objectives(&mut self) {
        let mut changes = Vec::new();
        for (idx, objective) in self.field.map.objectives.iter().enumerate() {
            if let Some(holder) = self.field.units.unit_at(objective.coord) {
                changes.push((idx, holder.team, objective.controlled_by != Some(holder.team)));
            }
        }

        for (idx, team, captured) in changes {
            if captured {
                let name = self.field.map.objectives[idx].name.clone();
                self.field.map.objectives[idx].controlled_by = Some(team);
                tracing::info!(?team, objective = %name, "objective captured");
                self.log_event(
                    BattleEventType::ObjectiveCaptured {
                        name: name.clone(),
                        team,
                    },
                    format!("{:?} captured {}", team, name),
                );
                self.earn(team, RewardEvent::ObjectiveCaptured);
            } else {
                self.earn(team, RewardEvent::ObjectiveHeld);
            }
        }
    }

    /// Rebuild a state by replaying actions from an initial state
    pub fn replay(initial: &BattleState, actions: &[Action]) -> BattleState {
        let mut state = initial.clone();
        for action in actions {
            // Rejections are part of the record and replay as rejections
            let _ = state.apply_action(action.clone());
        }
        state
    }

    /// Serialize to a versioned JSON save
    pub fn to_json(&self) -> std::result::Result<String, LoadError> {
        let save = SaveGame {
            version: SAVE_VERSION,
            state: self.clone(),
        };
        Ok(serde_json::to_string(&save)?)
    }

    /// Load a versioned JSON save
    pub fn from_json(json: &str) -> std::result::Result<BattleState, LoadError> {
        let save: SaveGame = serde_json::from_str(json)?;
        if save.version != SAVE_VERSION {
            return Err(LoadError::UnsupportedVersion(save.version));
        }
        Ok(save.state)
    }
}
