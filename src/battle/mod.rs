//! Battle system - turn-based grid tactics with fog of war
//!
//! Every rule is a pure function of the battlefield plus explicit state.
//!
//! Key properties:
//! - Stats are folded on demand (base + bonus + rank + status + aura), never cached
//! - Units live in an arena keyed by stable id; death is a query, not a removal
//! - All randomness flows through the seeded generator owned by `BattleState`
//! - Every gate runs before any mutation: an action applies fully or not at all

pub mod abilities;
pub mod ai;
pub mod artillery;
pub mod battle_map;
pub mod constants;
pub mod doctrine;
pub mod engagement;
pub mod execution;
pub mod grid;
pub mod movement;
pub mod reinforcements;
pub mod resolution;
pub mod stats;
pub mod targeting;
pub mod terrain;
pub mod unit_type;
pub mod units;
pub mod visibility;
pub mod weather;

// Re-exports for convenient access
pub use abilities::{
    apply_ability, can_use, AbilityCatalog, AbilityDef, AbilityEffect, AbilityId, AbilityTarget,
    AppliedEffect, AuraStat, TargetKind,
};
pub use artillery::{
    request_strike, ArtilleryState, Strike, StrikeCatalog, StrikeDef, StrikeEvent, StrikeHit,
    StrikeImpact, StrikeType,
};
pub use battle_map::{BattleMap, Objective, TerrainEffect, TerrainEffectKind, TerrainOverrides};
pub use constants::*;
pub use doctrine::{Doctrine, Nation, TeamProfile, TechBonuses};
pub use engagement::{combined_arms_partner, high_ground, is_flanking};
pub use execution::{
    Action, ActionOutcome, BattleEvent, BattleEventType, BattleOutcome, BattlePhase, BattleState,
    Battlefield, Rules, SaveGame, SideState,
};
pub use grid::{Direction, GridCoord};
pub use movement::{compute_reachable, find_path};
pub use reinforcements::{
    PackageCatalog, PackageId, ReinforcementPackage, ReinforcementState, RewardEvent,
    SpawnDescriptor,
};
pub use resolution::{apply_attack, resolve_attack, AttackResolution, CombatContext, ModifierLine, ModifierSource};
pub use targeting::{can_target, compute_targets};
pub use terrain::TerrainType;
pub use unit_type::{UnitProperties, UnitType};
pub use units::{ActionFlags, BattleUnit, Rank, StatusEffect, StatusKind, Team, UnitId, UnitRoster};
pub use visibility::{
    reveal_attacker, unit_vision_range, update_visibility, Visibility, VisibilityGrid,
};
pub use weather::Weather;
