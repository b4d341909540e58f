//! Ability system: static per-type definitions and the engine that validates
//! and applies them

pub mod catalog;
pub mod engine;

pub use catalog::{
    AbilityCatalog, AbilityDef, AbilityEffect, AbilityId, Activation, AuraStat, TargetKind,
};
pub use engine::{
    apply_ability, aura_bonus, can_use, healing_aura_pass, tick_cooldowns,
    tick_status_effects, AbilityTarget, AppliedEffect,
};
