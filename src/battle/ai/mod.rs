//! Battle AI
//!
//! Architecture: Trait + Data hybrid
//! - BattleAI trait defines interface for swappable implementations
//! - AiPersonality struct holds TOML-loaded weights/preferences
//! - DecisionContext provides fog-of-war-filtered battle state
//!
//! An AI only proposes actions. Every proposal goes through the same
//! controller entry points as player input and may be rejected.

mod commander;
mod decision_context;
mod personality;

pub use commander::AiCommander;
pub use decision_context::DecisionContext;
pub use personality::{
    load_personality, AiPersonality, BehaviorConfig, DifficultyConfig, WeightConfig,
};

use crate::battle::execution::Action;
use crate::battle::units::UnitId;

/// Trait for battle AI implementations
pub trait BattleAI {
    /// Next action for one unit, or None when it has nothing useful to do
    fn decide(&mut self, context: &DecisionContext, unit: UnitId) -> Option<Action>;

    /// Get the personality configuration
    fn personality(&self) -> &AiPersonality;

    /// Check if AI cheats on fog of war
    fn ignores_fog_of_war(&self) -> bool;
}
