//! Battle rule constants - fixed values shared by every mission
//!
//! These values are ADDITIVE, never multiplicative. Tunables that a mission
//! may override live in `core::config::BattleConfig`.

// Experience awarded per attack
pub const XP_KILL: u32 = 75;
pub const XP_HIT: u32 = 25;
pub const XP_FLANKING: u32 = 15;
pub const XP_CRITICAL: u32 = 10;

// Rank thresholds (total xp)
pub const REGULAR_XP: u32 = 100;
pub const VETERAN_XP: u32 = 250;
pub const ELITE_XP: u32 = 500;

// Flanking: ally must be within this Chebyshev distance of the defender
pub const FLANK_ALLY_RANGE: u32 = 2;

// Critical hits multiply total damage
pub const CRITICAL_MULTIPLIER: u32 = 2;

// Combined arms: a differently-typed ally within this distance of the attacker
pub const COMBINED_ARMS_RANGE: u32 = 1;

// Suppression applied by suppressing fire and barrages
pub const SUPPRESS_TURNS: u32 = 2;

// Reinforcements land within this Chebyshev distance of the requested tile
pub const SPAWN_SEARCH_RADIUS: u32 = 3;

// Snapshots kept for undo within a turn
pub const UNDO_DEPTH: usize = 32;

// Upper bound on actions an AI issues for one unit per turn
pub const AI_STEPS_PER_UNIT: usize = 4;

// Save format
pub const SAVE_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_worth_more_than_hit() {
        assert!(XP_KILL > XP_HIT);
    }

    #[test]
    fn test_rank_thresholds_ordered() {
        assert!(REGULAR_XP < VETERAN_XP);
        assert!(VETERAN_XP < ELITE_XP);
    }
}
