use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gameplay rejection. None of these abort the turn loop: the operation is
/// refused before any state changes and the reason is surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleError {
    /// Missing, dead, wrong-team, out-of-range or fogged target
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Points or cooldown unmet
    #[error("Insufficient resources: {0}")]
    InsufficientResources(String),

    /// Double-acting, ability on cooldown, dead actor
    #[error("Invalid unit state: {0}")]
    InvalidUnitState(String),

    /// Unknown unit type, ability or catalog entry referenced
    #[error("Data integrity: {0}")]
    DataIntegrity(String),
}

/// Coarse error category, used in the battle log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidTarget,
    InsufficientResources,
    InvalidUnitState,
    DataIntegrity,
}

impl BattleError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BattleError::InvalidTarget(_) => ErrorCategory::InvalidTarget,
            BattleError::InsufficientResources(_) => ErrorCategory::InsufficientResources,
            BattleError::InvalidUnitState(_) => ErrorCategory::InvalidUnitState,
            BattleError::DataIntegrity(_) => ErrorCategory::DataIntegrity,
        }
    }

    /// No gameplay error aborts the battle; data integrity faults degrade to a no-op
    pub fn is_fatal(&self) -> bool {
        false
    }

    /// Human-readable reason without the category prefix
    pub fn reason(&self) -> &str {
        match self {
            BattleError::InvalidTarget(r)
            | BattleError::InsufficientResources(r)
            | BattleError::InvalidUnitState(r)
            | BattleError::DataIntegrity(r) => r,
        }
    }
}

/// Errors loading configuration, content catalogs or saves
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsed, but failed validation
    #[error("Invalid content: {0}")]
    Invalid(String),

    #[error("Unsupported save version: {0}")]
    UnsupportedVersion(u32),
}

pub type Result<T> = std::result::Result<T, BattleError>;
