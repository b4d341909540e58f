//! Iron Front - deterministic rules engine for turn-based trench-warfare tactics

pub mod battle;
pub mod core;
