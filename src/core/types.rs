//! Core type definitions used throughout the codebase

/// Turn counter (1-based once the battle starts)
pub type Turn = u32;

/// Seed for the battle's random generator
pub type Seed = u64;
