//! # Bot Test Utilities
//!
//! Shared testing utilities for all crates:
//! - ASCII map and sandbox fixtures
//! - Breadth-first reference pathfinder
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bfs;
pub mod determinism;
pub mod fixtures;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
