//! # Bot Core
//!
//! Tick-based fleet controller for a two-planet grid RTS.
//!
//! This crate contains **only** decision logic:
//! - No IO beyond loading a config file
//! - No system randomness (every random choice draws from a seeded RNG)
//! - No engine of its own; everything goes through [`engine::GameEngine`]
//!
//! Each round the [`controller::Controller`] snapshots the engine, hands
//! idle workers to construction and harvesting, keeps factories busy, and
//! moves squads through their action queue.
//!
//! ## Crate Structure
//!
//! - [`engine`] - Engine boundary trait and unit snapshots
//! - [`commands`] - Checked engine calls returning [`commands::CallStatus`]
//! - [`grid`] - Cells, directions and planet maps
//! - [`pathfinding`] - A* on the 8-connected grid
//! - [`navigation`] - One step toward a target per round
//! - [`ledger`] - Karbonite reservations for construction projects
//! - [`construction`], [`harvest`], [`production`] - Worker and factory allocators
//! - [`squad`], [`scout`] - Combat units
//! - [`context`] - Per-match state and per-tick snapshot
//! - [`sandbox`] - Deterministic in-memory engine for tests and headless runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod commands;
pub mod config;
pub mod construction;
pub mod context;
pub mod controller;
pub mod engine;
pub mod error;
pub mod grid;
pub mod harvest;
pub mod ledger;
pub mod navigation;
pub mod pathfinding;
pub mod production;
pub mod sandbox;
pub mod scout;
pub mod squad;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::CallStatus;
    pub use crate::config::BotConfig;
    pub use crate::context::{SimContext, TickSnapshot};
    pub use crate::controller::{Controller, TickReport};
    pub use crate::engine::{GameEngine, Team, UnitId, UnitInfo, UnitKind, UnitLocation};
    pub use crate::error::{BotError, EngineError, Result};
    pub use crate::grid::{Cell, Direction, MapLocation, Planet, PlanetMap};
    pub use crate::ledger::{Ledger, Project};
    pub use crate::sandbox::SandboxEngine;
    pub use crate::squad::{Action, ActionKind, FollowUp, SquadManager, SquadState};
}
