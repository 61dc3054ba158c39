//! Error types for the controller core.
//!
//! Nothing in here is fatal to a tick: allocators turn these into
//! "back off and retry next round" decisions. They exist so that the
//! reason for a back-off can be logged and asserted on in tests.

use thiserror::Error;

use crate::engine::UnitId;
use crate::grid::Cell;

/// Result type alias using [`BotError`].
pub type Result<T> = std::result::Result<T, BotError>;

/// Top-level error type for planning and configuration failures.
#[derive(Debug, Error)]
pub enum BotError {
    /// The pathfinder exhausted its frontier without reaching the goal.
    #[error("No path from {start} to {goal}")]
    NoPath {
        /// Cell the search started from.
        start: Cell,
        /// Cell the search tried to reach.
        goal: Cell,
    },

    /// A cell lies outside the planet map.
    #[error("Cell {0} is outside the map")]
    OutOfBounds(Cell),

    /// A project already exists at this cell.
    #[error("Cell {0} already has a construction project")]
    CellAlreadyClaimed(Cell),

    /// No project is registered at this cell.
    #[error("No construction project at {0}")]
    UnknownProject(Cell),

    /// The ledger cannot cover a cost.
    #[error("Insufficient karbonite: need {required}, have {available}")]
    InsufficientResources {
        /// Amount required.
        required: u32,
        /// Amount currently spendable.
        available: u32,
    },

    /// Config file does not exist.
    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    /// Config file could not be read.
    #[error("Failed to read config file: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// Config file is not valid RON.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Config could not be written as RON.
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] ron::Error),

    /// Config parsed but holds an unusable value.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Failure reported by a mutating engine call.
///
/// The engine's `can_*` predicates are checked before every call, so an
/// `EngineError` means the engine disagreed with its own predicate or the
/// unit vanished between the check and the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The referenced unit does not exist (anymore).
    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),

    /// The engine refused the request.
    #[error("Engine rejected {action}: {reason}")]
    Rejected {
        /// Name of the call that was rejected.
        action: &'static str,
        /// Engine-provided reason.
        reason: String,
    },
}

impl EngineError {
    /// Shorthand for building a [`EngineError::Rejected`].
    #[must_use]
    pub fn rejected(action: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            action,
            reason: reason.into(),
        }
    }
}
