//! Checked wrappers around every mutating engine call.
//!
//! Each wrapper evaluates the engine's own readiness/legality predicates
//! first and only then issues the call. Allocators branch on the returned
//! [`CallStatus`] instead of treating failures as exceptions.

use tracing::warn;

use crate::engine::{EngineResult, GameEngine, UnitId, UnitKind};
use crate::grid::{Direction, MapLocation};

/// Outcome of a checked engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    /// The call was issued and accepted.
    Done,
    /// A precondition (cooldown, range, legality) does not hold this round.
    NotReady,
    /// The engine rejected the call despite its predicate.
    Failed(String),
}

impl CallStatus {
    /// True if the call went through.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

fn finish(action: &'static str, unit: UnitId, result: EngineResult) -> CallStatus {
    match result {
        Ok(()) => CallStatus::Done,
        Err(err) => {
            warn!(action, unit, error = %err, "Engine call failed");
            CallStatus::Failed(err.to_string())
        }
    }
}

/// Step one cell in `dir`.
pub fn try_move<E: GameEngine + ?Sized>(engine: &mut E, unit: UnitId, dir: Direction) -> CallStatus {
    if dir == Direction::Center || !engine.is_move_ready(unit) || !engine.can_move(unit, dir) {
        return CallStatus::NotReady;
    }
    finish("move", unit, engine.move_unit(unit, dir))
}

/// Attack `target` if off cooldown and in range.
pub fn try_attack<E: GameEngine + ?Sized>(engine: &mut E, unit: UnitId, target: UnitId) -> CallStatus {
    if !engine.is_attack_ready(unit) || !engine.can_attack(unit, target) {
        return CallStatus::NotReady;
    }
    finish("attack", unit, engine.attack(unit, target))
}

/// Heal `target` if off cooldown and in range.
pub fn try_heal<E: GameEngine + ?Sized>(engine: &mut E, healer: UnitId, target: UnitId) -> CallStatus {
    if !engine.is_heal_ready(healer) || !engine.can_heal(healer, target) {
        return CallStatus::NotReady;
    }
    finish("heal", healer, engine.heal(healer, target))
}

/// Place a blueprint next to the worker.
pub fn try_blueprint<E: GameEngine + ?Sized>(
    engine: &mut E,
    worker: UnitId,
    kind: UnitKind,
    dir: Direction,
) -> CallStatus {
    if !engine.can_blueprint(worker, kind, dir) {
        return CallStatus::NotReady;
    }
    finish("blueprint", worker, engine.blueprint(worker, kind, dir))
}

/// Work on an unfinished structure.
pub fn try_build<E: GameEngine + ?Sized>(engine: &mut E, worker: UnitId, structure: UnitId) -> CallStatus {
    if !engine.can_build(worker, structure) {
        return CallStatus::NotReady;
    }
    finish("build", worker, engine.build(worker, structure))
}

/// Harvest karbonite in `dir`.
pub fn try_harvest<E: GameEngine + ?Sized>(engine: &mut E, worker: UnitId, dir: Direction) -> CallStatus {
    if !engine.can_harvest(worker, dir) {
        return CallStatus::NotReady;
    }
    finish("harvest", worker, engine.harvest(worker, dir))
}

/// Load a robot into a structure.
pub fn try_load<E: GameEngine + ?Sized>(engine: &mut E, structure: UnitId, robot: UnitId) -> CallStatus {
    if !engine.can_load(structure, robot) {
        return CallStatus::NotReady;
    }
    finish("load", structure, engine.load(structure, robot))
}

/// Unload the next garrisoned unit in `dir`.
pub fn try_unload<E: GameEngine + ?Sized>(engine: &mut E, structure: UnitId, dir: Direction) -> CallStatus {
    if !engine.can_unload(structure, dir) {
        return CallStatus::NotReady;
    }
    finish("unload", structure, engine.unload(structure, dir))
}

/// Launch a rocket.
pub fn try_launch<E: GameEngine + ?Sized>(
    engine: &mut E,
    rocket: UnitId,
    destination: MapLocation,
) -> CallStatus {
    if !engine.can_launch(rocket, destination) {
        return CallStatus::NotReady;
    }
    finish("launch", rocket, engine.launch(rocket, destination))
}

/// Produce a robot.
pub fn try_produce<E: GameEngine + ?Sized>(engine: &mut E, factory: UnitId, kind: UnitKind) -> CallStatus {
    if !engine.can_produce(factory, kind) {
        return CallStatus::NotReady;
    }
    finish("produce", factory, engine.produce(factory, kind))
}
