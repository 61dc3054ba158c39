//! Factory production.
//!
//! Every built factory unloads one garrisoned robot per tick and queues the
//! next one if the ledger can spare the karbonite. Workers come first until
//! `min_workers` exist; after that the factory cycles through the configured
//! army composition.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::{try_produce, try_unload, CallStatus};
use crate::config::BotConfig;
use crate::context::TickSnapshot;
use crate::engine::{GameEngine, UnitKind};
use crate::grid::Direction;
use crate::ledger::Ledger;

/// Outcome of one production pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionReport {
    /// Robots started this tick.
    pub produced: u32,
    /// Robots let out of a factory.
    pub unloaded: u32,
}

/// Kind the next factory should produce.
///
/// `cursor` indexes into `army_composition` and only advances when a
/// soldier is actually queued.
#[must_use]
pub fn next_unit_kind(config: &BotConfig, workers: usize, cursor: usize) -> UnitKind {
    if workers < config.min_workers {
        return UnitKind::Worker;
    }
    match config.army_composition.len() {
        0 => UnitKind::Worker,
        n => config.army_composition[cursor % n],
    }
}

/// Unload and produce at every built factory.
pub fn run<E: GameEngine + ?Sized>(
    engine: &mut E,
    config: &BotConfig,
    ledger: &mut Ledger,
    cursor: &mut usize,
    snapshot: &TickSnapshot,
) -> ProductionReport {
    let mut report = ProductionReport::default();
    let mut workers = snapshot.units_of(UnitKind::Worker).count();

    let factories: Vec<_> = snapshot
        .structures()
        .filter(|(u, _)| u.kind == UnitKind::Factory && u.is_built)
        .map(|(u, _)| u.id)
        .collect();

    for factory in factories {
        if let Some(&dir) = Direction::ALL
            .iter()
            .find(|&&d| engine.can_unload(factory, d))
        {
            if try_unload(engine, factory, dir).is_done() {
                report.unloaded += 1;
            }
        }

        let kind = next_unit_kind(config, workers, *cursor);
        let cost = engine.cost_of(kind);
        if ledger.available() < cost {
            continue;
        }
        match try_produce(engine, factory, kind) {
            CallStatus::Done => {
                debug!(factory, ?kind, cost, "Production started");
                ledger.note_spent(cost);
                report.produced += 1;
                if kind == UnitKind::Worker {
                    workers += 1;
                } else {
                    *cursor += 1;
                }
            }
            CallStatus::NotReady | CallStatus::Failed(_) => {}
        }
    }

    report
}
