//! Structure construction.
//!
//! Each project moves through
//!
//! ```text
//! PLANNED --blueprint--> IN_PROGRESS --built--> COMPLETE
//!    |                        |
//!    +--> CANCELLED <---------+
//! ```
//!
//! A planned project is cancelled when its cell turns impassable or is taken
//! by a structure or an enemy unit; an in-progress one when its structure
//! disappears.
//! Workers are claimed out of the tick's [`WorkerPool`] so the harvest pass
//! never sees them.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commands::{try_blueprint, try_build, try_move, CallStatus};
use crate::config::BotConfig;
use crate::context::{IdleWorker, TickSnapshot, WorkerPool};
use crate::engine::{GameEngine, UnitInfo, UnitKind};
use crate::grid::{Cell, Direction};
use crate::ledger::Ledger;
use crate::navigation::advance_toward;

/// Outcome of one construction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionReport {
    /// Projects opened this tick.
    pub opened: u32,
    /// Blueprints placed this tick.
    pub blueprinted: u32,
    /// Build actions issued this tick.
    pub builds: u32,
    /// Projects whose structure finished.
    pub completed: u32,
    /// Projects dropped.
    pub cancelled: u32,
    /// Workers claimed from the pool.
    pub workers_claimed: u32,
}

/// Own structure standing on `cell`, if any.
fn structure_at<E: GameEngine + ?Sized>(engine: &E, cell: Cell) -> Option<UnitInfo> {
    let team = engine.team();
    engine
        .sense_nearby_units(cell, 0)
        .into_iter()
        .find(|u| u.team == team && u.kind.is_structure())
}

/// Something on `cell` that will not make way: any structure or enemy.
fn cell_taken<E: GameEngine + ?Sized>(engine: &E, cell: Cell) -> bool {
    let team = engine.team();
    engine
        .sense_nearby_units(cell, 0)
        .iter()
        .any(|u| u.team != team || u.kind.is_structure())
}

/// Run reconcile, open, blueprint and build for this tick.
pub fn run<E: GameEngine + ?Sized>(
    engine: &mut E,
    config: &BotConfig,
    ledger: &mut Ledger,
    snapshot: &mut TickSnapshot,
) -> ConstructionReport {
    let mut report = ConstructionReport::default();
    reconcile(engine, ledger, &mut report);
    open_projects(engine, config, ledger, snapshot, &mut report);
    staff_planned(engine, ledger, &mut snapshot.workers, &mut report);
    staff_in_progress(engine, config, ledger, &mut snapshot.workers, &mut report);
    report
}

/// Complete finished projects, cancel invalid ones, reset worker counters.
pub fn reconcile<E: GameEngine + ?Sized>(engine: &E, ledger: &mut Ledger, report: &mut ConstructionReport) {
    let planet = engine.planet();
    for cell in ledger.project_cells() {
        let Some(project) = ledger.project(cell) else {
            continue;
        };
        let outcome = if project.in_progress {
            match structure_at(engine, cell) {
                Some(s) if s.is_built => ledger.complete(cell).map(|_| true),
                Some(_) => continue,
                None => ledger.cancel(cell).map(|_| false),
            }
        } else if cell_taken(engine, cell) || !engine.planet_map(planet).is_passable(cell) {
            ledger.cancel(cell).map(|_| false)
        } else {
            continue;
        };

        match outcome {
            Ok(true) => {
                info!(cell = %cell, "Structure complete");
                report.completed += 1;
            }
            Ok(false) => report.cancelled += 1,
            Err(err) => debug!(cell = %cell, error = %err, "Reconcile skipped"),
        }
    }
    ledger.reset_assignments();
}

/// Kind of the next structure to plan, if any.
pub fn next_structure_kind(config: &BotConfig, ledger: &Ledger, snapshot: &TickSnapshot) -> Option<UnitKind> {
    let have = |kind: UnitKind| snapshot.units_of(kind).count() + ledger.planned_of(kind);

    if have(UnitKind::Factory) < config.factory_target {
        Some(UnitKind::Factory)
    } else if snapshot.round >= config.rocket_from_round && have(UnitKind::Rocket) < config.rocket_target {
        Some(UnitKind::Rocket)
    } else {
        None
    }
}

/// First free cell next to an idle worker (no structures yet) or diagonal
/// to an existing structure.
pub fn find_placement<E: GameEngine + ?Sized>(
    engine: &E,
    ledger: &Ledger,
    snapshot: &TickSnapshot,
) -> Option<Cell> {
    let map = engine.planet_map(snapshot.planet);
    let usable = |c: Cell| map.is_passable(c) && !engine.is_occupied(c) && !ledger.is_claimed(c);

    let structures: Vec<Cell> = snapshot.structures().map(|(_, c)| c).collect();
    if structures.is_empty() {
        snapshot
            .workers
            .iter()
            .flat_map(|w| Direction::ALL.iter().map(move |&d| w.cell.add(d)))
            .find(|&c| usable(c))
    } else {
        structures
            .iter()
            .flat_map(|&s| Direction::DIAGONALS.iter().map(move |&d| s.add(d)))
            .find(|&c| usable(c))
    }
}

fn open_projects<E: GameEngine + ?Sized>(
    engine: &E,
    config: &BotConfig,
    ledger: &mut Ledger,
    snapshot: &TickSnapshot,
    report: &mut ConstructionReport,
) {
    while ledger.planned_count() < config.max_planned_projects {
        let Some(kind) = next_structure_kind(config, ledger, snapshot) else {
            break;
        };
        let cost = engine.cost_of(kind);
        if !ledger.can_open_project(cost) {
            break;
        }
        let Some(cell) = find_placement(engine, ledger, snapshot) else {
            debug!(?kind, "No placement cell");
            break;
        };
        match ledger.open_project(cell, kind, cost) {
            Ok(()) => report.opened += 1,
            Err(err) => {
                debug!(cell = %cell, error = %err, "Project not opened");
                break;
            }
        }
    }
}

/// Move a worker off the cell it blocks.
fn step_aside<E: GameEngine + ?Sized>(engine: &mut E, worker: &IdleWorker) {
    for dir in Direction::ALL {
        if engine.can_move(worker.unit.id, dir) {
            try_move(engine, worker.unit.id, dir);
            return;
        }
    }
}

fn staff_planned<E: GameEngine + ?Sized>(
    engine: &mut E,
    ledger: &mut Ledger,
    pool: &mut WorkerPool,
    report: &mut ConstructionReport,
) {
    let planned: Vec<(Cell, UnitKind)> = ledger
        .projects()
        .filter(|p| !p.in_progress)
        .map(|p| (p.cell, p.kind))
        .collect();

    for (cell, kind) in planned {
        let Some(worker) = pool.claim_nearest(cell) else {
            break;
        };
        report.workers_claimed += 1;
        if let Some(project) = ledger.project_mut(cell) {
            project.workers_assigned += 1;
        }

        if worker.cell == cell {
            step_aside(engine, &worker);
        } else if advance_toward(engine, &worker.unit, cell) {
            let dir = worker.cell.direction_to(cell);
            if try_blueprint(engine, worker.unit.id, kind, dir) == CallStatus::Done {
                info!(cell = %cell, ?kind, worker = worker.unit.id, "Blueprint placed");
                report.blueprinted += 1;
                if let Err(err) = ledger.commit(cell) {
                    debug!(cell = %cell, error = %err, "Commit failed");
                }
            }
        }
    }
}

fn staff_in_progress<E: GameEngine + ?Sized>(
    engine: &mut E,
    config: &BotConfig,
    ledger: &mut Ledger,
    pool: &mut WorkerPool,
    report: &mut ConstructionReport,
) {
    let active: Vec<Cell> = ledger
        .projects()
        .filter(|p| p.in_progress)
        .map(|p| p.cell)
        .collect();

    for cell in active {
        let Some(structure) = structure_at(engine, cell) else {
            continue;
        };
        loop {
            let assigned = ledger.project(cell).map_or(u32::MAX, |p| p.workers_assigned);
            if assigned >= config.project_worker_cap {
                break;
            }
            let Some(worker) = pool.claim_nearest(cell) else {
                return;
            };
            report.workers_claimed += 1;
            if let Some(project) = ledger.project_mut(cell) {
                project.workers_assigned += 1;
            }

            if advance_toward(engine, &worker.unit, cell) && try_build(engine, worker.unit.id, structure.id).is_done() {
                report.builds += 1;
            }
        }
    }
}
