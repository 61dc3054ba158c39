//! Karbonite harvesting.
//!
//! Workers left over after construction walk to the nearest known deposit
//! and mine it. Deposit amounts are cached in a [`ResourceMap`] seeded from
//! the planet map and refreshed once per tick.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::{try_harvest, CallStatus};
use crate::context::WorkerPool;
use crate::engine::GameEngine;
use crate::grid::{Cell, PlanetMap};
use crate::navigation::advance_toward;

/// Cached karbonite per cell of one planet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMap {
    width: u32,
    height: u32,
    /// Row-major amounts.
    amounts: Vec<u32>,
}

impl ResourceMap {
    /// Seed from the deposits present at match start.
    #[must_use]
    pub fn from_map(map: &PlanetMap) -> Self {
        Self {
            width: map.width(),
            height: map.height(),
            amounts: map.cells().map(|c| map.initial_karbonite(c)).collect(),
        }
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        let inside =
            cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height;
        inside.then(|| (cell.y as usize) * (self.width as usize) + (cell.x as usize))
    }

    /// Cached amount at a cell; zero off the map.
    #[must_use]
    pub fn amount(&self, cell: Cell) -> u32 {
        self.index(cell).map_or(0, |i| self.amounts[i])
    }

    /// Overwrite the cached amount at a cell.
    pub fn set(&mut self, cell: Cell, amount: u32) {
        if let Some(i) = self.index(cell) {
            self.amounts[i] = amount;
        }
    }

    /// Query every cell. Cells the engine cannot see keep their value.
    pub fn refresh<E: GameEngine + ?Sized>(&mut self, engine: &E) {
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let cell = Cell::new(x, y);
                if let Some(amount) = engine.karbonite_at(cell) {
                    self.set(cell, amount);
                }
            }
        }
    }

    /// Total cached karbonite.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.amounts.iter().map(|&a| u64::from(a)).sum()
    }

    /// Nearest cell with a positive amount, by squared distance.
    ///
    /// Scans the whole map; ties go to the first cell in row-major order.
    #[must_use]
    pub fn nearest_deposit(&self, from: Cell) -> Option<Cell> {
        let width = self.width as usize;
        self.amounts
            .iter()
            .enumerate()
            .filter(|(_, amount)| **amount > 0)
            .map(|(i, _)| Cell::new((i % width) as i32, (i / width) as i32))
            .min_by_key(|c| c.distance_squared(from))
    }
}

/// Outcome of one harvest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    /// Workers that mined this tick.
    pub harvested: u32,
    /// Workers that walked toward a deposit.
    pub travelling: u32,
    /// Workers with no known deposit.
    pub idle: u32,
}

/// Send every remaining idle worker to mine.
pub fn run<E: GameEngine + ?Sized>(
    engine: &mut E,
    resources: &ResourceMap,
    pool: &mut WorkerPool,
) -> HarvestReport {
    let mut report = HarvestReport::default();

    for worker in pool.claim_all() {
        let Some(deposit) = resources.nearest_deposit(worker.cell) else {
            report.idle += 1;
            continue;
        };

        if worker.cell.is_adjacent_to(deposit) {
            let dir = worker.cell.direction_to(deposit);
            match try_harvest(engine, worker.unit.id, dir) {
                CallStatus::Done => report.harvested += 1,
                CallStatus::NotReady | CallStatus::Failed(_) => {
                    debug!(unit = worker.unit.id, cell = %deposit, "Harvest skipped");
                }
            }
        } else {
            advance_toward(engine, &worker.unit, deposit);
            report.travelling += 1;
        }
    }

    report
}
