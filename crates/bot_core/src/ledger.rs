//! Karbonite accounting and the construction project table.
//!
//! The engine debits karbonite only when a blueprint is placed. Until then
//! a planned project holds a reservation on the ledger, so:
//!
//! ```text
//! available = balance - sum(cost of projects not yet in progress)
//! ```
//!
//! Committing a project moves its cost from "reserved" to "spent" without
//! changing `available()`. Completing or cancelling removes the entry; a
//! planned project's reservation disappears with it, an in-progress one
//! has nothing left to return.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::UnitKind;
use crate::error::{BotError, Result};
use crate::grid::Cell;

/// One structure the controller intends to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Cell the structure goes on. Also the project key.
    pub cell: Cell,
    /// Structure kind.
    pub kind: UnitKind,
    /// Karbonite cost.
    pub cost: u32,
    /// The blueprint has been placed.
    pub in_progress: bool,
    /// Workers assigned this tick. Reset every tick.
    pub workers_assigned: u32,
}

impl Project {
    /// A freshly planned project.
    #[must_use]
    pub const fn new(cell: Cell, kind: UnitKind, cost: u32) -> Self {
        Self {
            cell,
            kind,
            cost,
            in_progress: false,
            workers_assigned: 0,
        }
    }
}

/// Spendable karbonite plus the project table keyed by cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    balance: u32,
    projects: BTreeMap<Cell, Project>,
}

impl Ledger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the engine's balance at the start of a tick.
    pub fn refresh(&mut self, balance: u32) {
        self.balance = balance;
    }

    /// Balance as last refreshed, minus spending recorded since.
    #[must_use]
    pub const fn balance(&self) -> u32 {
        self.balance
    }

    /// Karbonite held by planned projects.
    #[must_use]
    pub fn reserved(&self) -> u32 {
        self.projects
            .values()
            .filter(|p| !p.in_progress)
            .map(|p| p.cost)
            .sum()
    }

    /// Karbonite free for new projects and production.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.balance.saturating_sub(self.reserved())
    }

    /// Check if a project of `cost` fits in what is available.
    #[must_use]
    pub fn can_open_project(&self, cost: u32) -> bool {
        self.available() >= cost
    }

    /// Check if a cell already has a project.
    #[must_use]
    pub fn is_claimed(&self, cell: Cell) -> bool {
        self.projects.contains_key(&cell)
    }

    /// Reserve `cost` for a new project at `cell`.
    ///
    /// # Errors
    ///
    /// - [`BotError::CellAlreadyClaimed`] if the cell has a project
    /// - [`BotError::InsufficientResources`] if `cost` exceeds `available()`
    pub fn open_project(&mut self, cell: Cell, kind: UnitKind, cost: u32) -> Result<()> {
        if self.is_claimed(cell) {
            return Err(BotError::CellAlreadyClaimed(cell));
        }
        let available = self.available();
        if available < cost {
            return Err(BotError::InsufficientResources {
                required: cost,
                available,
            });
        }
        self.projects.insert(cell, Project::new(cell, kind, cost));
        debug!(cell = %cell, ?kind, cost, "Project opened");
        Ok(())
    }

    /// The blueprint was placed: the engine has spent the cost.
    ///
    /// Committing twice is a no-op.
    pub fn commit(&mut self, cell: Cell) -> Result<()> {
        let project = self
            .projects
            .get_mut(&cell)
            .ok_or(BotError::UnknownProject(cell))?;
        if !project.in_progress {
            project.in_progress = true;
            self.balance = self.balance.saturating_sub(project.cost);
            debug!(cell = %cell, "Project committed");
        }
        Ok(())
    }

    /// The structure is finished. Nothing is refunded.
    pub fn complete(&mut self, cell: Cell) -> Result<Project> {
        let project = self
            .projects
            .remove(&cell)
            .ok_or(BotError::UnknownProject(cell))?;
        debug!(cell = %cell, "Project complete");
        Ok(project)
    }

    /// Drop a project. A planned project's reservation is released.
    pub fn cancel(&mut self, cell: Cell) -> Result<Project> {
        let project = self
            .projects
            .remove(&cell)
            .ok_or(BotError::UnknownProject(cell))?;
        debug!(cell = %cell, in_progress = project.in_progress, "Project cancelled");
        Ok(project)
    }

    /// Record karbonite spent outside the project table this tick.
    pub fn note_spent(&mut self, amount: u32) {
        self.balance = self.balance.saturating_sub(amount);
    }

    /// Look up a project.
    #[must_use]
    pub fn project(&self, cell: Cell) -> Option<&Project> {
        self.projects.get(&cell)
    }

    /// Mutable project lookup.
    pub fn project_mut(&mut self, cell: Cell) -> Option<&mut Project> {
        self.projects.get_mut(&cell)
    }

    /// All projects in cell order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// Cells of all projects in cell order.
    #[must_use]
    pub fn project_cells(&self) -> Vec<Cell> {
        self.projects.keys().copied().collect()
    }

    /// Number of projects still waiting for a blueprint.
    #[must_use]
    pub fn planned_count(&self) -> usize {
        self.projects.values().filter(|p| !p.in_progress).count()
    }

    /// Number of planned projects of `kind`.
    #[must_use]
    pub fn planned_of(&self, kind: UnitKind) -> usize {
        self.projects
            .values()
            .filter(|p| !p.in_progress && p.kind == kind)
            .count()
    }

    /// Reset per-tick worker counters.
    pub fn reset_assignments(&mut self) {
        for project in self.projects.values_mut() {
            project.workers_assigned = 0;
        }
    }

    /// Total workers assigned across all projects this tick.
    #[must_use]
    pub fn total_assigned(&self) -> u32 {
        self.projects.values().map(|p| p.workers_assigned).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACTORY: u32 = 200;

    #[test]
    fn test_open_reserves_cost() {
        let mut ledger = Ledger::new();
        ledger.refresh(500);

        ledger.open_project(Cell::new(1, 1), UnitKind::Factory, FACTORY).unwrap();
        assert_eq!(ledger.available(), 300);
        assert!(ledger.can_open_project(300));
        assert!(!ledger.can_open_project(301));
    }

    #[test]
    fn test_commit_and_complete_do_not_move_available() {
        let mut ledger = Ledger::new();
        ledger.refresh(500);
        let cell = Cell::new(2, 2);

        ledger.open_project(cell, UnitKind::Factory, FACTORY).unwrap();
        let after_open = ledger.available();
        assert_eq!(after_open, 500 - FACTORY);

        ledger.commit(cell).unwrap();
        assert_eq!(ledger.available(), after_open);
        assert_eq!(ledger.reserved(), 0);

        // Next tick the engine reports the debited balance.
        ledger.refresh(500 - FACTORY);
        assert_eq!(ledger.available(), after_open);

        ledger.complete(cell).unwrap();
        assert_eq!(ledger.available(), after_open);
        assert!(ledger.project(cell).is_none());
    }

    #[test]
    fn test_double_commit_debits_once() {
        let mut ledger = Ledger::new();
        ledger.refresh(400);
        let cell = Cell::new(0, 0);
        ledger.open_project(cell, UnitKind::Factory, FACTORY).unwrap();
        ledger.commit(cell).unwrap();
        ledger.commit(cell).unwrap();
        assert_eq!(ledger.balance(), 200);
    }

    #[test]
    fn test_cancel_planned_releases_reservation() {
        let mut ledger = Ledger::new();
        ledger.refresh(250);
        let cell = Cell::new(3, 3);

        ledger.open_project(cell, UnitKind::Rocket, 150).unwrap();
        assert_eq!(ledger.available(), 100);
        let dropped = ledger.cancel(cell).unwrap();
        assert!(!dropped.in_progress);
        assert_eq!(ledger.available(), 250);
    }

    #[test]
    fn test_claimed_cell_is_rejected() {
        let mut ledger = Ledger::new();
        ledger.refresh(1000);
        let cell = Cell::new(4, 4);
        ledger.open_project(cell, UnitKind::Factory, FACTORY).unwrap();

        let err = ledger
            .open_project(cell, UnitKind::Rocket, 150)
            .unwrap_err();
        assert!(matches!(err, BotError::CellAlreadyClaimed(c) if c == cell));
        assert_eq!(ledger.projects().count(), 1);
    }

    #[test]
    fn test_unaffordable_project_is_rejected() {
        let mut ledger = Ledger::new();
        ledger.refresh(199);
        let err = ledger
            .open_project(Cell::new(0, 0), UnitKind::Factory, FACTORY)
            .unwrap_err();
        assert!(matches!(
            err,
            BotError::InsufficientResources {
                required: 200,
                available: 199
            }
        ));
    }

    #[test]
    fn test_unknown_project() {
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.commit(Cell::new(9, 9)),
            Err(BotError::UnknownProject(_))
        ));
        assert!(ledger.complete(Cell::new(9, 9)).is_err());
        assert!(ledger.cancel(Cell::new(9, 9)).is_err());
    }

    #[test]
    fn test_note_spent_reduces_available() {
        let mut ledger = Ledger::new();
        ledger.refresh(100);
        ledger.note_spent(40);
        assert_eq!(ledger.available(), 60);
        ledger.note_spent(500);
        assert_eq!(ledger.available(), 0);
    }

    #[test]
    fn test_assignment_counters() {
        let mut ledger = Ledger::new();
        ledger.refresh(1000);
        ledger.open_project(Cell::new(0, 0), UnitKind::Factory, FACTORY).unwrap();
        ledger.open_project(Cell::new(5, 5), UnitKind::Factory, FACTORY).unwrap();

        ledger.project_mut(Cell::new(0, 0)).unwrap().workers_assigned = 2;
        ledger.project_mut(Cell::new(5, 5)).unwrap().workers_assigned = 1;
        assert_eq!(ledger.total_assigned(), 3);
        assert_eq!(ledger.planned_of(UnitKind::Factory), 2);
        assert_eq!(ledger.planned_of(UnitKind::Rocket), 0);
        assert_eq!(ledger.planned_count(), 2);

        ledger.reset_assignments();
        assert_eq!(ledger.total_assigned(), 0);
    }
}
