//! Long-lived match state and the per-tick snapshot.
//!
//! [`SimContext`] is built once when a match starts, mutated in place by
//! every allocator each tick, and dropped when the match ends. It owns the
//! project table (inside the [`Ledger`]), the squad table, the scout roster,
//! the sightings list and the seeded RNG.
//!
//! [`TickSnapshot`] is rebuilt at the start of every tick from the engine.
//! Allocators claim idle workers out of its [`WorkerPool`], which is how a
//! worker is kept from being used twice in one tick.

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::BotConfig;
use crate::engine::{resolve_local, GameEngine, UnitId, UnitInfo, UnitKind};
use crate::grid::{Cell, Planet};
use crate::harvest::ResourceMap;
use crate::ledger::Ledger;
use crate::scout::{ScoutManager, Sightings};
use crate::squad::SquadManager;

/// A worker available for assignment this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleWorker {
    /// Engine snapshot of the worker.
    pub unit: UnitInfo,
    /// Cell it stands on.
    pub cell: Cell,
}

/// Workers nobody has claimed yet this tick, in id order.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    workers: Vec<IdleWorker>,
}

impl WorkerPool {
    /// Pool from workers in the order given.
    #[must_use]
    pub fn new(workers: Vec<IdleWorker>) -> Self {
        Self { workers }
    }

    /// Number of unclaimed workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// True if every worker has been claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Unclaimed workers in pool order.
    pub fn iter(&self) -> impl Iterator<Item = &IdleWorker> {
        self.workers.iter()
    }

    /// Claim the worker nearest to `cell` by squared distance.
    ///
    /// Ties go to the worker earlier in the pool.
    pub fn claim_nearest(&mut self, cell: Cell) -> Option<IdleWorker> {
        let index = self
            .workers
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| w.cell.distance_squared(cell))
            .map(|(i, _)| i)?;
        Some(self.workers.remove(index))
    }

    /// Claim a specific worker.
    pub fn claim(&mut self, id: UnitId) -> Option<IdleWorker> {
        let index = self.workers.iter().position(|w| w.unit.id == id)?;
        Some(self.workers.remove(index))
    }

    /// Claim everything that is left.
    pub fn claim_all(&mut self) -> Vec<IdleWorker> {
        std::mem::take(&mut self.workers)
    }
}

/// What the engine looked like at the start of this tick.
#[derive(Debug, Clone)]
pub struct TickSnapshot {
    /// Round number.
    pub round: u32,
    /// Planet the controller runs on.
    pub planet: Planet,
    /// Own units that are local to this planet, in id order.
    pub units: Vec<UnitInfo>,
    /// Idle workers still up for grabs.
    pub workers: WorkerPool,
    /// Size of the worker pool before any allocator ran.
    pub idle_at_start: usize,
    /// Combat units on the map that were not seen before this tick.
    pub fresh: Vec<UnitInfo>,
}

impl TickSnapshot {
    /// Local own units of `kind`.
    pub fn units_of(&self, kind: UnitKind) -> impl Iterator<Item = &UnitInfo> {
        self.units.iter().filter(move |u| u.kind == kind)
    }

    /// Local own structures standing on the map.
    pub fn structures(&self) -> impl Iterator<Item = (&UnitInfo, Cell)> {
        let planet = self.planet;
        self.units
            .iter()
            .filter(|u| u.kind.is_structure())
            .filter_map(move |u| u.cell_on(planet).map(|c| (u, c)))
    }
}

/// Per-match controller state.
#[derive(Debug, Clone)]
pub struct SimContext {
    /// Tuning knobs.
    pub config: BotConfig,
    /// Seeded RNG for random walks and launch sites.
    pub rng: ChaCha8Rng,
    /// Karbonite and projects.
    pub ledger: Ledger,
    /// Cached karbonite deposits.
    pub resources: ResourceMap,
    /// Squads, plan queue, waypoints and pending launches.
    pub squads: SquadManager,
    /// Scout roster.
    pub scouts: ScoutManager,
    /// Enemy positions reported by scouts.
    pub sightings: Sightings,
    /// Rotation index into `army_composition`.
    pub army_cursor: usize,
    seen: BTreeSet<UnitId>,
}

impl SimContext {
    /// Build the context at match start.
    pub fn new<E: GameEngine + ?Sized>(config: BotConfig, engine: &E) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let resources = ResourceMap::from_map(engine.planet_map(engine.planet()));
        let scouts = ScoutManager::new(config.scout_quota, config.scout_kind);
        Self {
            config,
            rng,
            ledger: Ledger::new(),
            resources,
            squads: SquadManager::new(),
            scouts,
            sightings: Sightings::default(),
            army_cursor: 0,
            seen: BTreeSet::new(),
        }
    }

    /// Refresh the ledger and resource cache and take this tick's snapshot.
    pub fn begin_tick<E: GameEngine + ?Sized>(&mut self, engine: &E) -> TickSnapshot {
        let planet = engine.planet();
        self.ledger.refresh(engine.karbonite());
        self.resources.refresh(engine);

        let mut units: Vec<UnitInfo> = engine
            .my_units()
            .into_iter()
            .filter_map(|u| resolve_local(engine, u.id, planet))
            .collect();
        units.sort_by_key(|u| u.id);

        let workers: Vec<IdleWorker> = units
            .iter()
            .filter(|u| u.kind == UnitKind::Worker)
            .filter_map(|u| {
                u.cell_on(planet).map(|cell| IdleWorker {
                    unit: u.clone(),
                    cell,
                })
            })
            .collect();

        let fresh: Vec<UnitInfo> = units
            .iter()
            .filter(|u| u.kind.is_soldier() && u.cell_on(planet).is_some())
            .filter(|u| !self.seen.contains(&u.id))
            .cloned()
            .collect();
        self.seen.extend(fresh.iter().map(|u| u.id));

        let idle_at_start = workers.len();
        TickSnapshot {
            round: engine.round(),
            planet,
            units,
            workers: WorkerPool::new(workers),
            idle_at_start,
            fresh,
        }
    }

    /// Describe every broken bookkeeping invariant.
    ///
    /// Empty when the context is consistent with `snapshot`.
    #[must_use]
    pub fn invariant_violations(&self, snapshot: &TickSnapshot) -> Vec<String> {
        let mut problems = Vec::new();

        let assigned = self.ledger.total_assigned() as usize;
        if assigned > snapshot.idle_at_start {
            problems.push(format!(
                "{assigned} workers assigned but only {} were idle",
                snapshot.idle_at_start
            ));
        }
        for project in self.ledger.projects() {
            if project.workers_assigned > self.config.project_worker_cap {
                problems.push(format!(
                    "project at {} has {} workers, cap is {}",
                    project.cell, project.workers_assigned, self.config.project_worker_cap
                ));
            }
        }

        let mut rostered = BTreeSet::new();
        for id in self.squads.all_members() {
            if !rostered.insert(id) {
                problems.push(format!("unit {id} is in more than one squad"));
            }
            if self.scouts.contains(id) {
                problems.push(format!("unit {id} is both scout and squad member"));
            }
        }

        problems
    }
}
