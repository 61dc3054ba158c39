//! Scouts and enemy sightings.
//!
//! A fixed number of freshly produced units are drafted as scouts. They
//! wander at random and report enemy rockets, factories and workers they
//! see. Squads consume those reports as attack targets.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::{resolve_local, GameEngine, UnitId, UnitInfo, UnitKind};
use crate::grid::Cell;
use crate::navigation::random_step;

/// Enemy positions, newest last, deduplicated by cell per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sightings {
    rockets: Vec<Cell>,
    factories: Vec<Cell>,
    workers: Vec<Cell>,
}

impl Sightings {
    fn list_mut(&mut self, kind: UnitKind) -> Option<&mut Vec<Cell>> {
        match kind {
            UnitKind::Rocket => Some(&mut self.rockets),
            UnitKind::Factory => Some(&mut self.factories),
            UnitKind::Worker => Some(&mut self.workers),
            _ => None,
        }
    }

    /// Record an enemy of `kind` at `cell`.
    ///
    /// Returns `true` if the sighting is new. Kinds that are not targets
    /// are ignored.
    pub fn report(&mut self, kind: UnitKind, cell: Cell) -> bool {
        match self.list_mut(kind) {
            Some(list) if !list.contains(&cell) => {
                list.push(cell);
                true
            }
            _ => false,
        }
    }

    /// Take the most urgent target: rockets, then factories, then workers,
    /// newest first within each.
    pub fn pop_target(&mut self) -> Option<Cell> {
        self.rockets
            .pop()
            .or_else(|| self.factories.pop())
            .or_else(|| self.workers.pop())
    }

    /// Total sightings held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rockets.len() + self.factories.len() + self.workers.len()
    }

    /// True if nothing has been sighted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The scout roster and its unfilled slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoutManager {
    quota: usize,
    kind: UnitKind,
    scouts: Vec<UnitId>,
    demand: usize,
}

impl ScoutManager {
    /// Empty roster with every slot open.
    #[must_use]
    pub fn new(quota: usize, kind: UnitKind) -> Self {
        Self {
            quota,
            kind,
            scouts: Vec::new(),
            demand: quota,
        }
    }

    /// Current scouts.
    #[must_use]
    pub fn scouts(&self) -> &[UnitId] {
        &self.scouts
    }

    /// Open slots waiting for a fresh unit.
    #[must_use]
    pub const fn demand(&self) -> usize {
        self.demand
    }

    /// True if `id` is a scout.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.scouts.contains(&id)
    }

    /// Forget scouts that are gone and reopen their slots.
    pub fn drop_stale<E: GameEngine + ?Sized>(&mut self, engine: &E) -> usize {
        let planet = engine.planet();
        let before = self.scouts.len();
        self.scouts
            .retain(|&id| resolve_local(engine, id, planet).is_some());
        let lost = before - self.scouts.len();
        if lost > 0 {
            debug!(lost, "Scouts lost");
        }
        self.demand = self.quota.saturating_sub(self.scouts.len());
        lost
    }

    /// Draft fresh units of the scouting kind into open slots.
    ///
    /// Returns the units that were not drafted.
    pub fn enlist(&mut self, fresh: Vec<UnitInfo>) -> Vec<UnitInfo> {
        let mut rest = Vec::with_capacity(fresh.len());
        for unit in fresh {
            if self.demand > 0 && unit.kind == self.kind {
                info!(unit = unit.id, "Scout drafted");
                self.scouts.push(unit.id);
                self.demand -= 1;
            } else {
                rest.push(unit);
            }
        }
        rest
    }

    /// Random-walk every scout and report what it sees.
    ///
    /// Returns the number of new sightings.
    pub fn explore<E, R>(&self, engine: &mut E, rng: &mut R, sightings: &mut Sightings) -> usize
    where
        E: GameEngine + ?Sized,
        R: rand::Rng + ?Sized,
    {
        let planet = engine.planet();
        let enemy = engine.team().enemy();
        let mut new = 0;

        for &id in &self.scouts {
            if resolve_local(engine, id, planet).is_none() {
                continue;
            }
            random_step(engine, id, rng);

            let Some(scout) = engine.unit(id) else {
                continue;
            };
            let Some(here) = scout.cell_on(planet) else {
                continue;
            };
            for other in engine.sense_nearby_units(here, scout.vision_range) {
                if other.team != enemy {
                    continue;
                }
                if let Some(cell) = other.cell_on(planet) {
                    if sightings.report(other.kind, cell) {
                        debug!(scout = id, kind = ?other.kind, cell = %cell, "Enemy sighted");
                        new += 1;
                    }
                }
            }
        }
        new
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::engine::Team;
    use crate::grid::{Planet, PlanetMap};
    use crate::sandbox::SandboxEngine;

    #[test]
    fn test_sightings_priority_and_dedup() {
        let mut sightings = Sightings::default();
        assert!(sightings.report(UnitKind::Worker, Cell::new(1, 1)));
        assert!(sightings.report(UnitKind::Factory, Cell::new(2, 2)));
        assert!(sightings.report(UnitKind::Factory, Cell::new(3, 3)));
        assert!(!sightings.report(UnitKind::Factory, Cell::new(2, 2)));
        assert!(!sightings.report(UnitKind::Ranger, Cell::new(4, 4)));
        assert!(sightings.report(UnitKind::Rocket, Cell::new(5, 5)));

        assert_eq!(sightings.len(), 4);
        assert_eq!(sightings.pop_target(), Some(Cell::new(5, 5)));
        assert_eq!(sightings.pop_target(), Some(Cell::new(3, 3)));
        assert_eq!(sightings.pop_target(), Some(Cell::new(2, 2)));
        assert_eq!(sightings.pop_target(), Some(Cell::new(1, 1)));
        assert_eq!(sightings.pop_target(), None);
    }

    #[test]
    fn test_enlist_fills_quota_with_scout_kind() {
        let mut engine = SandboxEngine::new(PlanetMap::new(Planet::Earth, 8, 8), Team::Red);
        engine.spawn(UnitKind::Knight, Team::Red, Cell::new(0, 0));
        engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(1, 0));
        engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(2, 0));
        engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(3, 0));

        let mut scouts = ScoutManager::new(2, UnitKind::Ranger);
        let rest = scouts.enlist(engine.my_units());

        assert_eq!(scouts.scouts(), &[2, 3]);
        assert_eq!(scouts.demand(), 0);
        assert_eq!(rest.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn test_lost_scout_reopens_slot() {
        let mut engine = SandboxEngine::new(PlanetMap::new(Planet::Earth, 8, 8), Team::Red);
        let a = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(1, 1));
        let b = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(5, 5));
        let mut scouts = ScoutManager::new(2, UnitKind::Ranger);
        scouts.enlist(engine.my_units());
        assert_eq!(scouts.demand(), 0);

        engine.kill(a);
        assert_eq!(scouts.drop_stale(&engine), 1);
        assert_eq!(scouts.demand(), 1);
        assert!(scouts.contains(b));
        assert!(!scouts.contains(a));

        let c = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(2, 2));
        let fresh = vec![engine.unit(c).unwrap()];
        assert!(scouts.enlist(fresh).is_empty());
        assert!(scouts.contains(c));
    }

    #[test]
    fn test_explore_reports_enemy_structures() {
        let mut engine = SandboxEngine::new(PlanetMap::new(Planet::Earth, 12, 12), Team::Red);
        let scout = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(5, 5));
        engine.spawn(UnitKind::Factory, Team::Blue, Cell::new(8, 8));
        engine.spawn(UnitKind::Knight, Team::Blue, Cell::new(6, 8));
        engine.spawn(UnitKind::Factory, Team::Red, Cell::new(3, 3));

        let mut scouts = ScoutManager::new(1, UnitKind::Ranger);
        scouts.enlist(vec![engine.unit(scout).unwrap()]);
        let mut sightings = Sightings::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let new = scouts.explore(&mut engine, &mut rng, &mut sightings);
        assert_eq!(new, 1);
        assert_eq!(sightings.pop_target(), Some(Cell::new(8, 8)));
    }
}
