//! Single-step movement toward a target.
//!
//! Every call plans from scratch against the current occupancy snapshot
//! and issues at most one move. Failures are logged and reported as "not
//! there yet"; the caller simply asks again next round.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::commands::{try_move, CallStatus};
use crate::engine::{GameEngine, UnitId, UnitInfo};
use crate::grid::{Cell, Direction};
use crate::pathfinding::find_path;

/// Squared distance that counts as "next to" a cell.
pub const ADJACENT: u32 = 2;

/// Move one step toward standing next to `target`.
///
/// Returns `true` if the unit is already adjacent to (or on) the target,
/// in which case no move is issued.
pub fn advance_toward<E: GameEngine + ?Sized>(engine: &mut E, unit: &UnitInfo, target: Cell) -> bool {
    advance_within(engine, unit, target, ADJACENT)
}

/// Move one step toward being within `range_squared` of `target`.
///
/// Returns `true` if the unit is already in range. Otherwise picks the
/// empty neighbour of `target` nearest to the unit (ties go to the first
/// in [`Direction::ALL`] order), searches a path to it and steps along it.
pub fn advance_within<E: GameEngine + ?Sized>(
    engine: &mut E,
    unit: &UnitInfo,
    target: Cell,
    range_squared: u32,
) -> bool {
    let planet = engine.planet();
    let Some(here) = unit.cell_on(planet) else {
        return false;
    };
    if here.distance_squared(target) <= range_squared.max(ADJACENT) {
        return true;
    }

    let next = {
        let map = engine.planet_map(planet);
        let approach = Direction::ALL
            .iter()
            .map(|&d| target.add(d))
            .filter(|&c| map.is_passable(c) && !engine.is_occupied(c))
            .min_by_key(|c| c.distance_squared(here));

        let Some(approach) = approach else {
            debug!(unit = unit.id, target = %target, "No free cell next to target");
            return false;
        };

        match find_path(map, here, approach, |c| engine.is_occupied(c)) {
            Ok(path) if path.len() > 1 => path[1],
            Ok(_) => return false,
            Err(err) => {
                debug!(unit = unit.id, target = %target, error = %err, "Path planning failed");
                return false;
            }
        }
    };

    match try_move(engine, unit.id, here.direction_to(next)) {
        CallStatus::Done | CallStatus::NotReady => {}
        CallStatus::Failed(reason) => {
            debug!(unit = unit.id, reason = %reason, "Step not taken");
        }
    }
    false
}

/// Step in a random direction if the move is ready and legal.
///
/// Returns `true` if the unit moved.
pub fn random_step<E, R>(engine: &mut E, unit: UnitId, rng: &mut R) -> bool
where
    E: GameEngine + ?Sized,
    R: Rng + ?Sized,
{
    let Some(&dir) = Direction::ALL.choose(rng) else {
        return false;
    };
    if !engine.can_move(unit, dir) {
        return false;
    }
    try_move(engine, unit, dir).is_done()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::engine::{Team, UnitKind};
    use crate::grid::{Planet, PlanetMap};
    use crate::sandbox::SandboxEngine;

    fn engine(w: u32, h: u32) -> SandboxEngine {
        SandboxEngine::new(PlanetMap::new(Planet::Earth, w, h), Team::Red)
    }

    #[test]
    fn test_adjacent_short_circuits() {
        let mut engine = engine(6, 6);
        let id = engine.spawn(UnitKind::Worker, Team::Red, Cell::new(2, 2));
        let unit = engine.unit(id).unwrap();

        assert!(advance_toward(&mut engine, &unit, Cell::new(3, 3)));
        assert!(advance_toward(&mut engine, &unit, Cell::new(2, 2)));
        // Nothing moved.
        assert_eq!(engine.unit(id).unwrap().cell_on(Planet::Earth), Some(Cell::new(2, 2)));
    }

    #[test]
    fn test_takes_one_step() {
        let mut engine = engine(10, 10);
        let id = engine.spawn(UnitKind::Worker, Team::Red, Cell::new(0, 0));
        let unit = engine.unit(id).unwrap();

        assert!(!advance_toward(&mut engine, &unit, Cell::new(6, 6)));
        assert_eq!(engine.unit(id).unwrap().cell_on(Planet::Earth), Some(Cell::new(1, 1)));

        // Cooldown: a second call this round issues nothing.
        let unit = engine.unit(id).unwrap();
        assert!(!advance_toward(&mut engine, &unit, Cell::new(6, 6)));
        assert_eq!(engine.unit(id).unwrap().cell_on(Planet::Earth), Some(Cell::new(1, 1)));
    }

    #[test]
    fn test_range_counts_as_arrived() {
        let mut engine = engine(10, 10);
        let id = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(0, 0));
        let unit = engine.unit(id).unwrap();
        assert!(advance_within(&mut engine, &unit, Cell::new(5, 5), 50));
        assert!(!advance_within(&mut engine, &unit, Cell::new(6, 5), 50));
    }

    #[test]
    fn test_enclosed_target_is_not_reached() {
        let mut engine = engine(7, 7);
        let target = Cell::new(3, 3);
        for dir in Direction::ALL {
            engine.spawn(UnitKind::Factory, Team::Red, target.add(dir));
        }
        let id = engine.spawn(UnitKind::Worker, Team::Red, Cell::new(0, 0));
        let unit = engine.unit(id).unwrap();

        assert!(!advance_toward(&mut engine, &unit, target));
        assert_eq!(engine.unit(id).unwrap().cell_on(Planet::Earth), Some(Cell::new(0, 0)));
    }

    #[test]
    fn test_engine_failure_is_swallowed() {
        let mut engine = engine(10, 10);
        let id = engine.spawn(UnitKind::Worker, Team::Red, Cell::new(0, 0));
        let unit = engine.unit(id).unwrap();
        engine.reject_next_call("desync");

        assert!(!advance_toward(&mut engine, &unit, Cell::new(8, 8)));
        assert_eq!(engine.unit(id).unwrap().cell_on(Planet::Earth), Some(Cell::new(0, 0)));
    }

    #[test]
    fn test_random_step_is_seeded() {
        let run = |seed: u64| {
            let mut engine = engine(9, 9);
            let id = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(4, 4));
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for _ in 0..6 {
                random_step(&mut engine, id, &mut rng);
                engine.advance_round();
            }
            engine.unit(id).unwrap().cell_on(Planet::Earth)
        };
        assert_eq!(run(7), run(7));
    }
}
