//! Breadth-first reference pathfinder.
//!
//! Unit-cost 8-connected BFS with the same expansion rules as
//! [`bot_core::pathfinding::find_path`]. Slow, obviously correct, and used
//! as the oracle for path length in property tests.

use std::collections::{HashMap, VecDeque};

use bot_core::grid::{Cell, Direction, PlanetMap};

/// Number of steps on a shortest path, or `None` if `goal` is unreachable.
///
/// The start cell is never checked; every other cell on the path must be
/// passable and not blocked.
pub fn shortest_steps<F>(map: &PlanetMap, start: Cell, goal: Cell, blocked: F) -> Option<u32>
where
    F: Fn(Cell) -> bool,
{
    if !map.in_bounds(start) || !map.in_bounds(goal) {
        return None;
    }
    if start == goal {
        return Some(0);
    }

    let mut dist: HashMap<Cell, u32> = HashMap::from([(start, 0)]);
    let mut queue = VecDeque::from([start]);

    while let Some(cell) = queue.pop_front() {
        let d = dist[&cell];
        for dir in Direction::ALL {
            let next = cell.add(dir);
            if dist.contains_key(&next) || !map.is_passable(next) || blocked(next) {
                continue;
            }
            if next == goal {
                return Some(d + 1);
            }
            dist.insert(next, d + 1);
            queue.push_back(next);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use bot_core::grid::Planet;

    use super::*;

    #[test]
    fn test_diagonal_is_one_step() {
        let map = PlanetMap::new(Planet::Earth, 5, 5);
        assert_eq!(shortest_steps(&map, Cell::new(0, 0), Cell::new(4, 4), |_| false), Some(4));
        assert_eq!(shortest_steps(&map, Cell::new(0, 0), Cell::new(4, 1), |_| false), Some(4));
    }

    #[test]
    fn test_wall_blocks() {
        let mut map = PlanetMap::new(Planet::Earth, 3, 3);
        for y in 0..3 {
            map.set_passable(Cell::new(1, y), false);
        }
        assert_eq!(shortest_steps(&map, Cell::new(0, 0), Cell::new(2, 2), |_| false), None);
    }
}
