//! Grid-based pathfinding using the A* algorithm.
//!
//! Searches run on integer cells with 8-directional movement at unit cost.
//! Occupancy by other units is a snapshot taken when a cell is expanded,
//! so a path may go stale as soon as those units move; callers re-plan
//! every round instead of caching.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{BotError, Result};
use crate::grid::{Cell, Direction, PlanetMap};

/// Cost of a single step in any of the 8 directions.
const STEP_COST: u32 = 1;

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    cell: Cell,
    /// f_score = g_score + heuristic
    f_score: u32,
    /// Insertion sequence; earlier pushes win ties.
    seq: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so we reverse the comparison for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Chebyshev distance: exact remaining cost on an open unit-cost 8-grid,
/// so it never overestimates and A* returns shortest paths.
#[inline]
fn heuristic(from: Cell, goal: Cell) -> u32 {
    from.chebyshev(goal)
}

/// Find a path from `start` to `goal`, both inclusive.
///
/// A neighbour is expanded only if it is on the map, passable, and
/// `is_occupied` returns `false` for it. The start cell is never checked
/// (the searching unit usually stands on it); the goal is, so an occupied
/// or walled-in goal yields [`BotError::NoPath`].
///
/// # Errors
///
/// - [`BotError::OutOfBounds`] if `start` or `goal` is off the map
/// - [`BotError::NoPath`] if the frontier empties before reaching `goal`
pub fn find_path<F>(map: &PlanetMap, start: Cell, goal: Cell, is_occupied: F) -> Result<Vec<Cell>>
where
    F: Fn(Cell) -> bool,
{
    if !map.in_bounds(start) {
        return Err(BotError::OutOfBounds(start));
    }
    if !map.in_bounds(goal) {
        return Err(BotError::OutOfBounds(goal));
    }
    if start == goal {
        return Ok(vec![start]);
    }

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, u32> = HashMap::new();
    let mut seq: u64 = 0;

    g_score.insert(start, 0);
    open_set.push(AStarNode {
        cell: start,
        f_score: heuristic(start, goal),
        seq,
    });

    while let Some(current) = open_set.pop() {
        if current.cell == goal {
            return Ok(reconstruct_path(&came_from, start, goal));
        }

        let current_g = g_score.get(&current.cell).copied().unwrap_or(u32::MAX);
        // Stale heap entry: a cheaper route to this cell was already expanded.
        if current.f_score > current_g.saturating_add(heuristic(current.cell, goal)) {
            continue;
        }

        for dir in Direction::ALL {
            let next = current.cell.add(dir);
            if !map.is_passable(next) || is_occupied(next) {
                continue;
            }

            let tentative_g = current_g + STEP_COST;
            let neighbor_g = g_score.get(&next).copied().unwrap_or(u32::MAX);
            if tentative_g < neighbor_g {
                came_from.insert(next, current.cell);
                g_score.insert(next, tentative_g);
                seq += 1;
                open_set.push(AStarNode {
                    cell: next,
                    f_score: tentative_g + heuristic(next, goal),
                    seq,
                });
            }
        }
    }

    Err(BotError::NoPath { start, goal })
}

/// Reconstruct path from came_from map.
fn reconstruct_path(came_from: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;

    while current != start {
        match came_from.get(&current) {
            Some(&prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }

    path.reverse();
    path
}

/// Convert a path into the sequence of step directions that walks it.
#[must_use]
pub fn path_directions(path: &[Cell]) -> Vec<Direction> {
    path.windows(2).map(|w| w[0].direction_to(w[1])).collect()
}
