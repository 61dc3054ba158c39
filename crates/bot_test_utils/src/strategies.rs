//! Proptest strategies for maps and cells.

use bot_core::grid::{Cell, Planet, PlanetMap};
use proptest::collection::vec;
use proptest::prelude::*;

/// Largest side length generated by [`arb_map`].
pub const MAX_SIDE: u32 = 16;

/// Random Earth map between 2x2 and [`MAX_SIDE`] square, with roughly a
/// quarter of the cells walled off.
pub fn arb_map() -> impl Strategy<Value = PlanetMap> {
    (2..=MAX_SIDE, 2..=MAX_SIDE).prop_flat_map(|(w, h)| {
        vec(prop::bool::weighted(0.25), (w * h) as usize).prop_map(move |walls| {
            let mut map = PlanetMap::new(Planet::Earth, w, h);
            for (cell, wall) in map.cells().collect::<Vec<_>>().into_iter().zip(walls) {
                if wall {
                    map.set_passable(cell, false);
                }
            }
            map
        })
    })
}

/// Any cell of a `width` x `height` map.
pub fn arb_cell(width: u32, height: u32) -> impl Strategy<Value = Cell> {
    (0..width as i32, 0..height as i32).prop_map(|(x, y)| Cell::new(x, y))
}

/// A map together with a start and goal on it.
pub fn arb_map_with_endpoints() -> impl Strategy<Value = (PlanetMap, Cell, Cell)> {
    arb_map().prop_flat_map(|map| {
        let (w, h) = (map.width(), map.height());
        (Just(map), arb_cell(w, h), arb_cell(w, h))
    })
}
