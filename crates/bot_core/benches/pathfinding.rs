//! Pathfinding benchmarks for bot_core.
//!
//! Run with: `cargo bench -p bot_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use bot_core::grid::{Cell, Planet, PlanetMap};
use bot_core::pathfinding::find_path;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// 64x64 map with staggered vertical walls that force detours.
fn maze() -> PlanetMap {
    let mut map = PlanetMap::new(Planet::Earth, 64, 64);
    for x in (8..64).step_by(8) {
        let gap = if (x / 8) % 2 == 0 { 0 } else { 63 };
        for y in 0..64 {
            if y != gap {
                map.set_passable(Cell::new(x, y), false);
            }
        }
    }
    map
}

/// Runs A* benchmarks on open and walled maps.
pub fn pathfinding_benchmark(c: &mut Criterion) {
    let open = PlanetMap::new(Planet::Earth, 64, 64);
    let walled = maze();

    c.bench_function("find_path open 64x64 corner to corner", |b| {
        b.iter(|| {
            find_path(
                black_box(&open),
                Cell::new(0, 0),
                Cell::new(63, 63),
                |_| false,
            )
        })
    });

    c.bench_function("find_path maze 64x64", |b| {
        b.iter(|| {
            find_path(
                black_box(&walled),
                Cell::new(0, 32),
                Cell::new(63, 32),
                |_| false,
            )
        })
    });

    c.bench_function("find_path unreachable 64x64", |b| {
        let mut boxed = PlanetMap::new(Planet::Earth, 64, 64);
        for x in 30..=34 {
            for y in 30..=34 {
                if x == 30 || x == 34 || y == 30 || y == 34 {
                    boxed.set_passable(Cell::new(x, y), false);
                }
            }
        }
        b.iter(|| {
            find_path(
                black_box(&boxed),
                Cell::new(0, 0),
                Cell::new(32, 32),
                |_| false,
            )
        })
    });
}

criterion_group!(benches, pathfinding_benchmark);
criterion_main!(benches);
