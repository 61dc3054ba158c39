//! Test fixtures and helpers.
//!
//! Maps and sandbox matches drawn as ASCII, so scenarios read like the
//! board they describe. Row `i` of a drawing is `y = i`; column `j` is
//! `x = j`.
//!
//! | Char | Meaning |
//! |------|---------|
//! | `.`  | open floor |
//! | `#`  | impassable |
//! | `*`  | karbonite deposit of [`DEPOSIT`] |
//! | `W K R M H F T` | own worker, knight, ranger, mage, healer, factory, rocket |
//! | lowercase of the above | enemy unit |

use bot_core::config::BotConfig;
use bot_core::controller::{Controller, TickReport};
use bot_core::engine::{Team, UnitKind};
use bot_core::grid::{Cell, Planet, PlanetMap};
use bot_core::sandbox::SandboxEngine;

/// Karbonite placed on a `*` cell.
pub const DEPOSIT: u32 = 30;

fn kind_of(c: char) -> Option<UnitKind> {
    match c.to_ascii_uppercase() {
        'W' => Some(UnitKind::Worker),
        'K' => Some(UnitKind::Knight),
        'R' => Some(UnitKind::Ranger),
        'M' => Some(UnitKind::Mage),
        'H' => Some(UnitKind::Healer),
        'F' => Some(UnitKind::Factory),
        'T' => Some(UnitKind::Rocket),
        _ => None,
    }
}

fn dimensions(rows: &[&str]) -> (u32, u32) {
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    (width as u32, rows.len() as u32)
}

/// Build a map from an ASCII drawing. Unit letters are open floor.
///
/// # Panics
///
/// Panics on an empty drawing.
#[must_use]
pub fn ascii_map(planet: Planet, rows: &[&str]) -> PlanetMap {
    let (width, height) = dimensions(rows);
    let mut map = PlanetMap::new(planet, width, height);
    for (y, row) in rows.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            let cell = Cell::new(x as i32, y as i32);
            match c {
                '#' => {
                    map.set_passable(cell, false);
                }
                '*' => {
                    map.set_initial_karbonite(cell, DEPOSIT);
                }
                _ => {}
            }
        }
    }
    map
}

/// Sandbox match on an Earth drawn as ASCII, played by [`Team::Red`].
///
/// Units are spawned row by row, left to right, so ids follow reading order.
#[must_use]
pub fn ascii_sandbox(rows: &[&str]) -> SandboxEngine {
    let mut engine = SandboxEngine::new(ascii_map(Planet::Earth, rows), Team::Red);
    for (y, row) in rows.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            let Some(kind) = kind_of(c) else {
                continue;
            };
            let team = if c.is_ascii_uppercase() {
                Team::Red
            } else {
                Team::Blue
            };
            engine.spawn(kind, team, Cell::new(x as i32, y as i32));
        }
    }
    engine
}

/// Open `width` x `height` Earth with deposits on every `spacing`-th cell
/// of both axes.
#[must_use]
pub fn open_field(width: u32, height: u32, spacing: u32) -> PlanetMap {
    let mut map = PlanetMap::new(Planet::Earth, width, height);
    let step = spacing.max(1) as usize;
    for y in (0..height as i32).step_by(step) {
        for x in (0..width as i32).step_by(step) {
            map.set_initial_karbonite(Cell::new(x, y), DEPOSIT);
        }
    }
    map
}

/// Default config with scouting turned off, which keeps squad tests free
/// of random walks.
#[must_use]
pub fn quiet_config() -> BotConfig {
    BotConfig {
        scout_quota: 0,
        ..BotConfig::default()
    }
}

/// Tick the controller `n` times, advancing the sandbox round after each.
pub fn run_ticks(controller: &mut Controller, engine: &mut SandboxEngine, n: u32) -> Vec<TickReport> {
    (0..n)
        .map(|_| {
            let report = controller.tick(engine);
            engine.advance_round();
            report
        })
        .collect()
}
