//! Scenario loading and map generation.
//!
//! Scenarios define the starting state of a headless match: the Earth map
//! (size, walls, deposits), the units on it, the economy and the bot config.

use std::collections::HashSet;
use std::path::Path;

use bot_core::config::BotConfig;
use bot_core::engine::{Team, UnitKind};
use bot_core::error::BotError;
use bot_core::grid::{Cell, Planet, PlanetMap};
use bot_core::sandbox::SandboxEngine;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The embedded bot config is unusable.
    #[error("Invalid bot config: {0}")]
    Config(#[from] BotError),
    /// Map dimensions are zero.
    #[error("Map must be at least 1x1, got {0}x{1}")]
    EmptyMap(u32, u32),
}

/// A unit present at match start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit type.
    pub kind: UnitKind,
    /// Owner.
    pub team: Team,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl UnitPlacement {
    /// Create a placement.
    #[must_use]
    pub const fn new(kind: UnitKind, team: Team, x: i32, y: i32) -> Self {
        Self { kind, team, x, y }
    }
}

/// A karbonite deposit placed by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPlacement {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Karbonite at match start.
    pub amount: u32,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Map dimensions (width, height) in cells.
    pub map_size: (u32, u32),
    /// Chance in percent that a free cell becomes a wall.
    pub wall_percent: u32,
    /// Hand-placed deposits.
    pub deposits: Vec<DepositPlacement>,
    /// Extra deposits scattered on random passable cells.
    pub random_deposits: u32,
    /// Amount of each scattered deposit.
    pub random_deposit_amount: u32,
    /// Units at match start.
    pub units: Vec<UnitPlacement>,
    /// Karbonite the controlled team starts with.
    pub starting_karbonite: u32,
    /// Karbonite every team gains per round.
    pub income_per_round: u32,
    /// Rounds played before the match is called.
    pub max_rounds: u32,
    /// Controller tuning. The match seed overrides `bot.seed`.
    pub bot: BotConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check map size and bot config.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let (w, h) = self.map_size;
        if w == 0 || h == 0 {
            return Err(ScenarioError::EmptyMap(w, h));
        }
        self.bot.validate()?;
        Ok(())
    }

    /// Standard 1v1 opening: a worker trio for each side in opposite
    /// corners of a 30x30 map, with a passive enemy.
    #[must_use]
    pub fn skirmish() -> Self {
        let mut units = Vec::new();
        for (dx, dy) in [(0, 0), (1, 0), (0, 1)] {
            units.push(UnitPlacement::new(UnitKind::Worker, Team::Red, 3 + dx, 3 + dy));
            units.push(UnitPlacement::new(UnitKind::Worker, Team::Blue, 26 - dx, 26 - dy));
        }
        units.push(UnitPlacement::new(UnitKind::Factory, Team::Blue, 24, 24));

        Self {
            name: "Standard Skirmish".to_string(),
            description: "Worker trio versus a passive enemy base".to_string(),
            map_size: (30, 30),
            wall_percent: 8,
            deposits: vec![
                DepositPlacement { x: 6, y: 6, amount: 200 },
                DepositPlacement { x: 15, y: 15, amount: 400 },
                DepositPlacement { x: 23, y: 23, amount: 200 },
            ],
            random_deposits: 10,
            random_deposit_amount: 60,
            units,
            starting_karbonite: 300,
            income_per_round: 3,
            max_rounds: 300,
            bot: BotConfig::default(),
        }
    }

    /// Build the Earth map for `seed`.
    ///
    /// Walls and scattered deposits are drawn from a `ChaCha8Rng`, so a
    /// seed always yields the same map. Cells holding a unit or a placed
    /// deposit are never walled.
    #[must_use]
    pub fn build_map(&self, seed: u64) -> PlanetMap {
        let (width, height) = self.map_size;
        let mut map = PlanetMap::new(Planet::Earth, width.max(1), height.max(1));
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let reserved: HashSet<Cell> = self
            .units
            .iter()
            .map(|u| Cell::new(u.x, u.y))
            .chain(self.deposits.iter().map(|d| Cell::new(d.x, d.y)))
            .collect();

        let cells: Vec<Cell> = map.cells().collect();
        for &cell in &cells {
            if !reserved.contains(&cell) && rng.gen_range(0..100) < self.wall_percent {
                map.set_passable(cell, false);
            }
        }

        for deposit in &self.deposits {
            map.set_initial_karbonite(Cell::new(deposit.x, deposit.y), deposit.amount);
        }

        let open: Vec<Cell> = map
            .passable_cells()
            .filter(|c| !reserved.contains(c))
            .collect();
        if !open.is_empty() {
            for _ in 0..self.random_deposits {
                let cell = open[rng.gen_range(0..open.len())];
                map.set_initial_karbonite(cell, self.random_deposit_amount);
            }
        }
        map
    }

    /// Build a ready-to-play sandbox match for `seed`, played by red.
    #[must_use]
    pub fn build_engine(&self, seed: u64) -> SandboxEngine {
        let mut engine = SandboxEngine::new(self.build_map(seed), Team::Red);
        engine.set_karbonite(self.starting_karbonite);
        engine.set_income(self.income_per_round);
        for unit in &self.units {
            engine.spawn(unit.kind, unit.team, Cell::new(unit.x, unit.y));
        }
        engine
    }
}
