//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a controller playing against the
//! sandbox produces identical results given identical inputs.
//!
//! # Sources of non-determinism
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Controller state that is iterated lives in `BTreeMap`s or sorted `Vec`s.
//!
//! - **System randomness**: Random walks and launch sites draw from a
//!   `ChaCha8Rng` seeded from `BotConfig::seed`.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use bot_core::config::BotConfig;
use bot_core::controller::Controller;
use bot_core::engine::{GameEngine, Team};
use bot_core::sandbox::SandboxEngine;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Controller is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Hash anything through its `Debug` rendering.
///
/// `DefaultHasher::new()` uses fixed keys, so the value is stable within
/// a build.
#[must_use]
pub fn debug_hash<T: Debug + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    format!("{value:?}").hash(&mut hasher);
    hasher.finish()
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one tick
/// * `hash` - Computes the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u32,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    tracing::debug!(runs, ticks, is_deterministic, "Determinism check finished");

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Play the controller against a fresh sandbox `runs` times and compare
/// the final unit tables, balances and tick reports.
pub fn verify_match_determinism<Setup>(
    runs: usize,
    ticks: u32,
    config: &BotConfig,
    setup: Setup,
) -> DeterminismResult
where
    Setup: Fn() -> SandboxEngine,
{
    verify_determinism(
        runs,
        ticks,
        || {
            let engine = setup();
            let controller = Controller::new(config.clone(), &engine);
            (engine, controller, Vec::new())
        },
        |(engine, controller, reports)| {
            reports.push(controller.tick(engine));
            engine.advance_round();
        },
        |(engine, _, reports)| {
            debug_hash(&(
                engine.units_of(Team::Red),
                engine.units_of(Team::Blue),
                engine.karbonite(),
                reports,
            ))
        },
    )
}
