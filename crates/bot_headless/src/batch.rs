//! Batch match runner.
//!
//! Runs many independent matches in parallel using rayon. Each match owns
//! its own sandbox and controller; nothing is shared between threads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::runner::{run_match, MatchOutcome, MatchSummary};
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of matches to run
    pub game_count: u32,
    /// Maximum parallel matches (0 = use rayon default)
    pub parallel_games: u32,
    /// Seed of the first match; match `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// Create config for `game_count` matches
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Aggregate numbers over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches per outcome.
    pub outcomes: BTreeMap<String, u32>,
    /// Mean rounds played.
    pub avg_rounds: f64,
    /// Mean robots alive at the end.
    pub avg_robots: f64,
    /// Mean structures finished.
    pub avg_structures: f64,
    /// Mean rockets launched.
    pub avg_launches: f64,
}

impl BatchSummary {
    /// Summarise a set of matches.
    #[must_use]
    pub fn from_games(games: &[MatchSummary]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let n = games.len() as f64;
        let mean = |f: fn(&MatchSummary) -> u32| games.iter().map(|g| f64::from(f(g))).sum::<f64>() / n;

        let mut outcomes = BTreeMap::new();
        for game in games {
            *outcomes.entry(outcome_name(game.outcome).to_string()).or_insert(0) += 1;
        }

        Self {
            outcomes,
            avg_rounds: mean(|g| g.rounds),
            avg_robots: mean(|g| g.robots),
            avg_structures: mean(|g| g.structures_completed),
            avg_launches: mean(|g| g.launches),
        }
    }
}

fn outcome_name(outcome: MatchOutcome) -> &'static str {
    match outcome {
        MatchOutcome::Eliminated => "eliminated",
        MatchOutcome::EnemyEliminated => "enemy_eliminated",
        MatchOutcome::RoundLimit => "round_limit",
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name
    pub scenario: String,
    /// Configuration used
    pub config: BatchConfig,
    /// Individual match summaries, in seed order
    pub games: Vec<MatchSummary>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Run a batch of matches
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();

    info!(
        "Starting batch run: {} matches of '{}'",
        config.game_count, scenario.name
    );

    // Configure thread pool if specified
    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let games: Vec<MatchSummary> = (0..config.game_count)
        .into_par_iter()
        .map(|i| run_match(scenario, config.seed_start.wrapping_add(u64::from(i)), None))
        .collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} matches in {:.1}s",
        games.len(),
        duration_seconds
    );

    BatchResults {
        scenario: scenario.name.clone(),
        config,
        games,
        summary,
        duration_seconds,
    }
}

/// Verify determinism by running the same seed several times
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> bool {
    let results: Vec<MatchSummary> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| run_match(scenario, seed, None))
        .collect();
    results.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Scenario {
        Scenario {
            max_rounds: 20,
            ..Scenario::skirmish()
        }
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345);

        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/results"));
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(&tiny(), BatchConfig::new(4).with_seed(10));

        assert_eq!(results.games.len(), 4);
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13]);
        assert_eq!(results.summary.outcomes.values().sum::<u32>(), 4);
        assert!((results.summary.avg_rounds - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_results_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("batch.json");
        let results = run_batch(&tiny(), BatchConfig::new(2));

        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games, results.games);
        assert_eq!(loaded.config, results.config);
    }

    #[test]
    fn test_verify_determinism() {
        assert!(verify_determinism(&tiny(), 77, 3));
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }
}
