//! Headless match runner for controller testing and CI verification.
//!
//! Plays the fleet controller against the deterministic sandbox engine
//! without any game client. This enables:
//!
//! - **Tuning**: Run many seeded matches and compare summaries
//! - **CI verification**: Automated checks of controller behaviour and determinism
//!
//! # Output
//!
//! - **stdout**: Match and batch summaries (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Play the built-in skirmish
//! cargo run -p bot_headless -- run --seed 7
//!
//! # Run a scenario file in parallel batches
//! cargo run -p bot_headless -- batch --scenario scenarios/skirmish.ron --count 200
//!
//! # Verify determinism
//! cargo run -p bot_headless -- verify --seed 42 --runs 5
//! ```

pub mod batch;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, BatchSummary};
pub use runner::{run_match, MatchOutcome, MatchSummary, TickObserver};
pub use scenario::{DepositPlacement, Scenario, ScenarioError, UnitPlacement};
