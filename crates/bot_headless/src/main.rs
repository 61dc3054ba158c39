//! Headless fleet controller runner.
//!
//! This binary plays the controller against the sandbox engine without a
//! game client. Designed for tuning, CI testing and determinism checks.
//!
//! # Usage
//!
//! ```bash
//! # Play the built-in skirmish once
//! cargo run -p bot_headless -- run --seed 3
//!
//! # Stream every tick report as JSON lines
//! cargo run -p bot_headless -- run --scenario scenarios/skirmish.ron --ticks
//!
//! # Run a batch of seeds
//! cargo run -p bot_headless -- batch --count 500 --output results/
//!
//! # Print the default controller config as RON
//! cargo run -p bot_headless -- dump-config
//! ```
//!
//! Summaries go to stdout as JSON; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use bot_core::config::BotConfig;
use bot_core::controller::TickReport;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bot_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{run_match, TickObserver},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "bot_headless")]
#[command(about = "Headless fleet controller runner for tuning and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single match
    Run {
        /// Scenario file to load (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Map and controller seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Override the scenario's round limit
        #[arg(long)]
        rounds: Option<u32>,

        /// Print every tick report as a JSON line before the summary
        #[arg(long)]
        ticks: bool,

        /// Also write the summary to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a batch of seeded matches in parallel
    Batch {
        /// Scenario file to load (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Verify that a seed always yields the same match
    Verify {
        /// Scenario file to load (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed to check
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of runs to compare
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },

    /// Print the default controller config as RON
    DumpConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for summaries)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            rounds,
            ticks,
            output,
        }) => cmd_run(scenario, seed, rounds, ticks, output),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
        }) => cmd_batch(scenario, count, parallel, output, seed),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => cmd_verify(scenario, seed, runs),
        Some(Commands::DumpConfig) => cmd_dump_config(),
        None => cmd_run(None, 0, None, false, None),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            tracing::error!("{message}");
            eprintln!("FATAL: {message}");
            ExitCode::FAILURE
        }
    }
}

type CmdResult = Result<ExitCode, String>;

fn load_scenario(path: Option<PathBuf>) -> Result<Scenario, String> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading scenario");
            Scenario::load(&path).map_err(|e| e.to_string())
        }
        None => Ok(Scenario::skirmish()),
    }
}

/// Play a single match and print its summary
fn cmd_run(
    scenario: Option<PathBuf>,
    seed: u64,
    rounds: Option<u32>,
    ticks: bool,
    output: Option<PathBuf>,
) -> CmdResult {
    let mut scenario = load_scenario(scenario)?;
    if let Some(rounds) = rounds {
        scenario.max_rounds = rounds;
    }

    let mut print_tick = |report: &TickReport| match serde_json::to_string(report) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to encode tick report"),
    };
    let observer: Option<TickObserver<'_>> = if ticks {
        Some(&mut print_tick as &mut dyn FnMut(&TickReport))
    } else {
        None
    };

    let summary = run_match(&scenario, seed, observer);
    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    println!("{json}");

    if let Some(path) = output {
        std::fs::write(&path, &json)
            .map_err(|e| format!("Cannot write summary to '{}': {e}", path.display()))?;
        eprintln!("Summary saved to: {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

/// Run a batch of matches and save the results
fn cmd_batch(
    scenario: Option<PathBuf>,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
) -> CmdResult {
    let scenario = load_scenario(scenario)?;

    let num_cpus = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);

    tracing::info!(
        scenario = %scenario.name,
        count,
        parallel,
        seed,
        output = %output.display(),
        cpus_available = num_cpus,
        max_rounds = scenario.max_rounds,
        "Batch configuration"
    );

    std::fs::create_dir_all(&output).map_err(|e| {
        format!("Cannot create output directory '{}': {e}", output.display())
    })?;

    let config = BatchConfig {
        game_count: count,
        parallel_games: parallel,
        seed_start: seed,
        output_dir: output.clone(),
    };
    let results = run_batch(&scenario, config);

    let results_path = output.join("batch_results.json");
    results
        .save(&results_path)
        .map_err(|e| format!("Failed to save results: {e}"))?;

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", results.games.len());
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Throughput: {:.1} matches/sec",
        results.games.len() as f64 / results.duration_seconds.max(0.001)
    );
    eprintln!("\nOutcomes:");
    for (outcome, n) in &results.summary.outcomes {
        eprintln!("  {outcome}: {n}");
    }
    eprintln!("Avg rounds: {:.1}", results.summary.avg_rounds);
    eprintln!("Avg robots: {:.1}", results.summary.avg_robots);
    eprintln!("Avg structures: {:.1}", results.summary.avg_structures);
    eprintln!("Avg launches: {:.2}", results.summary.avg_launches);
    eprintln!("\nResults saved to: {}", results_path.display());

    let json = serde_json::to_string_pretty(&results.summary).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

/// Verify determinism
fn cmd_verify(scenario: Option<PathBuf>, seed: u64, runs: u32) -> CmdResult {
    let scenario = load_scenario(scenario)?;
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    if verify_determinism(&scenario, seed, runs) {
        eprintln!("PASS: All {runs} runs produced identical results");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_dump_config() -> CmdResult {
    let ron = BotConfig::default()
        .to_ron_string()
        .map_err(|e| e.to_string())?;
    println!("{ron}");
    Ok(ExitCode::SUCCESS)
}
