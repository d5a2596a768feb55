//! Headless campaign runner.
//!
//! This binary plays campaigns without any presentation layer, controlled
//! via JSON on stdin/stdout or run to completion from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p crypt_headless
//!
//! # Play a whole campaign and print the event log
//! cargo run -p crypt_headless -- campaign --scenario crypt_campaign --events
//!
//! # Run batch balance test
//! cargo run -p crypt_headless -- batch --scenario crypt_campaign --count 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p crypt_headless -- verify --scenario crypt_campaign --runs 5
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crypt_core::prelude::*;
use crypt_headless::{
    batch::{run_batch, BatchConfig},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
    verify::verify_scenario,
};

#[derive(Parser)]
#[command(name = "crypt_headless")]
#[command(about = "Headless campaign runner for scripted play and CI")]
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
    /// Drive a campaign interactively over JSON lines
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "sample_skirmish")]
        scenario: String,

        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output state after every advancing command
        #[arg(long)]
        auto_state: bool,
    },

    /// Play a campaign to the end and print its summary
    Campaign {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "crypt_campaign")]
        scenario: String,

        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many waves
        #[arg(long, default_value = "1000")]
        max_waves: u32,

        /// Print every combat event to stdout
        #[arg(long)]
        events: bool,
    },

    /// Run a batch of campaigns for balance testing
    Batch {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "crypt_campaign")]
        scenario: String,

        /// Number of campaigns to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel campaigns (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Stop each campaign after this many waves
        #[arg(long, default_value = "1000")]
        max_waves: u32,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "crypt_campaign")]
        scenario: String,

        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Stop each run after this many waves
        #[arg(long, default_value = "1000")]
        max_waves: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            auto_state,
        }) => {
            cmd_run(&scenario, seed, auto_state);
        }
        Some(Commands::Campaign {
            scenario,
            seed,
            max_waves,
            events,
        }) => {
            cmd_campaign(&scenario, seed, max_waves, events);
        }
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            max_waves,
        }) => {
            cmd_batch(scenario, count, parallel, output, seed, max_waves);
        }
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
            max_waves,
        }) => {
            cmd_verify(&scenario, seed, runs, max_waves);
        }
        None => {
            // Default: interactive mode
            cmd_run("sample_skirmish", None, false);
        }
    }
}

/// Resolve a scenario or exit with an error.
fn load_scenario(name: &str, seed: Option<u64>) -> Scenario {
    match Scenario::resolve(name) {
        Ok(scenario) => match seed {
            Some(seed) => scenario.with_seed(seed),
            None => scenario,
        },
        Err(e) => {
            tracing::error!(error = %e, scenario = name, "Failed to load scenario");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Drive a campaign interactively
fn cmd_run(scenario: &str, seed: Option<u64>, auto_state: bool) {
    let scenario = load_scenario(scenario, seed);
    tracing::info!(scenario = %scenario.name, seed = scenario.seed, "Starting interactive session");

    let config = HeadlessConfig {
        auto_state_output: auto_state,
    };
    let runner = match HeadlessRunner::with_config(&scenario, config) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    if let Err(e) = runner.run(stdin.lock(), io::stdout().lock()) {
        tracing::error!(error = %e, "Session failed");
        std::process::exit(1);
    }
}

/// Play a campaign to the end
fn cmd_campaign(scenario: &str, seed: Option<u64>, max_waves: u32, print_events: bool) {
    let scenario = load_scenario(scenario, seed);

    let mut bus = EventBus::new();
    if print_events {
        bus.subscribe(|event| println!("{event}"));
    }

    let summary = match scenario
        .campaign_with_bus(bus)
        .and_then(|mut campaign| campaign.run(max_waves))
    {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "Campaign failed");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("CAMPAIGN COMPLETE: {}", scenario.name);
    eprintln!("{}", "=".repeat(50));
    eprintln!("Seed:          {}", scenario.seed);
    eprintln!("Waves cleared: {}", summary.waves_cleared);
    eprintln!("Final wave:    {}", summary.final_wave);
    eprintln!("Outcome:       {:?}", summary.outcome);
    eprintln!("Rounds:        {}", summary.rounds);
    eprintln!("Survivors:     {}", summary.survivors);
}

/// Run batch of campaigns for balance testing
fn cmd_batch(
    scenario_name: String,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    max_waves: u32,
) {
    let scenario = load_scenario(&scenario_name, None);

    tracing::info!(
        scenario = %scenario_name,
        count,
        parallel,
        seed,
        max_waves,
        output = %output.display(),
        "Batch configuration"
    );

    let config = BatchConfig {
        scenario: scenario_name,
        count,
        parallel,
        seed_start: seed,
        max_waves,
        output_dir: output.clone(),
    };
    let results = run_batch(config, &scenario);

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Campaigns played: {}", results.runs.len());
    if !results.errors.is_empty() {
        eprintln!("Campaigns failed: {}", results.errors.len());
    }
    eprintln!(
        "Waves cleared:    mean {:.2}, min {}, max {}",
        results.summary.mean_waves_cleared,
        results.summary.min_waves_cleared,
        results.summary.max_waves_cleared
    );
    eprintln!("Mean rounds:      {:.1}", results.summary.mean_rounds);
    eprintln!("Stalled:          {}", results.summary.stalled);
    eprintln!("Duration:         {:.2}s", results.duration_seconds);
    eprintln!("Results saved to: {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(scenario: &str, seed: Option<u64>, runs: u32, max_waves: u32) {
    let scenario = load_scenario(scenario, seed);
    tracing::info!(scenario = %scenario.name, seed = scenario.seed, runs, "Verifying determinism");

    let report = match verify_scenario(&scenario, runs, max_waves) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    for (i, run) in report.runs.iter().enumerate() {
        eprintln!(
            "Run {}: state {:016x}, log {:016x} ({} bytes), waves cleared {}",
            i + 1,
            run.state_hash,
            run.log_hash,
            run.log_bytes,
            run.summary.waves_cleared
        );
    }

    if report.is_deterministic() {
        eprintln!("PASS: all {runs} runs identical");
    } else {
        eprintln!("FAIL: runs diverged");
        std::process::exit(1);
    }
}
