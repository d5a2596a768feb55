//! Batch campaign runner for balance testing.
//!
//! Runs one campaign per seed in parallel using rayon and collects the
//! summaries, so a scenario's difficulty curve can be judged across many
//! seeds at once.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crypt_core::prelude::*;
use std::result::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario name or path, for the record
    pub scenario: String,
    /// Number of campaigns to run
    pub count: u32,
    /// Maximum parallel campaigns (0 = use rayon default)
    pub parallel: u32,
    /// First seed; campaign `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Wave cap per campaign
    pub max_waves: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "crypt_campaign".to_string(),
            count: 100,
            parallel: 0,
            seed_start: 0,
            max_waves: 1_000,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }
}

/// One finished campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRun {
    /// Seed used
    pub seed: u64,
    /// How it went
    pub summary: CampaignSummary,
    /// Final battle state hash
    pub hash: u64,
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Campaigns that completed
    pub campaigns: usize,
    /// Mean waves cleared
    pub mean_waves_cleared: f64,
    /// Fewest waves cleared by any seed
    pub min_waves_cleared: u32,
    /// Most waves cleared by any seed
    pub max_waves_cleared: u32,
    /// Mean rounds played
    pub mean_rounds: f64,
    /// Campaigns whose last wave stalled
    pub stalled: usize,
}

impl BatchSummary {
    /// Aggregate a set of runs.
    pub fn from_runs(runs: &[CampaignRun]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let n = runs.len() as f64;
        let cleared = || runs.iter().map(|r| r.summary.waves_cleared);
        let rounds = runs.iter().map(|r| f64::from(r.summary.rounds));
        Self {
            campaigns: runs.len(),
            mean_waves_cleared: cleared().map(f64::from).sum::<f64>() / n,
            min_waves_cleared: cleared().min().unwrap_or(0),
            max_waves_cleared: cleared().max().unwrap_or(0),
            mean_rounds: rounds.sum::<f64>() / n,
            stalled: runs
                .iter()
                .filter(|r| r.summary.outcome == Some(WaveOutcome::Stalled))
                .count(),
        }
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual campaigns, in seed order
    pub runs: Vec<CampaignRun>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
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

/// Run a single campaign to the end (or the wave cap).
pub fn run_single_campaign(
    scenario: &Scenario,
    seed: u64,
    max_waves: u32,
) -> Result<CampaignRun, CombatError> {
    let mut campaign = scenario.clone().with_seed(seed).campaign()?;
    let summary = campaign.run(max_waves)?;
    Ok(CampaignRun {
        seed,
        summary,
        hash: campaign.battle().state_hash(),
    })
}

/// Run a batch of campaigns in parallel.
pub fn run_batch(config: BatchConfig, scenario: &Scenario) -> BatchResults {
    let start = Instant::now();

    if config.parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<CampaignRun, BatchError>> = (0..config.count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_single_campaign(scenario, seed, config.max_waves) {
                Ok(run) => {
                    debug!(seed, waves = run.summary.waves_cleared, "Campaign finished");
                    Ok(run)
                }
                Err(e) => {
                    warn!(seed, error = %e, "Campaign failed");
                    Err(BatchError {
                        seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let mut runs = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(run) => runs.push(run),
            Err(e) => errors.push(e),
        }
    }

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        campaigns = runs.len(),
        errors = errors.len(),
        mean_waves = summary.mean_waves_cleared,
        duration_seconds,
        "Batch complete"
    );

    BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_runs_every_seed_in_order() {
        let config = BatchConfig::new("crypt_campaign", 6).with_seed(100);
        let results = run_batch(config, &Scenario::crypt_campaign());

        assert!(results.errors.is_empty());
        let seeds: Vec<u64> = results.runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, (100..106).collect::<Vec<_>>());
        assert_eq!(results.summary.campaigns, 6);
        assert!(results.summary.min_waves_cleared <= results.summary.max_waves_cleared);
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let scenario = Scenario::crypt_campaign();
        let results = run_batch(BatchConfig::new("crypt_campaign", 4), &scenario);

        for run in &results.runs {
            let again = run_single_campaign(&scenario, run.seed, 1_000).unwrap();
            assert_eq!(&again, run);
        }
    }

    #[test]
    fn test_summary_of_nothing() {
        assert_eq!(BatchSummary::from_runs(&[]), BatchSummary::default());
    }
}
