//! Replay verification.
//!
//! Plays the same scenario several times and compares the encoded event
//! logs byte for byte along with the final state hashes. Any difference
//! means some source of non-determinism leaked into the engine.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crypt_core::prelude::*;
use std::result::Result;
use serde::{Deserialize, Serialize};

use crate::scenario::{Scenario, ScenarioError};

/// Fingerprint of one verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    /// Final battle state hash.
    pub state_hash: u64,
    /// Hash of the encoded event log.
    pub log_hash: u64,
    /// Encoded event log length in bytes.
    pub log_bytes: usize,
    /// Campaign result.
    pub summary: CampaignSummary,
}

/// Outcome of [`verify_scenario`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed used.
    pub seed: u64,
    /// One fingerprint per run.
    pub runs: Vec<RunFingerprint>,
    /// Whether every encoded log matched the first byte for byte.
    pub logs_identical: bool,
}

impl VerifyReport {
    /// Whether every run produced the same log and final state.
    pub fn is_deterministic(&self) -> bool {
        self.logs_identical && self.runs.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run `scenario` `runs` times and compare the results.
pub fn verify_scenario(
    scenario: &Scenario,
    runs: u32,
    max_waves: u32,
) -> Result<VerifyReport, ScenarioError> {
    let mut reference: Option<Vec<u8>> = None;
    let mut logs_identical = true;
    let mut fingerprints = Vec::with_capacity(runs as usize);

    for run in 0..runs {
        let mut bus = EventBus::new();
        let (log, _) = EventLog::attach(&mut bus);
        let mut campaign = scenario.campaign_with_bus(bus)?;
        let summary = campaign.run(max_waves)?;
        let bytes = log.encode()?;

        let fingerprint = RunFingerprint {
            state_hash: campaign.battle().state_hash(),
            log_hash: hash_bytes(&bytes),
            log_bytes: bytes.len(),
            summary,
        };
        tracing::debug!(run, hash = fingerprint.state_hash, "Run complete");

        if reference.as_ref().is_some_and(|first| *first != bytes) {
            tracing::warn!(run, "Event log differs from first run");
            logs_identical = false;
        }
        if reference.is_none() {
            reference = Some(bytes);
        }
        fingerprints.push(fingerprint);
    }

    Ok(VerifyReport {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        runs: fingerprints,
        logs_identical,
    })
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}
