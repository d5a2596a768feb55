//! JSON protocol for headless campaign control.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Combat events, state snapshots and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, spawns wave 1, outputs `{"type":"ready",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Every advancing command answers with the events it produced
//! 4. When the party falls, the runner outputs `{"type":"game_over",...}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","scenario":"Sample Skirmish","seed":2112,"wave":1}
//! -> {"cmd":"step"}
//! <- {"type":"events","wave":1,"round":0,"progress":"InProgress","events":[...]}
//! -> {"cmd":"round"}
//! <- {"type":"events","wave":1,"round":1,"progress":"PlayersWin","events":[...]}
//! -> {"cmd":"next_wave"}
//! <- {"type":"events","wave":2,"round":0,"progress":"InProgress","events":[...]}
//! -> {"cmd":"hash"}
//! <- {"type":"state_hash","wave":2,"round":0,"hash":1234567890}
//! ```

use crypt_core::prelude::*;
use std::result::Result;
use serde::{Deserialize, Serialize};

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance by one actor turn.
    Step,

    /// Finish the current round (or play a whole one).
    Round,

    /// Play rounds until the wave ends or the limit is hit.
    Run {
        #[serde(default = "default_max_rounds")]
        max_rounds: u32,
    },

    /// Replace the mobs with the next wave.
    NextWave,

    /// Query current state without advancing.
    Query,

    /// Report the current state hash (for determinism verification).
    Hash,

    /// Quit the session.
    Quit,
}

fn default_max_rounds() -> u32 {
    100
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        scenario: String,
        seed: u64,
        wave: u32,
    },

    /// Events produced by an advancing command.
    Events {
        wave: u32,
        round: u32,
        progress: Progress,
        events: Vec<BattleEvent>,
    },

    /// Full state snapshot.
    State(StateSnapshot),

    /// State hash for determinism verification.
    StateHash { wave: u32, round: u32, hash: u64 },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// The party has fallen.
    GameOver { summary: CampaignSummary },

    /// Goodbye message before shutdown.
    Bye,
}

/// Everything a controller needs to render the current battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub wave: u32,
    pub round: u32,
    pub in_round: bool,
    pub progress: Progress,
    pub players: Vec<ActorSnapshot>,
    pub mobs: Vec<ActorSnapshot>,
    pub waves_cleared: u32,
    pub hash: u64,
}

impl StateSnapshot {
    /// Capture the campaign's current state.
    pub fn capture(campaign: &Campaign) -> Self {
        let battle = campaign.battle();
        Self {
            wave: campaign.wave(),
            round: battle.round_count(),
            in_round: battle.in_round(),
            progress: battle.progress(),
            players: battle.players().iter().map(Actor::snapshot).collect(),
            mobs: battle.mobs().iter().map(Actor::snapshot).collect(),
            waves_cleared: campaign.waves_cleared(),
            hash: battle.state_hash(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(scenario: &str, seed: u64, wave: u32) -> Self {
        Self::Ready {
            version: "1.0".to_string(),
            scenario: scenario.to_string(),
            seed,
            wave,
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Round => "round",
            Self::Run { .. } => "run",
            Self::NextWave => "next_wave",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
