//! Scenario loading and configuration.
//!
//! A scenario fixes everything a campaign needs to be reproduced: the
//! seed, the player party and the wave configuration. Scenarios load from
//! RON files or are picked by name from the built-in set.

use std::path::Path;

use crypt_core::prelude::*;
use std::result::Result;
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
    /// The scenario parsed but cannot be played.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] CombatError),
}

/// A complete, reproducible campaign setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Seed for the battle RNG.
    pub seed: u64,
    /// The player party.
    pub players: Vec<ActorSpawnParams>,
    /// Wave generation settings.
    pub waves: WaveConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::sample_skirmish()
    }
}

impl Scenario {
    /// Names accepted by [`Scenario::builtin`].
    pub const BUILTIN: [&'static str; 2] = ["sample_skirmish", "crypt_campaign"];

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

    /// Look up a built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "sample_skirmish" => Some(Self::sample_skirmish()),
            "crypt_campaign" => Some(Self::crypt_campaign()),
            _ => None,
        }
    }

    /// Resolve a built-in name, falling back to a file path.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Some(scenario) => Ok(scenario),
            None => Self::load(name_or_path),
        }
    }

    /// Check the party and wave configuration.
    pub fn validate(&self) -> Result<(), CombatError> {
        if self.players.is_empty() {
            return Err(CombatError::InvalidConfig(
                "scenario needs at least one player".to_string(),
            ));
        }
        self.waves.validate()
    }

    /// Same scenario with a different seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Start a campaign for this scenario.
    pub fn campaign(&self) -> Result<Campaign, CombatError> {
        self.campaign_with_bus(EventBus::new())
    }

    /// Start a campaign with observers already attached to `bus`.
    pub fn campaign_with_bus(&self, bus: EventBus) -> Result<Campaign, CombatError> {
        Campaign::with_bus(self.seed, bus, self.players.clone(), self.waves.clone())
    }

    /// alice and bob (20 health, damage 22) against waves of two 20-health
    /// mobs hitting for 5. The players clear each wave in one round.
    #[must_use]
    pub fn sample_skirmish() -> Self {
        Self {
            name: "Sample Skirmish".to_string(),
            description: "Two strong players against pairs of weak mobs".to_string(),
            seed: 2112,
            players: ["alice", "bob"]
                .into_iter()
                .map(|name| {
                    ActorSpawnParams::fighter(name, 20, Weapon::new("axe", 22), Alignment::Mob)
                })
                .collect(),
            waves: WaveConfig {
                batch_size: 2,
                boss_every: 0,
                templates: vec![MobTemplate::new("carly", 20, Weapon::new("claws", 5))],
                bosses: Vec::new(),
                health_growth_per_wave: Fixed::ZERO,
                damage_growth_per_wave: Fixed::ZERO,
                max_rounds_per_wave: 10,
            },
        }
    }

    /// The full crypt: a four-member party armed from the weapon rack,
    /// against growing waves of crypt dwellers and a boss every fifth wave.
    #[must_use]
    pub fn crypt_campaign() -> Self {
        let party = [
            ("alice", 70, "axe", 22),
            ("bob", 80, "ballista", 20),
            ("carly", 60, "gun knife", 30),
            ("denise", 90, "fencing sabre", 19),
        ];
        Self {
            name: "Scrypt the Crypt".to_string(),
            description: "Hold the crypt for as many waves as possible".to_string(),
            seed: 2112,
            players: party
                .into_iter()
                .map(|(name, health, weapon, damage)| {
                    ActorSpawnParams::fighter(
                        name,
                        health,
                        Weapon::new(weapon, damage),
                        Alignment::Mob,
                    )
                })
                .collect(),
            waves: WaveConfig {
                batch_size: 4,
                boss_every: 5,
                templates: vec![
                    MobTemplate::new("edgar", 18, Weapon::new("cudgel", 9)).with_weight(4),
                    MobTemplate::new("faust", 22, Weapon::new("dingbat", 10)).with_weight(3),
                    MobTemplate::new("gabbers", 15, Weapon::new("electric sword", 15))
                        .with_weight(2),
                    MobTemplate::new("heiki", 25, Weapon::new("ignition rod", 14)),
                    MobTemplate::new("ivano", 20, Weapon::new("jax", 18)),
                    MobTemplate::new("jakob", 16, Weapon::new("kelvin sapper", 11)),
                    MobTemplate::new("kai", 14, Weapon::new("long shiv", 10)),
                    MobTemplate::new("leo", 24, Weapon::new("monkey bite", 18)),
                ],
                bosses: vec![MobTemplate::new(
                    "minerva",
                    160,
                    Weapon::new("helishears", 31),
                )],
                health_growth_per_wave: Fixed::from_bits(1 << 30), // 0.25
                damage_growth_per_wave: Fixed::from_bits(1 << 29), // 0.125
                max_rounds_per_wave: 100,
            },
        }
    }
}
