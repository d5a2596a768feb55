//! # Crypt Core
//!
//! Deterministic combat resolution engine for Scrypt the Crypt.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (one seeded [`rng::BattleRng`] per battle)
//! - No floating-point math (wave scaling uses fixed-point)
//!
//! This separation enables:
//! - Headless drivers and batch balance runs
//! - Reproducible battles for tests and bug reports
//! - Presentation layers that only consume [`events::BattleEvent`]s
//!
//! ## Crate Structure
//!
//! - [`rng`] - Seeded pseudo-random generator
//! - [`actor`] - Combat participants and their vitals
//! - [`action`] - Scripted behaviour executed during a turn
//! - [`events`] - Combat notifications and the event bus
//! - [`battle`] - Rosters and the round/turn scheduler
//! - [`wave`] - Wave generation and the campaign loop
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod action;
pub mod actor;
pub mod battle;
pub mod error;
pub mod events;
pub mod math;
pub mod rng;
pub mod wave;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::action::Action;
    pub use crate::actor::{
        Actor, ActorId, ActorSnapshot, ActorSpawnParams, Alignment, Health, TurnState, Weapon,
    };
    pub use crate::battle::{Battle, Progress, RoundSteps, TurnReport};
    pub use crate::error::{CombatError, Result};
    pub use crate::events::{BattleEvent, EventBus, EventLog, SubscriptionId};
    pub use crate::math::Fixed;
    pub use crate::rng::BattleRng;
    pub use crate::wave::{
        Campaign, CampaignSummary, MobTemplate, WaveConfig, WaveGenerator, WaveOutcome, WavePlan,
    };
}
