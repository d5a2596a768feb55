//! Headless campaign runner for scripted play and CI verification.
//!
//! This crate drives a [`crypt_core::wave::Campaign`] without any
//! presentation layer:
//!
//! - **Scripted play**: a controller steps the battle over JSON lines
//! - **Batch runs**: many seeds in parallel to judge difficulty
//! - **Replay verification**: identical seeds must produce identical logs
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (step, round, next_wave, ...)
//! - **stdout**: Events and state snapshots (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Step through the sample skirmish
//! echo '{"cmd":"round"}' | cargo run -p crypt_headless -- run
//!
//! # Play a whole campaign from a RON file
//! cargo run -p crypt_headless -- campaign --scenario scenarios/crypt_campaign.ron
//!
//! # Verify determinism
//! cargo run -p crypt_headless -- verify --scenario crypt_campaign --runs 5
//! ```

pub mod batch;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod verify;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::{Scenario, ScenarioError};
pub use verify::{verify_scenario, VerifyReport};
