//! Error types for the combat engine.

use thiserror::Error;

use crate::actor::ActorId;
use crate::battle::Progress;

/// Result type alias using [`CombatError`].
pub type Result<T> = std::result::Result<T, CombatError>;

/// Top-level error type for all combat engine errors.
///
/// Benign absences (no target, dead target, empty opposing roster) are
/// never reported through this type; actions resolve them locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CombatError {
    /// No actor with this ID is in either roster.
    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),

    /// A roster mutation was attempted while a round is being resolved.
    #[error("Roster is locked while round {round} is in progress")]
    RoundInProgress {
        /// Round currently being resolved.
        round: u32,
    },

    /// The battle already reached a terminal state.
    #[error("Battle is over: {0:?}")]
    BattleOver(Progress),

    /// Invalid wave or campaign configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{path}': {message}")]
    DataParse {
        /// Path or label of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Binary encoding failure.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}
