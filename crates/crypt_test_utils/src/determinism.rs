//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! A battle must be fully reproducible from its seed and roster. Sources
//! of non-determinism include:
//!
//! - **Floating-point math**: wave growth uses fixed-point arithmetic via
//!   [`crypt_core::math::Fixed`].
//!
//! - **HashMap iteration order**: rosters are `Vec`s in spawn order, never
//!   hash maps.
//!
//! - **System randomness**: every random pick draws from the battle's
//!   seeded [`crypt_core::rng::BattleRng`].
//!
//! Two runs count as identical only if their encoded event logs match
//! byte for byte and they end in the same state.

use std::thread;

use crypt_core::battle::Battle;
use crypt_core::events::EventLog;

/// Everything observable about one battle played to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleRecord {
    /// Final state hash.
    pub state_hash: u64,
    /// Every event published while playing, bincode-encoded.
    pub log: Vec<u8>,
    /// Rounds played.
    pub rounds: u32,
}

/// Build a battle with `setup_fn`, play it for up to `max_rounds` rounds
/// and record the result.
///
/// The recorder is attached after setup, so the log starts with the first
/// round.
///
/// # Panics
///
/// Panics if the event log cannot be encoded.
pub fn record_battle<F>(setup_fn: F, max_rounds: u32) -> BattleRecord
where
    F: FnOnce() -> Battle,
{
    let mut battle = setup_fn();
    let (log, _) = EventLog::attach(battle.events_mut());
    battle.play_until_finished(max_rounds);

    BattleRecord {
        state_hash: battle.state_hash(),
        log: log.encode().expect("battle events encode"),
        rounds: battle.round_count(),
    }
}

/// Play the battle built by `setup_fn` twice and compare event logs and
/// final state.
///
/// Returns `true` if both runs are identical.
pub fn verify_battle_determinism<F>(setup_fn: F, max_rounds: u32) -> bool
where
    F: Fn() -> Battle,
{
    let first = record_battle(&setup_fn, max_rounds);
    let second = record_battle(&setup_fn, max_rounds);

    if first != second {
        tracing::warn!(
            first_hash = first.state_hash,
            second_hash = second.state_hash,
            first_log = first.log.len(),
            second_log = second.log.len(),
            "Battle replay diverged"
        );
        return false;
    }
    true
}

/// Run N battles on scoped threads and collect their records.
///
/// Each battle is built and played on its own thread, so the battle type
/// itself never crosses a thread boundary.
///
/// # Panics
///
/// Panics if a battle thread panics.
///
/// # Example
///
/// ```
/// use crypt_test_utils::determinism::run_parallel_battles;
/// use crypt_test_utils::fixtures::mirrored_roster;
///
/// let records = run_parallel_battles(|| mirrored_roster(7, 4), 4, 50);
/// assert!(records.windows(2).all(|w| w[0] == w[1]));
/// ```
pub fn run_parallel_battles<F>(
    setup_fn: F,
    num_battles: usize,
    max_rounds: u32,
) -> Vec<BattleRecord>
where
    F: Fn() -> Battle + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| s.spawn(|| record_battle(&setup_fn, max_rounds)))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    })
}

/// Step two copies of a battle side by side, returning the number of the
/// first step after which their states differ.
///
/// Useful for debugging non-determinism by finding exactly which turn
/// breaks reproducibility.
///
/// # Returns
///
/// `None` if both copies stay identical (or finish) within `max_steps`,
/// `Some(0)` if they already differ after setup, `Some(n)` if they diverge
/// after step `n`.
pub fn find_first_divergence<F>(setup_fn: F, max_steps: u64) -> Option<u64>
where
    F: Fn() -> Battle,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for step in 1..=max_steps {
        let a = first.step();
        let b = second.step();

        if a != b || first.state_hash() != second.state_hash() {
            tracing::warn!(step, "Battles diverged");
            return Some(step);
        }
        if a.is_none() {
            break;
        }
    }

    None
}
