//! Seeded pseudo-random generator for battles.
//!
//! Every random decision a battle makes (target selection, wave template
//! picks) draws from a single [`BattleRng`]. Two generators built from the
//! same seed and driven through the same sequence of calls yield identical
//! values, which is what makes battles reproducible.

use serde::{Deserialize, Serialize};

/// Multiplier from Knuth's MMIX LCG.
const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
/// Increment from Knuth's MMIX LCG.
const LCG_INCREMENT: u64 = 1_442_695_040_888_963_407;
/// Seed scramble so that small seeds do not start in a low-entropy state.
const SEED_SCRAMBLE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic 64-bit linear congruential generator.
///
/// Not cryptographically secure; only reproducibility matters here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleRng {
    state: u64,
}

impl BattleRng {
    /// Create a new generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed ^ SEED_SCRAMBLE,
        }
    }

    /// Advance the generator and return the next raw value.
    ///
    /// The low bits of an LCG have short periods, so the output is taken
    /// from the high half of the state folded with the low half.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        let high = self.state >> 32;
        (high << 32) | (high ^ (self.state & 0xFFFF_FFFF))
    }

    /// Draw an index in `[0, n)`.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`. Drawing from an empty range is a programmer
    /// error; callers check for emptiness before drawing.
    pub fn next_index(&mut self, n: usize) -> usize {
        assert!(n > 0, "BattleRng::next_index called with an empty range");
        // Truncating cast is fine: the modulo result is < n which fits usize.
        #[allow(clippy::cast_possible_truncation)]
        let index = (self.next_u64() % n as u64) as usize;
        index
    }

    /// Pick a uniformly random element of a slice.
    ///
    /// # Panics
    ///
    /// Panics if `items` is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_index(items.len())]
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Always consumes exactly one draw, so the stream position does not
    /// depend on the weights.
    ///
    /// # Panics
    ///
    /// Panics if `weights` is empty or every weight is zero.
    pub fn pick_weighted(&mut self, weights: &[u32]) -> usize {
        let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
        assert!(total > 0, "BattleRng::pick_weighted called with no weight");

        let mut roll = self.next_u64() % total;
        for (index, &weight) in weights.iter().enumerate() {
            let weight = u64::from(weight);
            if roll < weight {
                return index;
            }
            roll -= weight;
        }
        unreachable!("roll is always below the total weight")
    }
}
