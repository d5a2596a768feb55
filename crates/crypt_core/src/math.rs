//! Fixed-point math utilities for deterministic wave scaling.
//!
//! Stat growth across waves uses fixed-point arithmetic so that two
//! campaigns with the same seed and configuration scale their mobs
//! bit-identically on every platform.

use fixed::types::I32F32;

/// Fixed-point number type for all scaling math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as exact decimal strings (`"0.25"`) so
/// configuration files stay readable. Parsing a decimal string is exact
/// for every value the type can represent, so a round-trip preserves the
/// original bits.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as its decimal representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    /// Deserialize a fixed-point number from a decimal string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.trim()
            .parse::<Fixed>()
            .map_err(|e| D::Error::custom(format!("invalid fixed-point value '{text}': {e}")))
    }
}

/// Multiplier applied to a stat after `steps` growth increments.
///
/// `1 + growth * steps`, saturating, never below zero.
#[must_use]
pub fn growth_multiplier(growth: Fixed, steps: u32) -> Fixed {
    let scaled = growth.saturating_mul(Fixed::saturating_from_num(steps));
    Fixed::ONE.saturating_add(scaled).max(Fixed::ZERO)
}

/// Scale an integer stat by a fixed-point multiplier, rounding down.
#[must_use]
pub fn scale_stat(base: u32, multiplier: Fixed) -> u32 {
    Fixed::saturating_from_num(base)
        .saturating_mul(multiplier)
        .saturating_to_num::<u32>()
}
