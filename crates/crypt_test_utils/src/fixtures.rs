//! Test fixtures and helpers.
//!
//! Pre-built battles, rosters and wave configurations for consistent
//! testing.

use crypt_core::actor::{ActorSpawnParams, Alignment, Weapon};
use crypt_core::battle::Battle;
use crypt_core::wave::{MobTemplate, WaveConfig};
use fixed::types::I32F32;

/// Names used for generated rosters, in spawn order.
pub const NAMES: [&str; 13] = [
    "alice", "bob", "carly", "denise", "edgar", "faust", "gabbers", "heiki", "ivano", "jakob",
    "kai", "leo", "minerva",
];

/// Weapon catalogue paired with [`NAMES`].
pub const WEAPONS: [(&str, u32); 13] = [
    ("axe", 22),
    ("ballista", 20),
    ("cudgel", 9),
    ("dingbat", 10),
    ("electric sword", 15),
    ("fencing sabre", 19),
    ("gun knife", 30),
    ("helishears", 31),
    ("ignition rod", 14),
    ("jax", 18),
    ("kelvin sapper", 11),
    ("long shiv", 10),
    ("monkey bite", 18),
];

/// Create a fixed-point number from a float (for tests only).
///
/// Note: in engine code, never use floats. This is only for convenient
/// test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Weapon `i` of the catalogue, wrapping around.
#[must_use]
pub fn catalogue_weapon(i: usize) -> Weapon {
    let (name, damage) = WEAPONS[i % WEAPONS.len()];
    Weapon::new(name, damage)
}

/// The two-on-two skirmish: alice and bob (20 health, damage 22) against
/// carly and denise (20 health, damage 5). Every actor runs the standard
/// fighter script.
#[must_use]
pub fn sample_skirmish(seed: u64) -> Battle {
    let mut battle = Battle::new(seed);
    for name in ["alice", "bob"] {
        spawn(
            &mut battle,
            Alignment::Player,
            ActorSpawnParams::fighter(name, 20, Weapon::new("axe", 22), Alignment::Mob),
        );
    }
    for name in ["carly", "denise"] {
        spawn(
            &mut battle,
            Alignment::Mob,
            ActorSpawnParams::fighter(name, 20, Weapon::new("claws", 5), Alignment::Player),
        );
    }
    battle
}

/// Two evenly matched sides of `per_side` fighters each. Side members are
/// drawn from [`NAMES`] and [`WEAPONS`] in order, so player `i` and mob `i`
/// carry the same weapon.
#[must_use]
pub fn mirrored_roster(seed: u64, per_side: usize) -> Battle {
    let mut battle = Battle::new(seed);
    for alignment in [Alignment::Player, Alignment::Mob] {
        for i in 0..per_side {
            let name = format!("{} the {alignment}", NAMES[i % NAMES.len()]);
            let params =
                ActorSpawnParams::fighter(name, 60, catalogue_weapon(i), alignment.opposing());
            spawn(&mut battle, alignment, params);
        }
    }
    battle
}

/// A small party of the first `size` catalogue fighters, for campaigns.
#[must_use]
pub fn sample_party(size: usize) -> Vec<ActorSpawnParams> {
    (0..size)
        .map(|i| {
            ActorSpawnParams::fighter(
                NAMES[i % NAMES.len()],
                80,
                catalogue_weapon(i),
                Alignment::Mob,
            )
        })
        .collect()
}

/// Wave configuration using the back half of the catalogue as mobs, with a
/// boss every fifth wave.
#[must_use]
pub fn sample_campaign_config() -> WaveConfig {
    WaveConfig {
        batch_size: 3,
        boss_every: 5,
        templates: vec![
            MobTemplate::new("gabbers", 16, catalogue_weapon(2)).with_weight(3),
            MobTemplate::new("heiki", 20, catalogue_weapon(3)).with_weight(2),
            MobTemplate::new("ivano", 12, catalogue_weapon(8)),
        ],
        bosses: vec![MobTemplate::new("minerva", 150, catalogue_weapon(7))],
        health_growth_per_wave: fixed_f(0.2),
        damage_growth_per_wave: fixed_f(0.1),
        max_rounds_per_wave: 100,
    }
}

/// Parse a list of spawn parameters from RON.
pub fn party_from_ron(ron: &str) -> Result<Vec<ActorSpawnParams>, ron::error::SpannedError> {
    ron::from_str(ron)
}

fn spawn(battle: &mut Battle, alignment: Alignment, params: ActorSpawnParams) {
    if let Err(err) = battle.spawn(alignment, params) {
        panic!("fixture spawn failed: {err}");
    }
}
