//! Proptest strategies for battle testing.
//!
//! These strategies generate random but reproducible rosters for
//! property-based testing of combat invariants and determinism.

use proptest::prelude::*;

use crypt_core::action::Action;
use crypt_core::actor::{ActorSpawnParams, Alignment, Weapon};
use crypt_core::battle::Battle;

use crate::fixtures::WEAPONS;

/// Generate health values (1-200).
pub fn arb_health() -> impl Strategy<Value = u32> {
    1u32..200u32
}

/// Generate damage values (0-60). Zero-damage weapons are valid.
pub fn arb_damage() -> impl Strategy<Value = u32> {
    0u32..60u32
}

/// Generate a weapon with a catalogue name and arbitrary damage.
pub fn arb_weapon() -> impl Strategy<Value = Weapon> {
    (0..WEAPONS.len(), arb_damage()).prop_map(|(i, damage)| Weapon::new(WEAPONS[i].0, damage))
}

/// Generate an alignment.
pub fn arb_alignment() -> impl Strategy<Value = Alignment> {
    prop_oneof![Just(Alignment::Player), Just(Alignment::Mob)]
}

/// Generate a single action.
pub fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        arb_alignment().prop_map(Action::ChooseRandomTarget),
        Just(Action::Attack),
    ]
}

/// Generate spawn parameters for a fighter of `alignment`.
///
/// Most fighters run the standard script; some get an arbitrary script so
/// odd orderings (attacking before targeting, targeting allies) are
/// exercised too.
pub fn arb_spawn_params(alignment: Alignment) -> impl Strategy<Value = ActorSpawnParams> {
    let script = prop_oneof![
        3 => Just(Action::fighter_script(alignment.opposing())),
        1 => proptest::collection::vec(arb_action(), 0..4),
    ];
    ("[a-z]{3,8}", arb_health(), arb_weapon(), script).prop_map(
        |(name, health, weapon, script)| {
            ActorSpawnParams::new(name, health, weapon).with_script(script)
        },
    )
}

/// Generate both sides of a battle, each with 1 to `max_per_side` actors.
pub fn arb_roster(
    max_per_side: usize,
) -> impl Strategy<Value = (Vec<ActorSpawnParams>, Vec<ActorSpawnParams>)> {
    (
        proptest::collection::vec(arb_spawn_params(Alignment::Player), 1..=max_per_side),
        proptest::collection::vec(arb_spawn_params(Alignment::Mob), 1..=max_per_side),
    )
}

/// Build a battle from a generated roster.
///
/// # Panics
///
/// Panics if spawning fails, which cannot happen on a fresh battle.
#[must_use]
pub fn battle_from_roster(
    seed: u64,
    players: &[ActorSpawnParams],
    mobs: &[ActorSpawnParams],
) -> Battle {
    let mut battle = Battle::new(seed);
    for params in players {
        battle
            .spawn_player(params.clone())
            .expect("fresh battle accepts spawns");
    }
    for params in mobs {
        battle
            .spawn_mob(params.clone())
            .expect("fresh battle accepts spawns");
    }
    battle
}
