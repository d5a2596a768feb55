//! Property tests over whole battles: every event log produced from a
//! random roster must respect turn order, causality and health rules.

use std::collections::{HashMap, HashSet};

use crypt_core::prelude::*;
use crypt_test_utils::strategies::{arb_damage, arb_health, arb_roster, battle_from_roster};
use proptest::prelude::*;

const MAX_ROUNDS: u32 = 40;

/// Play a battle to completion and return every event it published.
fn record(
    seed: u64,
    players: &[ActorSpawnParams],
    mobs: &[ActorSpawnParams],
) -> Vec<BattleEvent> {
    let mut bus = EventBus::new();
    let (log, _) = EventLog::attach(&mut bus);
    let mut battle = Battle::with_bus(BattleRng::new(seed), bus);
    for params in players {
        battle.spawn_player(params.clone()).unwrap();
    }
    for params in mobs {
        battle.spawn_mob(params.clone()).unwrap();
    }
    battle.play_until_finished(MAX_ROUNDS);
    log.take()
}

/// Spawn snapshots keyed by actor ID.
fn spawned(events: &[BattleEvent]) -> HashMap<ActorId, ActorSnapshot> {
    events
        .iter()
        .filter_map(|event| match event {
            BattleEvent::ActorAdded { actor } => Some((actor.id, actor.clone())),
            _ => None,
        })
        .collect()
}

fn fighters(alignment: Alignment) -> impl Strategy<Value = Vec<ActorSpawnParams>> {
    proptest::collection::vec(
        (arb_health(), arb_damage()).prop_map(move |(health, damage)| {
            ActorSpawnParams::fighter(
                "grunt",
                health,
                Weapon::new("club", damage),
                alignment.opposing(),
            )
        }),
        1..5,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_turns_follow_roster_order(seed in any::<u64>(), (players, mobs) in arb_roster(5)) {
        let events = record(seed, &players, &mobs);
        let actors = spawned(&events);

        let mut turns: Vec<ActorId> = Vec::new();
        for event in &events {
            match event {
                BattleEvent::RoundStart { .. } => turns.clear(),
                BattleEvent::ActorActionsStart { actor } => turns.push(*actor),
                BattleEvent::RoundEnd { .. } => {
                    // Players first, then mobs, each in spawn (ID) order.
                    prop_assert!(turns.windows(2).all(|w| w[0] < w[1]));
                    let first_mob = turns
                        .iter()
                        .position(|id| actors[id].alignment == Alignment::Mob)
                        .unwrap_or(turns.len());
                    prop_assert!(turns[first_mob..]
                        .iter()
                        .all(|id| actors[id].alignment == Alignment::Mob));
                }
                _ => {}
            }
        }
    }

    #[test]
    fn prop_attack_subtracts_weapon_damage(seed in any::<u64>(), (players, mobs) in arb_roster(5)) {
        let events = record(seed, &players, &mobs);
        let actors = spawned(&events);

        for (i, event) in events.iter().enumerate() {
            if let BattleEvent::AttackStart { attacker, defender } = event {
                let damage = actors[attacker].weapon.damage;
                match &events[i + 1] {
                    BattleEvent::ActorHealthChange { actor, old_health, new_health } => {
                        prop_assert_eq!(actor, defender);
                        prop_assert!(*old_health > 0);
                        prop_assert_eq!(*new_health, old_health.saturating_sub(damage));
                    }
                    other => prop_assert!(false, "expected health change, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn prop_attack_events_are_bracketed(seed in any::<u64>(), (players, mobs) in arb_roster(5)) {
        let events = record(seed, &players, &mobs);

        for (i, event) in events.iter().enumerate() {
            if let BattleEvent::AttackStart { attacker, defender } = event {
                let died =
                    matches!(&events[i + 2], BattleEvent::Death { actor } if actor == defender);
                let end = if died { i + 3 } else { i + 2 };
                prop_assert_eq!(
                    &events[end],
                    &BattleEvent::AttackEnd { attacker: *attacker, defender: *defender }
                );
            }
        }
    }

    #[test]
    fn prop_death_fires_once_on_transition_to_zero(
        seed in any::<u64>(),
        (players, mobs) in arb_roster(5),
    ) {
        let events = record(seed, &players, &mobs);
        let mut dead = HashSet::new();

        for (i, event) in events.iter().enumerate() {
            match event {
                BattleEvent::Death { actor } => {
                    prop_assert!(dead.insert(*actor), "second death for #{actor}");
                    prop_assert!(matches!(
                        &events[i - 1],
                        BattleEvent::ActorHealthChange { actor: hurt, new_health: 0, .. }
                            if hurt == actor
                    ), "death for #{actor} not preceded by lethal health change");
                }
                BattleEvent::ActorHealthChange { actor, old_health, new_health } => {
                    prop_assert!(new_health <= old_health);
                    if *old_health > 0 && *new_health == 0 {
                        prop_assert_eq!(&events[i + 1], &BattleEvent::Death { actor: *actor });
                    }
                }
                _ => {}
            }
        }
    }

    #[test]
    fn prop_targets_are_living_enemies(
        seed in any::<u64>(),
        players in fighters(Alignment::Player),
        mobs in fighters(Alignment::Mob),
    ) {
        let events = record(seed, &players, &mobs);
        let actors = spawned(&events);
        let mut health: HashMap<ActorId, u32> =
            actors.iter().map(|(id, a)| (*id, a.health)).collect();

        for event in &events {
            match event {
                BattleEvent::ActorHealthChange { actor, new_health, .. } => {
                    health.insert(*actor, *new_health);
                }
                BattleEvent::ActorRemoved { actor } => {
                    health.remove(actor);
                }
                BattleEvent::TargetSelected { actor, target } => {
                    prop_assert_eq!(
                        actors[target].alignment,
                        actors[actor].alignment.opposing()
                    );
                    prop_assert!(health.get(target).is_some_and(|h| *h > 0));
                }
                _ => {}
            }
        }
    }

    #[test]
    fn prop_dead_actors_never_act(seed in any::<u64>(), (players, mobs) in arb_roster(5)) {
        let events = record(seed, &players, &mobs);
        let mut dead = HashSet::new();

        for event in &events {
            match event {
                BattleEvent::Death { actor } => {
                    dead.insert(*actor);
                }
                BattleEvent::ActorActionsStart { actor }
                | BattleEvent::TargetSelected { actor, .. } => {
                    prop_assert!(!dead.contains(actor));
                }
                BattleEvent::AttackStart { attacker, defender } => {
                    prop_assert!(!dead.contains(attacker));
                    prop_assert!(!dead.contains(defender));
                }
                _ => {}
            }
        }
    }

    #[test]
    fn prop_battle_ends_exactly_once(seed in any::<u64>(), (players, mobs) in arb_roster(5)) {
        let events = record(seed, &players, &mobs);
        let endings: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, BattleEvent::BattleEnded { .. }))
            .map(|(i, _)| i)
            .collect();

        prop_assert!(endings.len() <= 1);
        if let Some(&i) = endings.first() {
            prop_assert_eq!(i, events.len() - 1);
        }
    }

    #[test]
    fn prop_health_stays_within_bounds(seed in any::<u64>(), (players, mobs) in arb_roster(5)) {
        let mut battle = battle_from_roster(seed, &players, &mobs);
        while let Some(report) = battle.step() {
            for actor in battle.players().iter().chain(battle.mobs()) {
                prop_assert!(actor.health() <= actor.base_health());
                // Dead actors leave the roster at the end of the turn.
                prop_assert!(actor.is_alive());
            }
            if report.round >= MAX_ROUNDS {
                break;
            }
        }
    }
}
