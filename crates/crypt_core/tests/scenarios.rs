//! End-to-end scenarios: the two-on-two skirmish, replay reproducibility,
//! paused stepping and the campaign wave schedule.

use crypt_core::prelude::*;
use crypt_test_utils::fixtures::{
    mirrored_roster, sample_campaign_config, sample_party, sample_skirmish,
};

fn skirmish_with_log(seed: u64) -> (Battle, EventLog) {
    let mut bus = EventBus::new();
    let (log, _) = EventLog::attach(&mut bus);
    let mut battle = Battle::with_bus(BattleRng::new(seed), bus);
    for name in ["alice", "bob"] {
        battle
            .spawn_player(ActorSpawnParams::fighter(
                name,
                20,
                Weapon::new("axe", 22),
                Alignment::Mob,
            ))
            .unwrap();
    }
    for name in ["carly", "denise"] {
        battle
            .spawn_mob(ActorSpawnParams::fighter(
                name,
                20,
                Weapon::new("claws", 5),
                Alignment::Player,
            ))
            .unwrap();
    }
    (battle, log)
}

#[test]
fn skirmish_2112_players_win_in_one_round() {
    let mut battle = sample_skirmish(2112);
    assert_eq!(battle.play_round(), Progress::PlayersWin);
    assert_eq!(battle.round_count(), 1);
    assert!(battle.mobs().is_empty());
    assert_eq!(battle.players().len(), 2);
    assert!(battle.players().iter().all(|p| p.health() == 20));
}

#[test]
fn skirmish_log_tells_the_story() {
    let (mut battle, log) = skirmish_with_log(2112);
    battle.play_round();

    let events = log.events();
    let deaths: Vec<ActorId> = events
        .iter()
        .filter_map(|e| match e {
            BattleEvent::Death { actor } => Some(*actor),
            _ => None,
        })
        .collect();
    let mut sorted = deaths.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![3, 4]);

    // Mobs never got a turn.
    assert!(!events.contains(&BattleEvent::ActorActionsStart { actor: 3 }));
    assert!(!events.contains(&BattleEvent::ActorActionsStart { actor: 4 }));

    let tail = &events[events.len() - 2..];
    assert_eq!(
        tail,
        &[
            BattleEvent::RoundEnd { round: 1 },
            BattleEvent::BattleEnded {
                progress: Progress::PlayersWin,
                rounds: 1
            },
        ]
    );
}

#[test]
fn identical_seeds_produce_identical_logs() {
    let encode = |seed: u64| {
        let mut battle = mirrored_roster(seed, 6);
        let (log, _) = EventLog::attach(battle.events_mut());
        battle.play_until_finished(500);
        (log.encode().unwrap(), battle.state_hash())
    };

    let (first_log, first_hash) = encode(31337);
    let (second_log, second_hash) = encode(31337);
    assert_eq!(first_log, second_log);
    assert_eq!(first_hash, second_hash);

    let (other_log, _) = encode(31338);
    assert_ne!(first_log, other_log);
}

#[test]
fn paused_stepping_matches_uninterrupted_round() {
    let (mut straight, straight_log) = skirmish_with_log(7);
    straight.play_until_finished(100);

    let (mut paused, paused_log) = skirmish_with_log(7);
    {
        let mut steps = paused.steps();
        let first = steps.next().unwrap();
        assert_eq!(first.actor, 1);
    }
    // The round stays suspended until the battle is driven again.
    assert!(paused.in_round());
    assert_eq!(paused.round_count(), 0);

    paused.play_until_finished(100);

    assert_eq!(paused.state_hash(), straight.state_hash());
    assert_eq!(paused_log.events(), straight_log.events());
}

#[test]
fn stepwise_and_roundwise_agree_on_long_battles() {
    let mut by_round = mirrored_roster(99, 8);
    let mut by_step = mirrored_roster(99, 8);

    by_round.play_until_finished(1_000);
    let mut steps = 0;
    while by_step.step().is_some() {
        steps += 1;
        assert!(steps < 100_000, "battle never ended");
    }

    assert_eq!(by_round.progress(), by_step.progress());
    assert_eq!(by_round.round_count(), by_step.round_count());
    assert_eq!(by_round.state_hash(), by_step.state_hash());
}

#[test]
fn boss_replaces_batch_every_fifth_wave() {
    let mut generator = WaveGenerator::new(sample_campaign_config()).unwrap();
    let mut rng = BattleRng::new(2112);

    for wave in 1..=20 {
        let plan = generator.next_wave(&mut rng);
        if wave % 5 == 0 {
            assert!(plan.boss, "wave {wave} should be a boss wave");
            assert_eq!(plan.mobs.len(), 1);
        } else {
            assert!(!plan.boss, "wave {wave} should be a normal wave");
            assert_eq!(plan.mobs.len(), 3);
        }
    }
}

#[test]
fn campaign_replays_identically() {
    let run = || {
        let mut bus = EventBus::new();
        let (log, _) = EventLog::attach(&mut bus);
        let mut campaign =
            Campaign::with_bus(2112, bus, sample_party(3), sample_campaign_config()).unwrap();
        let summary = campaign.run(50).unwrap();
        (summary, log.encode().unwrap())
    };

    let (first, first_log) = run();
    let (second, second_log) = run();
    assert_eq!(first, second);
    assert_eq!(first_log, second_log);
    assert!(first.final_wave >= 1);
}

#[test]
fn campaign_ids_stay_unique_across_waves() {
    let mut bus = EventBus::new();
    let (log, _) = EventLog::attach(&mut bus);
    let mut campaign =
        Campaign::with_bus(5, bus, sample_party(4), sample_campaign_config()).unwrap();
    campaign.run(12).unwrap();

    let mut ids: Vec<ActorId> = log
        .events()
        .iter()
        .filter_map(|e| match e {
            BattleEvent::ActorAdded { actor } => Some(actor.id),
            _ => None,
        })
        .collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
}

#[test]
fn unsubscribed_observer_stops_receiving() {
    let mut battle = sample_skirmish(2112);
    let (log, id) = EventLog::attach(battle.events_mut());

    battle.step();
    let seen = log.len();
    assert!(seen > 0);

    assert!(battle.events_mut().unsubscribe(id));
    battle.play_round();
    assert_eq!(log.len(), seen);
}
