//! Scripted behaviour executed during an actor's turn.
//!
//! Actions form a closed set dispatched by a single `match`. Each action
//! receives the acting actor's ID and the battle, reads what it needs
//! through the battle (rosters, RNG) and publishes events as it mutates
//! state. Missing or dead targets are expected at runtime and resolved by
//! skipping the action; they are never reported as errors.

use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, Alignment};
use crate::battle::Battle;
use crate::events::BattleEvent;

/// One unit of scripted behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Pick a uniformly random living actor of the given alignment and
    /// store it as the current target. Always re-rolls; clears the target
    /// when nobody is eligible.
    ChooseRandomTarget(Alignment),
    /// Hit the current target with the equipped weapon.
    Attack,
}

impl Action {
    /// The standard script: choose a random member of `targets`, attack it.
    #[must_use]
    pub fn fighter_script(targets: Alignment) -> Vec<Self> {
        vec![Self::ChooseRandomTarget(targets), Self::Attack]
    }

    /// Execute this action on behalf of `owner`.
    pub fn execute(self, owner: ActorId, battle: &mut Battle) {
        match self {
            Self::ChooseRandomTarget(alignment) => choose_random_target(owner, alignment, battle),
            Self::Attack => attack(owner, battle),
        }
    }
}

fn choose_random_target(owner: ActorId, alignment: Alignment, battle: &mut Battle) {
    let candidates = battle.living_ids(alignment);
    if candidates.is_empty() {
        tracing::trace!(actor = owner, %alignment, "No eligible target");
        battle.set_target(owner, None);
        return;
    }

    let target = *battle.rng_mut().choose(&candidates);
    battle.set_target(owner, Some(target));
    battle.publish(BattleEvent::TargetSelected {
        actor: owner,
        target,
    });
}

fn attack(owner: ActorId, battle: &mut Battle) {
    let Some(attacker) = battle.actor(owner) else {
        return;
    };
    let damage = attacker.weapon().damage;

    let Some(target) = attacker.target() else {
        tracing::trace!(actor = owner, "Attack skipped: no target");
        return;
    };

    // The target may have died or been removed since it was chosen.
    if !battle.actor(target).is_some_and(|defender| defender.is_alive()) {
        tracing::trace!(actor = owner, target, "Attack skipped: target gone");
        return;
    }

    battle.publish(BattleEvent::AttackStart {
        attacker: owner,
        defender: target,
    });

    let Some((old_health, new_health)) = battle
        .actor_mut(target)
        .map(|defender| defender.take_damage(damage))
    else {
        return;
    };

    battle.publish(BattleEvent::ActorHealthChange {
        actor: target,
        old_health,
        new_health,
    });
    if old_health > 0 && new_health == 0 {
        battle.publish(BattleEvent::Death { actor: target });
    }

    battle.publish(BattleEvent::AttackEnd {
        attacker: owner,
        defender: target,
    });
}
