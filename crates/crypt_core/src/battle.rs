//! Rosters and the round/turn scheduler.
//!
//! A [`Battle`] owns two rosters (players and mobs), the battle's
//! [`BattleRng`] and its [`EventBus`]. The scheduler advances combat one
//! actor turn at a time; whole rounds are built on top of single steps.
//!
//! # Turn Order
//!
//! At the start of each round the scheduler snapshots every living actor:
//! players in insertion order, then mobs in insertion order. Actors that
//! die before their turn comes up are skipped.
//!
//! # Round Lifecycle
//!
//! 1. `RoundStart`
//! 2. For each living actor in turn order:
//!    `ActorActionsStart` → script actions → `ActorActionsEnd`
//!    → removal of the dead (`ActorRemoved`) → progress check
//! 3. `RoundEnd` (also when the round is cut short by the battle ending)
//! 4. `BattleEnded` once progress becomes terminal
//!
//! # Resumable Stepping
//!
//! The position inside the current round is stored in the battle itself,
//! so a caller can advance one turn with [`Battle::step`], do something
//! else, and resume later. [`Battle::steps`] wraps this in an iterator;
//! dropping the iterator part-way leaves the battle in a valid
//! mid-round state.
//!
//! # Example
//!
//! ```
//! use crypt_core::actor::{ActorSpawnParams, Alignment, Weapon};
//! use crypt_core::battle::{Battle, Progress};
//!
//! let mut battle = Battle::new(2112);
//! battle
//!     .spawn_player(ActorSpawnParams::fighter("alice", 20, Weapon::new("axe", 22), Alignment::Mob))
//!     .unwrap();
//! battle
//!     .spawn_mob(ActorSpawnParams::fighter("carly", 20, Weapon::new("cutlass", 5), Alignment::Player))
//!     .unwrap();
//!
//! assert_eq!(battle.play_round(), Progress::PlayersWin);
//! assert_eq!(battle.round_count(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::actor::{Actor, ActorId, ActorSpawnParams, Alignment, Weapon};
use crate::error::{CombatError, Result};
use crate::events::{BattleEvent, EventBus};
use crate::rng::BattleRng;

/// Status of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Progress {
    /// Both sides still have living actors.
    InProgress,
    /// The mob roster is empty.
    PlayersWin,
    /// The player roster is empty.
    MobsWin,
}

impl Progress {
    /// Whether the battle is over. Terminal states are never left.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Outcome of one actor turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    /// Round the turn belonged to.
    pub round: u32,
    /// Actor that took the turn.
    pub actor: ActorId,
    /// Battle progress after the turn.
    pub progress: Progress,
    /// Whether this turn closed its round.
    pub round_complete: bool,
}

/// Ordered collection of actors on one side.
///
/// Insertion order defines turn order within the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct Roster {
    actors: Vec<Actor>,
}

impl Roster {
    fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.id() == id)
    }

    fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|actor| actor.id() == id)
    }

    fn remove(&mut self, id: ActorId) -> Option<Actor> {
        let index = self.actors.iter().position(|actor| actor.id() == id)?;
        Some(self.actors.remove(index))
    }

    fn living_ids(&self) -> Vec<ActorId> {
        self.actors
            .iter()
            .filter(|actor| actor.is_alive())
            .map(Actor::id)
            .collect()
    }

    fn has_living(&self) -> bool {
        self.actors.iter().any(Actor::is_alive)
    }

    fn dead_ids(&self) -> Vec<ActorId> {
        self.actors
            .iter()
            .filter(|actor| !actor.is_alive())
            .map(Actor::id)
            .collect()
    }
}

/// Position inside the round currently being resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RoundCursor {
    round: u32,
    order: Vec<ActorId>,
    next: usize,
}

/// A battle between the player party and a mob roster.
#[derive(Debug)]
pub struct Battle {
    players: Roster,
    mobs: Roster,
    rng: BattleRng,
    bus: EventBus,
    progress: Progress,
    round_count: u32,
    cursor: Option<RoundCursor>,
    next_id: ActorId,
}

impl Battle {
    /// Create an empty battle seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_rng(BattleRng::new(seed))
    }

    /// Create an empty battle drawing from an existing RNG stream.
    #[must_use]
    pub fn with_rng(rng: BattleRng) -> Self {
        Self::with_bus(rng, EventBus::new())
    }

    /// Create an empty battle with an injected event bus, so observers can
    /// be attached before the first actor is spawned.
    #[must_use]
    pub fn with_bus(rng: BattleRng, bus: EventBus) -> Self {
        Self {
            players: Roster::default(),
            mobs: Roster::default(),
            rng,
            bus,
            progress: Progress::InProgress,
            round_count: 0,
            cursor: None,
            next_id: 1,
        }
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// Player roster, in turn order.
    #[must_use]
    pub fn players(&self) -> &[Actor] {
        &self.players.actors
    }

    /// Mob roster, in turn order.
    #[must_use]
    pub fn mobs(&self) -> &[Actor] {
        &self.mobs.actors
    }

    /// The roster for one side.
    #[must_use]
    pub fn roster(&self, alignment: Alignment) -> &[Actor] {
        match alignment {
            Alignment::Player => self.players(),
            Alignment::Mob => self.mobs(),
        }
    }

    /// Look up an actor in either roster.
    #[must_use]
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.players.get(id).or_else(|| self.mobs.get(id))
    }

    /// Current battle status.
    #[must_use]
    pub const fn progress(&self) -> Progress {
        self.progress
    }

    /// Number of rounds closed so far.
    #[must_use]
    pub const fn round_count(&self) -> u32 {
        self.round_count
    }

    /// Whether a round has started and not yet closed. Rosters cannot be
    /// changed while this is true.
    #[must_use]
    pub fn in_round(&self) -> bool {
        self.cursor.is_some()
    }

    /// The battle's RNG stream.
    #[must_use]
    pub fn rng(&self) -> &BattleRng {
        &self.rng
    }

    /// The event bus, for attaching and detaching observers.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Hash of the complete combat state.
    ///
    /// Two battles with identical rosters, RNG position, progress and
    /// round position produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.round_count.hash(&mut hasher);
        self.progress.hash(&mut hasher);
        self.rng.hash(&mut hasher);
        self.next_id.hash(&mut hasher);
        self.cursor.hash(&mut hasher);
        self.players.hash(&mut hasher);
        self.mobs.hash(&mut hasher);
        hasher.finish()
    }

    // ------------------------------------------------------------------
    // Roster mutation (between rounds only)
    // ------------------------------------------------------------------

    /// Add an actor to the roster for `alignment` and return its new ID.
    ///
    /// An ended battle never takes new actors; start the next wave with
    /// [`Battle::into_next_wave`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::RoundInProgress`] if called mid-round, or
    /// [`CombatError::BattleOver`] once the battle has ended.
    pub fn spawn(&mut self, alignment: Alignment, params: ActorSpawnParams) -> Result<ActorId> {
        self.ensure_between_rounds()?;
        if self.progress.is_terminal() {
            return Err(CombatError::BattleOver(self.progress));
        }

        let id = self.next_id;
        self.next_id += 1;
        let actor = Actor::spawn(id, alignment, params);
        let snapshot = actor.snapshot();
        match alignment {
            Alignment::Player => self.players.actors.push(actor),
            Alignment::Mob => self.mobs.actors.push(actor),
        }

        self.publish(BattleEvent::ActorAdded { actor: snapshot });
        Ok(id)
    }

    /// Add a player. Fails like [`Battle::spawn`].
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::RoundInProgress`] or [`CombatError::BattleOver`].
    pub fn spawn_player(&mut self, params: ActorSpawnParams) -> Result<ActorId> {
        self.spawn(Alignment::Player, params)
    }

    /// Add a mob. Fails like [`Battle::spawn`].
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::RoundInProgress`] or [`CombatError::BattleOver`].
    pub fn spawn_mob(&mut self, params: ActorSpawnParams) -> Result<ActorId> {
        self.spawn(Alignment::Mob, params)
    }

    /// Remove an actor from its roster.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::RoundInProgress`] if called mid-round, or
    /// [`CombatError::ActorNotFound`] if no roster holds `id`.
    pub fn remove_actor(&mut self, id: ActorId) -> Result<Actor> {
        self.ensure_between_rounds()?;
        self.take_actor(id).ok_or(CombatError::ActorNotFound(id))
    }

    /// Reassign an actor's weapon.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::ActorNotFound`] if no roster holds `id`.
    pub fn equip(&mut self, id: ActorId, weapon: Weapon) -> Result<()> {
        let actor = self.actor_mut(id).ok_or(CombatError::ActorNotFound(id))?;
        actor.set_weapon(weapon);
        Ok(())
    }

    /// Finish this battle and start the next wave's.
    ///
    /// Keeps the player roster, the RNG stream, the ID counter and the
    /// event bus (with its subscribers). Every mob is removed, targets are
    /// cleared, and the returned battle starts fresh in
    /// [`Progress::InProgress`] at round 0.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::RoundInProgress`] if called mid-round; the
    /// battle is dropped with the error.
    pub fn into_next_wave(mut self) -> Result<Self> {
        self.ensure_between_rounds()?;

        let mob_ids: Vec<ActorId> = self.mobs.actors.iter().map(Actor::id).collect();
        for id in mob_ids {
            self.take_actor(id);
        }
        for player in &mut self.players.actors {
            player.set_target(None);
        }

        Ok(Self {
            players: self.players,
            mobs: Roster::default(),
            rng: self.rng,
            bus: self.bus,
            progress: Progress::InProgress,
            round_count: 0,
            cursor: None,
            next_id: self.next_id,
        })
    }

    // ------------------------------------------------------------------
    // Scheduler
    // ------------------------------------------------------------------

    /// Advance the battle by one actor turn.
    ///
    /// Starts a new round if none is in progress. Returns `None` once the
    /// battle is over; a battle whose roster is already one-sided ends on
    /// this call without starting a round.
    pub fn step(&mut self) -> Option<TurnReport> {
        if self.progress.is_terminal() {
            return None;
        }

        if self.cursor.is_none() {
            let progress = self.evaluate_progress();
            if progress.is_terminal() {
                self.conclude(progress);
                return None;
            }
            self.begin_round();
        }

        let (round, actor) = {
            let cursor = self.cursor.as_mut()?;
            let actor = *cursor.order.get(cursor.next)?;
            cursor.next += 1;
            (cursor.round, actor)
        };

        self.take_turn(actor);
        self.remove_dead();

        let progress = self.evaluate_progress();
        let round_complete = if progress.is_terminal() {
            self.close_round();
            self.conclude(progress);
            true
        } else {
            self.skip_unable_actors();
            if self.cursor_exhausted() {
                self.close_round();
                true
            } else {
                false
            }
        };

        Some(TurnReport {
            round,
            actor,
            progress: self.progress,
            round_complete,
        })
    }

    /// Iterate over the remaining turns of the current round, or of the
    /// next round if none is in progress.
    ///
    /// The iterator holds the battle mutably, so only one enumeration can
    /// exist at a time.
    pub fn steps(&mut self) -> RoundSteps<'_> {
        RoundSteps {
            battle: self,
            done: false,
        }
    }

    /// Resolve the rest of the current round (or one full new round).
    ///
    /// Stops early if the battle ends mid-round; the remaining actors do
    /// not act.
    pub fn play_round(&mut self) -> Progress {
        for _ in self.steps() {}
        self.progress
    }

    /// Play rounds until the battle ends or `max_rounds` more rounds have
    /// been played.
    pub fn play_until_finished(&mut self, max_rounds: u32) -> Progress {
        let mut played = 0;
        while !self.progress.is_terminal() && played < max_rounds {
            self.play_round();
            played += 1;
        }
        self.progress
    }

    // ------------------------------------------------------------------
    // Context for actions
    // ------------------------------------------------------------------

    pub(crate) fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        if self.players.get(id).is_some() {
            self.players.get_mut(id)
        } else {
            self.mobs.get_mut(id)
        }
    }

    pub(crate) fn living_ids(&self, alignment: Alignment) -> Vec<ActorId> {
        match alignment {
            Alignment::Player => self.players.living_ids(),
            Alignment::Mob => self.mobs.living_ids(),
        }
    }

    pub(crate) fn set_target(&mut self, id: ActorId, target: Option<ActorId>) {
        if let Some(actor) = self.actor_mut(id) {
            actor.set_target(target);
        }
    }

    pub(crate) fn rng_mut(&mut self) -> &mut BattleRng {
        &mut self.rng
    }

    pub(crate) fn publish(&mut self, event: BattleEvent) {
        self.bus.publish(&event);
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(crate) fn ensure_between_rounds(&self) -> Result<()> {
        match &self.cursor {
            Some(cursor) => Err(CombatError::RoundInProgress {
                round: cursor.round,
            }),
            None => Ok(()),
        }
    }

    fn take_actor(&mut self, id: ActorId) -> Option<Actor> {
        let actor = self.players.remove(id).or_else(|| self.mobs.remove(id))?;
        self.publish(BattleEvent::ActorRemoved { actor: id });
        Some(actor)
    }

    fn evaluate_progress(&self) -> Progress {
        if !self.players.has_living() {
            Progress::MobsWin
        } else if !self.mobs.has_living() {
            Progress::PlayersWin
        } else {
            Progress::InProgress
        }
    }

    fn begin_round(&mut self) {
        let round = self.round_count + 1;
        let mut order = self.players.living_ids();
        order.extend(self.mobs.living_ids());

        tracing::debug!(round, actors = order.len(), "Round start");
        self.cursor = Some(RoundCursor {
            round,
            order,
            next: 0,
        });
        self.publish(BattleEvent::RoundStart { round });
    }

    fn close_round(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            self.round_count = cursor.round;
            tracing::debug!(round = cursor.round, "Round end");
            self.publish(BattleEvent::RoundEnd {
                round: cursor.round,
            });
        }
    }

    fn conclude(&mut self, progress: Progress) {
        self.progress = progress;
        tracing::debug!(?progress, rounds = self.round_count, "Battle ended");
        self.publish(BattleEvent::BattleEnded {
            progress,
            rounds: self.round_count,
        });
    }

    fn take_turn(&mut self, id: ActorId) {
        let Some(script) = self.actor(id).map(|actor| actor.script().to_vec()) else {
            return;
        };

        self.publish(BattleEvent::ActorActionsStart { actor: id });
        for action in script {
            if !self.actor(id).is_some_and(Actor::is_alive) {
                break;
            }
            self.run_action(id, action);
        }
        self.publish(BattleEvent::ActorActionsEnd { actor: id });
    }

    fn run_action(&mut self, id: ActorId, action: Action) {
        action.execute(id, self);
    }

    fn remove_dead(&mut self) {
        for id in self.players.dead_ids() {
            self.take_actor(id);
        }
        for id in self.mobs.dead_ids() {
            self.take_actor(id);
        }
    }

    /// Move the cursor past actors that died or left before their turn.
    fn skip_unable_actors(&mut self) {
        loop {
            let Some(next) = self
                .cursor
                .as_ref()
                .and_then(|cursor| cursor.order.get(cursor.next).copied())
            else {
                return;
            };
            if self.actor(next).is_some_and(Actor::is_alive) {
                return;
            }
            if let Some(cursor) = self.cursor.as_mut() {
                cursor.next += 1;
            }
        }
    }

    fn cursor_exhausted(&self) -> bool {
        self.cursor
            .as_ref()
            .map_or(true, |cursor| cursor.next >= cursor.order.len())
    }
}

impl Default for Battle {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Iterator over the turns of one round. See [`Battle::steps`].
#[derive(Debug)]
pub struct RoundSteps<'a> {
    battle: &'a mut Battle,
    done: bool,
}

impl RoundSteps<'_> {
    /// The battle being stepped.
    #[must_use]
    pub fn battle(&self) -> &Battle {
        self.battle
    }
}

impl Iterator for RoundSteps<'_> {
    type Item = TurnReport;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let report = self.battle.step();
        match report {
            Some(report) if !report.round_complete => {}
            _ => self.done = true,
        }
        report
    }
}
