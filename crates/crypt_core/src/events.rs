//! Combat notifications and the event bus.
//!
//! The engine publishes a [`BattleEvent`] synchronously every time combat
//! state changes, after the change has been applied. Observers (renderers,
//! loggers, tests) subscribe through the [`EventBus`] owned by the battle.
//!
//! The bus never queues, drops or retries events; buffering is a concern
//! of the consumer. [`EventLog`] is the stock consumer that records every
//! event for later inspection.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, ActorSnapshot};
use crate::battle::Progress;
use crate::error::{CombatError, Result};

/// One notable combat occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BattleEvent {
    /// An actor joined a roster.
    ActorAdded {
        /// State of the actor as it was added.
        actor: ActorSnapshot,
    },
    /// An actor left its roster (death cleanup or wave turnover).
    ActorRemoved {
        /// The removed actor.
        actor: ActorId,
    },
    /// A new round begins.
    RoundStart {
        /// 1-based round number.
        round: u32,
    },
    /// A round finished, either normally or cut short by the battle ending.
    RoundEnd {
        /// 1-based round number.
        round: u32,
    },
    /// An actor begins executing its script.
    ActorActionsStart {
        /// The acting actor.
        actor: ActorId,
    },
    /// An actor finished executing its script.
    ActorActionsEnd {
        /// The acting actor.
        actor: ActorId,
    },
    /// An actor chose a target.
    TargetSelected {
        /// The choosing actor.
        actor: ActorId,
        /// The chosen target.
        target: ActorId,
    },
    /// An attack is about to resolve.
    AttackStart {
        /// The attacking actor.
        attacker: ActorId,
        /// The defending actor.
        defender: ActorId,
    },
    /// An attack has resolved.
    AttackEnd {
        /// The attacking actor.
        attacker: ActorId,
        /// The defending actor.
        defender: ActorId,
    },
    /// An actor's health changed. Fired after the change is applied.
    ActorHealthChange {
        /// The affected actor.
        actor: ActorId,
        /// Health before the change.
        old_health: u32,
        /// Health after the change.
        new_health: u32,
    },
    /// An actor's health reached zero.
    Death {
        /// The dead actor.
        actor: ActorId,
    },
    /// The battle reached a terminal state.
    BattleEnded {
        /// Final state.
        progress: Progress,
        /// Rounds played, including the final partial round.
        rounds: u32,
    },
    /// A campaign wave was spawned.
    WaveStart {
        /// 1-based wave number.
        wave: u32,
        /// Whether this is a boss wave.
        boss: bool,
    },
}

impl fmt::Display for BattleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActorAdded { actor } => write!(
                f,
                "{}#{} joins the {}s ({}/{})",
                actor.name, actor.id, actor.alignment, actor.health, actor.base_health
            ),
            Self::ActorRemoved { actor } => write!(f, "#{actor} removed"),
            Self::RoundStart { round } => write!(f, "round {round} starts"),
            Self::RoundEnd { round } => write!(f, "round {round} ends"),
            Self::ActorActionsStart { actor } => write!(f, "#{actor} starts"),
            Self::ActorActionsEnd { actor } => write!(f, "#{actor} ends"),
            Self::TargetSelected { actor, target } => write!(f, "#{actor} targets #{target}"),
            Self::AttackStart { attacker, defender } => {
                write!(f, "#{attacker} attacks #{defender}")
            }
            Self::AttackEnd { attacker, defender } => {
                write!(f, "#{attacker} finished attacking #{defender}")
            }
            Self::ActorHealthChange {
                actor,
                old_health,
                new_health,
            } => write!(f, "#{actor} health {old_health} => {new_health}"),
            Self::Death { actor } => write!(f, "RIP #{actor}"),
            Self::BattleEnded { progress, rounds } => {
                write!(f, "battle ended with {progress:?} after {rounds} rounds")
            }
            Self::WaveStart { wave, boss } => {
                if *boss {
                    write!(f, "wave {wave} (boss)")
                } else {
                    write!(f, "wave {wave}")
                }
            }
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&BattleEvent)>;

/// Synchronous publish/subscribe channel for [`BattleEvent`]s.
///
/// Owned by a battle (and carried across waves by a campaign). Handlers are
/// invoked in subscription order and are dropped together with the bus, so
/// no handler can outlive the battle it observes.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(SubscriptionId, Handler)>,
    next_id: u64,
}

impl EventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handler. It sees every event published from now on.
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&BattleEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Detach a handler. Returns `false` if it was not attached.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub, _)| *sub != id);
        self.handlers.len() != before
    }

    /// Detach every handler.
    pub fn release_all(&mut self) {
        self.handlers.clear();
    }

    /// Number of attached handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver an event to every handler, in subscription order.
    pub fn publish(&mut self, event: &BattleEvent) {
        tracing::trace!(%event, "publish");
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

/// Recorder that keeps every event it receives.
///
/// Cloning an `EventLog` yields another handle onto the same record.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<BattleEvent>>>,
}

impl EventLog {
    /// Create an empty, unattached log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log and subscribe it to `bus`.
    pub fn attach(bus: &mut EventBus) -> (Self, SubscriptionId) {
        let log = Self::new();
        let sink = Rc::clone(&log.events);
        let id = bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        (log, id)
    }

    /// Copy of every recorded event, in publication order.
    #[must_use]
    pub fn events(&self) -> Vec<BattleEvent> {
        self.events.borrow().clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Remove and return every recorded event.
    pub fn take(&self) -> Vec<BattleEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Binary encoding of the recorded sequence, for byte-level comparison
    /// between runs.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(&*self.events.borrow())
            .map_err(|e| CombatError::Serialization(format!("Failed to encode event log: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_handlers_in_order() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&seen);
        bus.subscribe(move |_| first.borrow_mut().push("first"));
        let second = Rc::clone(&seen);
        bus.subscribe(move |_| second.borrow_mut().push("second"));

        bus.publish(&BattleEvent::RoundStart { round: 1 });
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let (log, id) = EventLog::attach(&mut bus);

        bus.publish(&BattleEvent::RoundStart { round: 1 });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&BattleEvent::RoundStart { round: 2 });

        assert_eq!(log.events(), vec![BattleEvent::RoundStart { round: 1 }]);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_release_all() {
        let mut bus = EventBus::new();
        let (log_a, _) = EventLog::attach(&mut bus);
        let (log_b, _) = EventLog::attach(&mut bus);
        assert_eq!(bus.len(), 2);

        bus.release_all();
        bus.publish(&BattleEvent::Death { actor: 4 });

        assert!(log_a.is_empty());
        assert!(log_b.is_empty());
    }

    #[test]
    fn test_log_take_drains() {
        let mut bus = EventBus::new();
        let (log, _) = EventLog::attach(&mut bus);
        bus.publish(&BattleEvent::Death { actor: 1 });

        assert_eq!(log.take().len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_encode_is_stable() {
        let mut bus = EventBus::new();
        let (log, _) = EventLog::attach(&mut bus);
        bus.publish(&BattleEvent::ActorHealthChange {
            actor: 2,
            old_health: 20,
            new_health: 0,
        });
        bus.publish(&BattleEvent::Death { actor: 2 });

        let first = log.encode().unwrap();
        let second = log.encode().unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_display_reads_like_a_log_line() {
        let event = BattleEvent::ActorHealthChange {
            actor: 3,
            old_health: 20,
            new_health: 15,
        };
        assert_eq!(event.to_string(), "#3 health 20 => 15");
        assert_eq!(BattleEvent::Death { actor: 3 }.to_string(), "RIP #3");
    }
}
