//! Combat participants.
//!
//! An [`Actor`] is a passive data holder: identity, vitals, equipment and
//! an ordered action script. All behaviour lives in [`crate::action`] and
//! is driven by the battle scheduler.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Unique identifier for an actor, assigned by the owning battle at spawn.
pub type ActorId = u32;

/// Which side an actor fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Alignment {
    /// Member of the player party.
    Player,
    /// Member of the mob roster.
    Mob,
}

impl Alignment {
    /// The side this alignment fights against.
    #[must_use]
    pub const fn opposing(self) -> Self {
        match self {
            Self::Player => Self::Mob,
            Self::Mob => Self::Player,
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Mob => write!(f, "mob"),
        }
    }
}

/// An equipped weapon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Weapon {
    /// Display name.
    pub name: String,
    /// Damage dealt per attack.
    pub damage: u32,
}

impl Weapon {
    /// Create a weapon.
    #[must_use]
    pub fn new(name: impl Into<String>, damage: u32) -> Self {
        Self {
            name: name.into(),
            damage,
        }
    }
}

impl Default for Weapon {
    fn default() -> Self {
        Self::new("fists", 1)
    }
}

/// Health of an actor.
///
/// `max` is fixed at creation; `current` stays within `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health at full.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if the actor is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction to prevent underflow.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current = self.current.saturating_sub(actual);
        actual
    }
}

/// Transient per-turn attributes read and written by actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnState {
    /// Current target. Stored as an ID and re-validated on every read,
    /// since the referenced actor may have died or been removed.
    pub target: Option<ActorId>,
}

/// Parameters for spawning a new actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSpawnParams {
    /// Display name.
    pub name: String,
    /// Maximum health; the actor starts at full health.
    pub base_health: u32,
    /// Equipped weapon.
    #[serde(default)]
    pub weapon: Weapon,
    /// Actions executed in order every turn.
    #[serde(default)]
    pub script: Vec<Action>,
}

impl ActorSpawnParams {
    /// Create spawn parameters with an empty script.
    #[must_use]
    pub fn new(name: impl Into<String>, base_health: u32, weapon: Weapon) -> Self {
        Self {
            name: name.into(),
            base_health,
            weapon,
            script: Vec::new(),
        }
    }

    /// Spawn parameters with the standard "pick a random enemy, hit it"
    /// script against the given side.
    #[must_use]
    pub fn fighter(
        name: impl Into<String>,
        base_health: u32,
        weapon: Weapon,
        targets: Alignment,
    ) -> Self {
        Self::new(name, base_health, weapon).with_script(Action::fighter_script(targets))
    }

    /// Replace the action script.
    #[must_use]
    pub fn with_script(mut self, script: Vec<Action>) -> Self {
        self.script = script;
        self
    }

    /// Append one action to the script.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.script.push(action);
        self
    }
}

/// A combat participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    id: ActorId,
    name: String,
    alignment: Alignment,
    health: Health,
    weapon: Weapon,
    script: Vec<Action>,
    state: TurnState,
}

impl Actor {
    pub(crate) fn spawn(id: ActorId, alignment: Alignment, params: ActorSpawnParams) -> Self {
        Self {
            id,
            name: params.name,
            alignment,
            health: Health::new(params.base_health),
            weapon: params.weapon,
            script: params.script,
            state: TurnState::default(),
        }
    }

    /// Stable identifier.
    #[must_use]
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Display name. Not unique; see [`Actor::unique_name`].
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name disambiguated by ID, e.g. `alice#1`.
    #[must_use]
    pub fn unique_name(&self) -> String {
        format!("{}#{}", self.name, self.id)
    }

    /// Side this actor fights for.
    #[must_use]
    pub const fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Maximum health, fixed at creation.
    #[must_use]
    pub const fn base_health(&self) -> u32 {
        self.health.max
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health.current
    }

    /// Full health component.
    #[must_use]
    pub const fn vitals(&self) -> Health {
        self.health
    }

    /// Whether the actor still has health left.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// Equipped weapon.
    #[must_use]
    pub fn weapon(&self) -> &Weapon {
        &self.weapon
    }

    /// The action script.
    #[must_use]
    pub fn script(&self) -> &[Action] {
        &self.script
    }

    /// Last chosen target, which may no longer be alive.
    #[must_use]
    pub const fn target(&self) -> Option<ActorId> {
        self.state.target
    }

    /// Transient per-turn attributes.
    #[must_use]
    pub const fn turn_state(&self) -> &TurnState {
        &self.state
    }

    pub(crate) fn set_weapon(&mut self, weapon: Weapon) {
        self.weapon = weapon;
    }

    pub(crate) fn set_target(&mut self, target: Option<ActorId>) {
        self.state.target = target;
    }

    /// Apply damage and return `(old, new)` health.
    pub(crate) fn take_damage(&mut self, amount: u32) -> (u32, u32) {
        let old = self.health.current;
        self.health.apply_damage(amount);
        (old, self.health.current)
    }

    /// Copy of the public read surface.
    #[must_use]
    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id,
            name: self.name.clone(),
            alignment: self.alignment,
            base_health: self.health.max,
            health: self.health.current,
            weapon: self.weapon.clone(),
            target: self.state.target,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {}/{} [{} {}]",
            self.unique_name(),
            self.alignment,
            self.health.current,
            self.health.max,
            self.weapon.name,
            self.weapon.damage
        )
    }
}

/// Immutable copy of an actor's read surface, carried by events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorSnapshot {
    /// Stable identifier.
    pub id: ActorId,
    /// Display name.
    pub name: String,
    /// Side.
    pub alignment: Alignment,
    /// Maximum health.
    pub base_health: u32,
    /// Current health.
    pub health: u32,
    /// Equipped weapon.
    pub weapon: Weapon,
    /// Current target, if any.
    pub target: Option<ActorId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Actor {
        Actor::spawn(
            1,
            Alignment::Player,
            ActorSpawnParams::fighter("alice", 20, Weapon::new("axe", 22), Alignment::Mob),
        )
    }

    #[test]
    fn test_opposing_alignment() {
        assert_eq!(Alignment::Player.opposing(), Alignment::Mob);
        assert_eq!(Alignment::Mob.opposing(), Alignment::Player);
    }

    #[test]
    fn test_spawn_starts_at_full_health() {
        let actor = alice();
        assert_eq!(actor.health(), 20);
        assert_eq!(actor.base_health(), 20);
        assert!(actor.is_alive());
        assert_eq!(actor.target(), None);
        assert_eq!(actor.script().len(), 2);
    }

    #[test]
    fn test_take_damage_floors_at_zero() {
        let mut actor = alice();
        assert_eq!(actor.take_damage(5), (20, 15));
        assert_eq!(actor.take_damage(50), (15, 0));
        assert!(!actor.is_alive());
        assert_eq!(actor.take_damage(3), (0, 0));
    }

    #[test]
    fn test_health_reports_damage_actually_dealt() {
        let mut health = Health::new(10);
        assert_eq!(health.apply_damage(4), 4);
        assert_eq!(health.apply_damage(100), 6);
        assert!(health.is_dead());
        assert_eq!(health.max, 10);
    }

    #[test]
    fn test_unique_name_includes_id() {
        assert_eq!(alice().unique_name(), "alice#1");
    }

    #[test]
    fn test_snapshot_mirrors_read_surface() {
        let mut actor = alice();
        actor.set_target(Some(3));
        actor.set_weapon(Weapon::new("gun knife", 30));
        let snap = actor.snapshot();
        assert_eq!(snap.id, 1);
        assert_eq!(snap.alignment, Alignment::Player);
        assert_eq!(snap.weapon.damage, 30);
        assert_eq!(snap.target, Some(3));
    }
}
