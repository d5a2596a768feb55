//! Wave generation and the campaign loop.
//!
//! A campaign keeps one player party alive across successive waves of
//! mobs. Each wave is generated from weighted templates; every
//! `boss_every`-th wave is a single boss instead of a normal batch. Mob
//! stats grow with the wave number using fixed-point multipliers so that
//! the scaling is reproducible.
//!
//! The campaign runs until the mobs win (or a wave cap is reached):
//!
//! ```text
//! loop:
//!     spawn wave → play rounds → cleared? next wave : stop
//! ```
//!
//! All template picks draw from the battle's RNG, so a campaign is fully
//! determined by its seed, party and [`WaveConfig`].

use serde::{Deserialize, Serialize};

use crate::actor::{ActorSpawnParams, Alignment, Weapon};
use crate::battle::{Battle, Progress};
use crate::error::{CombatError, Result};
use crate::events::{BattleEvent, EventBus};
use crate::math::{fixed_serde, growth_multiplier, scale_stat, Fixed};
use crate::rng::BattleRng;

fn default_weight() -> u32 {
    1
}

/// A kind of mob a wave can contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobTemplate {
    /// Base display name.
    pub name: String,
    /// Health at wave 1.
    pub base_health: u32,
    /// Weapon at wave 1.
    pub weapon: Weapon,
    /// Relative pick weight.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl MobTemplate {
    /// Create a template with weight 1.
    #[must_use]
    pub fn new(name: impl Into<String>, base_health: u32, weapon: Weapon) -> Self {
        Self {
            name: name.into(),
            base_health,
            weapon,
            weight: 1,
        }
    }

    /// Set the pick weight.
    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Wave generation and pacing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Mobs per normal wave.
    pub batch_size: u32,
    /// Every Nth wave is a boss wave. 0 disables bosses.
    pub boss_every: u32,
    /// Templates for normal waves.
    pub templates: Vec<MobTemplate>,
    /// Templates for boss waves.
    #[serde(default)]
    pub bosses: Vec<MobTemplate>,
    /// Health growth per wave after the first (0.25 = +25% per wave).
    #[serde(with = "fixed_serde", default)]
    pub health_growth_per_wave: Fixed,
    /// Damage growth per wave after the first.
    #[serde(with = "fixed_serde", default)]
    pub damage_growth_per_wave: Fixed,
    /// Rounds a wave may last before it is declared stalled.
    pub max_rounds_per_wave: u32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            boss_every: 5,
            templates: vec![
                MobTemplate::new("ghoul", 18, Weapon::new("claws", 6)).with_weight(3),
                MobTemplate::new("skeleton", 14, Weapon::new("rusty sword", 9)).with_weight(2),
                MobTemplate::new("wraith", 10, Weapon::new("chill touch", 14)),
            ],
            bosses: vec![MobTemplate::new(
                "crypt lord",
                120,
                Weapon::new("soul scythe", 24),
            )],
            health_growth_per_wave: Fixed::from_bits(1 << 30), // 0.25
            damage_growth_per_wave: Fixed::from_bits(1 << 29), // 0.125
            max_rounds_per_wave: 100,
        }
    }
}

impl WaveConfig {
    /// Parse a configuration from RON and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| CombatError::DataParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every wave this configuration can produce is well formed.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CombatError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_rounds_per_wave == 0 {
            return Err(CombatError::InvalidConfig(
                "max_rounds_per_wave must be at least 1".to_string(),
            ));
        }
        validate_templates("templates", &self.templates)?;
        if self.boss_every > 0 {
            validate_templates("bosses", &self.bosses)?;
        }
        Ok(())
    }

    /// Whether wave number `wave` (1-based) is a boss wave.
    #[must_use]
    pub const fn is_boss_wave(&self, wave: u32) -> bool {
        self.boss_every > 0 && wave > 0 && wave % self.boss_every == 0
    }
}

fn validate_templates(field: &str, templates: &[MobTemplate]) -> Result<()> {
    if templates.is_empty() {
        return Err(CombatError::InvalidConfig(format!("{field} must not be empty")));
    }
    if templates.iter().all(|t| t.weight == 0) {
        return Err(CombatError::InvalidConfig(format!(
            "{field} needs at least one template with non-zero weight"
        )));
    }
    if let Some(t) = templates.iter().find(|t| t.base_health == 0) {
        return Err(CombatError::InvalidConfig(format!(
            "{field}: template '{}' has zero health",
            t.name
        )));
    }
    Ok(())
}

/// The mobs for one wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavePlan {
    /// 1-based wave number.
    pub wave: u32,
    /// Whether this is a boss wave.
    pub boss: bool,
    /// Mobs to spawn, in turn order.
    pub mobs: Vec<ActorSpawnParams>,
}

/// Produces successive [`WavePlan`]s.
#[derive(Debug, Clone)]
pub struct WaveGenerator {
    config: WaveConfig,
    wave: u32,
}

impl WaveGenerator {
    /// Create a generator. The first call to [`WaveGenerator::next_wave`]
    /// yields wave 1.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: WaveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, wave: 0 })
    }

    /// Number of the most recently generated wave (0 before the first).
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    /// Generate the next wave, drawing template picks from `rng`.
    pub fn next_wave(&mut self, rng: &mut BattleRng) -> WavePlan {
        self.wave += 1;
        let wave = self.wave;
        let boss = self.config.is_boss_wave(wave);

        let health = growth_multiplier(self.config.health_growth_per_wave, wave - 1);
        let damage = growth_multiplier(self.config.damage_growth_per_wave, wave - 1);

        let mobs = if boss {
            let template = pick(&self.config.bosses, rng);
            vec![scaled_mob(template, template.name.clone(), health, damage)]
        } else {
            (1..=self.config.batch_size)
                .map(|n| {
                    let template = pick(&self.config.templates, rng);
                    let name = format!("{} {n}", template.name);
                    scaled_mob(template, name, health, damage)
                })
                .collect()
        };

        tracing::debug!(wave, boss, mobs = mobs.len(), "Wave generated");
        WavePlan { wave, boss, mobs }
    }
}

fn pick<'a>(templates: &'a [MobTemplate], rng: &mut BattleRng) -> &'a MobTemplate {
    let weights: Vec<u32> = templates.iter().map(|t| t.weight).collect();
    &templates[rng.pick_weighted(&weights)]
}

fn scaled_mob(
    template: &MobTemplate,
    name: String,
    health: Fixed,
    damage: Fixed,
) -> ActorSpawnParams {
    let weapon = Weapon::new(
        template.weapon.name.clone(),
        scale_stat(template.weapon.damage, damage),
    );
    ActorSpawnParams::fighter(
        name,
        scale_stat(template.base_health, health).max(1),
        weapon,
        Alignment::Player,
    )
}

/// How a wave ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveOutcome {
    /// Every mob died.
    Cleared,
    /// Every player died.
    Defeated,
    /// The round limit was reached with both sides alive.
    Stalled,
}

/// Result of a campaign run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    /// Waves the party survived.
    pub waves_cleared: u32,
    /// Last wave spawned.
    pub final_wave: u32,
    /// How the last wave ended, if any wave was played.
    pub outcome: Option<WaveOutcome>,
    /// Rounds played across all waves.
    pub rounds: u32,
    /// Players still alive at the end.
    pub survivors: usize,
}

/// A player party fighting successive waves.
///
/// The current wave may be driven either with [`Campaign::run_wave`] or
/// stepwise through [`Campaign::battle_mut`]; its result is settled into
/// the campaign totals when the next wave is spawned.
#[derive(Debug)]
pub struct Campaign {
    battle: Battle,
    generator: WaveGenerator,
    /// Waves cleared before the current one.
    settled_cleared: u32,
    /// Rounds played before the current wave.
    settled_rounds: u32,
    /// The current wave hit its round limit.
    stalled: bool,
}

impl Campaign {
    /// Start a campaign: spawn the party into a fresh battle seeded with
    /// `seed`. No wave is spawned yet.
    pub fn new(seed: u64, party: Vec<ActorSpawnParams>, config: WaveConfig) -> Result<Self> {
        Self::with_bus(seed, EventBus::new(), party, config)
    }

    /// Like [`Campaign::new`] with observers already attached to `bus`, so
    /// they also see the party being spawned.
    pub fn with_bus(
        seed: u64,
        bus: EventBus,
        party: Vec<ActorSpawnParams>,
        config: WaveConfig,
    ) -> Result<Self> {
        let generator = WaveGenerator::new(config)?;
        let mut battle = Battle::with_bus(BattleRng::new(seed), bus);
        for member in party {
            battle.spawn_player(member)?;
        }
        Ok(Self {
            battle,
            generator,
            settled_cleared: 0,
            settled_rounds: 0,
            stalled: false,
        })
    }

    /// The battle hosting the current wave.
    #[must_use]
    pub fn battle(&self) -> &Battle {
        &self.battle
    }

    /// Mutable access to the current battle, for stepwise driving.
    pub fn battle_mut(&mut self) -> &mut Battle {
        &mut self.battle
    }

    /// The event bus shared by every wave.
    pub fn events_mut(&mut self) -> &mut EventBus {
        self.battle.events_mut()
    }

    /// Current wave number (0 before the first wave).
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.generator.wave()
    }

    /// Waves cleared so far, including the current one if it is won.
    #[must_use]
    pub fn waves_cleared(&self) -> u32 {
        self.settled_cleared + u32::from(self.current_cleared())
    }

    /// Rounds played across all waves so far.
    #[must_use]
    pub fn rounds(&self) -> u32 {
        self.settled_rounds + self.battle.round_count()
    }

    /// How the current wave ended, or `None` while it is still being
    /// fought (or before the first wave).
    #[must_use]
    pub fn outcome(&self) -> Option<WaveOutcome> {
        if self.wave() == 0 {
            return None;
        }
        match self.battle.progress() {
            Progress::PlayersWin => Some(WaveOutcome::Cleared),
            Progress::MobsWin => Some(WaveOutcome::Defeated),
            Progress::InProgress if self.stalled => Some(WaveOutcome::Stalled),
            Progress::InProgress => None,
        }
    }

    /// Whether the party has been wiped out.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.battle.progress() == Progress::MobsWin
    }

    fn current_cleared(&self) -> bool {
        self.wave() > 0 && self.battle.progress() == Progress::PlayersWin
    }

    /// Replace the mob roster with the next wave.
    ///
    /// Allowed between rounds even if the current wave is unfinished; its
    /// remaining mobs are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::RoundInProgress`] if the current battle is
    /// mid-round, or [`CombatError::BattleOver`] once the mobs have won.
    pub fn spawn_next_wave(&mut self) -> Result<WavePlan> {
        self.battle.ensure_between_rounds()?;
        if self.is_over() {
            return Err(CombatError::BattleOver(Progress::MobsWin));
        }

        // A battle that was played before wave 1 may already have ended.
        if self.wave() > 0 || self.battle.progress().is_terminal() {
            self.settled_cleared += u32::from(self.current_cleared());
            self.settled_rounds += self.battle.round_count();
            self.battle = std::mem::take(&mut self.battle).into_next_wave()?;
        }
        self.stalled = false;

        let plan = self.generator.next_wave(self.battle.rng_mut());
        self.battle.publish(BattleEvent::WaveStart {
            wave: plan.wave,
            boss: plan.boss,
        });
        for mob in &plan.mobs {
            self.battle.spawn_mob(mob.clone())?;
        }

        tracing::debug!(wave = plan.wave, boss = plan.boss, "Wave spawned");
        Ok(plan)
    }

    /// Play the current wave until it is cleared, the party falls, or the
    /// wave's round limit is hit.
    pub fn run_wave(&mut self) -> WaveOutcome {
        let limit = self.generator.config().max_rounds_per_wave;
        let remaining = limit.saturating_sub(self.battle.round_count());

        match self.battle.play_until_finished(remaining) {
            Progress::PlayersWin => WaveOutcome::Cleared,
            Progress::MobsWin => WaveOutcome::Defeated,
            Progress::InProgress => {
                tracing::warn!(
                    wave = self.wave(),
                    rounds = self.battle.round_count(),
                    "Wave stalled at round limit"
                );
                self.stalled = true;
                WaveOutcome::Stalled
            }
        }
    }

    /// Run waves until the party falls, a wave stalls, or `max_waves`
    /// waves have been spawned.
    pub fn run(&mut self, max_waves: u32) -> Result<CampaignSummary> {
        while self.wave() < max_waves && !self.is_over() {
            self.spawn_next_wave()?;
            if self.run_wave() != WaveOutcome::Cleared {
                break;
            }
        }
        Ok(self.summary())
    }

    /// Snapshot of the campaign so far.
    #[must_use]
    pub fn summary(&self) -> CampaignSummary {
        CampaignSummary {
            waves_cleared: self.waves_cleared(),
            final_wave: self.wave(),
            outcome: self.outcome(),
            rounds: self.rounds(),
            survivors: self
                .battle
                .players()
                .iter()
                .filter(|p| p.is_alive())
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;

    fn party() -> Vec<ActorSpawnParams> {
        vec![
            ActorSpawnParams::fighter("alice", 60, Weapon::new("axe", 22), Alignment::Mob),
            ActorSpawnParams::fighter("bob", 60, Weapon::new("ballista", 20), Alignment::Mob),
        ]
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(WaveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_boss_wave_schedule() {
        let config = WaveConfig::default();
        let bosses: Vec<u32> = (1..=15).filter(|&w| config.is_boss_wave(w)).collect();
        assert_eq!(bosses, vec![5, 10, 15]);

        let no_bosses = WaveConfig {
            boss_every: 0,
            ..WaveConfig::default()
        };
        assert!(!(1..=20).any(|w| no_bosses.is_boss_wave(w)));
    }

    #[test]
    fn test_generator_substitutes_single_boss() {
        let mut generator = WaveGenerator::new(WaveConfig::default()).unwrap();
        let mut rng = BattleRng::new(2112);

        for wave in 1..=15 {
            let plan = generator.next_wave(&mut rng);
            assert_eq!(plan.wave, wave);
            if wave % 5 == 0 {
                assert!(plan.boss);
                assert_eq!(plan.mobs.len(), 1);
                assert_eq!(plan.mobs[0].name, "crypt lord");
            } else {
                assert!(!plan.boss);
                assert_eq!(plan.mobs.len(), 3);
            }
        }
    }

    #[test]
    fn test_stats_scale_with_wave() {
        let config = WaveConfig {
            templates: vec![MobTemplate::new("ghoul", 20, Weapon::new("claws", 8))],
            boss_every: 0,
            batch_size: 1,
            ..WaveConfig::default()
        };
        let mut generator = WaveGenerator::new(config).unwrap();
        let mut rng = BattleRng::new(1);

        let first = generator.next_wave(&mut rng);
        let second = generator.next_wave(&mut rng);
        let third = generator.next_wave(&mut rng);

        assert_eq!(first.mobs[0].base_health, 20);
        assert_eq!(first.mobs[0].weapon.damage, 8);
        assert_eq!(second.mobs[0].base_health, 25);
        assert_eq!(second.mobs[0].weapon.damage, 9);
        assert_eq!(third.mobs[0].base_health, 30);
        assert_eq!(third.mobs[0].weapon.damage, 10);
    }

    #[test]
    fn test_mobs_target_players() {
        let mut generator = WaveGenerator::new(WaveConfig::default()).unwrap();
        let plan = generator.next_wave(&mut BattleRng::new(3));
        for mob in &plan.mobs {
            assert_eq!(mob.script, crate::action::Action::fighter_script(Alignment::Player));
        }
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let empty = WaveConfig {
            templates: Vec::new(),
            ..WaveConfig::default()
        };
        assert!(matches!(empty.validate(), Err(CombatError::InvalidConfig(_))));

        let weightless = WaveConfig {
            templates: vec![MobTemplate::new("ghoul", 10, Weapon::default()).with_weight(0)],
            ..WaveConfig::default()
        };
        assert!(weightless.validate().is_err());

        let bossless = WaveConfig {
            bosses: Vec::new(),
            ..WaveConfig::default()
        };
        assert!(WaveGenerator::new(bossless).is_err());
    }

    #[test]
    fn test_config_from_ron() {
        let ron = r#"(
            batch_size: 2,
            boss_every: 3,
            templates: [
                (name: "ghoul", base_health: 10, weapon: (name: "claws", damage: 3)),
            ],
            bosses: [
                (name: "lich", base_health: 80, weapon: (name: "staff", damage: 12), weight: 2),
            ],
            health_growth_per_wave: "0.5",
            max_rounds_per_wave: 50,
        )"#;
        let config = WaveConfig::from_ron_str(ron).unwrap();
        assert_eq!(config.templates[0].weight, 1);
        assert_eq!(config.bosses[0].weight, 2);
        assert_eq!(config.health_growth_per_wave, Fixed::from_num(0.5));
        assert_eq!(config.damage_growth_per_wave, Fixed::ZERO);
    }

    #[test]
    fn test_config_from_bad_ron() {
        assert!(matches!(
            WaveConfig::from_ron_str("(batch_size: \"three\")"),
            Err(CombatError::DataParse { .. })
        ));
    }

    #[test]
    fn test_campaign_spawns_waves_into_battle() {
        let mut campaign = Campaign::new(2112, party(), WaveConfig::default()).unwrap();
        assert_eq!(campaign.wave(), 0);
        assert_eq!(campaign.battle().players().len(), 2);

        let plan = campaign.spawn_next_wave().unwrap();
        assert_eq!(plan.wave, 1);
        assert_eq!(campaign.battle().mobs().len(), 3);
    }

    #[test]
    fn test_campaign_refuses_mid_round_wave() {
        let mut campaign = Campaign::new(2112, party(), WaveConfig::default()).unwrap();
        campaign.spawn_next_wave().unwrap();
        campaign.battle_mut().step().unwrap();
        assert!(matches!(
            campaign.spawn_next_wave(),
            Err(CombatError::RoundInProgress { round: 1 })
        ));
    }

    #[test]
    fn test_campaign_mobs_eventually_win() {
        let mut campaign = Campaign::new(7, party(), WaveConfig::default()).unwrap();
        let summary = campaign.run(1_000).unwrap();

        assert_eq!(summary.outcome, Some(WaveOutcome::Defeated));
        assert_eq!(summary.survivors, 0);
        assert_eq!(summary.waves_cleared + 1, summary.final_wave);
        assert!(campaign.is_over());
        assert!(matches!(
            campaign.spawn_next_wave(),
            Err(CombatError::BattleOver(Progress::MobsWin))
        ));
    }

    #[test]
    fn test_campaign_wave_cap() {
        let strong = vec![ActorSpawnParams::fighter(
            "minerva",
            1_000_000,
            Weapon::new("helishears", 1_000),
            Alignment::Mob,
        )];
        let mut campaign = Campaign::new(1, strong, WaveConfig::default()).unwrap();
        let summary = campaign.run(6).unwrap();

        assert_eq!(summary.final_wave, 6);
        assert_eq!(summary.waves_cleared, 6);
        assert_eq!(summary.outcome, Some(WaveOutcome::Cleared));
    }

    #[test]
    fn test_stalled_wave() {
        let harmless = vec![ActorSpawnParams::fighter(
            "leo",
            50,
            Weapon::new("long shiv", 0),
            Alignment::Mob,
        )];
        let config = WaveConfig {
            templates: vec![MobTemplate::new("ghoul", 10, Weapon::new("claws", 0))],
            damage_growth_per_wave: Fixed::ZERO,
            max_rounds_per_wave: 4,
            ..WaveConfig::default()
        };
        let mut campaign = Campaign::new(1, harmless, config).unwrap();
        let summary = campaign.run(10).unwrap();

        assert_eq!(summary.outcome, Some(WaveOutcome::Stalled));
        assert_eq!(summary.final_wave, 1);
        assert_eq!(summary.rounds, 4);
    }

    #[test]
    fn test_wave_start_event_precedes_spawns() {
        let mut bus = EventBus::new();
        let (log, _) = EventLog::attach(&mut bus);
        let mut campaign = Campaign::with_bus(3, bus, party(), WaveConfig::default()).unwrap();
        campaign.spawn_next_wave().unwrap();

        let events = log.events();
        let wave_start = events
            .iter()
            .position(|e| *e == BattleEvent::WaveStart { wave: 1, boss: false })
            .unwrap();
        let added: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, BattleEvent::ActorAdded { .. }))
            .map(|(i, _)| i)
            .collect();
        // Two party members before the wave, three mobs after it.
        assert_eq!(added.len(), 5);
        assert!(added[..2].iter().all(|&i| i < wave_start));
        assert!(added[2..].iter().all(|&i| i > wave_start));
    }

    #[test]
    fn test_wave_one_after_early_run_gets_fresh_battle() {
        let mut campaign = Campaign::new(1, party(), WaveConfig::default()).unwrap();
        // No mobs yet, so this ends the placeholder battle at once.
        assert_eq!(campaign.run_wave(), WaveOutcome::Cleared);
        assert_eq!(campaign.battle().progress(), Progress::PlayersWin);

        campaign.spawn_next_wave().unwrap();
        assert_eq!(campaign.battle().progress(), Progress::InProgress);
        assert_eq!(campaign.battle().mobs().len(), 3);
        assert_eq!(campaign.waves_cleared(), 0);
        assert_eq!(campaign.rounds(), 0);

        let outcome = campaign.run_wave();
        assert!(campaign.rounds() > 0);
        match outcome {
            WaveOutcome::Cleared => {
                assert!(campaign.battle().mobs().is_empty());
                assert_eq!(campaign.waves_cleared(), 1);
            }
            _ => assert_eq!(campaign.waves_cleared(), 0),
        }
    }

    #[test]
    fn test_stepwise_wave_is_settled_on_turnover() {
        let mut campaign = Campaign::new(11, party(), WaveConfig::default()).unwrap();
        campaign.spawn_next_wave().unwrap();
        assert_eq!(campaign.outcome(), None);

        while campaign.battle_mut().step().is_some() {}
        let rounds = campaign.rounds();
        assert!(rounds > 0);

        if campaign.outcome() == Some(WaveOutcome::Cleared) {
            assert_eq!(campaign.waves_cleared(), 1);
            campaign.spawn_next_wave().unwrap();
            assert_eq!(campaign.waves_cleared(), 1);
            assert_eq!(campaign.rounds(), rounds);
            assert_eq!(campaign.outcome(), None);
        } else {
            assert_eq!(campaign.outcome(), Some(WaveOutcome::Defeated));
            assert_eq!(campaign.waves_cleared(), 0);
        }
    }
}
