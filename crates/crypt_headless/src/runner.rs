//! Headless campaign runner implementation.
//!
//! The runner owns one [`Campaign`] and an [`EventLog`] attached to its
//! bus. Each command is applied synchronously and answered with the events
//! it produced, so a controller sees exactly what an observer on the bus
//! would see.

use std::io::{self, BufRead, Write};

use crypt_core::prelude::*;
use std::result::Result;

use crate::protocol::{Command, Response, StateSnapshot};
use crate::scenario::{Scenario, ScenarioError};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output a state snapshot after every advancing command.
    pub auto_state_output: bool,
}

/// Headless runner for scripted campaign play.
pub struct HeadlessRunner {
    config: HeadlessConfig,
    scenario: String,
    seed: u64,
    campaign: Campaign,
    log: EventLog,
    game_over_sent: bool,
}

impl HeadlessRunner {
    /// Create a runner for `scenario` with default config. Wave 1 is
    /// spawned immediately.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        Self::with_config(scenario, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    pub fn with_config(
        scenario: &Scenario,
        config: HeadlessConfig,
    ) -> Result<Self, ScenarioError> {
        let mut bus = EventBus::new();
        let (log, _) = EventLog::attach(&mut bus);
        let mut campaign = scenario.campaign_with_bus(bus)?;
        campaign.spawn_next_wave()?;

        Ok(Self {
            config,
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            campaign,
            log,
            game_over_sent: false,
        })
    }

    /// The campaign being driven.
    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    /// The greeting sent before any command is read.
    pub fn ready(&self) -> Response {
        Response::ready(&self.scenario, self.seed, self.campaign.wave())
    }

    /// Apply one command and return the responses to send, in order.
    pub fn handle(&mut self, cmd: &Command) -> Vec<Response> {
        let name = cmd.name();
        let advanced = match cmd {
            Command::Step => {
                if self.campaign.battle_mut().step().is_none() {
                    return vec![self.finished_error(name)];
                }
                true
            }
            Command::Round => {
                if self.campaign.battle().progress().is_terminal() {
                    return vec![self.finished_error(name)];
                }
                self.campaign.battle_mut().play_round();
                true
            }
            Command::Run { max_rounds } => {
                if self.campaign.battle().progress().is_terminal() {
                    return vec![self.finished_error(name)];
                }
                self.campaign.battle_mut().play_until_finished(*max_rounds);
                true
            }
            Command::NextWave => match self.campaign.spawn_next_wave() {
                Ok(plan) => {
                    tracing::info!(wave = plan.wave, boss = plan.boss, "Next wave");
                    true
                }
                Err(err) => return vec![Response::error(err.to_string(), Some(name))],
            },
            Command::Query => {
                return vec![Response::State(StateSnapshot::capture(&self.campaign))];
            }
            Command::Hash => {
                let battle = self.campaign.battle();
                return vec![Response::StateHash {
                    wave: self.campaign.wave(),
                    round: battle.round_count(),
                    hash: battle.state_hash(),
                }];
            }
            Command::Quit => return vec![Response::Bye],
        };

        let mut responses = Vec::new();
        if advanced {
            let battle = self.campaign.battle();
            responses.push(Response::Events {
                wave: self.campaign.wave(),
                round: battle.round_count(),
                progress: battle.progress(),
                events: self.log.take(),
            });
            if self.config.auto_state_output {
                responses.push(Response::State(StateSnapshot::capture(&self.campaign)));
            }
        }
        if self.campaign.is_over() && !self.game_over_sent {
            self.game_over_sent = true;
            let summary = self.campaign.summary();
            tracing::info!(
                waves_cleared = summary.waves_cleared,
                rounds = summary.rounds,
                "Party defeated"
            );
            responses.push(Response::GameOver { summary });
        }
        responses
    }

    /// Run the command loop: read JSON lines from `input` until `quit` or
    /// end of input, writing responses to `output`.
    pub fn run<R: BufRead, W: Write>(mut self, input: R, mut output: W) -> io::Result<()> {
        // Spawning wave 1 already produced events; start the session clean.
        self.log.take();
        write_response(&mut output, &self.ready())?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let cmd = match Command::from_json(line) {
                Ok(cmd) => cmd,
                Err(e) => {
                    let error = Response::error(format!("Parse error: {e}"), None);
                    write_response(&mut output, &error)?;
                    continue;
                }
            };
            tracing::debug!(cmd = cmd.name(), "Command received");

            for response in self.handle(&cmd) {
                write_response(&mut output, &response)?;
            }
            if cmd == Command::Quit {
                tracing::info!("Session closed");
                return Ok(());
            }
        }

        tracing::info!("Input closed");
        Ok(())
    }

    fn finished_error(&self, cmd: &str) -> Response {
        let progress = self.campaign.battle().progress();
        let hint = if self.campaign.is_over() {
            "the campaign is over"
        } else {
            "send next_wave to continue"
        };
        Response::error(format!("wave already ended with {progress:?}; {hint}"), Some(cmd))
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}
