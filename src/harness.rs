// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Drives a whole simulation run.
//!
//! [`Simulation`] validates the configuration, sets up the selected
//! [`Protocol`] and runs it to completion over a fresh [`MessageBus`].
//! The rounds themselves are executed by a [`RoundDriver`], which is shared
//! by all protocols.

use std::time::Instant;

use log::{info, trace, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::chain_growth::ChainGrowth;
use crate::config::{ConfigError, Mode, RunBudget, SimulationConfig};
use crate::dolev_strong::DolevStrong;
use crate::network::{BusError, MessageBus, Outgoing};
use crate::protocol::{ProtocolError, ProtocolNode};
use crate::report::{ChainGrowthReport, ConsensusReport};
use crate::Round;

/// Reasons for a run to end without a report.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("round {round} exceeds the budget of {max_rounds} rounds")]
    RoundBudgetExceeded { max_rounds: u64, round: Round },
    #[error("time limit of {limit_ms} ms exceeded after round {round}")]
    DeadlineExceeded { limit_ms: u64, round: Round },
}

/// Executes rounds for a set of protocol nodes over one bus.
pub struct RoundDriver<M> {
    bus: MessageBus<M>,
    budget: RunBudget,
    parallel: bool,
    started: Instant,
}

impl<M: Clone + Send + Sync> RoundDriver<M> {
    /// Creates a driver with an empty bus. The time budget starts now.
    #[must_use]
    pub fn new(num_processes: u64, budget: RunBudget, parallel: bool) -> Self {
        Self {
            bus: MessageBus::new(num_processes),
            budget,
            parallel,
            started: Instant::now(),
        }
    }

    #[must_use]
    pub const fn bus(&self) -> &MessageBus<M> {
        &self.bus
    }

    /// Executes `round` for all `nodes`.
    ///
    /// Every node first receives its inbox, then all nodes step, and only
    /// afterwards their messages are posted in node order. Stepping in
    /// parallel thus yields exactly the same bus contents.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if a budget is exceeded, a node reports
    /// an invariant violation, or the bus is misused.
    pub fn run_round<N>(&mut self, round: Round, nodes: &mut [N]) -> Result<(), SimulationError>
    where
        N: ProtocolNode<Message = M>,
    {
        if let Some(max_rounds) = self.budget.max_rounds {
            if round > max_rounds {
                return Err(SimulationError::RoundBudgetExceeded { max_rounds, round });
            }
        }

        let inboxes = nodes
            .iter()
            .map(|node| self.bus.deliver(round, node.id()))
            .collect::<Result<Vec<_>, _>>()?;
        let outboxes: Vec<Vec<Outgoing<M>>> = if self.parallel {
            nodes
                .par_iter_mut()
                .zip(inboxes.into_par_iter())
                .map(|(node, inbox)| node.step(round, inbox))
                .collect::<Result<_, _>>()?
        } else {
            nodes
                .iter_mut()
                .zip(inboxes)
                .map(|(node, inbox)| node.step(round, inbox))
                .collect::<Result<_, _>>()?
        };
        for (node, outbox) in nodes.iter().zip(outboxes) {
            for msg in outbox {
                self.bus.post(round, node.id(), msg)?;
            }
        }
        trace!("round {round}: {} messages sent", self.bus.sent_in(round));

        if let Some(limit) = self.budget.time_limit() {
            if self.started.elapsed() >= limit {
                return Err(SimulationError::DeadlineExceeded {
                    limit_ms: limit.as_millis() as u64,
                    round,
                });
            }
        }
        Ok(())
    }

    /// Hands the messages of the final round to all `nodes`.
    ///
    /// `round` is one past the last executed round.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if a node reports an invariant violation.
    pub fn finish<N>(&mut self, round: Round, nodes: &mut [N]) -> Result<(), SimulationError>
    where
        N: ProtocolNode<Message = M>,
    {
        for node in nodes.iter_mut() {
            let inbox = self.bus.deliver(round, node.id())?;
            node.finish(round, inbox)?;
        }
        Ok(())
    }
}

/// Protocol variant of a run, selected from the configured [`Mode`].
pub enum Protocol {
    ChainGrowth(ChainGrowth),
    DolevStrong(DolevStrong),
    NoOp,
}

/// A validated simulation, ready to run.
pub struct Simulation {
    config: SimulationConfig,
    protocol: Protocol,
}

impl Simulation {
    /// Validates `config` and sets up the initial state of every process.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] if the configuration is invalid and
    /// [`SimulationError::RoundBudgetExceeded`] if the configured rounds can
    /// never fit the round budget.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        if let Some(max_rounds) = config.budget.max_rounds {
            if config.mode != Mode::NoOp && config.num_rounds() > max_rounds {
                return Err(SimulationError::RoundBudgetExceeded {
                    max_rounds,
                    round: max_rounds + 1,
                });
            }
        }
        let protocol = match config.mode {
            Mode::ChainGrowth => Protocol::ChainGrowth(ChainGrowth::new(&config)?),
            Mode::DolevStrong => Protocol::DolevStrong(DolevStrong::new(&config)),
            Mode::NoOp => Protocol::NoOp,
        };
        Ok(Self { config, protocol })
    }

    /// Runs all rounds and returns the final report.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if the run is aborted.
    pub fn run(self) -> Result<ConsensusReport, SimulationError> {
        let config = &self.config;
        info!(
            "running {} with {} processes ({} faulty) for {} rounds",
            config.mode,
            config.processes,
            config.faults.len(),
            config.num_rounds()
        );
        let result = match self.protocol {
            Protocol::ChainGrowth(protocol) => {
                let mut driver = RoundDriver::new(config.processes, config.budget, config.parallel);
                protocol.run(&mut driver).map(ConsensusReport::from)
            }
            Protocol::DolevStrong(protocol) => {
                let mut driver = RoundDriver::new(config.processes, config.budget, config.parallel);
                protocol.run(&mut driver).map(ConsensusReport::from)
            }
            Protocol::NoOp => Ok(ChainGrowthReport::empty().into()),
        };
        if let Err(err) = &result {
            warn!("simulation aborted: {err}");
        }
        result
    }
}

/// Runs the simulation described by `config` to completion.
///
/// The result only depends on `config`: equal configurations give equal reports.
///
/// # Errors
///
/// Returns [`SimulationError`] if the configuration is invalid or the run is aborted.
pub fn run_consensus(config: &SimulationConfig) -> Result<ConsensusReport, SimulationError> {
    Simulation::new(config.clone())?.run()
}
