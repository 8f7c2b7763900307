// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Chain growth under the longest-chain rule.
//!
//! Every process holds an adopted [`Chain`] rooted at the shared genesis block.
//! Each round runs through these steps:
//! - `ROUND_START`: the bus hands out the previous round's proposals.
//! - `EXTEND`: every process adopts the longest valid chain among its current
//!   one and the received proposals. Ties keep the current chain.
//! - `PROPOSE`: the round's proposer (see [`ProposerSchedule`]) broadcasts its
//!   adopted chain extended by one block.
//! - `ROUND_END`: the harness records the chain length of the reference process.
//!
//! Since proposals only become visible at the next round boundary, the
//! `EXTEND` for round `r`'s proposals happens at the start of round `r + 1`,
//! before that round's proposal. Without faults the reference chain therefore
//! has length `r` after round `r`.

mod block;
mod chain;
mod schedule;

use std::sync::Arc;

use log::{debug, info, trace};

pub use self::block::{Block, BlockHash};
pub use self::chain::{Chain, ChainError};
pub use self::schedule::ProposerSchedule;
use crate::config::{ConfigError, FaultBehavior, SimulationConfig};
use crate::harness::{RoundDriver, SimulationError};
use crate::network::{Delivery, Outgoing};
use crate::process::{Process, processes_from_config};
use crate::protocol::{ProtocolError, ProtocolNode};
use crate::report::ChainGrowthReport;
use crate::{ProcessId, Round};

/// A proposed chain, as sent over the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub round: Round,
    pub chain: Arc<Chain>,
}

/// Log entry an honest proposer appends in the given round.
#[must_use]
pub fn entry_for_round(round: Round) -> String {
    format!("tx round {round}")
}

/// Chain-growth state of a single process.
pub struct ChainGrowthNode {
    process: Process,
    num_processes: u64,
    chain: Arc<Chain>,
    schedule: Arc<ProposerSchedule>,
}

impl ChainGrowthNode {
    /// Creates a node whose adopted chain is just genesis.
    #[must_use]
    pub fn new(process: Process, num_processes: u64, schedule: Arc<ProposerSchedule>) -> Self {
        Self {
            process,
            num_processes,
            chain: Arc::new(Chain::genesis()),
            schedule,
        }
    }

    /// Returns the currently adopted chain.
    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    #[must_use]
    pub const fn process(&self) -> &Process {
        &self.process
    }

    fn extend(&mut self, inbox: Vec<Delivery<Proposal>>) {
        for Delivery { sender, payload } in inbox {
            if let Err(err) = payload.chain.validate() {
                debug!(
                    "process {} rejected proposal of process {sender} from round {}: {err}",
                    self.process.id, payload.round
                );
                continue;
            }
            // strictly longer only, ties keep the current chain
            if payload.chain.len() > self.chain.len() {
                trace!(
                    "process {} adopts chain of length {} from process {sender}",
                    self.process.id,
                    payload.chain.len()
                );
                self.chain = payload.chain;
            }
        }
    }

    fn propose(&self, round: Round) -> Vec<Outgoing<Proposal>> {
        let id = self.process.id;
        if self.schedule.proposer(round) != id {
            return Vec::new();
        }
        let entry = entry_for_round(round);
        let proposal = |chain: Chain| Proposal {
            round,
            chain: Arc::new(chain),
        };
        match self.process.fault() {
            None => {
                let chain = self.chain.extended(round, id, entry);
                vec![Outgoing::to_all(proposal(chain))]
            }
            Some(FaultBehavior::Silent) => Vec::new(),
            Some(FaultBehavior::Equivocate) => {
                let forks = [0, 1].map(|fork| {
                    let chain = self.chain.extended(round, id, format!("{entry} fork {fork}"));
                    proposal(chain)
                });
                (0..self.num_processes)
                    .map(|to| Outgoing::to_one(to, forks[(to % 2) as usize].clone()))
                    .collect()
            }
            Some(FaultBehavior::Forge) => {
                let mut chain = self.chain.extended(round, id, entry);
                let height = chain.tip().height() + 1;
                let unlinked = Block::from_parts(
                    height,
                    *Block::genesis().hash(),
                    round,
                    Some(id),
                    format!("{} forged", entry_for_round(round)),
                );
                chain.push_unchecked(unlinked);
                vec![Outgoing::to_all(proposal(chain))]
            }
        }
    }
}

impl ProtocolNode for ChainGrowthNode {
    type Message = Proposal;

    fn id(&self) -> ProcessId {
        self.process.id
    }

    fn step(
        &mut self,
        round: Round,
        inbox: Vec<Delivery<Proposal>>,
    ) -> Result<Vec<Outgoing<Proposal>>, ProtocolError> {
        self.extend(inbox);
        Ok(self.propose(round))
    }
}

/// Chain-growth run over all processes of a configuration.
pub struct ChainGrowth {
    nodes: Vec<ChainGrowthNode>,
    reference: ProcessId,
    rounds: u64,
}

impl ChainGrowth {
    /// Registers the initial state of every process.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHonestProcess`] if there is no process to report on.
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        let reference = config
            .reference_process()
            .ok_or(ConfigError::NoHonestProcess)?;
        let rounds = config.num_rounds();
        let schedule = Arc::new(ProposerSchedule::new(config.proposer, config.processes));
        let nodes = processes_from_config(config)
            .into_iter()
            .map(|p| ChainGrowthNode::new(p, config.processes, schedule.clone()))
            .collect();
        Ok(Self {
            nodes,
            reference,
            rounds,
        })
    }

    /// Runs all rounds and reports the reference process's chain.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if the run exceeds its budget or the
    /// reference chain ever shrinks.
    pub fn run(
        mut self,
        driver: &mut RoundDriver<Proposal>,
    ) -> Result<ChainGrowthReport, SimulationError> {
        let mut lengths: Vec<usize> = Vec::new();
        for round in 1..=self.rounds {
            driver.run_round(round, &mut self.nodes)?;
            let length = self.reference_chain().len();
            if let Some(&previous) = lengths.last() {
                if length < previous {
                    return Err(ProtocolError::ChainShrank {
                        process: self.reference,
                        from: previous,
                        to: length,
                    }
                    .into());
                }
            }
            lengths.push(length);
        }
        let log = self.reference_chain().log();
        info!(
            "chain growth finished after {} rounds with {} entries",
            self.rounds,
            log.len()
        );
        Ok(ChainGrowthReport::new(lengths, log))
    }

    fn reference_chain(&self) -> &Chain {
        self.nodes[self.reference as usize].chain()
    }
}
