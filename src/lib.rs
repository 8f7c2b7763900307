// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Deterministic simulator for round-based consensus protocols.
//!
//! A fixed set of simulated processes advances in lockstep over a synchronous
//! [`MessageBus`]. Two protocols are provided:
//! - [`chain_growth`] grows a hash-linked log under the longest-chain rule.
//! - [`dolev_strong`] reliably broadcasts one value despite Byzantine processes.
//!
//! The entry point is [`run_consensus`], a pure function from a
//! [`SimulationConfig`] to a [`ConsensusReport`].
//!
//! # Examples
//!
//! ```
//! use blockchain_consensus::{ConsensusReport, Mode, SimulationConfig, run_consensus};
//!
//! let config = SimulationConfig::for_mode(Mode::ChainGrowth).with_rounds(3);
//! let ConsensusReport::ChainGrowth(report) = run_consensus(&config).unwrap() else {
//!     unreachable!();
//! };
//! assert_eq!(report.chain_lengths_per_round, vec![1, 2, 3]);
//! assert_eq!(report.final_log[0], "genesis");
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod chain_growth;
pub mod config;
pub mod crypto;
pub mod dolev_strong;
pub mod harness;
pub mod logging;
pub mod network;
pub mod process;
pub mod protocol;
pub mod report;
#[cfg(test)]
pub mod test_utils;

pub use self::config::{
    BroadcastConfig, ConfigError, FaultBehavior, FaultSpec, Mode, ProposerSelection, RunBudget,
    SimulationConfig,
};
pub use self::harness::{Simulation, SimulationError, run_consensus};
pub use self::network::MessageBus;
pub use self::process::{Conduct, Process, Role};
pub use self::report::{BroadcastReport, ChainGrowthReport, ConsensusReport};

/// Process identity type, `0..N-1`.
pub type ProcessId = u64;

/// Round number type. The first executed round is round 1.
pub type Round = u64;

/// Log entry shared as the root of every honest chain.
pub const GENESIS_ENTRY: &str = "genesis";
