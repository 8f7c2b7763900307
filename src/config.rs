// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulation configuration.
//!
//! A [`SimulationConfig`] is assembled from defaults, an optional TOML file,
//! and finally command-line flags. [`SimulationConfig::validate`] rejects
//! every configuration a run could not give meaningful results for, before
//! any round executes.
//!
//! # Examples
//!
//! ```
//! use blockchain_consensus::{FaultBehavior, Mode, SimulationConfig};
//!
//! let config = SimulationConfig::from_toml_str(
//!     r#"
//!     mode = "dolev"
//!     processes = 5
//!
//!     [[faults]]
//!     process = 3
//!     behavior = "equivocate"
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.mode, Mode::DolevStrong);
//! assert_eq!(config.behavior_of(3), Some(FaultBehavior::Equivocate));
//! assert_eq!(config.num_rounds(), 2);
//! config.validate().unwrap();
//! ```

use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ProcessId;

/// Number of processes simulated unless configured otherwise.
pub const DEFAULT_PROCESSES: u64 = 4;
/// Number of chain-growth rounds run unless configured otherwise.
pub const DEFAULT_CHAIN_ROUNDS: u64 = 10;
/// Input the broadcast sender holds unless configured otherwise.
pub const DEFAULT_SENDER_INPUT: &str = "1";

/// Errors detected while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file")]
    Parse(#[from] toml::de::Error),
    #[error("malformed fault `{0}`, expected `<process>:<silent|equivocate|forge>`")]
    MalformedFault(String),
    #[error("at least one process is required")]
    NoProcesses,
    #[error("process {id} does not exist, only {processes} processes are simulated")]
    UnknownProcess { id: ProcessId, processes: u64 },
    #[error("process {0} is listed as faulty more than once")]
    DuplicateFault(ProcessId),
    #[error("every process is faulty, no honest process is left to report on")]
    NoHonestProcess,
    #[error("{faulty} faulty processes exceed the declared fault bound of {fault_bound}")]
    FaultBoundExceeded { faulty: u64, fault_bound: u64 },
    #[error("{rounds} rounds cannot tolerate a fault bound of {fault_bound}, more rounds than faults are needed")]
    InsufficientRounds { rounds: u64, fault_bound: u64 },
    #[error("the broadcast sender input must not be empty")]
    EmptyInput,
}

/// Protocol variant run by the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Mode {
    /// Longest-chain log growth.
    #[default]
    #[serde(rename = "chain", alias = "chain-growth")]
    #[value(name = "chain", alias = "chain-growth")]
    ChainGrowth,
    /// Dolev-Strong Byzantine broadcast.
    #[serde(rename = "dolev", alias = "dolev-strong")]
    #[value(name = "dolev", alias = "dolev-strong")]
    DolevStrong,
    /// Runs nothing and reports an empty chain.
    #[serde(rename = "noop")]
    #[value(name = "noop")]
    NoOp,
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ChainGrowth => "chain",
            Self::DolevStrong => "dolev",
            Self::NoOp => "noop",
        };
        write!(f, "{name}")
    }
}

/// Rule deciding which process proposes in each chain-growth round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposerSelection {
    /// Round `r` is proposed by process `(r - 1) mod N`.
    #[default]
    RoundRobin,
    /// Proposers are drawn uniformly from a PRNG seeded with `seed`.
    Seeded { seed: u64 },
}

/// How a faulty process deviates from the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FaultBehavior {
    /// Never sends anything.
    Silent,
    /// Sends conflicting content to even and odd recipients.
    Equivocate,
    /// Sends fabricated chains that honest validation must reject.
    Forge,
}

impl FromStr for FaultBehavior {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| ConfigError::MalformedFault(s.into()))
    }
}

/// Marks one process as faulty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaultSpec {
    pub process: ProcessId,
    pub behavior: FaultBehavior,
}

impl FromStr for FaultSpec {
    type Err = ConfigError;

    /// Parses `<process>:<behavior>`, e.g. `2:equivocate`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedFault(s.into());
        let (process, behavior) = s.split_once(':').ok_or_else(malformed)?;
        let process = process.trim().parse().map_err(|_| malformed())?;
        let behavior = behavior.trim().parse().map_err(|_| malformed())?;
        Ok(Self { process, behavior })
    }
}

/// Settings specific to Dolev-Strong broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BroadcastConfig {
    /// Designated sender.
    pub sender: ProcessId,
    /// Private input of the sender.
    pub input: String,
    /// Assumed upper bound `f` on faulty processes.
    /// Defaults to the number of configured faults.
    pub fault_bound: Option<u64>,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            sender: 0,
            input: DEFAULT_SENDER_INPUT.to_owned(),
            fault_bound: None,
        }
    }
}

/// Limits after which a run is aborted without a result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunBudget {
    pub max_rounds: Option<u64>,
    pub time_limit_ms: Option<u64>,
}

impl RunBudget {
    /// Returns the wall-clock limit, if any.
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }
}

/// Full description of one simulation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub mode: Mode,
    /// Number of rounds, see [`SimulationConfig::num_rounds`] for defaults.
    pub rounds: Option<u64>,
    pub processes: u64,
    pub proposer: ProposerSelection,
    pub broadcast: BroadcastConfig,
    pub faults: Vec<FaultSpec>,
    pub budget: RunBudget,
    /// Step the processes of each round on the `rayon` pool.
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            rounds: None,
            processes: DEFAULT_PROCESSES,
            proposer: ProposerSelection::default(),
            broadcast: BroadcastConfig::default(),
            faults: Vec::new(),
            budget: RunBudget::default(),
            parallel: false,
        }
    }
}

impl SimulationConfig {
    /// Creates the default configuration for the given mode.
    #[must_use]
    pub fn for_mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Parses a configuration from TOML. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input or unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// and [`ConfigError::Parse`] if it is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    #[must_use]
    pub fn with_rounds(mut self, rounds: u64) -> Self {
        self.rounds = Some(rounds);
        self
    }

    #[must_use]
    pub fn with_processes(mut self, processes: u64) -> Self {
        self.processes = processes;
        self
    }

    #[must_use]
    pub fn with_fault(mut self, process: ProcessId, behavior: FaultBehavior) -> Self {
        self.faults.push(FaultSpec { process, behavior });
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.proposer = ProposerSelection::Seeded { seed };
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.broadcast.input = input.into();
        self
    }

    #[must_use]
    pub fn with_sender(mut self, sender: ProcessId) -> Self {
        self.broadcast.sender = sender;
        self
    }

    #[must_use]
    pub fn with_fault_bound(mut self, fault_bound: u64) -> Self {
        self.broadcast.fault_bound = Some(fault_bound);
        self
    }

    #[must_use]
    pub fn with_budget(mut self, budget: RunBudget) -> Self {
        self.budget = budget;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns the declared fault bound `f`.
    #[must_use]
    pub fn fault_bound(&self) -> u64 {
        self.broadcast
            .fault_bound
            .unwrap_or(self.faults.len() as u64)
    }

    /// Returns the number of rounds to run.
    ///
    /// Without an explicit count, chain growth runs [`DEFAULT_CHAIN_ROUNDS`],
    /// broadcast runs `f + 1` and the no-op protocol runs none.
    #[must_use]
    pub fn num_rounds(&self) -> u64 {
        self.rounds.unwrap_or(match self.mode {
            Mode::ChainGrowth => DEFAULT_CHAIN_ROUNDS,
            Mode::DolevStrong => self.fault_bound() + 1,
            Mode::NoOp => 0,
        })
    }

    /// Returns the fault behavior of the given process, `None` if it is honest.
    #[must_use]
    pub fn behavior_of(&self, process: ProcessId) -> Option<FaultBehavior> {
        self.faults
            .iter()
            .find(|f| f.process == process)
            .map(|f| f.behavior)
    }

    /// Returns the lowest-identity honest process.
    #[must_use]
    pub fn reference_process(&self) -> Option<ProcessId> {
        (0..self.processes).find(|&id| self.behavior_of(id).is_none())
    }

    /// Checks that a run with this configuration has well-defined results.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processes == 0 {
            return Err(ConfigError::NoProcesses);
        }
        let mut seen = BTreeSet::new();
        for fault in &self.faults {
            self.check_known(fault.process)?;
            if !seen.insert(fault.process) {
                return Err(ConfigError::DuplicateFault(fault.process));
            }
        }
        if self.reference_process().is_none() {
            return Err(ConfigError::NoHonestProcess);
        }

        if self.mode == Mode::DolevStrong {
            self.check_known(self.broadcast.sender)?;
            if self.broadcast.input.is_empty() {
                return Err(ConfigError::EmptyInput);
            }
            let faulty = self.faults.len() as u64;
            let fault_bound = self.fault_bound();
            if faulty > fault_bound {
                return Err(ConfigError::FaultBoundExceeded {
                    faulty,
                    fault_bound,
                });
            }
            let rounds = self.num_rounds();
            if rounds <= fault_bound {
                return Err(ConfigError::InsufficientRounds {
                    rounds,
                    fault_bound,
                });
            }
        }
        Ok(())
    }

    fn check_known(&self, id: ProcessId) -> Result<(), ConfigError> {
        if id >= self.processes {
            return Err(ConfigError::UnknownProcess {
                id,
                processes: self.processes,
            });
        }
        Ok(())
    }
}
