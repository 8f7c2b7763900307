// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use blockchain_consensus::{
    FaultSpec, Mode, ProposerSelection, SimulationConfig, logging, run_consensus,
};
use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::Context;

/// Deterministic simulator for round-based consensus protocols.
///
/// Prints the result of the run as JSON to stdout. Logs go to stderr.
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Protocol to run, chain growth if omitted.
    #[arg(value_enum)]
    mode: Option<Mode>,
    /// TOML file to read the configuration from. Flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of rounds to run.
    #[arg(long)]
    rounds: Option<u64>,
    /// Number of simulated processes.
    #[arg(long)]
    processes: Option<u64>,
    /// Draw chain-growth proposers from a PRNG with this seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Designated broadcast sender.
    #[arg(long)]
    sender: Option<u64>,
    /// Input of the broadcast sender.
    #[arg(long)]
    input: Option<String>,
    /// Assumed upper bound on faulty processes for broadcast.
    #[arg(long)]
    fault_bound: Option<u64>,
    /// Marks a process as faulty, e.g. `2:equivocate`. Can be repeated.
    #[arg(long = "fault", value_name = "ID:BEHAVIOR")]
    faults: Vec<FaultSpec>,
    /// Abort if the run would need more rounds than this.
    #[arg(long)]
    max_rounds: Option<u64>,
    /// Abort if the run takes longer than this many milliseconds.
    #[arg(long)]
    time_limit_ms: Option<u64>,
    /// Step processes in parallel.
    #[arg(long)]
    parallel: bool,
}

impl Args {
    /// Layers these flags over the config file, if any, and the defaults.
    fn into_config(self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimulationConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(rounds) = self.rounds {
            config.rounds = Some(rounds);
        }
        if let Some(processes) = self.processes {
            config.processes = processes;
        }
        if let Some(seed) = self.seed {
            config.proposer = ProposerSelection::Seeded { seed };
        }
        if let Some(sender) = self.sender {
            config.broadcast.sender = sender;
        }
        if let Some(input) = self.input {
            config.broadcast.input = input;
        }
        if let Some(fault_bound) = self.fault_bound {
            config.broadcast.fault_bound = Some(fault_bound);
        }
        if !self.faults.is_empty() {
            config.faults = self.faults;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.budget.max_rounds = Some(max_rounds);
        }
        if let Some(time_limit_ms) = self.time_limit_ms {
            config.budget.time_limit_ms = Some(time_limit_ms);
        }
        config.parallel |= self.parallel;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // enable fancy `color_eyre` error messages
    color_eyre::install()?;

    let args = Args::parse();
    logging::enable_logforth();

    let config = args.into_config()?;
    let report = run_consensus(&config).context("simulation failed")?;
    println!("{}", report.to_json()?);
    Ok(())
}
