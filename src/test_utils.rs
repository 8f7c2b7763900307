// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Utility functions for tests.

use crate::chain_growth::{Chain, entry_for_round};
use crate::report::{BroadcastReport, ChainGrowthReport};
use crate::{SimulationConfig, run_consensus};

/// Creates a valid chain of `len` blocks, genesis included, proposed round-robin by 4 processes.
pub fn linear_chain(len: usize) -> Chain {
    let mut chain = Chain::genesis();
    for round in 1..len as u64 {
        chain = chain.extended(round, (round - 1) % 4, entry_for_round(round));
    }
    chain
}

/// Runs a chain-growth configuration that is expected to succeed.
pub fn run_chain(config: &SimulationConfig) -> ChainGrowthReport {
    let report = run_consensus(config).unwrap();
    report.as_chain_growth().unwrap().clone()
}

/// Runs a broadcast configuration that is expected to succeed.
pub fn run_broadcast(config: &SimulationConfig) -> BroadcastReport {
    let report = run_consensus(config).unwrap();
    report.as_broadcast().unwrap().clone()
}
