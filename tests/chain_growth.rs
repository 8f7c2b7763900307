// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

use blockchain_consensus::{
    ChainGrowthReport, ConsensusReport, FaultBehavior, Mode, SimulationConfig, run_consensus,
};

fn chain(config: &SimulationConfig) -> ChainGrowthReport {
    run_consensus(config)
        .unwrap()
        .as_chain_growth()
        .unwrap()
        .clone()
}

fn assert_well_formed(report: &ChainGrowthReport) {
    assert_eq!(report.final_log[0], "genesis");
    assert_eq!(report.final_length, report.final_log.len());
    assert!(
        report
            .chain_lengths_per_round
            .windows(2)
            .all(|w| w[0] <= w[1])
    );
    if let Some(&last) = report.chain_lengths_per_round.last() {
        assert_eq!(last, report.final_length);
    }
}

#[test]
fn single_round() {
    let report = chain(&SimulationConfig::for_mode(Mode::ChainGrowth).with_rounds(1));
    assert_eq!(report.chain_lengths_per_round, vec![1]);
    assert_eq!(report.final_log, vec!["genesis"]);
    assert_eq!(report.final_length, 1);
}

#[test]
fn fault_free_growth() {
    let config = SimulationConfig::for_mode(Mode::ChainGrowth)
        .with_processes(5)
        .with_rounds(12);
    let report = chain(&config);
    assert_well_formed(&report);
    assert_eq!(report.chain_lengths_per_round, (1..=12).collect::<Vec<_>>());
    let expected: Vec<String> = std::iter::once("genesis".to_owned())
        .chain((1..12).map(|r| format!("tx round {r}")))
        .collect();
    assert_eq!(report.final_log, expected);
}

#[test]
fn single_process() {
    let config = SimulationConfig::for_mode(Mode::ChainGrowth)
        .with_processes(1)
        .with_rounds(4);
    assert_eq!(chain(&config).chain_lengths_per_round, vec![1, 2, 3, 4]);
}

#[test]
fn silent_or_forging_proposer_stalls() {
    for behavior in [FaultBehavior::Silent, FaultBehavior::Forge] {
        let config = SimulationConfig::for_mode(Mode::ChainGrowth).with_fault(1, behavior);
        let report = chain(&config);
        assert_well_formed(&report);
        assert_eq!(
            report.chain_lengths_per_round,
            vec![1, 2, 2, 3, 4, 5, 5, 6, 7, 8]
        );
        assert!(report.final_log.iter().all(|e| !e.contains("forged")));
    }
}

#[test]
fn equivocating_proposer_forks_heal() {
    let config = SimulationConfig::for_mode(Mode::ChainGrowth).with_fault(1, FaultBehavior::Equivocate);
    let report = chain(&config);
    assert_well_formed(&report);
    assert_eq!(report.chain_lengths_per_round, (1..=10).collect::<Vec<_>>());
    assert_eq!(report.final_log[2], "tx round 2 fork 0");
}

#[test]
fn reference_skips_faulty_processes() {
    let config = SimulationConfig::for_mode(Mode::ChainGrowth)
        .with_fault(0, FaultBehavior::Equivocate)
        .with_rounds(3);
    let report = chain(&config);
    // process 1 is odd, so it adopted the second fork
    assert_eq!(report.final_log, vec!["genesis", "tx round 1 fork 1", "tx round 2"]);
}

#[test]
fn seeded_schedule() {
    let config = SimulationConfig::for_mode(Mode::ChainGrowth)
        .with_processes(6)
        .with_rounds(30)
        .with_seed(7)
        .with_fault(2, FaultBehavior::Silent)
        .with_fault(4, FaultBehavior::Forge);
    let report = chain(&config);
    assert_well_formed(&report);
    assert_eq!(report, chain(&config));
    assert_eq!(report, chain(&config.clone().with_parallel(true)));
}

#[test]
fn genesis_invariant_holds() {
    for rounds in 1..8 {
        for processes in 1..5 {
            let config = SimulationConfig::for_mode(Mode::ChainGrowth)
                .with_processes(processes)
                .with_rounds(rounds);
            let report = chain(&config);
            assert_well_formed(&report);
            assert_eq!(report.chain_lengths_per_round.len(), rounds as usize);
        }
    }
}

#[test]
fn noop_reports_empty_chain() {
    let report = run_consensus(&SimulationConfig::for_mode(Mode::NoOp)).unwrap();
    let json = report.to_json().unwrap();
    assert_eq!(ConsensusReport::from_json(&json).unwrap(), report);
    let report = report.as_chain_growth().unwrap();
    assert!(report.chain_lengths_per_round.is_empty());
    assert!(report.final_log.is_empty());
    assert_eq!(report.final_length, 0);
}
