// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

use blockchain_consensus::crypto::{Endorsement, hash};
use blockchain_consensus::dolev_strong::CertifiedValue;
use blockchain_consensus::{FaultBehavior, Mode, SimulationConfig, run_consensus};
use divan::counter::{BytesCount, ItemsCount};

fn main() {
    // run registered benchmarks.
    divan::main();
}

#[divan::bench(consts = [32, 1024])]
fn hash_bytes<const N: usize>(bencher: divan::Bencher) {
    bencher
        .counter(BytesCount::new(N))
        .with_inputs(|| (0..N).map(|_| rand::random::<u8>()).collect())
        .bench_values(|s: Vec<u8>| hash(&s));
}

#[divan::bench(consts = [1, 8, 32])]
fn verify_certificate<const N: u64>(bencher: divan::Bencher) {
    bencher
        .counter(ItemsCount::new(N))
        .with_inputs(|| (1..N).fold(CertifiedValue::originate(0, "1"), |c, id| c.extend(id)))
        .bench_values(|cert: CertifiedValue| cert.check(0, N, N as usize));
}

#[divan::bench]
fn endorse(bencher: divan::Bencher) {
    let prior: Vec<_> = (0..16).map(|id| Endorsement::new(id, "1", &[])).collect();
    bencher
        .counter(ItemsCount::new(1_usize))
        .bench(|| Endorsement::new(16, "1", &prior));
}

#[divan::bench(args = [false, true], consts = [16, 64])]
fn chain_growth<const N: u64>(bencher: divan::Bencher, parallel: bool) {
    let config = SimulationConfig::for_mode(Mode::ChainGrowth)
        .with_processes(N)
        .with_rounds(100)
        .with_fault(1, FaultBehavior::Equivocate)
        .with_parallel(parallel);
    bencher
        .counter(ItemsCount::new(100_usize))
        .bench(|| run_consensus(&config).unwrap());
}

#[divan::bench(args = [false, true], consts = [8, 16])]
fn dolev_strong<const N: u64>(bencher: divan::Bencher, parallel: bool) {
    let mut config = SimulationConfig::for_mode(Mode::DolevStrong)
        .with_processes(N)
        .with_parallel(parallel);
    for id in 0..N / 3 {
        config = config.with_fault(id, FaultBehavior::Equivocate);
    }
    bencher
        .counter(ItemsCount::new(1_usize))
        .bench(|| run_consensus(&config).unwrap());
}
