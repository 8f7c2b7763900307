// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ProposerSelection;
use crate::crypto::hash_all;
use crate::{ProcessId, Round};

/// Assignment of proposers to rounds, shared by all processes of a run.
#[derive(Clone, Copy, Debug)]
pub struct ProposerSchedule {
    selection: ProposerSelection,
    num_processes: u64,
}

impl ProposerSchedule {
    /// Creates the schedule among `num_processes` processes.
    #[must_use]
    pub const fn new(selection: ProposerSelection, num_processes: u64) -> Self {
        Self {
            selection,
            num_processes,
        }
    }

    /// Gives the proposer of the given round.
    ///
    /// A seeded schedule derives each round's PRNG from the seed and the round
    /// alone, so the proposer of any round is known without drawing the earlier ones.
    #[must_use]
    pub fn proposer(&self, round: Round) -> ProcessId {
        match self.selection {
            ProposerSelection::RoundRobin => round.saturating_sub(1) % self.num_processes,
            ProposerSelection::Seeded { seed } => {
                let rng_seed = hash_all(&[&seed.to_be_bytes(), &round.to_be_bytes()]);
                StdRng::from_seed(rng_seed).random_range(0..self.num_processes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin() {
        let schedule = ProposerSchedule::new(ProposerSelection::RoundRobin, 4);
        let proposers: Vec<_> = (1..=6).map(|r| schedule.proposer(r)).collect();
        assert_eq!(proposers, vec![0, 1, 2, 3, 0, 1]);
    }

    #[test]
    fn seeded_is_reproducible() {
        let selection = ProposerSelection::Seeded { seed: 42 };
        let a = ProposerSchedule::new(selection, 7);
        let b = ProposerSchedule::new(selection, 7);
        for round in 1..=50 {
            assert_eq!(a.proposer(round), b.proposer(round));
            assert!(a.proposer(round) < 7);
        }
    }

    #[test]
    fn seeds_differ() {
        let a = ProposerSchedule::new(ProposerSelection::Seeded { seed: 1 }, 16);
        let b = ProposerSchedule::new(ProposerSelection::Seeded { seed: 2 }, 16);
        assert!((1..=64).any(|r| a.proposer(r) != b.proposer(r)));
    }

    #[test]
    fn seeded_far_rounds() {
        let schedule = ProposerSchedule::new(ProposerSelection::Seeded { seed: 3 }, 5);
        assert!(schedule.proposer(u64::MAX) < 5);
        assert_eq!(schedule.proposer(1 << 40), schedule.proposer(1 << 40));
        // not every round picks the same process
        assert!((1..=32).any(|r| schedule.proposer(r) != schedule.proposer(1)));
    }
}
