// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Result records of a simulation run.
//!
//! A report is produced once at the end of a run and never changes afterwards.
//! Its JSON form contains exactly the fields of the protocol that produced it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ProcessId;

/// Outcome of a chain-growth run, also used by the no-op protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainGrowthReport {
    /// Adopted chain length of the reference process after each round.
    pub chain_lengths_per_round: Vec<usize>,
    /// Entries of the reference process's final chain.
    pub final_log: Vec<String>,
    pub final_length: usize,
}

impl ChainGrowthReport {
    #[must_use]
    pub fn new(chain_lengths_per_round: Vec<usize>, final_log: Vec<String>) -> Self {
        let final_length = final_log.len();
        Self {
            chain_lengths_per_round,
            final_log,
            final_length,
        }
    }

    /// Returns the report of a run that executed nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// Outcome of a Dolev-Strong run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastReport {
    pub sender_input: String,
    /// Decision of every honest process.
    pub honest_outputs: BTreeMap<ProcessId, String>,
}

impl BroadcastReport {
    #[must_use]
    pub fn new(sender_input: String, honest_outputs: BTreeMap<ProcessId, String>) -> Self {
        Self {
            sender_input,
            honest_outputs,
        }
    }

    /// Returns the common decision, `None` if honest processes disagree.
    #[must_use]
    pub fn agreed_value(&self) -> Option<&str> {
        let mut outputs = self.honest_outputs.values();
        let first = outputs.next()?;
        outputs.all(|o| o == first).then_some(first.as_str())
    }
}

/// Report of any protocol, serialized without a tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConsensusReport {
    ChainGrowth(ChainGrowthReport),
    Broadcast(BroadcastReport),
}

impl ConsensusReport {
    /// Renders the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Never fails for reports built by this crate.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a report from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` does not have the fields of exactly one report kind.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub const fn as_chain_growth(&self) -> Option<&ChainGrowthReport> {
        match self {
            Self::ChainGrowth(report) => Some(report),
            Self::Broadcast(_) => None,
        }
    }

    #[must_use]
    pub const fn as_broadcast(&self) -> Option<&BroadcastReport> {
        match self {
            Self::Broadcast(report) => Some(report),
            Self::ChainGrowth(_) => None,
        }
    }
}

impl From<ChainGrowthReport> for ConsensusReport {
    fn from(report: ChainGrowthReport) -> Self {
        Self::ChainGrowth(report)
    }
}

impl From<BroadcastReport> for ConsensusReport {
    fn from(report: BroadcastReport) -> Self {
        Self::Broadcast(report)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn chain_growth_fields() {
        let report = ConsensusReport::from(ChainGrowthReport::new(
            vec![1, 2],
            vec!["genesis".into(), "tx round 1".into()],
        ));
        let value: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "chain_lengths_per_round": [1, 2],
                "final_log": ["genesis", "tx round 1"],
                "final_length": 2,
            })
        );
    }

    #[test]
    fn broadcast_keys_are_strings() {
        let outputs = BTreeMap::from([(0, "1".to_owned()), (2, "1".to_owned())]);
        let report = ConsensusReport::from(BroadcastReport::new("1".into(), outputs));
        let value: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "sender_input": "1",
                "honest_outputs": {"0": "1", "2": "1"},
            })
        );
    }

    #[test]
    fn decoding_is_idempotent() {
        let outputs = BTreeMap::from([(1, "0".to_owned()), (3, "0".to_owned())]);
        let json = ConsensusReport::from(BroadcastReport::new("1".into(), outputs))
            .to_json()
            .unwrap();
        let first = ConsensusReport::from_json(&json).unwrap();
        let second = ConsensusReport::from_json(&json).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_broadcast().unwrap().agreed_value(), Some("0"));
        assert!(first.as_chain_growth().is_none());

        let json = ConsensusReport::from(ChainGrowthReport::empty())
            .to_json()
            .unwrap();
        let decoded = ConsensusReport::from_json(&json).unwrap();
        assert_eq!(decoded.as_chain_growth(), Some(&ChainGrowthReport::empty()));
    }

    #[test]
    fn reject_mixed_fields() {
        let json = r#"{"sender_input": "1", "honest_outputs": {}, "final_length": 0}"#;
        assert!(ConsensusReport::from_json(json).is_err());
        assert!(ConsensusReport::from_json("{}").is_err());
    }

    #[test]
    fn disagreement() {
        let outputs = BTreeMap::from([(1, "0".to_owned()), (2, "1".to_owned())]);
        let report = BroadcastReport::new("1".into(), outputs);
        assert_eq!(report.agreed_value(), None);
        assert_eq!(BroadcastReport::new("1".into(), BTreeMap::new()).agreed_value(), None);
    }
}
