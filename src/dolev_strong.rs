// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Dolev-Strong authenticated Byzantine broadcast.
//!
//! A designated sender distributes its input, endorsed by itself, in round 1.
//! In every later round `k`, a process accepts a [`CertifiedValue`] only if its
//! chain holds at least `k - 1` distinct endorsements starting with the sender.
//! Whenever an honest process certifies a value for the first time, it relays
//! the value with its own endorsement appended.
//! Running at least `f + 1` rounds guarantees that whatever one honest process
//! certified, every honest process certified as well.
//!
//! At the end each honest process decides on the single value it certified,
//! or on [`DEFAULT_DECISION`] if it certified none or several.

mod certificate;

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

pub use self::certificate::{CertificationError, CertifiedValue};
use crate::config::{FaultBehavior, SimulationConfig};
use crate::harness::{RoundDriver, SimulationError};
use crate::network::{Delivery, Outgoing};
use crate::process::{Process, processes_from_config};
use crate::protocol::{ProtocolError, ProtocolNode};
use crate::report::BroadcastReport;
use crate::{ProcessId, Round};

/// Decision of a process that certified no value or conflicting values.
pub const DEFAULT_DECISION: &str = "0";

/// Returns the binary value conflicting with `input`.
#[must_use]
pub fn conflicting_value(input: &str) -> &'static str {
    if input == "1" { "0" } else { "1" }
}

/// Dolev-Strong state of a single process.
pub struct DolevStrongNode {
    process: Process,
    num_processes: u64,
    sender: ProcessId,
    /// Private input, only held by the sender.
    input: Option<String>,
    /// First certificate accepted for each value.
    extracted: BTreeMap<String, CertifiedValue>,
}

impl DolevStrongNode {
    #[must_use]
    pub fn new(process: Process, num_processes: u64, sender: ProcessId, input: String) -> Self {
        Self {
            process,
            num_processes,
            sender,
            input: process.is_sender().then_some(input),
            extracted: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn process(&self) -> &Process {
        &self.process
    }

    /// Returns the values certified so far.
    #[must_use]
    pub fn extracted(&self) -> BTreeSet<&str> {
        self.extracted.keys().map(String::as_str).collect()
    }

    /// Collapses the extracted set into this process's output.
    #[must_use]
    pub fn decide(&self) -> String {
        let mut values = self.extracted.keys();
        match (values.next(), values.next()) {
            (Some(value), None) => value.clone(),
            _ => DEFAULT_DECISION.to_owned(),
        }
    }

    /// Accepts all valid certificates in `inbox`, returning those for new values.
    fn accept(&mut self, round: Round, inbox: Vec<Delivery<CertifiedValue>>) -> Vec<CertifiedValue> {
        let min_len = round.saturating_sub(1) as usize;
        let mut fresh = Vec::new();
        for Delivery { sender, payload } in inbox {
            if let Err(err) = payload.check(self.sender, self.num_processes, min_len) {
                debug!(
                    "process {} rejected {payload} from process {sender} in round {round}: {err}",
                    self.process.id
                );
                continue;
            }
            if self.extracted.contains_key(payload.value()) {
                continue;
            }
            debug!(
                "process {} extracted {:?} in round {round}",
                self.process.id,
                payload.value()
            );
            self.extracted
                .insert(payload.value().to_owned(), payload.clone());
            fresh.push(payload);
        }
        fresh
    }

    /// Endorses newly certified values for relaying.
    fn endorse(&self, fresh: Vec<CertifiedValue>) -> Result<Vec<CertifiedValue>, ProtocolError> {
        let id = self.process.id;
        let mut relayed = Vec::with_capacity(fresh.len());
        for cert in fresh {
            if cert.endorsed_by(id) {
                continue;
            }
            let extended = cert.extend(id);
            if !extended.has_distinct_signers() {
                return Err(ProtocolError::RepeatedIdentity {
                    process: id,
                    chain: extended.signers(),
                });
            }
            relayed.push(extended);
        }
        Ok(relayed)
    }

    fn originate(&mut self) -> Vec<Outgoing<CertifiedValue>> {
        let id = self.process.id;
        let Some(input) = self.input.clone() else {
            return Vec::new();
        };
        match self.process.fault() {
            None => {
                let cert = CertifiedValue::originate(id, input);
                self.extracted.insert(cert.value().to_owned(), cert.clone());
                vec![Outgoing::to_all(cert)]
            }
            Some(FaultBehavior::Silent) => Vec::new(),
            Some(FaultBehavior::Equivocate) => {
                let even = CertifiedValue::originate(id, input.as_str());
                let odd = CertifiedValue::originate(id, conflicting_value(&input));
                (0..self.num_processes)
                    .map(|to| {
                        let cert = if to % 2 == 0 { &even } else { &odd };
                        Outgoing::to_one(to, cert.clone())
                    })
                    .collect()
            }
            Some(FaultBehavior::Forge) => {
                vec![Outgoing::to_all(CertifiedValue::forged(input, id, 2))]
            }
        }
    }

    fn forge(&self, inbox: Vec<Delivery<CertifiedValue>>) -> Vec<Outgoing<CertifiedValue>> {
        let id = self.process.id;
        if inbox.is_empty() {
            if self.process.is_sender() {
                return Vec::new();
            }
            let forged = CertifiedValue::forged(format!("forged-{id}"), id, 2);
            return vec![Outgoing::to_all(forged)];
        }
        inbox
            .into_iter()
            .map(|d| Outgoing::to_all(d.payload.extend(id).extend(id)))
            .collect()
    }
}

impl ProtocolNode for DolevStrongNode {
    type Message = CertifiedValue;

    fn id(&self) -> ProcessId {
        self.process.id
    }

    fn step(
        &mut self,
        round: Round,
        inbox: Vec<Delivery<CertifiedValue>>,
    ) -> Result<Vec<Outgoing<CertifiedValue>>, ProtocolError> {
        if round == 1 && self.process.is_sender() {
            return Ok(self.originate());
        }
        match self.process.fault() {
            None => {
                let fresh = self.accept(round, inbox);
                let relayed = self.endorse(fresh)?;
                Ok(relayed.into_iter().map(Outgoing::to_all).collect())
            }
            Some(FaultBehavior::Silent) => Ok(Vec::new()),
            Some(FaultBehavior::Equivocate) => {
                let fresh = self.accept(round, inbox);
                let relayed = self.endorse(fresh)?;
                let evens = (0..self.num_processes).step_by(2);
                Ok(relayed
                    .iter()
                    .flat_map(|cert| evens.clone().map(move |to| Outgoing::to_one(to, cert.clone())))
                    .collect())
            }
            Some(FaultBehavior::Forge) => Ok(self.forge(inbox)),
        }
    }

    fn finish(
        &mut self,
        round: Round,
        inbox: Vec<Delivery<CertifiedValue>>,
    ) -> Result<(), ProtocolError> {
        if self.process.is_honest() {
            self.accept(round, inbox);
        }
        Ok(())
    }
}

/// Dolev-Strong run over all processes of a configuration.
pub struct DolevStrong {
    nodes: Vec<DolevStrongNode>,
    rounds: u64,
    input: String,
}

impl DolevStrong {
    /// Registers the initial state of every process.
    ///
    /// `config` is expected to have passed [`SimulationConfig::validate`].
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        let broadcast = &config.broadcast;
        let nodes = processes_from_config(config)
            .into_iter()
            .map(|p| {
                DolevStrongNode::new(p, config.processes, broadcast.sender, broadcast.input.clone())
            })
            .collect();
        Self {
            nodes,
            rounds: config.num_rounds(),
            input: broadcast.input.clone(),
        }
    }

    /// Runs all rounds and collects the decisions of the honest processes.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if the run exceeds its budget or an honest
    /// process would relay an invalid chain.
    pub fn run(
        mut self,
        driver: &mut RoundDriver<CertifiedValue>,
    ) -> Result<BroadcastReport, SimulationError> {
        for round in 1..=self.rounds {
            driver.run_round(round, &mut self.nodes)?;
        }
        driver.finish(self.rounds + 1, &mut self.nodes)?;
        let honest_outputs: BTreeMap<ProcessId, String> = self
            .nodes
            .iter()
            .filter(|n| n.process.is_honest())
            .map(|n| (n.process.id, n.decide()))
            .collect();
        info!(
            "broadcast finished after {} rounds, {} honest processes decided",
            self.rounds,
            honest_outputs.len()
        );
        Ok(BroadcastReport::new(self.input, honest_outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Conduct, Role};

    fn node(id: ProcessId, conduct: Conduct) -> DolevStrongNode {
        let role = if id == 0 { Role::Sender } else { Role::Receiver };
        let process = Process { id, conduct, role };
        DolevStrongNode::new(process, 4, 0, "1".into())
    }

    fn delivered(sender: ProcessId, payload: CertifiedValue) -> Delivery<CertifiedValue> {
        Delivery { sender, payload }
    }

    #[test]
    fn honest_sender_originates() {
        let mut sender = node(0, Conduct::Honest);
        let out = sender.step(1, Vec::new()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload, CertifiedValue::originate(0, "1"));
        assert_eq!(sender.decide(), "1");
    }

    #[test]
    fn receiver_relays_once() {
        let mut receiver = node(2, Conduct::Honest);
        assert!(receiver.step(1, Vec::new()).unwrap().is_empty());

        let cert = CertifiedValue::originate(0, "1");
        let out = receiver.step(2, vec![delivered(0, cert.clone())]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload.signers(), vec![0, 2]);
        assert_eq!(receiver.extracted(), BTreeSet::from(["1"]));

        // the same value again is not relayed a second time
        let again = cert.extend(1);
        assert!(receiver.step(3, vec![delivered(1, again)]).unwrap().is_empty());
        assert_eq!(receiver.decide(), "1");
    }

    #[test]
    fn short_chain_rejected() {
        let mut receiver = node(2, Conduct::Honest);
        let cert = CertifiedValue::originate(0, "1");
        assert!(receiver.step(3, vec![delivered(0, cert)]).unwrap().is_empty());
        assert!(receiver.extracted().is_empty());
        assert_eq!(receiver.decide(), DEFAULT_DECISION);
    }

    #[test]
    fn own_endorsement_not_repeated() {
        let mut receiver = node(2, Conduct::Honest);
        let cert = CertifiedValue::originate(0, "0").extend(2);
        assert!(receiver.step(3, vec![delivered(1, cert)]).unwrap().is_empty());
        assert_eq!(receiver.decide(), "0");
    }

    #[test]
    fn conflicting_values_default() {
        let mut receiver = node(3, Conduct::Honest);
        let out = receiver
            .step(
                2,
                vec![
                    delivered(0, CertifiedValue::originate(0, "1")),
                    delivered(0, CertifiedValue::originate(0, "0")),
                ],
            )
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(receiver.extracted().len(), 2);
        assert_eq!(receiver.decide(), DEFAULT_DECISION);
    }

    #[test]
    fn finish_accepts_without_relaying() {
        let mut receiver = node(1, Conduct::Honest);
        let cert = CertifiedValue::originate(0, "1").extend(2);
        receiver.finish(3, vec![delivered(2, cert)]).unwrap();
        assert_eq!(receiver.decide(), "1");
    }

    #[test]
    fn equivocating_sender_splits_peers() {
        let mut sender = node(0, Conduct::Faulty(FaultBehavior::Equivocate));
        let out = sender.step(1, Vec::new()).unwrap();
        let values: Vec<_> = out.iter().map(|o| o.payload.value()).collect();
        assert_eq!(values, ["1", "0", "1", "0"]);
    }

    #[test]
    fn equivocating_relay_skips_odd_peers() {
        let mut relay = node(1, Conduct::Faulty(FaultBehavior::Equivocate));
        let cert = CertifiedValue::originate(0, "1");
        let out = relay.step(2, vec![delivered(0, cert)]).unwrap();
        let recipients: Vec<_> = out.iter().map(|o| o.recipient).collect();
        assert_eq!(
            recipients,
            [
                crate::network::Recipient::One(0),
                crate::network::Recipient::One(2)
            ]
        );
    }

    #[test]
    fn forgeries_are_rejected() {
        let mut forger = node(3, Conduct::Faulty(FaultBehavior::Forge));
        let fabricated = forger.step(1, Vec::new()).unwrap();
        let relayed = forger
            .step(2, vec![delivered(0, CertifiedValue::originate(0, "1"))])
            .unwrap();
        assert_eq!(relayed[0].payload.signers(), vec![0, 3, 3]);

        let mut receiver = node(2, Conduct::Honest);
        let inbox = fabricated
            .into_iter()
            .chain(relayed)
            .map(|o| delivered(3, o.payload))
            .collect();
        assert!(receiver.step(3, inbox).unwrap().is_empty());
        assert!(receiver.extracted().is_empty());
    }

    #[test]
    fn conflicting_bit() {
        assert_eq!(conflicting_value("1"), "0");
        assert_eq!(conflicting_value("0"), "1");
        assert_eq!(conflicting_value("attack"), "1");
    }
}
