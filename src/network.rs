// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synchronous round-based message bus.
//!
//! The [`MessageBus`] connects all simulated processes of one run.
//! It implements the synchronous network model:
//! - everything sent in round `r` is delivered at the start of round `r + 1`
//! - nothing sent in round `r` is visible to any process during round `r`
//! - each message reaches each of its recipients exactly once, in sending order
//!
//! The bus does not police content. A faulty process is free to send
//! different payloads to different recipients in the same round.
//!
//! # Examples
//!
//! ```
//! use blockchain_consensus::MessageBus;
//!
//! let mut bus = MessageBus::new(3);
//! bus.broadcast(1, 0, "hello").unwrap();
//! assert!(bus.deliver(1, 2).unwrap().is_empty());
//! let delivered = bus.deliver(2, 2).unwrap();
//! assert_eq!(delivered[0].sender, 0);
//! assert_eq!(delivered[0].payload, "hello");
//! ```

use log::trace;
use thiserror::Error;

use crate::{ProcessId, Round};

/// Misuse of the bus by the engine itself.
///
/// None of these can be caused by faulty processes.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("unknown sender {0}")]
    UnknownSender(ProcessId),
    #[error("unknown recipient {0}")]
    UnknownRecipient(ProcessId),
    #[error("message for round {round} sent after round {latest} was already written")]
    RoundRegression { round: Round, latest: Round },
}

/// Addressee of an outgoing message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    /// Every process, the sender included.
    All,
    /// A single process.
    One(ProcessId),
}

impl Recipient {
    const fn includes(self, id: ProcessId) -> bool {
        match self {
            Self::All => true,
            Self::One(recipient) => recipient == id,
        }
    }
}

/// Message a process wants to send at the end of its step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outgoing<M> {
    pub recipient: Recipient,
    pub payload: M,
}

impl<M> Outgoing<M> {
    #[must_use]
    pub const fn to_all(payload: M) -> Self {
        Self {
            recipient: Recipient::All,
            payload,
        }
    }

    #[must_use]
    pub const fn to_one(recipient: ProcessId, payload: M) -> Self {
        Self {
            recipient: Recipient::One(recipient),
            payload,
        }
    }
}

/// Message handed to a recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery<M> {
    pub sender: ProcessId,
    pub payload: M,
}

#[derive(Debug)]
struct Envelope<M> {
    round: Round,
    sender: ProcessId,
    recipient: Recipient,
    payload: M,
}

/// Round-scoped message log shared by all processes of a run.
///
/// Entries every recipient has moved past are dropped, so the log only
/// holds messages still pending for some process.
#[derive(Debug)]
pub struct MessageBus<M> {
    num_processes: u64,
    /// Messages not yet passed by every recipient, ordered by round.
    log: Vec<Envelope<M>>,
    /// Per recipient, index of the first log entry not yet considered.
    cursors: Vec<usize>,
    /// Highest round written so far.
    latest_round: Round,
}

impl<M: Clone> MessageBus<M> {
    /// Creates an empty bus connecting processes `0..num_processes`.
    #[must_use]
    pub fn new(num_processes: u64) -> Self {
        Self {
            num_processes,
            log: Vec::new(),
            cursors: vec![0; num_processes as usize],
            latest_round: 0,
        }
    }

    /// Sends `payload` from `sender` to every process in `round`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError`] if `sender` is unknown or `round` lies before
    /// a round that was already written.
    pub fn broadcast(&mut self, round: Round, sender: ProcessId, payload: M) -> Result<(), BusError> {
        self.push(round, sender, Recipient::All, payload)
    }

    /// Sends `payload` from `sender` to the single process `recipient` in `round`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError`] if either process is unknown or `round` lies
    /// before a round that was already written.
    pub fn send(
        &mut self,
        round: Round,
        sender: ProcessId,
        recipient: ProcessId,
        payload: M,
    ) -> Result<(), BusError> {
        self.push(round, sender, Recipient::One(recipient), payload)
    }

    /// Sends an [`Outgoing`] message produced by a process step.
    ///
    /// # Errors
    ///
    /// See [`MessageBus::send`].
    pub fn post(&mut self, round: Round, sender: ProcessId, msg: Outgoing<M>) -> Result<(), BusError> {
        self.push(round, sender, msg.recipient, msg.payload)
    }

    /// Returns all messages for `recipient` sent before `round` and not yet delivered.
    ///
    /// Messages are returned in sending order.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::UnknownRecipient`] if `recipient` is not on this bus.
    pub fn deliver(&mut self, round: Round, recipient: ProcessId) -> Result<Vec<Delivery<M>>, BusError> {
        let cursor = self
            .cursors
            .get_mut(recipient as usize)
            .ok_or(BusError::UnknownRecipient(recipient))?;
        let mut delivered = Vec::new();
        while let Some(envelope) = self.log.get(*cursor) {
            if envelope.round >= round {
                break;
            }
            if envelope.recipient.includes(recipient) {
                delivered.push(Delivery {
                    sender: envelope.sender,
                    payload: envelope.payload.clone(),
                });
            }
            *cursor += 1;
        }
        trace!(
            "delivered {} messages to process {recipient} in round {round}",
            delivered.len()
        );
        self.compact();
        Ok(delivered)
    }

    /// Returns the number of messages sent in `round` that are still pending
    /// for at least one recipient.
    #[must_use]
    pub fn sent_in(&self, round: Round) -> usize {
        self.log.iter().filter(|e| e.round == round).count()
    }

    /// Returns the number of messages not yet passed by every recipient.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Drops the log prefix that every recipient has already moved past.
    fn compact(&mut self) {
        let Some(&passed) = self.cursors.iter().min() else {
            return;
        };
        if passed == 0 {
            return;
        }
        self.log.drain(..passed);
        for cursor in &mut self.cursors {
            *cursor -= passed;
        }
    }

    fn push(
        &mut self,
        round: Round,
        sender: ProcessId,
        recipient: Recipient,
        payload: M,
    ) -> Result<(), BusError> {
        if sender >= self.num_processes {
            return Err(BusError::UnknownSender(sender));
        }
        if let Recipient::One(id) = recipient {
            if id >= self.num_processes {
                return Err(BusError::UnknownRecipient(id));
            }
        }
        if round < self.latest_round {
            return Err(BusError::RoundRegression {
                round,
                latest: self.latest_round,
            });
        }
        self.latest_round = round;
        self.log.push(Envelope {
            round,
            sender,
            recipient,
            payload,
        });
        Ok(())
    }
}
