// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common interface of the per-process protocol state machines.
//!
//! The harness drives every protocol the same way: in each round it collects
//! the inbox of every process from the [`MessageBus`], lets every process
//! [`step`] once, and only then posts all outboxes back to the bus.
//! After the last round, [`finish`] hands each process whatever was sent in
//! that final round.
//!
//! [`MessageBus`]: crate::MessageBus
//! [`step`]: ProtocolNode::step
//! [`finish`]: ProtocolNode::finish

use thiserror::Error;

use crate::network::{Delivery, Outgoing};
use crate::{ProcessId, Round};

/// Internal invariant violations detected by a protocol node.
///
/// These indicate a defect in the engine, never adversarial input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("process {process} would relay a certification chain repeating an identity: {chain:?}")]
    RepeatedIdentity {
        process: ProcessId,
        chain: Vec<ProcessId>,
    },
    #[error("adopted chain of process {process} shrank from {from} to {to}")]
    ChainShrank {
        process: ProcessId,
        from: usize,
        to: usize,
    },
}

/// State machine of a single simulated process.
pub trait ProtocolNode: Send {
    /// Payload exchanged over the bus.
    type Message: Clone + Send + Sync;

    /// Identity of this process.
    fn id(&self) -> ProcessId;

    /// Executes `round` for this process.
    ///
    /// `inbox` holds everything sent to this process before `round`.
    /// Returns the messages to send in `round`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] iff an internal invariant is violated.
    fn step(
        &mut self,
        round: Round,
        inbox: Vec<Delivery<Self::Message>>,
    ) -> Result<Vec<Outgoing<Self::Message>>, ProtocolError>;

    /// Consumes the messages sent in the final round.
    ///
    /// `round` is one past the last executed round. By default they are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] iff an internal invariant is violated.
    fn finish(
        &mut self,
        _round: Round,
        _inbox: Vec<Delivery<Self::Message>>,
    ) -> Result<(), ProtocolError> {
        Ok(())
    }
}
