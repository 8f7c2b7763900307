// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulated participants.

use crate::config::{FaultBehavior, Mode, SimulationConfig};
use crate::ProcessId;

/// Whether a process follows the protocol.
///
/// Fixed for the whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conduct {
    Honest,
    Faulty(FaultBehavior),
}

/// Role of a process in broadcast mode.
///
/// Chain-growth processes are all [`Role::Receiver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

/// Identity, conduct and role of one participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Process {
    pub id: ProcessId,
    pub conduct: Conduct,
    pub role: Role,
}

impl Process {
    #[must_use]
    pub const fn honest(id: ProcessId) -> Self {
        Self {
            id,
            conduct: Conduct::Honest,
            role: Role::Receiver,
        }
    }

    #[must_use]
    pub const fn is_honest(&self) -> bool {
        matches!(self.conduct, Conduct::Honest)
    }

    #[must_use]
    pub const fn is_sender(&self) -> bool {
        matches!(self.role, Role::Sender)
    }

    /// Returns the fault behavior, `None` for honest processes.
    #[must_use]
    pub const fn fault(&self) -> Option<FaultBehavior> {
        match self.conduct {
            Conduct::Honest => None,
            Conduct::Faulty(behavior) => Some(behavior),
        }
    }
}

/// Creates all processes declared by the configuration, ordered by identity.
#[must_use]
pub fn processes_from_config(config: &SimulationConfig) -> Vec<Process> {
    (0..config.processes)
        .map(|id| {
            let conduct = config
                .behavior_of(id)
                .map_or(Conduct::Honest, Conduct::Faulty);
            let role = if config.mode == Mode::DolevStrong && id == config.broadcast.sender {
                Role::Sender
            } else {
                Role::Receiver
            };
            Process { id, conduct, role }
        })
        .collect()
}
