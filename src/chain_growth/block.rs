// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hash-linked log entries.

use std::fmt::Display;

use crate::crypto::hash::{Hash, ZERO_HASH, hash_all};
use crate::{GENESIS_ENTRY, ProcessId, Round};

/// Hash identifying a block.
pub type BlockHash = Hash;

/// One entry of a process's log, linked to its parent by hash.
///
/// Blocks carry no timestamp, so equal contents always hash equally
/// and every run is reproducible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    height: u64,
    parent: BlockHash,
    round: Round,
    proposer: Option<ProcessId>,
    entry: String,
    hash: BlockHash,
}

impl Block {
    /// Returns the genesis block shared by all processes.
    #[must_use]
    pub fn genesis() -> Self {
        Self::from_parts(0, ZERO_HASH, 0, None, GENESIS_ENTRY.to_owned())
    }

    /// Creates a block on top of `parent`.
    #[must_use]
    pub fn child_of(parent: &Block, round: Round, proposer: ProcessId, entry: String) -> Self {
        Self::from_parts(parent.height + 1, parent.hash, round, Some(proposer), entry)
    }

    /// Creates a block with arbitrary contents.
    ///
    /// Nothing ties the result to an existing chain.
    /// Only faulty processes build blocks this way.
    pub(crate) fn from_parts(
        height: u64,
        parent: BlockHash,
        round: Round,
        proposer: Option<ProcessId>,
        entry: String,
    ) -> Self {
        let proposer_bytes = proposer.map_or([0xff; 8], u64::to_be_bytes);
        let hash = hash_all(&[
            &height.to_be_bytes(),
            &parent,
            &round.to_be_bytes(),
            &proposer_bytes,
            entry.as_bytes(),
        ]);
        Self {
            height,
            parent,
            round,
            proposer,
            entry,
            hash,
        }
    }

    #[must_use]
    pub const fn height(&self) -> u64 {
        self.height
    }

    #[must_use]
    pub const fn parent(&self) -> &BlockHash {
        &self.parent
    }

    #[must_use]
    pub const fn hash(&self) -> &BlockHash {
        &self.hash
    }

    /// Round this block was proposed in, 0 for genesis.
    #[must_use]
    pub const fn round(&self) -> Round {
        self.round
    }

    #[must_use]
    pub const fn proposer(&self) -> Option<ProcessId> {
        self.proposer
    }

    /// The opaque log token of this block.
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    #[must_use]
    pub fn is_genesis(&self) -> bool {
        *self == Self::genesis()
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Block(height={}, prev={}..., hash={}...)",
            self.height,
            hex::encode(&self.parent[..4]),
            hex::encode(&self.hash[..4])
        )
    }
}
