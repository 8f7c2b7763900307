// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use super::block::Block;
use crate::{ProcessId, Round};

/// Reasons for rejecting a received chain.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,
    #[error("chain does not start at the genesis block")]
    WrongGenesis,
    #[error("block at index {index} claims height {height}")]
    HeightMismatch { index: usize, height: u64 },
    #[error("block at height {0} does not link to its predecessor")]
    BrokenLink(u64),
}

/// Sequence of blocks from genesis to a tip.
///
/// Chains handed out by this module are always valid.
/// Chains received from other processes must be checked with [`Chain::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// Returns the chain consisting of only the genesis block.
    #[must_use]
    pub fn genesis() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    /// Returns a copy of this chain extended by one block.
    #[must_use]
    pub fn extended(&self, round: Round, proposer: ProcessId, entry: String) -> Self {
        let mut blocks = self.blocks.clone();
        blocks.push(Block::child_of(self.tip(), round, proposer, entry));
        Self { blocks }
    }

    /// Appends `block` without checking that it links to the tip.
    pub(crate) fn push_unchecked(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Checks that this chain starts at genesis and every block links to its predecessor.
    ///
    /// # Errors
    ///
    /// Returns the first [`ChainError`] found, scanning from genesis.
    pub fn validate(&self) -> Result<(), ChainError> {
        let (first, rest) = self.blocks.split_first().ok_or(ChainError::Empty)?;
        if !first.is_genesis() {
            return Err(ChainError::WrongGenesis);
        }
        let mut prev = first;
        for (i, block) in rest.iter().enumerate() {
            if block.height() != prev.height() + 1 {
                return Err(ChainError::HeightMismatch {
                    index: i + 1,
                    height: block.height(),
                });
            }
            if block.parent() != prev.hash() {
                return Err(ChainError::BrokenLink(block.height()));
            }
            prev = block;
        }
        Ok(())
    }

    /// Number of blocks, genesis included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the last block.
    ///
    /// # Panics
    ///
    /// Panics if the chain is empty, which can only happen for received chains
    /// that failed [`Chain::validate`].
    #[must_use]
    pub fn tip(&self) -> &Block {
        self.blocks.last().expect("chain contains at least genesis")
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns the log, i.e. the entries of all blocks in order.
    #[must_use]
    pub fn log(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.entry().to_owned()).collect()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::genesis()
    }
}
