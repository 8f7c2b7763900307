// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic hash function.
//!
//! This module abstracts the hash function used for block links and
//! endorsement tags. Currently, SHA-256 is used.

use sha2::{Digest, Sha256};

/// Regular 256-bit hash, used to link blocks.
pub type Hash = [u8; 32];

/// Short 128-bit hash, used for endorsement tags.
///
/// Collisions only need to be hard to find by accident here,
/// the simulated adversary never searches for them.
pub type ShortHash = [u8; 16];

/// Hash every parent link of the genesis block points to.
pub const ZERO_HASH: Hash = [0; 32];

/// Hashes the given data using SHA-256.
#[must_use]
pub fn hash(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hashes all the given data slices together using SHA-256.
///
/// Every slice is prefixed with its length, so `["ab", "c"]` and `["a", "bc"]`
/// hash differently.
#[must_use]
pub fn hash_all(data: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for item in data {
        hasher.update((item.len() as u64).to_be_bytes());
        hasher.update(item);
    }
    hasher.finalize().into()
}

/// Truncates the given hash into a [`ShortHash`].
#[must_use]
pub fn truncate(hash: Hash) -> ShortHash {
    let mut short = [0; 16];
    short.copy_from_slice(&hash[..16]);
    short
}
