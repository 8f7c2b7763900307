// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulated endorsements for certification chains.

use std::fmt::Display;

use super::hash::{ShortHash, hash_all, truncate};
use crate::ProcessId;

/// One link of a certification chain.
///
/// Binds the signer's identity to the endorsed value and to every endorsement
/// that came before it. The tag is keyless, so it only stands in for a
/// signature as long as processes never compute tags for someone else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endorsement {
    signer: ProcessId,
    tag: ShortHash,
}

impl Endorsement {
    /// Endorses `value` as `signer`, on top of the `prior` endorsements.
    #[must_use]
    pub fn new(signer: ProcessId, value: &str, prior: &[Endorsement]) -> Self {
        Self {
            signer,
            tag: compute_tag(signer, value, prior),
        }
    }

    /// Returns the identity of the endorsing process.
    #[must_use]
    pub const fn signer(&self) -> ProcessId {
        self.signer
    }

    /// Checks this endorsement against the value and the preceding endorsements.
    #[must_use]
    pub fn verify(&self, value: &str, prior: &[Endorsement]) -> bool {
        self.tag == compute_tag(self.signer, value, prior)
    }
}

impl Display for Endorsement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.signer, hex::encode(&self.tag[..4]))
    }
}

fn compute_tag(signer: ProcessId, value: &str, prior: &[Endorsement]) -> ShortHash {
    let mut endorsed = Vec::with_capacity(prior.len() * 24);
    for e in prior {
        endorsed.extend_from_slice(&e.signer.to_be_bytes());
        endorsed.extend_from_slice(&e.tag);
    }
    truncate(hash_all(&[
        &signer.to_be_bytes(),
        value.as_bytes(),
        &endorsed,
    ]))
}
