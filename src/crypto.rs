// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hashing and simulated endorsements.
//!
//! Nothing in here is a real signature scheme. Block links and endorsement
//! tags are plain SHA-256 digests, which is enough for a simulated adversary
//! that never fabricates another process's endorsement.

pub mod endorsement;
pub mod hash;

pub use self::endorsement::Endorsement;
pub use self::hash::{Hash, ShortHash, hash, hash_all};
