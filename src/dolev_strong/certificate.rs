// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Values carried together with their certification chain.

use std::fmt::Display;

use thiserror::Error;

use crate::ProcessId;
use crate::crypto::Endorsement;

/// Reasons for not accepting a [`CertifiedValue`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum CertificationError {
    #[error("value carries no endorsements")]
    Unendorsed,
    #[error("chain has {have} endorsements, {need} are required")]
    TooShort { have: usize, need: usize },
    #[error("chain does not start with the designated sender")]
    NotFromSender,
    #[error("chain contains unknown signer {0}")]
    UnknownSigner(ProcessId),
    #[error("chain contains signer {0} more than once")]
    RepeatedSigner(ProcessId),
    #[error("endorsement of signer {0} does not verify")]
    InvalidEndorsement(ProcessId),
}

/// A value together with the ordered endorsements vouching for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertifiedValue {
    value: String,
    endorsements: Vec<Endorsement>,
}

impl CertifiedValue {
    /// Creates the initial certificate of the sender for its input.
    #[must_use]
    pub fn originate(sender: ProcessId, value: impl Into<String>) -> Self {
        let value = value.into();
        let endorsements = vec![Endorsement::new(sender, &value, &[])];
        Self {
            value,
            endorsements,
        }
    }

    /// Creates a certificate whose chain is `signer` repeated `copies` times.
    ///
    /// Each endorsement verifies on its own, yet the chain as a whole never
    /// passes [`CertifiedValue::check`].
    #[must_use]
    pub fn forged(value: impl Into<String>, signer: ProcessId, copies: usize) -> Self {
        let mut forged = Self {
            value: value.into(),
            endorsements: Vec::with_capacity(copies),
        };
        for _ in 0..copies {
            forged = forged.extend(signer);
        }
        forged
    }

    /// Returns a copy of this certificate with `signer`'s endorsement appended.
    #[must_use]
    pub fn extend(&self, signer: ProcessId) -> Self {
        let mut endorsements = self.endorsements.clone();
        endorsements.push(Endorsement::new(signer, &self.value, &self.endorsements));
        Self {
            value: self.value.clone(),
            endorsements,
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the identities in the chain, in endorsement order.
    #[must_use]
    pub fn signers(&self) -> Vec<ProcessId> {
        self.endorsements.iter().map(Endorsement::signer).collect()
    }

    /// Number of endorsements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endorsements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endorsements.is_empty()
    }

    #[must_use]
    pub fn endorsed_by(&self, id: ProcessId) -> bool {
        self.endorsements.iter().any(|e| e.signer() == id)
    }

    #[must_use]
    pub fn has_distinct_signers(&self) -> bool {
        let mut signers = self.signers();
        signers.sort_unstable();
        signers.windows(2).all(|w| w[0] != w[1])
    }

    /// Checks whether this certificate may be accepted.
    ///
    /// `min_len` is the number of endorsements required in the current round.
    ///
    /// # Errors
    ///
    /// Returns the first [`CertificationError`] found.
    pub fn check(
        &self,
        sender: ProcessId,
        num_processes: u64,
        min_len: usize,
    ) -> Result<(), CertificationError> {
        let first = self
            .endorsements
            .first()
            .ok_or(CertificationError::Unendorsed)?;
        if first.signer() != sender {
            return Err(CertificationError::NotFromSender);
        }
        let mut seen = vec![false; num_processes as usize];
        for e in &self.endorsements {
            let signer = e.signer();
            let slot = seen
                .get_mut(signer as usize)
                .ok_or(CertificationError::UnknownSigner(signer))?;
            if *slot {
                return Err(CertificationError::RepeatedSigner(signer));
            }
            *slot = true;
        }
        if self.len() < min_len {
            return Err(CertificationError::TooShort {
                have: self.len(),
                need: min_len,
            });
        }
        for (i, e) in self.endorsements.iter().enumerate() {
            if !e.verify(&self.value, &self.endorsements[..i]) {
                return Err(CertificationError::InvalidEndorsement(e.signer()));
            }
        }
        Ok(())
    }
}

impl Display for CertifiedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} via [", self.value)?;
        for (i, e) in self.endorsements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn originate_and_extend() {
        let cert = CertifiedValue::originate(0, "1");
        assert_eq!(cert.value(), "1");
        assert_eq!(cert.signers(), vec![0]);
        cert.check(0, 4, 1).unwrap();

        let relayed = cert.extend(2).extend(3);
        assert_eq!(relayed.signers(), vec![0, 2, 3]);
        assert!(relayed.endorsed_by(2));
        assert!(!relayed.endorsed_by(1));
        relayed.check(0, 4, 3).unwrap();
        // the relayed copy leaves the source alone
        assert_eq!(cert.len(), 1);
    }

    #[test]
    fn too_short() {
        let cert = CertifiedValue::originate(0, "1");
        assert_eq!(
            cert.check(0, 4, 2),
            Err(CertificationError::TooShort { have: 1, need: 2 })
        );
    }

    #[test]
    fn wrong_sender() {
        let cert = CertifiedValue::originate(1, "1");
        assert_eq!(cert.check(0, 4, 1), Err(CertificationError::NotFromSender));
    }

    #[test]
    fn unknown_signer() {
        let cert = CertifiedValue::originate(0, "1").extend(7);
        assert_eq!(
            cert.check(0, 4, 2),
            Err(CertificationError::UnknownSigner(7))
        );
    }

    #[test]
    fn forged_chain_is_rejected() {
        let cert = CertifiedValue::forged("1", 0, 2);
        assert_eq!(cert.signers(), vec![0, 0]);
        assert!(!cert.has_distinct_signers());
        assert_eq!(
            cert.check(0, 4, 1),
            Err(CertificationError::RepeatedSigner(0))
        );

        let cert = CertifiedValue::forged("forged-2", 2, 2);
        assert_eq!(cert.check(0, 4, 1), Err(CertificationError::NotFromSender));

        let empty = CertifiedValue::forged("1", 0, 0);
        assert!(empty.is_empty());
        assert_eq!(empty.check(0, 4, 0), Err(CertificationError::Unendorsed));
    }

    #[test]
    fn tampered_value_is_rejected() {
        let mut cert = CertifiedValue::originate(0, "1").extend(1);
        cert.value = "0".into();
        assert_eq!(
            cert.check(0, 4, 2),
            Err(CertificationError::InvalidEndorsement(0))
        );
    }

    #[test]
    fn display() {
        let cert = CertifiedValue::originate(0, "1").extend(3);
        let s = cert.to_string();
        assert!(s.starts_with("\"1\" via [0:"));
        assert!(s.contains(", 3:"));
    }
}
