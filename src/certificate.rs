//! Staleness certificates for cached trie-walk state.
//!
//! The node store keeps two generation counters. The *structure* generation
//! moves on every change that can alter a walk (a node linked or unlinked, an
//! equation attached or its right-hand side replaced). The *removal*
//! generation moves only when a node is unlinked. A certificate snapshots both.
//!
//! # Invariants
//! - Equal structure generation: nothing has changed, the cached state is
//!   [`Validity::Valid`].
//! - Removal generation moved: something the cached state may depend on is
//!   gone, the cached state is [`Validity::Invalid`].
//! - Otherwise only additions happened: the cached state still exists but a
//!   longer match may now be available, [`Validity::Checkable`].

use serde::{Deserialize, Serialize};

/// Snapshot of the store generations taken alongside cached state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Certificate {
    structure: u64,
    removal: u64,
}

/// Result of checking a [`Certificate`] against the current generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Validity {
    /// Nothing changed since the snapshot.
    Valid,
    /// A removal happened; recompute from scratch.
    Invalid,
    /// Only additions happened; re-walk from the cached depth.
    Checkable,
}

/// The pair of counters owned by a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generations {
    structure: u64,
    removal: u64,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an addition or an in-place change.
    #[inline]
    pub fn bump_structure(&mut self) {
        self.structure += 1;
    }

    /// Records a removal. Removals are structural changes too.
    #[inline]
    pub fn bump_removal(&mut self) {
        self.structure += 1;
        self.removal += 1;
    }

    /// Snapshots the current generations.
    #[inline]
    pub fn certificate(&self) -> Certificate {
        Certificate {
            structure: self.structure,
            removal: self.removal,
        }
    }

    /// Classifies a previously taken certificate.
    ///
    /// # Panics
    /// Panics if the certificate is from the future, which means it was taken
    /// from a different store.
    pub fn check(&self, cert: &Certificate) -> Validity {
        assert!(
            cert.structure <= self.structure && cert.removal <= self.removal,
            "certificate {:?} was not issued by this store (now {:?})",
            cert,
            self
        );
        if cert.structure == self.structure {
            Validity::Valid
        } else if cert.removal < self.removal {
            Validity::Invalid
        } else {
            Validity::Checkable
        }
    }

    pub fn structure(&self) -> u64 {
        self.structure
    }

    pub fn removal(&self) -> u64 {
        self.removal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_certificate_is_valid() {
        let gens = Generations::new();
        assert_eq!(gens.check(&gens.certificate()), Validity::Valid);
    }

    #[test]
    fn additions_make_it_checkable() {
        let mut gens = Generations::new();
        let cert = gens.certificate();
        gens.bump_structure();
        assert_eq!(gens.check(&cert), Validity::Checkable);
    }

    #[test]
    fn removals_invalidate() {
        let mut gens = Generations::new();
        let cert = gens.certificate();
        gens.bump_removal();
        assert_eq!(gens.check(&cert), Validity::Invalid);
        // A removal alone never leaves the certificate valid.
        assert_ne!(gens.check(&cert), Validity::Valid);
    }

    #[test]
    fn never_valid_after_any_change() {
        let mut gens = Generations::new();
        let mut certs = Vec::new();
        for step in 0..20 {
            certs.push(gens.certificate());
            if step % 3 == 0 {
                gens.bump_removal();
            } else {
                gens.bump_structure();
            }
            for cert in &certs {
                assert_ne!(gens.check(cert), Validity::Valid);
            }
        }
    }

    #[test]
    #[should_panic(expected = "was not issued by this store")]
    fn foreign_certificate_panics() {
        let mut other = Generations::new();
        other.bump_structure();
        let cert = other.certificate();
        Generations::new().check(&cert);
    }
}
