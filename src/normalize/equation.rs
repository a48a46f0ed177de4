//! Working equations and their provenance.

use crate::word::Word;
use serde::{Deserialize, Serialize};

/// Where a candidate equation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provenance {
    /// Declared inverse pair or caller axiom.
    Axiom,
    /// Relation handed in by a caller.
    Relation,
    /// Critical pair of two trie equations, by insertion id.
    Overlap { first: u64, second: u64 },
    /// Right-hand side re-reduction of a trie equation.
    Correction,
    /// Equation unlinked by a newer left-hand side.
    Dubious,
    /// Letter moved across an equation with an invertible end letter.
    PartialReduction,
    /// Cyclic conjugate or inverse of a primary relator.
    Conjugate,
    /// Re-examined pool entry.
    Pool,
    /// Two right-hand sides found for one left-hand side.
    RhsImprovement,
    /// Resubmission after admission asked for another pass.
    Retry,
}

/// A transient `(lhs, rhs)` pair on its way to admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingEquation {
    pub lhs: Word,
    pub rhs: Word,
    pub provenance: Provenance,
}

impl WorkingEquation {
    pub fn new(lhs: Word, rhs: Word, provenance: Provenance) -> Self {
        Self {
            lhs,
            rhs,
            provenance,
        }
    }

    /// The normalized form of an equation that holds trivially.
    pub fn trivial(provenance: Provenance) -> Self {
        Self::new(Word::new(), Word::new(), provenance)
    }

    /// `true` if both sides are equal.
    pub fn is_trivial(&self) -> bool {
        self.lhs == self.rhs
    }

    /// Combined length of both sides.
    pub fn total_len(&self) -> usize {
        self.lhs.len() + self.rhs.len()
    }
}
