//! Equation normalizer.
//!
//! Turns a raw `(lhs, rhs)` pair into the canonical form admission control
//! works on. One normalization round runs, in order:
//!
//! 1. cancellation of common cancellable prefixes and suffixes,
//! 2. reduction of both sides against the node store,
//! 3. orientation (the greater side becomes the left-hand side),
//! 4. coset separator migration and balancing.
//!
//! Rounds repeat until a round changes nothing, so normalizing a normalized
//! equation returns it unchanged.
//!
//! # Failure
//! A word that would grow past the maximum length makes the result
//! `failed`. With [`NormalizeOptions::safe`] unset the overflow is treated as
//! an invariant violation instead.

mod balance;
mod equation;

pub use equation::{Provenance, WorkingEquation};

use crate::node::{NodeStore, ReductionOverflow};
use crate::order::WordOrder;
use crate::word::{Cancellability, Generator, Word};
use std::cmp::Ordering;
use tracing::debug;

/// Upper bound on normalization rounds for one equation.
const MAX_ROUNDS: usize = 64;

/// Options for [`Normalizer::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Report reduction overflow as `failed` instead of aborting.
    pub safe: bool,
    /// Leave the left-hand side alone: no cancellation, reduction or
    /// balancing. Used to correct right-hand sides of trie equations.
    pub keep_lhs: bool,
    /// Balance the sides after reduction.
    pub balance: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            safe: true,
            keep_lhs: false,
            balance: true,
        }
    }
}

impl NormalizeOptions {
    /// Options for right-hand side corrections.
    pub fn correction() -> Self {
        Self {
            keep_lhs: true,
            balance: false,
            ..Self::default()
        }
    }
}

/// Result of a normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub equation: WorkingEquation,
    /// Reduction overflowed or the rounds did not settle; `equation` is the
    /// last oriented form reached.
    pub failed: bool,
}

impl Normalized {
    fn ok(equation: WorkingEquation) -> Self {
        Self {
            equation,
            failed: false,
        }
    }
}

/// Shape of an equation after a balancing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Shape {
    Oriented(Word, Word),
    Trivial,
}

/// Borrowed view of everything normalization reads.
pub struct Normalizer<'a> {
    pub store: &'a NodeStore,
    pub order: &'a dyn WordOrder,
    /// Known inverses, declared or learned.
    pub inverses: &'a [Option<Generator>],
    pub cancellability: &'a Cancellability,
    pub coset_separator: Option<Generator>,
    pub max_word_length: usize,
    /// Non-geodesic balancing stops once both sides are longer than this.
    pub balance_ceiling: usize,
}

impl<'a> Normalizer<'a> {
    /// Normalizes `lhs = rhs`.
    pub fn normalize(
        &self,
        lhs: &[Generator],
        rhs: &[Generator],
        provenance: Provenance,
        options: NormalizeOptions,
    ) -> Normalized {
        self.normalize_within(lhs, rhs, provenance, options, MAX_ROUNDS)
    }

    /// Like [`normalize`](Self::normalize), giving up after `rounds` rounds.
    /// An equation still changing by then may be reducible, so it is
    /// reported as `failed`.
    fn normalize_within(
        &self,
        lhs: &[Generator],
        rhs: &[Generator],
        provenance: Provenance,
        options: NormalizeOptions,
        rounds: usize,
    ) -> Normalized {
        let mut l = lhs.to_vec();
        let mut r = rhs.to_vec();
        for _ in 0..rounds {
            match self.round(&l, &r, options) {
                Ok(Shape::Trivial) => return Normalized::ok(WorkingEquation::trivial(provenance)),
                Ok(Shape::Oriented(nl, nr)) => {
                    if nl == l && nr == r {
                        return Normalized::ok(WorkingEquation::new(l, r, provenance));
                    }
                    l = nl;
                    r = nr;
                }
                Err(overflow) => return self.overflowed(l, r, provenance, options, overflow),
            }
        }
        debug!(lhs = l.len(), rhs = r.len(), rounds, "normalization did not settle");
        Normalized {
            equation: WorkingEquation::new(l, r, provenance),
            failed: true,
        }
    }

    fn overflowed(
        &self,
        l: Word,
        r: Word,
        provenance: Provenance,
        options: NormalizeOptions,
        overflow: ReductionOverflow,
    ) -> Normalized {
        if !options.safe {
            fatal!(
                "reduction overflow in unchecked normalization ({} = {}, {:?}): {}",
                l.len(),
                r.len(),
                provenance,
                overflow
            );
        }
        let equation = match self.order.compare(&l, &r) {
            Ordering::Less => WorkingEquation::new(r, l, provenance),
            Ordering::Equal => WorkingEquation::trivial(provenance),
            Ordering::Greater => WorkingEquation::new(l, r, provenance),
        };
        Normalized {
            equation,
            failed: true,
        }
    }

    fn round(&self, l: &[Generator], r: &[Generator], options: NormalizeOptions) -> Result<Shape, ReductionOverflow> {
        let mut l = l.to_vec();
        let mut r = r.to_vec();
        if !options.keep_lhs {
            self.cancel(&mut l, &mut r);
        }
        r = self.reduce(&r)?;
        if !options.keep_lhs {
            l = self.reduce(&l)?;
        }
        let (l, r) = match self.order.compare(&l, &r) {
            Ordering::Equal => return Ok(Shape::Trivial),
            Ordering::Less => (r, l),
            Ordering::Greater => (l, r),
        };
        if options.keep_lhs || !options.balance {
            return Ok(Shape::Oriented(l, r));
        }
        match self.migrate_separator(l, r)? {
            Shape::Oriented(l, r) => self.balance(l, r),
            Shape::Trivial => Ok(Shape::Trivial),
        }
    }

    /// Reduces `word` against the store.
    pub fn reduce(&self, word: &[Generator]) -> Result<Word, ReductionOverflow> {
        self.store
            .reduce(word, self.max_word_length)
            .map(|reduction| reduction.word)
    }

    /// Strips the common cancellable prefix and suffix.
    pub fn cancel(&self, l: &mut Word, r: &mut Word) {
        let mut prefix = 0;
        while prefix < l.len()
            && prefix < r.len()
            && l[prefix] == r[prefix]
            && self.cancellability.cancels_left(l[prefix])
        {
            prefix += 1;
        }
        l.drain(..prefix);
        r.drain(..prefix);
        let mut suffix = 0;
        while suffix < l.len() && suffix < r.len() {
            let g = l[l.len() - 1 - suffix];
            if g != r[r.len() - 1 - suffix] || !self.cancellability.cancels_right(g) {
                break;
            }
            suffix += 1;
        }
        l.truncate(l.len() - suffix);
        r.truncate(r.len() - suffix);
    }

    fn inverse(&self, g: Generator) -> Option<Generator> {
        self.inverses.get(g.index()).copied().flatten()
    }
}
