//! Interestingness oracles consulted by admission control.
//!
//! An oracle sees candidate equations that would otherwise be pooled and
//! may ask for them to be inserted. The engine only uses its boolean
//! answer; what makes an equation interesting is the oracle's business.

use crate::node::NodeStore;
use crate::word::{invert_with, Generator, Word};
use std::collections::BTreeMap;
use std::fmt;

/// Word reduction as seen by an oracle.
pub trait Reducer {
    /// Irreducible form of `word`, or `None` if it overflows.
    fn reduce_word(&self, word: &[Generator]) -> Option<Word>;

    /// Formal inverse of `word`, if every letter is invertible.
    fn inverse(&self, word: &[Generator]) -> Option<Word>;
}

/// [`Reducer`] over a node store with a length cap.
pub struct StoreReducer<'a> {
    pub store: &'a NodeStore,
    pub inverses: &'a [Option<Generator>],
    pub max_len: usize,
}

impl Reducer for StoreReducer<'_> {
    fn reduce_word(&self, word: &[Generator]) -> Option<Word> {
        self.store.reduce(word, self.max_len).ok().map(|r| r.word)
    }

    fn inverse(&self, word: &[Generator]) -> Option<Word> {
        invert_with(self.inverses, word)
    }
}

/// External judgement of candidate equations.
pub trait InterestOracle: fmt::Debug {
    /// `true` if the equation should be inserted even though size rules
    /// would pool it.
    fn is_interesting(&self, lhs: &[Generator], rhs: &[Generator], reducer: &dyn Reducer) -> bool;

    /// Records an equation that entered the trie.
    fn learn(&mut self, lhs: &[Generator], rhs: &[Generator], reducer: &dyn Reducer);

    /// Forgets an equation that left the trie.
    fn retract(&mut self, lhs: &[Generator], rhs: &[Generator], reducer: &dyn Reducer);

    /// Inactive oracles are never consulted and get no learn/retract jobs.
    fn is_active(&self) -> bool {
        true
    }
}

/// Oracle that finds nothing interesting.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOracle;

impl InterestOracle for NoOracle {
    fn is_interesting(&self, _: &[Generator], _: &[Generator], _: &dyn Reducer) -> bool {
        false
    }

    fn learn(&mut self, _: &[Generator], _: &[Generator], _: &dyn Reducer) {}

    fn retract(&mut self, _: &[Generator], _: &[Generator], _: &dyn Reducer) {}

    fn is_active(&self) -> bool {
        false
    }
}

/// Tracks the word differences of equations in the trie.
///
/// The differences of `u = v` are the reduced words `u[..i]⁻¹ · v[..i]` for
/// every prefix length `i` (the shorter side padded by its full length). An
/// equation is interesting when one of its short differences has not been
/// seen in any trie equation: inserting it extends the difference set an
/// automatic structure would be built from.
#[derive(Debug, Clone, Default)]
pub struct DifferenceTracker {
    known: BTreeMap<Word, u32>,
    max_difference_length: usize,
}

impl DifferenceTracker {
    /// Tracks differences up to `max_difference_length` letters.
    pub fn new(max_difference_length: usize) -> Self {
        Self {
            known: BTreeMap::new(),
            max_difference_length,
        }
    }

    /// Number of distinct differences currently known.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn knows(&self, difference: &[Generator]) -> bool {
        self.known.contains_key(difference)
    }

    /// Reduced differences of `lhs = rhs` within the length limit.
    ///
    /// Empty when a letter of `lhs` has no inverse.
    pub fn differences(&self, lhs: &[Generator], rhs: &[Generator], reducer: &dyn Reducer) -> Vec<Word> {
        let mut out = Vec::new();
        let n = lhs.len().max(rhs.len());
        for i in 1..=n {
            let u = &lhs[..i.min(lhs.len())];
            let v = &rhs[..i.min(rhs.len())];
            let Some(mut word) = reducer.inverse(u) else {
                return Vec::new();
            };
            word.extend_from_slice(v);
            if let Some(d) = reducer.reduce_word(&word) {
                if !d.is_empty() && d.len() <= self.max_difference_length {
                    out.push(d);
                }
            }
        }
        out.sort();
        out.dedup();
        out
    }
}

impl InterestOracle for DifferenceTracker {
    fn is_interesting(&self, lhs: &[Generator], rhs: &[Generator], reducer: &dyn Reducer) -> bool {
        self.differences(lhs, rhs, reducer)
            .iter()
            .any(|d| !self.knows(d))
    }

    fn learn(&mut self, lhs: &[Generator], rhs: &[Generator], reducer: &dyn Reducer) {
        for d in self.differences(lhs, rhs, reducer) {
            *self.known.entry(d).or_insert(0) += 1;
        }
    }

    fn retract(&mut self, lhs: &[Generator], rhs: &[Generator], reducer: &dyn Reducer) {
        for d in self.differences(lhs, rhs, reducer) {
            if let Some(count) = self.known.get_mut(&d) {
                *count -= 1;
                if *count == 0 {
                    self.known.remove(&d);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Free group on `a` (0), `A` (1): reduction cancels `aA` and `Aa`.
    struct FreeCyclic;

    impl Reducer for FreeCyclic {
        fn reduce_word(&self, word: &[Generator]) -> Option<Word> {
            let mut out: Word = Vec::new();
            for &g in word {
                match out.last() {
                    Some(&last) if last.as_u16() ^ 1 == g.as_u16() => {
                        out.pop();
                    }
                    _ => out.push(g),
                }
            }
            Some(out)
        }

        fn inverse(&self, word: &[Generator]) -> Option<Word> {
            Some(word.iter().rev().map(|g| Generator::new(g.as_u16() ^ 1)).collect())
        }
    }

    fn w(s: &str) -> Word {
        s.chars()
            .map(|c| Generator::new(if c == 'a' { 0 } else { 1 }))
            .collect()
    }

    #[test]
    fn differences_of_a_power_relation() {
        let tracker = DifferenceTracker::new(8);
        // aaa = A has differences AA, AAA and AAAA.
        let diffs = tracker.differences(&w("aaa"), &w("A"), &FreeCyclic);
        assert_eq!(diffs, vec![w("AA"), w("AAA"), w("AAAA")]);
        assert!(!diffs.iter().any(Vec::is_empty));
    }

    #[test]
    fn learning_makes_equations_uninteresting() {
        let mut tracker = DifferenceTracker::new(8);
        let (l, r) = (w("aaa"), w("A"));
        assert!(tracker.is_interesting(&l, &r, &FreeCyclic));
        tracker.learn(&l, &r, &FreeCyclic);
        assert!(!tracker.is_interesting(&l, &r, &FreeCyclic));
        assert!(!tracker.is_empty());
        tracker.retract(&l, &r, &FreeCyclic);
        assert!(tracker.is_empty());
    }

    #[test]
    fn length_limit_filters_differences() {
        let tracker = DifferenceTracker::new(1);
        assert!(tracker.differences(&w("aaa"), &w("A"), &FreeCyclic).iter().all(|d| d.len() <= 1));
    }

    #[test]
    fn no_oracle_is_inactive() {
        assert!(!NoOracle.is_active());
        assert!(!NoOracle.is_interesting(&w("aa"), &w(""), &FreeCyclic));
    }
}
