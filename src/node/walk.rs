//! Walking the trie: transitions, suffix fallback, reduction and census.

use super::{NodeStore, SuffixLink};
use crate::arena::{NodeId, ROOT};
use crate::certificate::Validity;
use crate::word::{Generator, Word};
use std::collections::BTreeMap;
use thiserror::Error;

/// A word grew past the maximum length while being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("word length {length} exceeds the maximum of {max}")]
pub struct ReductionOverflow {
    pub length: usize,
    pub max: usize,
}

/// Outcome of [`NodeStore::reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// The irreducible word.
    pub word: Word,
    /// `true` if at least one rule was applied.
    pub changed: bool,
    /// Automaton state after reading `word`.
    pub state: NodeId,
}

impl NodeStore {
    /// Follows `g` from `state`.
    ///
    /// Returns the longest suffix of `word(state)·g` that is a linked node.
    /// The result may be much shorter than the word walked so far when
    /// intermediate words have been pruned; the fallback chain always ends
    /// at the root, which accepts every generator.
    pub fn transition(&self, state: NodeId, g: Generator) -> NodeId {
        let mut s = state;
        loop {
            if let Some(c) = self.child(s, g) {
                return c;
            }
            if s == ROOT {
                return ROOT;
            }
            s = self.suffix(s);
        }
    }

    /// Longest proper suffix of `word(id)` that is a linked node.
    ///
    /// Cached per node behind a certificate. A checkable cache entry is
    /// revalidated by searching only the suffixes longer than the cached one.
    pub fn suffix(&self, id: NodeId) -> NodeId {
        let node = self.node(id);
        if node.length <= 1 {
            return ROOT;
        }
        let (min_len, mut found) = match node.suffix.get() {
            Some(link) => match self.generations.check(&link.cert) {
                Validity::Valid => return link.target,
                Validity::Checkable => (link.target_len as usize + 1, link.target),
                Validity::Invalid => (1, ROOT),
            },
            None => (1, ROOT),
        };
        let word = self.word(id);
        let n = word.len();
        for len in (min_len..n).rev() {
            if let Some(target) = self.find(&word[n - len..]) {
                found = target;
                break;
            }
        }
        node.suffix.set(Some(SuffixLink {
            target: found,
            target_len: self.node(found).length,
            cert: self.certificate(),
        }));
        found
    }

    /// Reduces `word` to its irreducible form.
    ///
    /// Keeps a stack of automaton states, one per output letter, so a rewrite
    /// resumes from the state just before the replaced left-hand side.
    /// Fails if the word being rewritten ever exceeds `max_len`.
    pub fn reduce(&self, word: &[Generator], max_len: usize) -> Result<Reduction, ReductionOverflow> {
        if word.len() > max_len {
            return Err(ReductionOverflow {
                length: word.len(),
                max: max_len,
            });
        }
        let mut pending: Word = word.iter().rev().copied().collect();
        let mut out: Word = Vec::with_capacity(word.len());
        let mut states: Vec<NodeId> = Vec::with_capacity(word.len() + 1);
        states.push(ROOT);
        let mut changed = false;
        while let Some(g) = pending.pop() {
            let state = self.transition(states[states.len() - 1], g);
            out.push(g);
            states.push(state);
            if let Some(eq) = self.node(state).equation() {
                let lhs_len = self.node(state).length();
                out.truncate(out.len() - lhs_len);
                states.truncate(states.len() - lhs_len);
                let rhs = self.word(eq.rhs);
                pending.extend(rhs.iter().rev());
                changed = true;
                let length = out.len() + pending.len();
                if length > max_len {
                    return Err(ReductionOverflow { length, max: max_len });
                }
            }
        }
        Ok(Reduction {
            word: out,
            changed,
            state: states[states.len() - 1],
        })
    }

    /// Position just past the first left-hand side occurrence in `word`.
    ///
    /// Returns `(end, equation)` for the leftmost-ending match, or `None` if
    /// `word` is irreducible.
    pub fn first_match(&self, word: &[Generator]) -> Option<(usize, NodeId)> {
        let mut state = ROOT;
        for (i, &g) in word.iter().enumerate() {
            state = self.transition(state, g);
            if self.node(state).is_final() {
                return Some((i + 1, state));
            }
        }
        None
    }

    /// `true` if no left-hand side occurs in `word`.
    pub fn is_irreducible(&self, word: &[Generator]) -> bool {
        self.first_match(word).is_none()
    }

    /// Counts irreducible words by length, for lengths `0..=max_len`.
    ///
    /// Dynamic programming over automaton states: words reaching the same
    /// state have the same irreducible continuations.
    pub fn census(&self, max_len: usize) -> Vec<u64> {
        let mut counts = Vec::with_capacity(max_len + 1);
        counts.push(1u64);
        let mut level: BTreeMap<NodeId, u64> = BTreeMap::new();
        level.insert(ROOT, 1);
        for _ in 0..max_len {
            let mut next: BTreeMap<NodeId, u64> = BTreeMap::new();
            for (&state, &count) in &level {
                for i in 0..self.alphabet_len {
                    let target = self.transition(state, Generator::new(i as u16));
                    if self.node(target).is_final() {
                        continue;
                    }
                    let slot = next.entry(target).or_insert(0);
                    *slot = slot.saturating_add(count);
                }
            }
            counts.push(next.values().fold(0u64, |acc, &c| acc.saturating_add(c)));
            level = next;
        }
        counts
    }
}
