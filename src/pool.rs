//! Overflow equation pool.
//!
//! Equations too long or too uninteresting for the trie wait here, keyed by
//! their left-hand side. Each key has exactly one right-hand side: a better
//! one replaces the stored one in place and the loser is handed back to the
//! caller, so the equation the two right-hand sides form is not lost.
//!
//! Every entry remembers the store certificate under which it was last
//! examined. A re-examination with a still-valid certificate would reduce
//! the entry exactly as before and can be skipped.

use crate::certificate::Certificate;
use crate::content::{ContentMetrics, ContentStore, EntryId, SideHandle};
use crate::order::WordOrder;
use crate::word::{word_from_bytes, word_to_bytes, Generator, Word};
use std::cmp::Ordering;

/// Outcome of [`EquationPool::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolInsert {
    /// New left-hand side.
    Added(EntryId),
    /// The left-hand side was already pooled.
    ///
    /// `displaced` is the right-hand side that did not survive: the old one
    /// when `replaced`, otherwise the one just offered.
    Existing {
        id: EntryId,
        displaced: Word,
        replaced: bool,
    },
}

/// Equations held outside the trie.
#[derive(Debug)]
pub struct EquationPool {
    entries: ContentStore,
    rhs: SideHandle<Word>,
    examined: SideHandle<Option<Certificate>>,
}

impl Default for EquationPool {
    fn default() -> Self {
        Self::new()
    }
}

impl EquationPool {
    pub fn new() -> Self {
        let mut entries = ContentStore::new();
        let rhs = entries.attach::<Word>();
        let examined = entries.attach::<Option<Certificate>>();
        Self {
            entries,
            rhs,
            examined,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metrics(&self) -> &ContentMetrics {
        self.entries.metrics()
    }

    /// Pools `lhs = rhs`, keeping the smaller right-hand side per key.
    pub fn insert(&mut self, lhs: &[Generator], rhs: Word, order: &dyn WordOrder) -> PoolInsert {
        let inserted = self.entries.insert(&word_to_bytes(lhs));
        let id = inserted.id;
        if !inserted.duplicate {
            self.store_rhs(id, rhs);
            return PoolInsert::Added(id);
        }
        let current = self.entries.get(self.rhs, id).cloned().unwrap_or_default();
        if order.compare(&rhs, &current) == Ordering::Less {
            self.store_rhs(id, rhs);
            PoolInsert::Existing {
                id,
                displaced: current,
                replaced: true,
            }
        } else {
            PoolInsert::Existing {
                id,
                displaced: rhs,
                replaced: false,
            }
        }
    }

    fn store_rhs(&mut self, id: EntryId, rhs: Word) {
        if let Some(slot) = self.entries.get_mut(self.rhs, id) {
            *slot = rhs;
        }
        if let Some(slot) = self.entries.get_mut(self.examined, id) {
            *slot = None;
        }
    }

    /// Looks up the pooled right-hand side of `lhs`.
    pub fn find(&mut self, lhs: &[Generator]) -> Option<(EntryId, Word)> {
        let id = self.entries.find(&word_to_bytes(lhs))?;
        let rhs = self.entries.get(self.rhs, id)?.clone();
        Some((id, rhs))
    }

    /// The equation stored at `id`.
    pub fn get(&self, id: EntryId) -> Option<(Word, Word)> {
        let lhs = word_from_bytes(self.entries.key(id)?);
        let rhs = self.entries.get(self.rhs, id)?.clone();
        Some((lhs, rhs))
    }

    /// Removes and returns the equation at `id`.
    ///
    /// The last entry moves into `id`, so a scan that removes the entry at
    /// its cursor must not advance the cursor.
    pub fn take(&mut self, id: EntryId) -> Option<(Word, Word)> {
        let equation = self.get(id)?;
        self.entries.remove(id);
        Some(equation)
    }

    /// Certificate under which entry `id` was last examined.
    pub fn examined(&self, id: EntryId) -> Option<Certificate> {
        self.entries.get(self.examined, id).copied().flatten()
    }

    pub fn mark_examined(&mut self, id: EntryId, cert: Certificate) {
        if let Some(slot) = self.entries.get_mut(self.examined, id) {
            *slot = Some(cert);
        }
    }

    /// All pooled equations, in entry order.
    pub fn equations(&self) -> Vec<(Word, Word)> {
        self.entries
            .iter()
            .filter_map(|(id, _)| self.get(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::ShortLex;

    fn w(s: &str) -> Word {
        s.bytes().map(|b| Generator::new(u16::from(b - b'a'))).collect()
    }

    #[test]
    fn smaller_rhs_replaces_in_place() {
        let order = ShortLex::new(3);
        let mut pool = EquationPool::new();
        let id = match pool.insert(&w("cccc"), w("ab"), &order) {
            PoolInsert::Added(id) => id,
            other => panic!("unexpected {:?}", other),
        };
        match pool.insert(&w("cccc"), w("b"), &order) {
            PoolInsert::Existing {
                id: same,
                displaced,
                replaced,
            } => {
                assert_eq!(same, id);
                assert_eq!(displaced, w("ab"));
                assert!(replaced);
            }
            other => panic!("unexpected {:?}", other),
        }
        match pool.insert(&w("cccc"), w("ba"), &order) {
            PoolInsert::Existing {
                displaced,
                replaced,
                ..
            } => {
                assert_eq!(displaced, w("ba"));
                assert!(!replaced);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(id), Some((w("cccc"), w("b"))));
    }

    #[test]
    fn take_relocates_last_entry() {
        let order = ShortLex::new(3);
        let mut pool = EquationPool::new();
        pool.insert(&w("aaa"), w(""), &order);
        pool.insert(&w("bbb"), w("a"), &order);
        pool.insert(&w("ccc"), w("b"), &order);
        let first = EntryId::new(0);
        assert_eq!(pool.take(first), Some((w("aaa"), w(""))));
        assert_eq!(pool.get(first), Some((w("ccc"), w("b"))));
        assert_eq!(pool.len(), 2);
        assert!(pool.find(&w("aaa")).is_none());
    }

    #[test]
    fn examination_certificate_is_cleared_by_a_new_rhs() {
        let order = ShortLex::new(3);
        let mut pool = EquationPool::new();
        let generations = crate::certificate::Generations::new();
        let id = match pool.insert(&w("cc"), w("a"), &order) {
            PoolInsert::Added(id) => id,
            other => panic!("unexpected {:?}", other),
        };
        pool.mark_examined(id, generations.certificate());
        assert!(pool.examined(id).is_some());
        pool.insert(&w("cc"), w(""), &order);
        assert!(pool.examined(id).is_none());
    }
}
