//! The node store: a shared, reference-counted trie over words.
//!
//! Every node is one word, the path from the root. A node either stands for
//! an irreducible word or carries an equation whose left-hand side is the
//! node's word. Walking the trie with suffix fallback gives an Aho–Corasick
//! style automaton that recognises the left-hand sides, which is what
//! reduction runs on.
//!
//! # Invariants
//! - A linked non-final node is an irreducible word. A linked final node is a
//!   left-hand side all of whose proper subwords are irreducible.
//! - A final node's right-hand side and trailing subword are linked and
//!   non-final whenever the final node itself is linked. When a sweep breaks
//!   this for a right-hand side, the engine re-corrects the equation before
//!   it is used again.
//! - Only linked nodes are reachable by [`NodeStore::transition`]. Unlinked
//!   nodes are *in limbo*: kept alive by their reference count, never used
//!   for reduction.
//! - A node is destroyed only by [`NodeStore::reclaim`], only when it is
//!   unlinked and unreferenced.
//!
//! # Determinism
//! Children are visited in generator order and node ids are allocated from a
//! LIFO free list, so identical edit sequences give identical stores.

mod store;
mod walk;

pub use store::{NodeCounts, NodeStore, StoreMetrics, SweepReport};
pub use walk::{Reduction, ReductionOverflow};

use crate::arena::NodeId;
use crate::certificate::Certificate;
use crate::word::Generator;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Processing state of an equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquationClass {
    /// Inserted, overlaps not yet fully expanded.
    Pending,
    /// All overlaps within the current limits have been scheduled.
    Expanded,
}

/// Classification used in statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeClass {
    /// Linked, no equation.
    Irreducible,
    /// Linked equation, overlaps pending.
    Pending,
    /// Linked equation, overlaps expanded.
    Expanded,
    /// Unlinked, kept alive only by references.
    Limbo,
}

/// Equation data carried by a final node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationData {
    /// Irreducible right-hand side.
    pub rhs: NodeId,
    /// The left-hand side without its first letter.
    pub trailing_subword: NodeId,
    pub class: EquationClass,
    /// Primary equations seed conjugation; secondary ones only reduce.
    pub primary: bool,
    pub axiom: bool,
    /// Monotonic insertion id, never reused.
    pub id: u64,
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Irreducible,
    Equation(EquationData),
}

/// Child table: dense for small alphabets, sparse otherwise.
#[derive(Debug, Clone)]
pub(crate) enum Children {
    Dense(Box<[Option<NodeId>]>),
    /// Sorted by generator.
    Sparse(Vec<(Generator, NodeId)>),
}

impl Children {
    pub(crate) fn new(dense: bool, alphabet_len: usize) -> Self {
        if dense {
            Children::Dense(vec![None; alphabet_len].into_boxed_slice())
        } else {
            Children::Sparse(Vec::new())
        }
    }

    #[inline]
    pub(crate) fn get(&self, g: Generator) -> Option<NodeId> {
        match self {
            Children::Dense(table) => table[g.index()],
            Children::Sparse(list) => list
                .binary_search_by_key(&g, |(k, _)| *k)
                .ok()
                .map(|i| list[i].1),
        }
    }

    /// Inserts a child, switching a crowded sparse table to dense.
    pub(crate) fn insert(&mut self, g: Generator, id: NodeId, alphabet_len: usize) {
        match self {
            Children::Dense(table) => table[g.index()] = Some(id),
            Children::Sparse(list) => {
                match list.binary_search_by_key(&g, |(k, _)| *k) {
                    Ok(i) => list[i].1 = id,
                    Err(i) => list.insert(i, (g, id)),
                }
                if list.len() * 8 > alphabet_len {
                    let mut table = vec![None; alphabet_len].into_boxed_slice();
                    for &(k, v) in list.iter() {
                        table[k.index()] = Some(v);
                    }
                    *self = Children::Dense(table);
                }
            }
        }
    }

    pub(crate) fn remove(&mut self, g: Generator) -> Option<NodeId> {
        match self {
            Children::Dense(table) => table[g.index()].take(),
            Children::Sparse(list) => list
                .binary_search_by_key(&g, |(k, _)| *k)
                .ok()
                .map(|i| list.remove(i).1),
        }
    }

    /// Children in generator order.
    pub(crate) fn entries(&self) -> Vec<(Generator, NodeId)> {
        match self {
            Children::Dense(table) => table
                .iter()
                .enumerate()
                .filter_map(|(i, c)| c.map(|id| (Generator::new(i as u16), id)))
                .collect(),
            Children::Sparse(list) => list.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_dense(&self) -> bool {
        matches!(self, Children::Dense(_))
    }
}

/// Cached suffix fallback of a node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SuffixLink {
    pub(crate) target: NodeId,
    pub(crate) target_len: u32,
    pub(crate) cert: Certificate,
}

/// One trie node.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) prefix: Option<NodeId>,
    pub(crate) last: Option<Generator>,
    pub(crate) length: u32,
    pub(crate) children: Children,
    pub(crate) refcount: u32,
    pub(crate) linked: bool,
    /// Height of the deepest linked descendant.
    pub(crate) max_height: u32,
    /// Length of the longest live left-hand side at or below this node.
    pub(crate) max_accepted: u32,
    pub(crate) payload: Payload,
    pub(crate) inverse: Option<NodeId>,
    pub(crate) suffix: Cell<Option<SuffixLink>>,
}

impl Node {
    pub(crate) fn root(dense: bool, alphabet_len: usize) -> Self {
        Self {
            prefix: None,
            last: None,
            length: 0,
            children: Children::new(dense, alphabet_len),
            refcount: 0,
            linked: true,
            max_height: 0,
            max_accepted: 0,
            payload: Payload::Irreducible,
            inverse: None,
            suffix: Cell::new(None),
        }
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        matches!(self.payload, Payload::Equation(_))
    }

    #[inline]
    pub fn equation(&self) -> Option<&EquationData> {
        match &self.payload {
            Payload::Equation(eq) => Some(eq),
            Payload::Irreducible => None,
        }
    }

    pub fn length(&self) -> usize {
        self.length as usize
    }

    pub fn class(&self) -> NodeClass {
        if !self.linked {
            return NodeClass::Limbo;
        }
        match &self.payload {
            Payload::Irreducible => NodeClass::Irreducible,
            Payload::Equation(eq) => match eq.class {
                EquationClass::Pending => NodeClass::Pending,
                EquationClass::Expanded => NodeClass::Expanded,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_children_stay_sorted_and_upgrade() {
        let mut c = Children::new(false, 16);
        c.insert(Generator::new(5), NodeId::new(1), 16);
        assert!(!c.is_dense());
        c.insert(Generator::new(2), NodeId::new(2), 16);
        assert_eq!(
            c.entries(),
            vec![
                (Generator::new(2), NodeId::new(2)),
                (Generator::new(5), NodeId::new(1))
            ]
        );
        // Third child crosses 16/8 and switches to a dense table.
        c.insert(Generator::new(9), NodeId::new(3), 16);
        assert!(c.is_dense());
        assert_eq!(c.get(Generator::new(9)), Some(NodeId::new(3)));
        assert_eq!(c.remove(Generator::new(2)), Some(NodeId::new(2)));
        assert_eq!(c.get(Generator::new(2)), None);
    }
}
