//! Arena allocation for trie nodes.
//!
//! Provides `NodeId` (a dense, total-orderable identifier) and `NodeArena`
//! (contiguous storage with free-list reuse). The arena stores node data of a
//! generic type `T`; the node store keeps its trie nodes here and refers to
//! prefixes, children, right-hand sides and inverses by index only.
//!
//! # Determinism
//! - `NodeId` ordering is by its inner `u32`.
//! - Iteration order over slots is by index (0..capacity).
//! - Free-list reuse is LIFO, so the same sequence of allocations and
//!   deallocations always produces the same ids.

use std::fmt;

/// Dense node identifier.
///
/// `NodeId(u32)` is `Copy`, `Eq`, `Ord`, `Hash`. The inner value is an index
/// into the arena's slot array. Index `0` is reserved for the trie root
/// (see [`ROOT`]).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a new `NodeId` from a raw `u32`.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw `u32` index.
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Maximum possible `NodeId` (for sentinel use).
    pub const MAX: NodeId = NodeId(u32::MAX);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// The trie root: the node for the empty word.
///
/// Allocated by [`NodeArena::with_root`] and never deallocated.
pub const ROOT: NodeId = NodeId(0);

/// Slot in the node arena.
#[derive(Debug, Clone)]
struct NodeSlot<T> {
    data: Option<T>,
    next_free: Option<u32>, // index of next free slot, if any
}

/// Contiguous storage for node data with free-list reuse.
#[derive(Debug, Clone)]
pub struct NodeArena<T> {
    slots: Vec<NodeSlot<T>>,
    free_list_head: Option<u32>,
    /// Number of live nodes (slots with `data.is_some()`).
    live_count: usize,
}

impl<T> NodeArena<T> {
    /// Creates an arena whose reserved slot 0 holds `root`.
    pub fn with_root(root: T) -> Self {
        Self {
            slots: vec![NodeSlot {
                data: Some(root),
                next_free: None,
            }],
            free_list_head: None,
            live_count: 1,
        }
    }

    /// Allocates a new slot and returns its `NodeId`.
    ///
    /// If a free slot is available, reuses it; otherwise pushes a new slot.
    ///
    /// # Determinism
    /// The most recently freed slot is reused first.
    pub fn allocate(&mut self, data: T) -> NodeId {
        self.live_count += 1;
        if let Some(idx) = self.free_list_head {
            let slot = &mut self.slots[idx as usize];
            debug_assert!(slot.data.is_none(), "free slot should have no data");
            self.free_list_head = slot.next_free;
            slot.data = Some(data);
            slot.next_free = None;
            NodeId(idx)
        } else {
            let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            assert!(idx != u32::MAX, "node arena exhausted the u32 index space");
            self.slots.push(NodeSlot {
                data: Some(data),
                next_free: None,
            });
            NodeId(idx)
        }
    }

    /// Deallocates the slot identified by `id`, returning its data.
    ///
    /// Returns `None` if the slot was already free or out of range.
    ///
    /// # Panics
    /// Panics if `id` is [`ROOT`].
    pub fn deallocate(&mut self, id: NodeId) -> Option<T> {
        assert!(id != ROOT, "cannot deallocate the trie root");
        let slot = self.slots.get_mut(id.index())?;
        let data = slot.data.take()?;
        slot.next_free = self.free_list_head;
        self.free_list_head = Some(id.0);
        self.live_count -= 1;
        Some(data)
    }

    /// Returns a reference to the data at `id`, if live.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id.index()).and_then(|s| s.data.as_ref())
    }

    /// Returns a mutable reference to the data at `id`, if live.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(|s| s.data.as_mut())
    }

    /// Returns `true` if `id` names a live slot.
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, including the root.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Total number of slots (live and free).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots waiting on the free list.
    pub fn free_count(&self) -> usize {
        self.slots.len() - self.live_count
    }

    /// Iterates over live nodes in index order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.data.as_ref().map(|d| (NodeId(i as u32), d)))
    }
}

impl<T> std::ops::Index<NodeId> for NodeArena<T> {
    type Output = T;

    fn index(&self, id: NodeId) -> &T {
        match self.get(id) {
            Some(data) => data,
            None => panic!("access to freed or unknown node {}", id),
        }
    }
}

impl<T> std::ops::IndexMut<NodeId> for NodeArena<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        match self.get_mut(id) {
            Some(data) => data,
            None => panic!("access to freed or unknown node {}", id),
        }
    }
}
