//! Content-addressed store over byte-string keys.
//!
//! Entries are dense: ids run from 0 to `len() - 1`. Keys are hashed with
//! CRC-32 into chained buckets. Clients attach [`SideArray`]s to hold
//! per-entry payloads; the store resizes them with its capacity and moves
//! their slots whenever it moves an entry.
//!
//! # Invariants
//! - No two entries have equal keys.
//! - Every side array has exactly `capacity()` slots.
//! - `remove` moves the last entry into the freed id; the returned
//!   [`Relocation`] tells clients which id changed.
//! - The empty key is an ordinary stored key: `find(b"")` after
//!   `insert(b"")` succeeds, and before it fails.

pub mod hash;
mod side;

pub use side::{SideArray, SideHandle};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense entry identifier.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(u32);

impl EntryId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

/// Result of [`ContentStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inserted {
    pub id: EntryId,
    /// `true` if the key was already present and `id` is the existing entry.
    pub duplicate: bool,
}

/// An entry moved by [`ContentStore::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from: EntryId,
    pub to: EntryId,
}

/// Store counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub inserts: u64,
    pub duplicates: u64,
    pub lookups: u64,
    pub removals: u64,
    pub rehashes: u64,
    pub grows: u64,
}

impl ContentMetrics {
    pub fn reset(&mut self) {
        *self = ContentMetrics::default();
    }
}

/// Hash table of byte-string keys with attachable side arrays.
#[derive(Debug)]
pub struct ContentStore {
    keys: Vec<Box<[u8]>>,
    hashes: Vec<u32>,
    /// Next entry in the same bucket.
    chain: Vec<Option<u32>>,
    /// First entry of each bucket.
    buckets: Vec<Option<u32>>,
    /// Entry capacity; side arrays are kept at this length.
    allocated: usize,
    side_arrays: Vec<Box<dyn SideArray>>,
    metrics: ContentMetrics,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore {
    /// Creates an empty store with the minimum table size.
    pub fn new() -> Self {
        Self::with_expected(0)
    }

    /// Creates a store sized for about `expected` keys.
    pub fn with_expected(expected: usize) -> Self {
        let buckets = hash::quantize(expected);
        Self {
            keys: Vec::new(),
            hashes: Vec::new(),
            chain: Vec::new(),
            buckets: vec![None; buckets],
            allocated: buckets,
            side_arrays: Vec::new(),
            metrics: ContentMetrics::default(),
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Entry capacity (and side-array length).
    pub fn capacity(&self) -> usize {
        self.allocated
    }

    /// Number of hash buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn metrics(&self) -> &ContentMetrics {
        &self.metrics
    }

    /// Key of entry `id`.
    pub fn key(&self, id: EntryId) -> Option<&[u8]> {
        self.keys.get(id.index()).map(|k| &k[..])
    }

    /// Iterates entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &[u8])> {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, k)| (EntryId(i as u32), &k[..]))
    }

    #[inline]
    fn bucket_of(&self, hash: u32) -> usize {
        hash as usize % self.buckets.len()
    }

    /// Finds the entry with key `key`.
    pub fn find(&mut self, key: &[u8]) -> Option<EntryId> {
        self.metrics.lookups += 1;
        self.lookup(key, hash::key_hash(key))
    }

    /// Like [`find`](Self::find) without touching the counters.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.lookup(key, hash::key_hash(key)).is_some()
    }

    fn lookup(&self, key: &[u8], hash: u32) -> Option<EntryId> {
        let mut cursor = self.buckets[self.bucket_of(hash)];
        while let Some(idx) = cursor {
            let i = idx as usize;
            if self.hashes[i] == hash && &self.keys[i][..] == key {
                return Some(EntryId(idx));
            }
            cursor = self.chain[i];
        }
        None
    }

    /// Inserts `key`, or returns the existing entry flagged as duplicate.
    pub fn insert(&mut self, key: &[u8]) -> Inserted {
        let hash = hash::key_hash(key);
        if let Some(id) = self.lookup(key, hash) {
            self.metrics.duplicates += 1;
            return Inserted {
                id,
                duplicate: true,
            };
        }
        if self.keys.len() == self.allocated {
            self.grow();
        }
        let idx = self.keys.len() as u32;
        let bucket = self.bucket_of(hash);
        self.keys.push(key.to_vec().into_boxed_slice());
        self.hashes.push(hash);
        self.chain.push(self.buckets[bucket]);
        self.buckets[bucket] = Some(idx);
        self.metrics.inserts += 1;
        if self.keys.len() > self.buckets.len() {
            self.rehash();
        }
        Inserted {
            id: EntryId(idx),
            duplicate: false,
        }
    }

    /// Removes entry `id`.
    ///
    /// The last entry moves into `id`; its old id is reported so clients can
    /// follow it. Returns `None` when nothing moved (the removed entry was
    /// the last one, or `id` is out of range).
    pub fn remove(&mut self, id: EntryId) -> Option<Relocation> {
        let i = id.index();
        if i >= self.keys.len() {
            return None;
        }
        self.unchain(i);
        self.metrics.removals += 1;
        let last = self.keys.len() - 1;
        let relocation = if i != last {
            self.unchain(last);
            self.keys.swap(i, last);
            self.hashes.swap(i, last);
            let bucket = self.bucket_of(self.hashes[i]);
            self.chain[i] = self.buckets[bucket];
            self.buckets[bucket] = Some(i as u32);
            for side in &mut self.side_arrays {
                side.relocate(last, i);
            }
            Some(Relocation {
                from: EntryId(last as u32),
                to: id,
            })
        } else {
            for side in &mut self.side_arrays {
                side.clear_slot(last);
            }
            None
        };
        self.keys.pop();
        self.hashes.pop();
        self.chain.pop();
        relocation
    }

    /// Unlinks entry `i` from its bucket chain.
    fn unchain(&mut self, i: usize) {
        let bucket = self.bucket_of(self.hashes[i]);
        let target = Some(i as u32);
        if self.buckets[bucket] == target {
            self.buckets[bucket] = self.chain[i];
            return;
        }
        let mut cursor = self.buckets[bucket];
        while let Some(idx) = cursor {
            let j = idx as usize;
            if self.chain[j] == target {
                self.chain[j] = self.chain[i];
                return;
            }
            cursor = self.chain[j];
        }
    }

    fn grow(&mut self) {
        self.allocated = hash::grow_capacity(self.allocated);
        let allocated = self.allocated;
        self.keys.reserve(allocated - self.keys.len());
        for side in &mut self.side_arrays {
            side.resize_slots(allocated);
        }
        self.metrics.grows += 1;
    }

    fn rehash(&mut self) {
        let size = hash::rehash_size(self.allocated, self.keys.len());
        self.buckets = vec![None; size];
        for i in 0..self.keys.len() {
            let bucket = self.bucket_of(self.hashes[i]);
            self.chain[i] = self.buckets[bucket];
            self.buckets[bucket] = Some(i as u32);
        }
        self.metrics.rehashes += 1;
    }

    // ----- side arrays -----

    /// Registers a side array of `T`, sized to the current capacity.
    pub fn attach<T: Default + fmt::Debug + 'static>(&mut self) -> SideHandle<T> {
        let mut array: Vec<T> = Vec::new();
        array.resize_slots(self.allocated);
        self.side_arrays.push(Box::new(array));
        SideHandle::new(self.side_arrays.len() - 1)
    }

    fn side_vec<T: 'static>(&self, handle: SideHandle<T>) -> &Vec<T> {
        match self
            .side_arrays
            .get(handle.index)
            .and_then(|a| a.as_any().downcast_ref::<Vec<T>>())
        {
            Some(v) => v,
            None => panic!("side array {:?} does not belong to this store", handle),
        }
    }

    fn side_vec_mut<T: 'static>(&mut self, handle: SideHandle<T>) -> &mut Vec<T> {
        match self
            .side_arrays
            .get_mut(handle.index)
            .and_then(|a| a.as_any_mut().downcast_mut::<Vec<T>>())
        {
            Some(v) => v,
            None => panic!("side array {:?} does not belong to this store", handle),
        }
    }

    /// Payloads of the live entries.
    pub fn side<T: 'static>(&self, handle: SideHandle<T>) -> &[T] {
        &self.side_vec(handle)[..self.keys.len()]
    }

    /// Payload of entry `id`.
    pub fn get<T: 'static>(&self, handle: SideHandle<T>, id: EntryId) -> Option<&T> {
        if id.index() < self.keys.len() {
            self.side_vec(handle).get(id.index())
        } else {
            None
        }
    }

    /// Mutable payload of entry `id`.
    pub fn get_mut<T: 'static>(&mut self, handle: SideHandle<T>, id: EntryId) -> Option<&mut T> {
        if id.index() < self.keys.len() {
            self.side_vec_mut(handle).get_mut(id.index())
        } else {
            None
        }
    }
}
