//! Parallel per-entry payload arrays.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

/// A payload array the content store keeps in lockstep with its entries.
///
/// The store never sees the element type: it only resizes the array with
/// its own capacity and moves slots when entries are relocated.
pub trait SideArray: fmt::Debug {
    /// Resizes to `len` slots, filling new ones with the default value.
    fn resize_slots(&mut self, len: usize);

    /// Moves slot `from` into slot `to`, leaving `from` at its default.
    fn relocate(&mut self, from: usize, to: usize);

    /// Resets slot `index` to its default.
    fn clear_slot(&mut self, index: usize);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Default + fmt::Debug + 'static> SideArray for Vec<T> {
    fn resize_slots(&mut self, len: usize) {
        self.resize_with(len, T::default);
    }

    fn relocate(&mut self, from: usize, to: usize) {
        if from != to {
            self[to] = std::mem::take(&mut self[from]);
        }
    }

    fn clear_slot(&mut self, index: usize) {
        self[index] = T::default();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed handle to a side array registered with a content store.
pub struct SideHandle<T> {
    pub(super) index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SideHandle<T> {
    pub(super) fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for SideHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SideHandle<T> {}

impl<T> fmt::Debug for SideHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SideHandle({})", self.index)
    }
}
