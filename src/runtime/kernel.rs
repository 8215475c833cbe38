//! Work-group execution model
//!
//! A grouped kernel body receives a [`Group`]. The group's workers are emulated by one
//! compute-unit thread, so a body is written as a sequence of phases:
//!
//! ```text
//! group.for_each_item(|item| ...)   // phase 1: every worker runs
//!                                   // <- barrier
//! group.for_each_item(|item| ...)   // phase 2
//! group.leader(|item| ...)          // worker 0 only
//! ```
//!
//! The boundary between two phases is the group barrier: no worker starts phase 2 before
//! every worker finished phase 1. State that must survive a barrier lives in local
//! memory obtained from a [`LocalAccessor`] declared at submission time.
//!
//! Groups of one kernel run concurrently on different compute units and never yield
//! their thread while running. A group that spins on a flag published by another group
//! which was scheduled earlier therefore always makes progress.

use crate::dtype::Element;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// Identity of one worker inside a grouped kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    /// Index of the worker within its group
    pub local_id: usize,
    /// Index of the group within the kernel
    pub group_id: usize,
    /// Number of workers per group
    pub local_size: usize,
    /// Number of groups in the kernel
    pub group_count: usize,
}

impl WorkItem {
    /// Index of the worker across the whole kernel
    #[inline]
    pub fn global_id(&self) -> usize {
        self.group_id * self.local_size + self.local_id
    }

    /// Total number of workers in the kernel
    #[inline]
    pub fn global_size(&self) -> usize {
        self.group_count * self.local_size
    }
}

/// One work-group of a grouped kernel
#[derive(Debug)]
pub struct Group {
    id: usize,
    count: usize,
    local_size: usize,
}

impl Group {
    pub(crate) fn new(id: usize, count: usize, local_size: usize) -> Self {
        Self {
            id,
            count,
            local_size,
        }
    }

    /// Physical index of this group
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of groups in the kernel
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of workers in this group
    #[inline]
    pub fn local_size(&self) -> usize {
        self.local_size
    }

    #[inline]
    fn item(&self, local_id: usize) -> WorkItem {
        WorkItem {
            local_id,
            group_id: self.id,
            local_size: self.local_size,
            group_count: self.count,
        }
    }

    /// Run one barrier-delimited phase on every worker of the group
    pub fn for_each_item(&self, mut f: impl FnMut(WorkItem)) {
        for local_id in 0..self.local_size {
            f(self.item(local_id));
        }
    }

    /// Run `f` on worker 0 only and broadcast its result to the group
    pub fn leader<R>(&self, f: impl FnOnce(WorkItem) -> R) -> R {
        f(self.item(0))
    }

    /// Materialize local memory declared with [`Handler::local_accessor`](super::Handler::local_accessor)
    ///
    /// The memory is default-initialized and released when the group finishes.
    pub fn local_memory<T: Element>(&self, accessor: &LocalAccessor<T>) -> LocalMemory<T> {
        LocalMemory {
            data: vec![T::default(); accessor.len],
        }
    }

    /// Native group-wide reduction of one value per worker
    ///
    /// Only valid for an associative, commutative operator whose identity is known.
    pub fn reduce_over_group<T: Element>(
        &self,
        values: impl IntoIterator<Item = T>,
        identity: T,
        op: impl Fn(T, T) -> T,
    ) -> T {
        values.into_iter().fold(identity, op)
    }
}

/// Declaration of per-group scratch memory, made on the [`Handler`](super::Handler)
#[derive(Debug)]
pub struct LocalAccessor<T> {
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LocalAccessor<T> {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            len,
            _marker: PhantomData,
        }
    }

    /// Number of elements each group gets
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the declaration holds no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Clone for LocalAccessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LocalAccessor<T> {}

/// Per-group scratch memory, exclusive to the owning group for one kernel invocation
#[derive(Debug)]
pub struct LocalMemory<T> {
    data: Vec<T>,
}

impl<T> Deref for LocalMemory<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for LocalMemory<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_ids() {
        let group = Group::new(2, 4, 8);
        let mut seen = Vec::new();
        group.for_each_item(|item| seen.push(item.global_id()));
        assert_eq!(seen, (16..24).collect::<Vec<_>>());
        assert_eq!(group.leader(|item| item.global_size()), 32);
    }

    #[test]
    fn test_local_memory_survives_phases() {
        let group = Group::new(0, 1, 4);
        let mut scratch = group.local_memory(&LocalAccessor::<u32>::new(4));
        group.for_each_item(|item| scratch[item.local_id] = item.local_id as u32 + 1);
        let total = group.reduce_over_group(scratch.iter().copied(), 0, |a, b| a + b);
        assert_eq!(total, 10);
    }
}
