//! Device memory blocks

use super::{Accessor, AccessorMut};
use crate::dtype::Element;
use crate::error::Result;
use crate::runtime::{Allocator, DependencyTracker, TrackingAllocator};
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::Arc;

/// One device allocation
///
/// Zero-length requests allocate a single dummy element so that every allocation has a
/// valid address.
pub(crate) struct DeviceMemory<T> {
    cells: Box<[UnsafeCell<T>]>,
    allocator: TrackingAllocator,
    bytes: usize,
    tracker: DependencyTracker,
}

// Kernels access disjoint elements concurrently; AccessorMut::set carries the contract.
unsafe impl<T: Send + Sync> Sync for DeviceMemory<T> {}

impl<T: Element> DeviceMemory<T> {
    pub(crate) fn new(allocator: &TrackingAllocator, len: usize) -> Result<Self> {
        let slots = len.max(1);
        let bytes = slots * std::mem::size_of::<T>();
        allocator.reserve(bytes)?;
        Ok(Self {
            cells: (0..slots).map(|_| UnsafeCell::new(T::default())).collect(),
            allocator: allocator.clone(),
            bytes,
            tracker: DependencyTracker::default(),
        })
    }

    pub(crate) fn from_slice(allocator: &TrackingAllocator, data: &[T]) -> Result<Self> {
        let memory = Self::new(allocator, data.len())?;
        for (cell, value) in memory.cells.iter().zip(data) {
            // SAFETY: the allocation is not shared yet.
            unsafe { *cell.get() = *value };
        }
        Ok(memory)
    }

    #[inline]
    pub(crate) fn read(&self, i: usize) -> T {
        // SAFETY: writers to element `i` are excluded by the AccessorMut::set contract.
        unsafe { *self.cells[i].get() }
    }

    /// # Safety
    ///
    /// No concurrent access to element `i`.
    #[inline]
    pub(crate) unsafe fn write(&self, i: usize, value: T) {
        unsafe { *self.cells[i].get() = value };
    }

    /// Copy `len` elements starting at `offset` to the host
    ///
    /// Callers must have waited for every kernel writing the range.
    pub(crate) fn read_range(&self, offset: usize, len: usize) -> Vec<T> {
        (offset..offset + len).map(|i| self.read(i)).collect()
    }

    /// Copy `data` into the allocation starting at `offset`
    ///
    /// # Safety
    ///
    /// No kernel may access the range concurrently.
    pub(crate) unsafe fn write_range(&self, offset: usize, data: &[T]) {
        for (i, value) in data.iter().enumerate() {
            unsafe { self.write(offset + i, *value) };
        }
    }

    pub(crate) fn tracker(&self) -> &DependencyTracker {
        &self.tracker
    }
}

impl<T> Drop for DeviceMemory<T> {
    fn drop(&mut self) {
        self.allocator.release(self.bytes);
    }
}

impl<T> fmt::Debug for DeviceMemory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("len", &self.cells.len())
            .field("bytes", &self.bytes)
            .finish()
    }
}

/// Accessor over a window of device memory
pub struct DeviceAccessor<T> {
    memory: Arc<DeviceMemory<T>>,
    offset: usize,
    len: usize,
}

impl<T> DeviceAccessor<T> {
    pub(crate) fn new(memory: Arc<DeviceMemory<T>>, offset: usize, len: usize) -> Self {
        Self {
            memory,
            offset,
            len,
        }
    }

    /// Number of elements visible through the accessor
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no element is visible
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Clone for DeviceAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            memory: self.memory.clone(),
            offset: self.offset,
            len: self.len,
        }
    }
}

impl<T: Element> Accessor for DeviceAccessor<T> {
    type Item = T;

    #[inline]
    fn get(&self, i: usize) -> T {
        debug_assert!(i < self.len, "index {i} out of bounds for {}", self.len);
        self.memory.read(self.offset + i)
    }
}

impl<T: Element> AccessorMut for DeviceAccessor<T> {
    #[inline]
    unsafe fn set(&self, i: usize, value: T) {
        debug_assert!(i < self.len, "index {i} out of bounds for {}", self.len);
        unsafe { self.memory.write(self.offset + i, value) };
    }
}
