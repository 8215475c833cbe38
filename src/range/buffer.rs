//! Managed device buffers

use super::memory::{DeviceAccessor, DeviceMemory};
use super::{Access, Range};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::{Handler, Queue};
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

/// Device-resident buffer with automatic dependency tracking
///
/// Clones and slices share the allocation. Every kernel that obtains an accessor is
/// ordered against earlier kernels touching the same allocation according to both
/// access modes; host reads ([`to_vec`](Self::to_vec)) wait for pending writers.
pub struct Buffer<T> {
    memory: Arc<DeviceMemory<T>>,
    offset: usize,
    len: usize,
    capability: Access,
}

impl<T: Element> Buffer<T> {
    /// Allocate `len` default-initialized elements on the queue's device
    pub fn new(queue: &Queue, len: usize) -> Result<Self> {
        let memory = DeviceMemory::new(queue.device().allocator(), len)?;
        Ok(Self::wrap(memory, len))
    }

    /// Allocate a buffer holding a copy of `data`
    pub fn from_slice(queue: &Queue, data: &[T]) -> Result<Self> {
        let memory = DeviceMemory::from_slice(queue.device().allocator(), data)?;
        Ok(Self::wrap(memory, data.len()))
    }

    pub(crate) fn wrap(memory: DeviceMemory<T>, len: usize) -> Self {
        Self {
            memory: Arc::new(memory),
            offset: 0,
            len,
            capability: Access::ReadWrite,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer has no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View of a sub-range sharing the allocation
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Result<Self> {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.len,
        };
        if start > end || end > self.len {
            return Err(Error::IndexOutOfBounds {
                index: end.max(start),
                size: self.len,
            });
        }
        Ok(Self {
            memory: self.memory.clone(),
            offset: self.offset + start,
            len: end - start,
            capability: self.capability,
        })
    }

    fn with_capability(&self, capability: Access) -> Self {
        Self {
            memory: self.memory.clone(),
            offset: self.offset,
            len: self.len,
            capability,
        }
    }

    /// View that algorithms may only read
    pub fn read_only(&self) -> Self {
        self.with_capability(Access::Read)
    }

    /// View that algorithms may only write
    pub fn write_only(&self) -> Self {
        self.with_capability(Access::Write)
    }

    /// View whose prior contents the caller does not care about
    pub fn discard(&self) -> Self {
        self.with_capability(Access::DiscardReadWrite)
    }

    /// Copy the contents to the host, waiting for pending writers
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.memory.tracker().wait_writes()?;
        Ok(self.memory.read_range(self.offset, self.len))
    }

    /// Read one element, waiting for pending writers
    pub fn get(&self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.len,
            });
        }
        self.memory.tracker().wait_writes()?;
        Ok(self.memory.read(self.offset + index))
    }

    /// Overwrite the contents from the host, waiting for every pending access
    pub fn copy_from_slice(&self, data: &[T]) -> Result<()> {
        if data.len() != self.len {
            return Err(Error::invalid_argument(
                "data",
                format!("expected {} elements, got {}", self.len, data.len()),
            ));
        }
        self.memory.tracker().wait_all()?;
        // SAFETY: every kernel that accessed the allocation has completed, and new ones
        // are ordered after this call returns.
        unsafe { self.memory.write_range(self.offset, data) };
        Ok(())
    }
}

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        Self {
            memory: self.memory.clone(),
            offset: self.offset,
            len: self.len,
            capability: self.capability,
        }
    }
}

impl<T: Element> Range for Buffer<T> {
    type Item = T;
    type Accessor = DeviceAccessor<T>;

    fn len(&self) -> usize {
        self.len
    }

    fn capability(&self) -> Access {
        self.capability
    }

    fn access(&self, h: &mut Handler, mode: Access) -> Result<DeviceAccessor<T>> {
        let resolved = Access::resolve(self.capability, mode)?;
        h.track(self.memory.tracker(), resolved);
        Ok(DeviceAccessor::new(self.memory.clone(), self.offset, self.len))
    }
}

impl<T> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("capability", &self.capability)
            .finish()
    }
}
