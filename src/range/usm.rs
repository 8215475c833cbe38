//! Raw device allocations (unified shared memory style)

use super::memory::{DeviceAccessor, DeviceMemory};
use super::{Access, Range};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::{Handler, Queue};
use std::sync::Arc;

/// Raw device allocation without dependency tracking
///
/// Kernels get unrestricted read-write access regardless of the mode an algorithm
/// requests, and nothing orders two submissions touching the same allocation. The
/// caller sequences them by waiting on the returned events or on the queue; host
/// copies are `unsafe` for the same reason.
pub struct UsmBuffer<T> {
    memory: Arc<DeviceMemory<T>>,
    len: usize,
}

impl Queue {
    /// Allocate `len` default-initialized elements of raw device memory
    pub fn malloc_device<T: Element>(&self, len: usize) -> Result<UsmBuffer<T>> {
        Ok(UsmBuffer {
            memory: Arc::new(DeviceMemory::new(self.device().allocator(), len)?),
            len,
        })
    }
}

impl<T: Element> UsmBuffer<T> {
    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the allocation holds no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the contents to the host
    ///
    /// # Safety
    ///
    /// Every kernel writing the allocation must have completed.
    pub unsafe fn copy_to_host(&self) -> Vec<T> {
        self.memory.read_range(0, self.len)
    }

    /// Overwrite the contents from the host
    ///
    /// # Safety
    ///
    /// No kernel may be accessing the allocation.
    pub unsafe fn copy_from_host(&self, data: &[T]) -> Result<()> {
        if data.len() != self.len {
            return Err(Error::invalid_argument(
                "data",
                format!("expected {} elements, got {}", self.len, data.len()),
            ));
        }
        unsafe { self.memory.write_range(0, data) };
        Ok(())
    }
}

impl<T> Clone for UsmBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            memory: self.memory.clone(),
            len: self.len,
        }
    }
}

impl<T: Element> Range for UsmBuffer<T> {
    type Item = T;
    type Accessor = DeviceAccessor<T>;

    fn len(&self) -> usize {
        self.len
    }

    fn capability(&self) -> Access {
        Access::ReadWrite
    }

    fn access(&self, _h: &mut Handler, _mode: Access) -> Result<DeviceAccessor<T>> {
        Ok(DeviceAccessor::new(self.memory.clone(), 0, self.len))
    }
}
