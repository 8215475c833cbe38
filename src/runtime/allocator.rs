//! Device memory accounting
//!
//! Device memory is ordinary host memory on the emulated accelerator, but every
//! allocation is charged against the device's global memory size so that exhausting it
//! surfaces as [`Error::OutOfMemory`] like it would on real hardware.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Memory allocator trait for device backends
pub trait Allocator: Clone + Send + Sync {
    /// Charge `size_bytes` against the device
    ///
    /// Returns [`Error::OutOfMemory`] if the device cannot hold the allocation.
    fn reserve(&self, size_bytes: usize) -> Result<()>;

    /// Return `size_bytes` previously reserved
    fn release(&self, size_bytes: usize);

    /// Get the total allocated bytes
    fn allocated_bytes(&self) -> usize {
        0 // Default: tracking not supported
    }
}

/// Allocator that counts bytes against a fixed capacity
///
/// Clones share the same counter.
#[derive(Clone, Debug)]
pub struct TrackingAllocator {
    capacity: usize,
    used: Arc<AtomicUsize>,
}

impl TrackingAllocator {
    /// Create an allocator for a device with `capacity` bytes of global memory
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Total device capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Allocator for TrackingAllocator {
    fn reserve(&self, size_bytes: usize) -> Result<()> {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(size_bytes)
                    .filter(|&total| total <= self.capacity)
            })
            .map(|_| ())
            .map_err(|_| Error::OutOfMemory { size: size_bytes })
    }

    fn release(&self, size_bytes: usize) {
        self.used.fetch_sub(size_bytes, Ordering::AcqRel);
    }

    fn allocated_bytes(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }
}
