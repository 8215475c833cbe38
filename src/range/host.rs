//! Host-resident data moved to the device on demand

use super::memory::{DeviceAccessor, DeviceMemory};
use super::{Access, Range};
use crate::dtype::Element;
use crate::error::Result;
use crate::runtime::Handler;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

enum HostData<'a, T> {
    Shared(&'a [T]),
    Exclusive(&'a mut [T]),
}

impl<T> HostData<'_, T> {
    fn as_slice(&self) -> &[T] {
        match self {
            Self::Shared(s) => s,
            Self::Exclusive(s) => s,
        }
    }
}

/// Host slice used as an algorithm range
///
/// The first kernel that accesses it allocates device memory and copies the host data
/// in (skipped for discard modes). If the slice was borrowed mutably and any kernel
/// wrote to it, the device contents are copied back when the `HostSlice` is dropped,
/// after every writer has finished. Use [`finish`](Self::finish) to observe copy-back
/// failures instead of having them logged.
pub struct HostSlice<'a, T: Element> {
    host: HostData<'a, T>,
    capability: Access,
    device: Mutex<Option<Arc<DeviceMemory<T>>>>,
    written: AtomicBool,
}

/// Read-only range over a host slice
pub fn host<T: Element>(data: &[T]) -> HostSlice<'_, T> {
    HostSlice {
        host: HostData::Shared(data),
        capability: Access::Read,
        device: Mutex::new(None),
        written: AtomicBool::new(false),
    }
}

/// Read-write range over a host slice, copied back on drop
pub fn host_mut<T: Element>(data: &mut [T]) -> HostSlice<'_, T> {
    HostSlice {
        host: HostData::Exclusive(data),
        capability: Access::ReadWrite,
        device: Mutex::new(None),
        written: AtomicBool::new(false),
    }
}

impl<T: Element> HostSlice<'_, T> {
    /// Mark the prior contents as irrelevant: no copy-in happens
    pub fn discard(mut self) -> Self {
        self.capability = match self.capability {
            Access::Read => Access::Read,
            _ => Access::DiscardReadWrite,
        };
        self
    }

    /// Restrict algorithms to writing
    pub fn write_only(mut self) -> Self {
        if self.capability.writes() {
            self.capability = if self.capability.is_discard() {
                Access::DiscardWrite
            } else {
                Access::Write
            };
        }
        self
    }

    /// Copy results back now, surfacing any kernel or copy failure
    pub fn finish(mut self) -> Result<()> {
        self.copy_back()
    }

    fn copy_back(&mut self) -> Result<()> {
        let Some(memory) = self.device.lock().take() else {
            return Ok(());
        };
        if !self.written.load(Ordering::Acquire) {
            return Ok(());
        }
        if let HostData::Exclusive(dst) = &mut self.host {
            memory.tracker().wait_writes()?;
            for (i, slot) in dst.iter_mut().enumerate() {
                *slot = memory.read(i);
            }
        }
        Ok(())
    }

    fn device_memory(&self, h: &Handler, mode: Access) -> Result<Arc<DeviceMemory<T>>> {
        let mut slot = self.device.lock();
        if let Some(memory) = slot.as_ref() {
            return Ok(memory.clone());
        }
        let allocator = h.queue().device().allocator();
        let data = self.host.as_slice();
        let memory = if mode.is_discard() {
            DeviceMemory::new(allocator, data.len())?
        } else {
            DeviceMemory::from_slice(allocator, data)?
        };
        let memory = Arc::new(memory);
        *slot = Some(memory.clone());
        Ok(memory)
    }
}

impl<T: Element> Range for HostSlice<'_, T> {
    type Item = T;
    type Accessor = DeviceAccessor<T>;

    fn len(&self) -> usize {
        self.host.as_slice().len()
    }

    fn capability(&self) -> Access {
        self.capability
    }

    fn access(&self, h: &mut Handler, mode: Access) -> Result<DeviceAccessor<T>> {
        let resolved = Access::resolve(self.capability, mode)?;
        let memory = self.device_memory(h, resolved)?;
        if resolved.writes() {
            self.written.store(true, Ordering::Release);
        }
        h.track(memory.tracker(), resolved);
        let len = self.len();
        Ok(DeviceAccessor::new(memory, 0, len))
    }
}

impl<T: Element> Drop for HostSlice<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.copy_back() {
            error!(error = %err, len = self.len(), "copy-back of host slice failed");
        }
    }
}
