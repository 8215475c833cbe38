//! Execution contexts
//!
//! An [`ExecutionContext`] binds a queue and a kernel-name tag. The tag becomes the
//! prefix of every kernel id an algorithm submits (`"<name>::<stage>"`), which keeps
//! otherwise identical generic kernel bodies apart in the device's kernel registry.
//!
//! When one algorithm invokes another internally, it derives a context with
//! [`ExecutionContext::wrapped`] so the inner kernels get their own ids.

use crate::error::Result;
use crate::runtime::{Device, Event, Handler, Queue};
use std::fmt;
use std::sync::Arc;

const DEFAULT_KERNEL_NAME: &str = "devpar";

/// Device queue plus kernel-name tag; immutable once constructed
#[derive(Clone)]
pub struct ExecutionContext {
    queue: Queue,
    kernel_name: Arc<str>,
    explicit: bool,
}

impl ExecutionContext {
    /// Context on `queue` with the default kernel name
    pub fn new(queue: Queue) -> Self {
        Self {
            queue,
            kernel_name: Arc::from(DEFAULT_KERNEL_NAME),
            explicit: false,
        }
    }

    /// Same queue, different kernel name
    pub fn with_kernel_name(&self, name: impl AsRef<str>) -> Self {
        Self {
            queue: self.queue.clone(),
            kernel_name: Arc::from(name.as_ref()),
            explicit: true,
        }
    }

    /// Same queue, kernel name wrapped as `wrapper<name>`
    pub fn wrapped(&self, wrapper: &str) -> Self {
        Self {
            queue: self.queue.clone(),
            kernel_name: Arc::from(format!("{wrapper}<{}>", self.kernel_name)),
            explicit: self.explicit,
        }
    }

    /// Queue this context submits to
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Kernel-name tag
    pub fn kernel_name(&self) -> &str {
        &self.kernel_name
    }

    /// Kernel id of one stage of an algorithm
    pub fn kernel_id(&self, stage: &str) -> String {
        format!("{}::{stage}", self.kernel_name)
    }

    /// Block until every command on the queue has finished
    pub fn wait(&self) -> Result<()> {
        self.queue.wait()
    }

    pub(crate) fn submit<F>(&self, stage: &str, build: F) -> Result<Event>
    where
        F: FnOnce(&mut Handler) -> Result<()>,
    {
        self.queue
            .submit_kernel(Arc::from(self.kernel_id(stage)), self.explicit, build)
    }

    pub(crate) fn compute_units(&self) -> usize {
        self.queue.device().compute_units()
    }

    pub(crate) fn is_cpu(&self) -> bool {
        self.queue.device().is_cpu()
    }

    /// Work-group size for `stage`, given the local memory each worker needs
    ///
    /// Bounded by the device maximum, by local memory, and with the `compile-kernel`
    /// feature by the compiled kernel's limit. Always a power of two.
    pub(crate) fn work_group_size(&self, stage: &str, local_bytes_per_item: usize) -> usize {
        let device = self.queue.device();
        let mut size = device.max_work_group_size();
        if local_bytes_per_item > 0 {
            size = size.min(device.local_mem_size() / local_bytes_per_item);
        }
        #[cfg(feature = "compile-kernel")]
        {
            size = size.min(device.kernels().kernel_work_group_size(&self.kernel_id(stage)));
        }
        #[cfg(not(feature = "compile-kernel"))]
        let _ = stage;
        prev_power_of_two(size.max(1))
    }
}

#[inline]
fn prev_power_of_two(n: usize) -> usize {
    1 << (usize::BITS - 1 - n.leading_zeros())
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("kernel_name", &self.kernel_name)
            .field("queue", &self.queue)
            .finish()
    }
}
