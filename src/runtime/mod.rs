//! Device runtime: devices, queues, events and work-group execution
//!
//! # Architecture
//!
//! ```text
//! Platform (process-wide registry, explicit init/shutdown)
//! └── Device (limits, compute units, memory accounting, kernel registry)
//!     └── Queue (asynchronous submission, returns Events)
//!         └── Handler (one command: flat kernel, grouped kernel or host task)
//!             └── Group / WorkItem / LocalAccessor (work-group execution)
//! ```

mod allocator;
pub mod config;
pub mod cpu;
mod event;
pub mod kernel;
mod platform;
mod queue;
mod registry;

pub use allocator::{Allocator, TrackingAllocator};
pub use config::{DeviceConfig, DeviceKind};
pub use event::{Event, EventStatus};
pub use kernel::{Group, LocalAccessor, LocalMemory, WorkItem};
pub use platform::Platform;
pub use queue::{Handler, Queue};
pub use registry::KernelRegistry;

pub(crate) use queue::DependencyTracker;

/// Trait for device identification and limits
pub trait Device: Clone + Send + Sync + 'static {
    /// Unique identifier for this device
    fn id(&self) -> usize;

    /// Check if two devices are the same
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Human-readable name
    fn name(&self) -> String {
        format!("Device({})", self.id())
    }

    /// Number of compute units that run work-groups concurrently
    fn compute_units(&self) -> usize;

    /// Largest work-group size the device accepts
    fn max_work_group_size(&self) -> usize;

    /// Local memory available to one work-group, in bytes
    fn local_mem_size(&self) -> usize;

    /// Returns true for CPU-like devices
    fn is_cpu(&self) -> bool {
        false
    }
}
