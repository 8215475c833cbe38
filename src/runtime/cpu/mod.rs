//! CPU device backend
//!
//! The only device this crate drives: an accelerator emulated on host threads. Work-groups
//! execute on the threads of a rayon pool sized to the configured compute units.

mod device;

pub use device::CpuDevice;
