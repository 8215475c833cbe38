//! # devpar
//!
//! **Parallel algorithms over device-resident data, on an emulated accelerator.**
//!
//! devpar runs the familiar algorithm library (reduce, scan, sort, find, merge,
//! element-wise transforms) as kernels submitted to a device queue. The device is
//! emulated on host threads with the execution model of a real accelerator:
//! work-groups of workers, per-group local memory, barriers, asynchronous submission
//! and events.
//!
//! ## Features
//!
//! - **Ranges**: device buffers, host slices, raw device allocations, and composite
//!   views (zip, transform, counting, permutation)
//! - **Dependency tracking**: submissions touching the same buffer are ordered by
//!   access mode, no manual event plumbing
//! - **Single-pass scans** with decoupled lookback, radix and merge sorts, early-exit
//!   searches
//! - **Named kernels**: every submission gets a `"{name}::{stage}"` id for logs and
//!   work-group size limits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use devpar::prelude::*;
//!
//! let platform = Platform::host()?;
//! let ctx = platform.context().with_kernel_name("demo");
//!
//! let data = Buffer::from_slice(ctx.queue(), &[5, 3, 8, 1, 9, 2])?;
//! let sum = reduce(&ctx, &data, 0, Plus)?;
//! sort(&ctx, &data, Less)?.wait()?;
//! ```
//!
//! ## Feature Flags
//!
//! - `compile-kernel`: bound work-group sizes by per-kernel limits from the device's
//!   kernel registry
//! - `f16`: half-precision element types (F16, BF16)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithm;
pub mod dtype;
pub mod error;
pub mod ops;
pub mod policy;
pub mod range;
pub mod runtime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithm::*;
    pub use crate::dtype::{Arithmetic, DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::ops::{BinaryOp, BitAnd, BitOr, BitXor, Compare, Greater, Less, Maximum, Minimum, Multiplies, Plus};
    pub use crate::policy::ExecutionContext;
    pub use crate::range::{
        Access, Accessor, AccessorMut, Buffer, HostSlice, Range, UsmBuffer, counting, host, host_mut, permutation,
        transform_view, zip,
    };
    pub use crate::runtime::{DeviceConfig, DeviceKind, Event, Platform, Queue};
}
