//! Error types for devpar

use crate::range::Access;
use thiserror::Error;

/// Result type alias using devpar's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in devpar operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// A range cannot provide the access capability an algorithm needs
    #[error("Incompatible access: range supplies {supplied:?}, algorithm requires {required:?}")]
    IncompatibleAccess {
        /// Capability the caller supplied
        supplied: Access,
        /// Capability the algorithm requested
        required: Access,
    },

    /// Device global memory exhausted
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Local scratch request larger than the device supports
    #[error("Local memory exceeded: requested {requested} bytes, device provides {available}")]
    LocalMemoryExceeded {
        /// Requested size in bytes
        requested: usize,
        /// Device local memory size in bytes
        available: usize,
    },

    /// Index out of bounds
    #[error("Index {index} out of bounds for range of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Size of the range
        size: usize,
    },

    /// A kernel failed while executing on the device
    #[error("Kernel '{kernel}' failed: {reason}")]
    Kernel {
        /// Kernel identity
        kernel: String,
        /// Failure description
        reason: String,
    },

    /// A kernel was not run because one of its dependencies failed
    #[error("Kernel '{kernel}' skipped: dependency failed: {reason}")]
    DependencyFailed {
        /// Kernel identity
        kernel: String,
        /// Failure of the dependency
        reason: String,
    },

    /// Backend-specific error (thread spawn, pool creation)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a kernel failure error
    pub fn kernel(kernel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Kernel {
            kernel: kernel.into(),
            reason: reason.into(),
        }
    }

    /// Check that `len` is at least `required`, naming the offending argument otherwise
    pub(crate) fn check_len(arg: &'static str, len: usize, required: usize) -> Result<()> {
        if len < required {
            return Err(Self::invalid_argument(
                arg,
                format!("range holds {len} elements, at least {required} required"),
            ));
        }
        Ok(())
    }
}
