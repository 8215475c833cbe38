//! Ranges: device-resident data and composite views over it
//!
//! A [`Range`] is what algorithms consume. For one kernel submission it resolves to an
//! [`Accessor`] supporting index-based access, after checking that the requested
//! [`Access`] mode is compatible with what the range allows.
//!
//! | Range | Memory | Dependency tracking |
//! |-------|--------|---------------------|
//! | [`Buffer`] | device, managed | automatic, by access mode |
//! | [`HostSlice`] | host slice copied to device on first use, copied back on drop | automatic |
//! | [`UsmBuffer`] | raw device allocation | none: caller orders submissions |
//! | [`Zip`] | tuple of ranges | per constituent |
//! | [`Transform`] | one range plus a function applied on access | per constituent |
//! | [`Counting`] | none (synthetic) | none |
//! | [`Permutation`] | source range indexed through a map range | per constituent |
//!
//! Composite ranges distribute the accessor request to their constituents and assemble
//! the results into a composite accessor.

mod buffer;
mod counting;
mod host;
pub(crate) mod memory;
mod permutation;
mod transform;
mod usm;
mod zip;

pub use buffer::Buffer;
pub use counting::{Counting, CountingAccessor, counting};
pub use host::{HostSlice, host, host_mut};
pub use memory::DeviceAccessor;
pub use permutation::{Permutation, PermutationAccessor, permutation};
pub use transform::{Transform, TransformAccessor, transform_view};
pub use usm::UsmBuffer;
pub use zip::{Zip, ZipAccessor, zip};

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::Handler;

// ============================================================================
// Access modes
// ============================================================================

/// Access capability of a range, or access requirement of an algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Read existing contents
    Read,
    /// Write; existing contents are kept where not written
    Write,
    /// Read and write
    ReadWrite,
    /// Write without caring about prior contents
    DiscardWrite,
    /// Read and write without caring about prior contents
    DiscardReadWrite,
}

impl Access {
    /// Returns true if the mode allows reading
    #[inline]
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite | Self::DiscardReadWrite)
    }

    /// Returns true if the mode allows writing
    #[inline]
    pub fn writes(self) -> bool {
        !matches!(self, Self::Read)
    }

    /// Returns true if prior contents may be dropped
    #[inline]
    pub fn is_discard(self) -> bool {
        matches!(self, Self::DiscardWrite | Self::DiscardReadWrite)
    }

    fn from_flags(read: bool, write: bool, discard: bool) -> Option<Self> {
        match (read, write, discard) {
            (true, false, _) => Some(Self::Read),
            (false, true, false) => Some(Self::Write),
            (true, true, false) => Some(Self::ReadWrite),
            (false, true, true) => Some(Self::DiscardWrite),
            (true, true, true) => Some(Self::DiscardReadWrite),
            (false, false, _) => None,
        }
    }

    /// Pick the tightest mode that satisfies both the range and the algorithm
    ///
    /// The result reads and writes exactly what `required` does; it is a discard mode if
    /// either side discards and the result writes. Fails if `supplied` cannot provide a
    /// capability `required` needs.
    ///
    /// ```
    /// use devpar::range::Access;
    ///
    /// assert_eq!(Access::resolve(Access::ReadWrite, Access::Read).unwrap(), Access::Read);
    /// assert_eq!(
    ///     Access::resolve(Access::DiscardReadWrite, Access::Write).unwrap(),
    ///     Access::DiscardWrite
    /// );
    /// assert!(Access::resolve(Access::Read, Access::Write).is_err());
    /// ```
    pub fn resolve(supplied: Access, required: Access) -> Result<Access> {
        let incompatible = || Error::IncompatibleAccess { supplied, required };
        if (required.reads() && !supplied.reads()) || (required.writes() && !supplied.writes()) {
            return Err(incompatible());
        }
        let discard = required.is_discard() || supplied.is_discard();
        Self::from_flags(required.reads(), required.writes(), discard).ok_or_else(incompatible)
    }

    /// Capability shared by two constituents of a composite range, if any
    pub fn intersect(self, other: Access) -> Option<Access> {
        Self::from_flags(
            self.reads() && other.reads(),
            self.writes() && other.writes(),
            self.is_discard() || other.is_discard(),
        )
    }
}

// ============================================================================
// Range traits
// ============================================================================

/// Index-based element access inside a kernel
pub trait Accessor: Clone + Send + Sync + 'static {
    /// Element type
    type Item: Element;

    /// Read element `i`
    fn get(&self, i: usize) -> Self::Item;
}

/// Accessor that can also store elements
pub trait AccessorMut: Accessor {
    /// Store `value` at element `i`
    ///
    /// # Safety
    ///
    /// No other worker may read or write element `i` while this call runs, and `i` must
    /// be within the range the accessor was created for.
    unsafe fn set(&self, i: usize, value: Self::Item);
}

/// Input or output of an algorithm
pub trait Range: Send + Sync {
    /// Element type
    type Item: Element;
    /// Accessor produced for a kernel submission
    type Accessor: Accessor<Item = Self::Item>;

    /// Number of elements
    fn len(&self) -> usize;

    /// Returns true if the range has no elements
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access capability the range allows
    fn capability(&self) -> Access;

    /// Accessor for the command being built by `h`, with `mode` resolved against the
    /// range's capability
    fn access(&self, h: &mut Handler, mode: Access) -> Result<Self::Accessor>;
}

impl<R: Range + ?Sized> Range for &R {
    type Item = R::Item;
    type Accessor = R::Accessor;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn capability(&self) -> Access {
        (**self).capability()
    }

    fn access(&self, h: &mut Handler, mode: Access) -> Result<Self::Accessor> {
        (**self).access(h, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Access; 5] = [
        Access::Read,
        Access::Write,
        Access::ReadWrite,
        Access::DiscardWrite,
        Access::DiscardReadWrite,
    ];

    #[test]
    fn test_resolve_narrows_to_requirement() {
        assert_eq!(Access::resolve(Access::ReadWrite, Access::Read), Ok(Access::Read));
        assert_eq!(Access::resolve(Access::ReadWrite, Access::Write), Ok(Access::Write));
        assert_eq!(
            Access::resolve(Access::Write, Access::DiscardWrite),
            Ok(Access::DiscardWrite)
        );
        assert_eq!(
            Access::resolve(Access::DiscardReadWrite, Access::Read),
            Ok(Access::Read)
        );
    }

    #[test]
    fn test_resolve_rejects_missing_capability() {
        assert_eq!(
            Access::resolve(Access::Read, Access::ReadWrite),
            Err(Error::IncompatibleAccess {
                supplied: Access::Read,
                required: Access::ReadWrite
            })
        );
        assert!(Access::resolve(Access::DiscardWrite, Access::Read).is_err());
    }

    #[test]
    fn test_resolve_is_identity_on_equal_modes() {
        for mode in ALL {
            assert_eq!(Access::resolve(mode, mode), Ok(mode));
        }
    }

    #[test]
    fn test_intersect() {
        assert_eq!(Access::Read.intersect(Access::ReadWrite), Some(Access::Read));
        assert_eq!(Access::Read.intersect(Access::Write), None);
        assert_eq!(
            Access::ReadWrite.intersect(Access::DiscardWrite),
            Some(Access::DiscardWrite)
        );
    }
}
