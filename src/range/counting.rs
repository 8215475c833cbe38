//! Counting sequences

use super::{Access, Accessor, Range};
use crate::dtype::Arithmetic;
use crate::error::{Error, Result};
use crate::runtime::Handler;
use num_traits::AsPrimitive;

/// Synthetic read-only range `start, start + 1, ..., start + len - 1`
///
/// Occupies no device memory.
#[derive(Debug, Clone, Copy)]
pub struct Counting<T = usize> {
    start: T,
    len: usize,
}

/// Accessor of a [`Counting`] range
#[derive(Debug, Clone, Copy)]
pub struct CountingAccessor<T> {
    start: T,
}

/// Range of `len` consecutive values starting at `start`
pub fn counting<T: Arithmetic>(start: T, len: usize) -> Counting<T>
where
    usize: AsPrimitive<T>,
{
    Counting { start, len }
}

impl<T: Arithmetic> Range for Counting<T>
where
    usize: AsPrimitive<T>,
{
    type Item = T;
    type Accessor = CountingAccessor<T>;

    fn len(&self) -> usize {
        self.len
    }

    fn capability(&self) -> Access {
        Access::Read
    }

    fn access(&self, _h: &mut Handler, mode: Access) -> Result<CountingAccessor<T>> {
        if mode.writes() {
            return Err(Error::IncompatibleAccess {
                supplied: Access::Read,
                required: mode,
            });
        }
        Ok(CountingAccessor { start: self.start })
    }
}

impl<T: Arithmetic> Accessor for CountingAccessor<T>
where
    usize: AsPrimitive<T>,
{
    type Item = T;

    #[inline]
    fn get(&self, i: usize) -> T {
        self.start + i.as_()
    }
}
