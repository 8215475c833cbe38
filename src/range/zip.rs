//! Zipped ranges

use super::{Access, Accessor, AccessorMut, Range};
use crate::error::Result;
use crate::runtime::Handler;

/// Tuple of ranges viewed as one range of tuples
///
/// The length is the shortest constituent's. Accessor requests go to every constituent
/// with the same mode.
#[derive(Debug, Clone)]
pub struct Zip<T>(pub T);

/// Accessor of a [`Zip`]: one accessor per constituent
#[derive(Debug, Clone)]
pub struct ZipAccessor<T>(pub T);

/// Zip a tuple of ranges
///
/// ```rust,ignore
/// let pairs = zip((&keys, &values));
/// stable_sort(&ctx, &pairs, |a: &(u32, f32), b: &(u32, f32)| a.0 < b.0)?;
/// ```
pub fn zip<T>(ranges: T) -> Zip<T> {
    Zip(ranges)
}

macro_rules! impl_zip {
    ($($r:ident $idx:tt),+) => {
        impl<$($r: Range),+> Range for Zip<($($r,)+)> {
            type Item = ($($r::Item,)+);
            type Accessor = ZipAccessor<($($r::Accessor,)+)>;

            fn len(&self) -> usize {
                [$(self.0.$idx.len()),+].into_iter().min().unwrap_or(0)
            }

            fn capability(&self) -> Access {
                [$(self.0.$idx.capability()),+]
                    .into_iter()
                    .try_fold(Access::ReadWrite, |acc, c| acc.intersect(c))
                    .unwrap_or(Access::Read)
            }

            fn access(&self, h: &mut Handler, mode: Access) -> Result<Self::Accessor> {
                Ok(ZipAccessor(($(self.0.$idx.access(h, mode)?,)+)))
            }
        }

        impl<$($r: Accessor),+> Accessor for ZipAccessor<($($r,)+)> {
            type Item = ($($r::Item,)+);

            #[inline]
            fn get(&self, i: usize) -> Self::Item {
                ($(self.0.$idx.get(i),)+)
            }
        }

        impl<$($r: AccessorMut),+> AccessorMut for ZipAccessor<($($r,)+)> {
            #[inline]
            unsafe fn set(&self, i: usize, value: Self::Item) {
                $(unsafe { self.0.$idx.set(i, value.$idx) };)+
            }
        }
    };
}

impl_zip!(A 0, B 1);
impl_zip!(A 0, B 1, C 2);
impl_zip!(A 0, B 1, C 2, D 3);
