//! Permutation views

use super::{Access, Accessor, AccessorMut, Range};
use crate::error::Result;
use crate::runtime::Handler;

/// View of `source` reordered through an index map
///
/// Element `i` of the view is `source[map[i]]`; the view is as long as the map. Writing
/// through the view requires the map to be injective.
#[derive(Debug, Clone)]
pub struct Permutation<R, I> {
    source: R,
    map: I,
}

/// Accessor of a [`Permutation`]
#[derive(Debug, Clone)]
pub struct PermutationAccessor<A, M> {
    source: A,
    map: M,
}

/// View `source` through the index range `map`
pub fn permutation<R: Range, I: Range<Item = usize>>(source: R, map: I) -> Permutation<R, I> {
    Permutation { source, map }
}

impl<R: Range, I: Range<Item = usize>> Range for Permutation<R, I> {
    type Item = R::Item;
    type Accessor = PermutationAccessor<R::Accessor, I::Accessor>;

    fn len(&self) -> usize {
        self.map.len()
    }

    fn capability(&self) -> Access {
        self.source.capability()
    }

    fn access(&self, h: &mut Handler, mode: Access) -> Result<Self::Accessor> {
        // The map need not cover the whole source, so prior contents always survive
        let mode = match mode {
            Access::DiscardWrite => Access::Write,
            Access::DiscardReadWrite => Access::ReadWrite,
            other => other,
        };
        Ok(PermutationAccessor {
            source: self.source.access(h, mode)?,
            map: self.map.access(h, Access::Read)?,
        })
    }
}

impl<A: Accessor, M: Accessor<Item = usize>> Accessor for PermutationAccessor<A, M> {
    type Item = A::Item;

    #[inline]
    fn get(&self, i: usize) -> A::Item {
        self.source.get(self.map.get(i))
    }
}

impl<A: AccessorMut, M: Accessor<Item = usize>> AccessorMut for PermutationAccessor<A, M> {
    #[inline]
    unsafe fn set(&self, i: usize, value: A::Item) {
        unsafe { self.source.set(self.map.get(i), value) };
    }
}
