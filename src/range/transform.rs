//! Transform views

use super::{Access, Accessor, Range};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::Handler;

/// Read-only view applying `f` to every element of a range on access
#[derive(Debug, Clone)]
pub struct Transform<R, F> {
    range: R,
    f: F,
}

/// Accessor of a [`Transform`]: applies the function at the point of access
#[derive(Debug, Clone)]
pub struct TransformAccessor<A, F> {
    inner: A,
    f: F,
}

/// View `range` through `f`
pub fn transform_view<R, F, U>(range: R, f: F) -> Transform<R, F>
where
    R: Range,
    F: Fn(R::Item) -> U + Clone + Send + Sync + 'static,
    U: Element,
{
    Transform { range, f }
}

impl<R, F, U> Range for Transform<R, F>
where
    R: Range,
    F: Fn(R::Item) -> U + Clone + Send + Sync + 'static,
    U: Element,
{
    type Item = U;
    type Accessor = TransformAccessor<R::Accessor, F>;

    fn len(&self) -> usize {
        self.range.len()
    }

    fn capability(&self) -> Access {
        Access::Read
    }

    fn access(&self, h: &mut Handler, mode: Access) -> Result<Self::Accessor> {
        if mode.writes() {
            return Err(Error::IncompatibleAccess {
                supplied: Access::Read,
                required: mode,
            });
        }
        Ok(TransformAccessor {
            inner: self.range.access(h, Access::Read)?,
            f: self.f.clone(),
        })
    }
}

impl<A, F, U> Accessor for TransformAccessor<A, F>
where
    A: Accessor,
    F: Fn(A::Item) -> U + Clone + Send + Sync + 'static,
    U: Element,
{
    type Item = U;

    #[inline]
    fn get(&self, i: usize) -> U {
        (self.f)(self.inner.get(i))
    }
}
