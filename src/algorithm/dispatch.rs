//! Flat kernel dispatch and the element-wise algorithm family
//!
//! Every algorithm here is one flat kernel: `workers` independent workers, each
//! handling one index. [`SubDomain`] covers the case where the kernel touches a whole
//! buffer but only part of it needs a worker (e.g. [`reverse`] swaps pairs, so half as
//! many workers as elements).

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::policy::ExecutionContext;
use crate::range::{Access, Accessor, AccessorMut, Range};
use crate::runtime::{Event, Handler};

/// Index domain of a flat kernel: the buffer spans `[first, last)`, workers cover
/// `[first, mid)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SubDomain {
    pub first: usize,
    pub mid: usize,
    pub last: usize,
}

impl SubDomain {
    /// One worker per element of `[0, n)`
    pub(crate) fn full(n: usize) -> Self {
        Self {
            first: 0,
            mid: n,
            last: n,
        }
    }

    /// Buffer of `n` elements, workers for the first half
    pub(crate) fn half(n: usize) -> Self {
        Self {
            first: 0,
            mid: n / 2,
            last: n,
        }
    }

    pub(crate) fn workers(&self) -> usize {
        self.mid - self.first
    }
}

/// Submit a flat kernel over `domain`
///
/// `build` requests accessors on the handler and returns the per-index body; the body
/// receives indices in `[domain.first, domain.mid)`.
pub(crate) fn submit_for<B, F>(
    ctx: &ExecutionContext,
    stage: &str,
    domain: SubDomain,
    build: B,
) -> Result<Event>
where
    B: FnOnce(&mut Handler) -> Result<F>,
    F: Fn(usize) + Send + Sync + 'static,
{
    let first = domain.first;
    ctx.submit(stage, |h| {
        let body = build(h)?;
        h.parallel_for(domain.workers(), move |i| body(first + i))
    })
}

/// Access mode for an output of which only the first `n` elements get written
#[inline]
pub(crate) fn output_mode(output_len: usize, n: usize) -> Access {
    if output_len == n {
        Access::DiscardWrite
    } else {
        Access::Write
    }
}

/// Apply `f` to every element in place
pub fn for_each<R, F>(ctx: &ExecutionContext, range: R, f: F) -> Result<Event>
where
    R: Range,
    R::Accessor: AccessorMut,
    F: Fn(&mut R::Item) + Clone + Send + Sync + 'static,
{
    let n = range.len();
    if n == 0 {
        return Ok(Event::completed());
    }
    submit_for(ctx, "for_each", SubDomain::full(n), |h| {
        let acc = range.access(h, Access::ReadWrite)?;
        Ok(move |i: usize| {
            let mut value = acc.get(i);
            f(&mut value);
            // SAFETY: worker `i` is the only one touching element `i`.
            unsafe { acc.set(i, value) };
        })
    })
}

/// `output[i] = f(input[i])` for every element of `input`
pub fn transform<I, O, F>(ctx: &ExecutionContext, input: I, output: O, f: F) -> Result<Event>
where
    I: Range,
    O: Range,
    O::Accessor: AccessorMut,
    F: Fn(I::Item) -> O::Item + Clone + Send + Sync + 'static,
{
    let n = input.len();
    Error::check_len("output", output.len(), n)?;
    if n == 0 {
        return Ok(Event::completed());
    }
    submit_for(ctx, "transform", SubDomain::full(n), |h| {
        let src = input.access(h, Access::Read)?;
        let dst = output.access(h, output_mode(output.len(), n))?;
        Ok(move |i: usize| unsafe { dst.set(i, f(src.get(i))) })
    })
}

/// `output[i] = f(input1[i], input2[i])` for every element of `input1`
pub fn transform_binary<I1, I2, O, F>(
    ctx: &ExecutionContext,
    input1: I1,
    input2: I2,
    output: O,
    f: F,
) -> Result<Event>
where
    I1: Range,
    I2: Range,
    O: Range,
    O::Accessor: AccessorMut,
    F: Fn(I1::Item, I2::Item) -> O::Item + Clone + Send + Sync + 'static,
{
    let n = input1.len();
    Error::check_len("input2", input2.len(), n)?;
    Error::check_len("output", output.len(), n)?;
    if n == 0 {
        return Ok(Event::completed());
    }
    submit_for(ctx, "transform_binary", SubDomain::full(n), |h| {
        let a = input1.access(h, Access::Read)?;
        let b = input2.access(h, Access::Read)?;
        let dst = output.access(h, output_mode(output.len(), n))?;
        Ok(move |i: usize| unsafe { dst.set(i, f(a.get(i), b.get(i))) })
    })
}

/// Set every element to `value`
pub fn fill<R>(ctx: &ExecutionContext, range: R, value: R::Item) -> Result<Event>
where
    R: Range,
    R::Accessor: AccessorMut,
{
    let n = range.len();
    if n == 0 {
        return Ok(Event::completed());
    }
    submit_for(ctx, "fill", SubDomain::full(n), |h| {
        let dst = range.access(h, Access::DiscardWrite)?;
        Ok(move |i: usize| unsafe { dst.set(i, value) })
    })
}

/// Copy `input` into the front of `output`
pub fn copy<T, I, O>(ctx: &ExecutionContext, input: I, output: O) -> Result<Event>
where
    T: Element,
    I: Range<Item = T>,
    O: Range<Item = T>,
    O::Accessor: AccessorMut,
{
    let n = input.len();
    Error::check_len("output", output.len(), n)?;
    if n == 0 {
        return Ok(Event::completed());
    }
    submit_for(ctx, "copy", SubDomain::full(n), |h| {
        let src = input.access(h, Access::Read)?;
        let dst = output.access(h, output_mode(output.len(), n))?;
        Ok(move |i: usize| unsafe { dst.set(i, src.get(i)) })
    })
}

/// Reverse the range in place
pub fn reverse<R>(ctx: &ExecutionContext, range: R) -> Result<Event>
where
    R: Range,
    R::Accessor: AccessorMut,
{
    let n = range.len();
    if n < 2 {
        return Ok(Event::completed());
    }
    let domain = SubDomain::half(n);
    submit_for(ctx, "reverse", domain, |h| {
        let acc = range.access(h, Access::ReadWrite)?;
        Ok(move |i: usize| {
            let j = domain.last - 1 - i;
            let (a, b) = (acc.get(i), acc.get(j));
            // SAFETY: worker `i` owns the pair (i, n - 1 - i).
            unsafe {
                acc.set(i, b);
                acc.set(j, a);
            }
        })
    })
}
