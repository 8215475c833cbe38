//! Reduction engine
//!
//! Two phases:
//!
//! 1. One grouped kernel. Worker `w` folds a contiguous chunk of the input, then the
//!    group combines its workers' partials, either with the native group reduction
//!    (operators with a known identity) or with a local-memory tree. The leader stores
//!    the group's result at `partials[group]`.
//! 2. While more than one partial remains, a flat kernel combines pairs at doubling
//!    strides in place (`ceil(log2(groups))` passes).
//!
//! Chunks are contiguous and the tree always combines a lower slot with a higher one,
//! so the result equals the sequential left fold for any associative operator, not
//! only commutative ones.

use super::dispatch::{SubDomain, submit_for};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::ops::{BinaryOp, Compare, Plus};
use crate::policy::ExecutionContext;
use crate::range::{Access, Accessor, AccessorMut, Buffer, Range, zip};
use tracing::trace;

/// Combine two optional partials, `None` being the empty partial
#[inline]
pub(crate) fn combine<T, Op: BinaryOp<T>>(op: &Op, a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(op.apply(a, b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Fold `f(i, range[i])` over the whole range with `op`; `None` for an empty range
pub(crate) fn reduce_core<R, T, Op, F>(
    ctx: &ExecutionContext,
    range: R,
    op: Op,
    f: F,
) -> Result<Option<T>>
where
    R: Range,
    T: Element,
    Op: BinaryOp<T>,
    F: Fn(usize, R::Item) -> T + Clone + Send + Sync + 'static,
{
    let n = range.len();
    if n == 0 {
        return Ok(None);
    }

    let group_size = ctx.work_group_size("reduce", size_of::<Option<T>>());
    let groups = ctx.compute_units().min(n.div_ceil(group_size)).max(1);
    let chunk = n.div_ceil(groups * group_size);
    let partials = Buffer::<Option<T>>::new(ctx.queue(), groups)?;
    let identity = op.known_identity();

    let mut prev = {
        let op = op.clone();
        let partials = &partials;
        let range = &range;
        ctx.submit("reduce", move |h| {
            let src = range.access(h, Access::Read)?;
            let dst = partials.access(h, Access::DiscardWrite)?;
            let scratch = h.local_accessor::<Option<T>>(group_size)?;
            h.parallel_for_work_group(groups, group_size, move |group| {
                let mut local = group.local_memory(&scratch);
                group.for_each_item(|item| {
                    let lo = (item.global_id() * chunk).min(n);
                    let hi = (lo + chunk).min(n);
                    local[item.local_id] = (lo..hi)
                        .map(|i| f(i, src.get(i)))
                        .reduce(|a, b| op.apply(a, b));
                });
                let result = match identity {
                    Some(identity) => Some(group.reduce_over_group(
                        local.iter().map(|v| v.unwrap_or(identity)),
                        identity,
                        |a, b| op.apply(a, b),
                    )),
                    None => {
                        let mut stride = 1;
                        while stride < group.local_size() {
                            group.for_each_item(|item| {
                                let i = item.local_id;
                                if i % (2 * stride) == 0 && i + stride < item.local_size {
                                    local[i] = combine(&op, local[i], local[i + stride]);
                                }
                            });
                            stride *= 2;
                        }
                        local[0]
                    }
                };
                group.leader(|_| unsafe { dst.set(group.id(), result) });
            })
        })?
    };

    let mut stride = 1;
    while stride < groups {
        trace!(kernel = %ctx.kernel_id("reduce_pass"), stride, groups, "reduce pass");
        let workers = groups.div_ceil(2 * stride);
        let op = op.clone();
        let after = prev.clone();
        prev = submit_for(ctx, "reduce_pass", SubDomain::full(workers), |h| {
            h.depends_on(&after);
            let acc = partials.access(h, Access::ReadWrite)?;
            Ok(move |k: usize| {
                let a = 2 * stride * k;
                let b = a + stride;
                if b < groups {
                    // SAFETY: worker `k` owns slots `a` and `b` in this pass.
                    unsafe { acc.set(a, combine(&op, acc.get(a), acc.get(b))) };
                }
            })
        })?;
        stride *= 2;
    }

    prev.wait()?;
    partials.get(0)
}

/// Fold the range with `op`, starting from `init`
///
/// Returns `init` for an empty range without touching the device.
pub fn reduce<R, Op>(ctx: &ExecutionContext, range: R, init: R::Item, op: Op) -> Result<R::Item>
where
    R: Range,
    Op: BinaryOp<R::Item>,
{
    transform_reduce(ctx, range, init, op, |v: R::Item| v)
}

/// Fold `f(range[i])` with `op`, starting from `init`
pub fn transform_reduce<R, T, Op, F>(
    ctx: &ExecutionContext,
    range: R,
    init: T,
    op: Op,
    f: F,
) -> Result<T>
where
    R: Range,
    T: Element,
    Op: BinaryOp<T>,
    F: Fn(R::Item) -> T + Clone + Send + Sync + 'static,
{
    let total = reduce_core(ctx, range, op.clone(), move |_, v| f(v))?;
    Ok(match total {
        Some(total) => op.apply(init, total),
        None => init,
    })
}

/// Fold `f(range1[i], range2[i])` with `op`, starting from `init`
///
/// The inner-product shape: `transform_reduce_binary(ctx, &a, &b, 0.0, Plus, |x, y| x * y)`.
pub fn transform_reduce_binary<R1, R2, T, Op, F>(
    ctx: &ExecutionContext,
    range1: R1,
    range2: R2,
    init: T,
    op: Op,
    f: F,
) -> Result<T>
where
    R1: Range,
    R2: Range,
    T: Element,
    Op: BinaryOp<T>,
    F: Fn(R1::Item, R2::Item) -> T + Clone + Send + Sync + 'static,
{
    Error::check_len("range2", range2.len(), range1.len())?;
    transform_reduce(ctx, zip((range1, range2)), init, op, move |(a, b)| f(a, b))
}

/// Number of elements satisfying `pred`
pub fn count_if<R, P>(ctx: &ExecutionContext, range: R, pred: P) -> Result<usize>
where
    R: Range,
    P: Fn(&R::Item) -> bool + Clone + Send + Sync + 'static,
{
    transform_reduce(ctx, range, 0usize, Plus, move |v| usize::from(pred(&v)))
}

/// Index of the first smallest element, `None` for an empty range
pub fn min_element<R, C>(ctx: &ExecutionContext, range: R, comp: C) -> Result<Option<usize>>
where
    R: Range,
    C: Compare<R::Item>,
{
    let pick = move |a: (R::Item, usize), b: (R::Item, usize)| {
        if comp.less(&b.0, &a.0) { b } else { a }
    };
    let best = reduce_core(ctx, range, pick, |i, v| (v, i))?;
    Ok(best.map(|(_, i)| i))
}

/// Index of the first largest element, `None` for an empty range
pub fn max_element<R, C>(ctx: &ExecutionContext, range: R, comp: C) -> Result<Option<usize>>
where
    R: Range,
    C: Compare<R::Item>,
{
    let pick = move |a: (R::Item, usize), b: (R::Item, usize)| {
        if comp.less(&a.0, &b.0) { b } else { a }
    };
    let best = reduce_core(ctx, range, pick, |i, v| (v, i))?;
    Ok(best.map(|(_, i)| i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_skips_empty_partials() {
        let op = |a: i32, b: i32| a - b;
        assert_eq!(combine(&op, Some(5), Some(3)), Some(2));
        assert_eq!(combine(&op, None, Some(3)), Some(3));
        assert_eq!(combine(&op, Some(5), None), Some(5));
        assert_eq!(combine::<i32, _>(&op, None, None), None);
    }
}
