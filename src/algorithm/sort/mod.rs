//! Sort engine
//!
//! `stable_sort` picks one of two pipelines from the comparator type:
//!
//! - [`Compare::RADIX`] comparators ([`Less`](crate::ops::Less),
//!   [`Greater`](crate::ops::Greater) on arithmetic types) go to the LSD radix sort in
//!   [`radix`].
//! - Everything else runs a bottom-up merge sort: runs of length `k = 1, 2, 4, ...`
//!   are merged pairwise by one worker per element, ping-ponging between the range and
//!   a scratch buffer, with a final copy back if the data ends up in scratch.
//!
//! `partial_sort` runs the same merge pipeline with the partial merge kernel, which only
//! resolves the first `mid` elements of every merged run.

pub(crate) mod merge_kernel;
mod radix;

use self::merge_kernel::{MergeKernel, MergeRuns};
use super::dispatch::{SubDomain, submit_for};
use crate::error::{Error, Result};
use crate::ops::Compare;
use crate::policy::ExecutionContext;
use crate::range::{Access, Accessor, AccessorMut, Buffer, Range};
use crate::runtime::Event;
use tracing::trace;

/// Sort the range in place, keeping equal elements in their original order
pub fn stable_sort<R, C>(ctx: &ExecutionContext, range: R, comp: C) -> Result<Event>
where
    R: Range,
    R::Accessor: AccessorMut,
    C: Compare<R::Item>,
{
    if range.len() < 2 {
        return Ok(Event::completed());
    }
    if C::RADIX {
        return radix::radix_sort(ctx, &range, comp);
    }
    merge_sort(ctx, &range, MergeKernel::Full, comp)
}

/// Sort the range in place
///
/// Every sort here is stable; this is [`stable_sort`].
pub fn sort<R, C>(ctx: &ExecutionContext, range: R, comp: C) -> Result<Event>
where
    R: Range,
    R::Accessor: AccessorMut,
    C: Compare<R::Item>,
{
    stable_sort(ctx, range, comp)
}

/// Place the `mid` smallest elements, sorted, at the front of the range
///
/// The order of the remaining elements is unspecified.
pub fn partial_sort<R, C>(ctx: &ExecutionContext, range: R, mid: usize, comp: C) -> Result<Event>
where
    R: Range,
    R::Accessor: AccessorMut,
    C: Compare<R::Item>,
{
    let n = range.len();
    if mid > n {
        return Err(Error::invalid_argument(
            "mid",
            format!("{mid} is past the end of a range of {n} elements"),
        ));
    }
    if mid == 0 || n < 2 {
        return Ok(Event::completed());
    }
    merge_sort(ctx, &range, MergeKernel::Partial { k: mid }, comp)
}

fn merge_sort<R, C>(ctx: &ExecutionContext, range: &R, kernel: MergeKernel, comp: C) -> Result<Event>
where
    R: Range,
    R::Accessor: AccessorMut,
    C: Compare<R::Item>,
{
    let n = range.len();
    let scratch = Buffer::<R::Item>::new(ctx.queue(), n)?;
    let mut prev = Event::completed();
    let mut in_scratch = false;
    let mut k = 1;

    while k < n {
        trace!(kernel = %ctx.kernel_id("merge_sort"), run = k, n, "merge sort pass");
        let after = prev;
        let comp = comp.clone();
        let from_scratch = in_scratch;
        prev = submit_for(ctx, "merge_sort", SubDomain::full(n), |h| {
            h.depends_on(&after);
            let data = range.access(h, Access::ReadWrite)?;
            let temp = scratch.access(h, Access::ReadWrite)?;
            Ok(move |i: usize| {
                let start = 2 * k * (i / (2 * k));
                let end1 = (start + k).min(n);
                let runs = MergeRuns {
                    start1: start,
                    end1,
                    start2: end1,
                    end2: (start + 2 * k).min(n),
                    out: start,
                };
                if from_scratch {
                    kernel.run(i, &temp, &temp, runs, &data, &comp);
                } else {
                    kernel.run(i, &data, &data, runs, &temp, &comp);
                }
            })
        })?;
        in_scratch = !in_scratch;
        k *= 2;
    }

    if !in_scratch {
        return Ok(prev);
    }
    submit_for(ctx, "merge_sort_copy", SubDomain::full(n), |h| {
        h.depends_on(&prev);
        let data = range.access(h, Access::DiscardWrite)?;
        let temp = scratch.access(h, Access::Read)?;
        // SAFETY: one worker per element.
        Ok(move |i: usize| unsafe { data.set(i, temp.get(i)) })
    })
}
