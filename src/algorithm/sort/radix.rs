//! LSD radix sort for comparators with an order-preserving unsigned key
//!
//! One round per 8-bit digit of the key, least significant first:
//!
//! 1. histogram: group `g` counts the digits of its contiguous block into local memory
//!    and stores them column-wise, `counts[digit * groups + g]`
//! 2. exclusive scan of `counts` through the scan engine, giving every (digit, group)
//!    pair its first output slot
//! 3. scatter: each group walks its block in order and moves every element to the next
//!    slot of its (digit, group) pair, which keeps the sort stable
//!
//! Rounds ping-pong between the range and a scratch buffer.

use crate::algorithm::scan::exclusive_scan;
use crate::dtype::Element;
use crate::error::Result;
use crate::ops::{Compare, Plus};
use crate::policy::ExecutionContext;
use crate::range::{Access, Accessor, AccessorMut, Buffer, Range};
use crate::runtime::Event;
use tracing::trace;

const DIGIT_BITS: u32 = 8;
const BUCKETS: usize = 1 << DIGIT_BITS;

#[inline]
fn digit(key: u64, shift: u32) -> usize {
    ((key >> shift) as usize) & (BUCKETS - 1)
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    n: usize,
    groups: usize,
    group_size: usize,
    block: usize,
}

impl Layout {
    fn block(&self, group: usize) -> std::ops::Range<usize> {
        let lo = (group * self.block).min(self.n);
        lo..(lo + self.block).min(self.n)
    }
}

pub(super) fn radix_sort<R, C>(ctx: &ExecutionContext, range: &R, comp: C) -> Result<Event>
where
    R: Range,
    R::Accessor: AccessorMut,
    C: Compare<R::Item>,
{
    let n = range.len();
    let group_size = ctx.work_group_size("radix_histogram", 0);
    let groups = ctx.compute_units().min(n.div_ceil(group_size)).max(1);
    let layout = Layout {
        n,
        groups,
        group_size,
        block: n.div_ceil(groups),
    };
    let rounds = comp.radix_bits().div_ceil(DIGIT_BITS);

    let queue = ctx.queue();
    let scratch = Buffer::<R::Item>::new(queue, n)?;
    let counts = Buffer::<usize>::new(queue, BUCKETS * groups)?;
    let offsets = Buffer::<usize>::new(queue, BUCKETS * groups)?;
    let scan_ctx = ctx.wrapped("radix");

    let mut prev = Event::completed();
    let mut in_scratch = false;
    for round in 0..rounds {
        let shift = round * DIGIT_BITS;
        trace!(kernel = %ctx.kernel_id("radix_scatter"), round, rounds, groups, "radix round");
        prev = if in_scratch {
            histogram(ctx, &scratch, &counts, &comp, shift, layout, &prev)?
        } else {
            histogram(ctx, range, &counts, &comp, shift, layout, &prev)?
        };
        prev = exclusive_scan(&scan_ctx, &counts, &offsets, 0usize, Plus)?;
        prev = if in_scratch {
            scatter(ctx, &scratch, range, &offsets, &comp, shift, layout, &prev)?
        } else {
            scatter(ctx, range, &scratch, &offsets, &comp, shift, layout, &prev)?
        };
        in_scratch = !in_scratch;
    }

    if !in_scratch {
        return Ok(prev);
    }
    ctx.submit("radix_copy", |h| {
        h.depends_on(&prev);
        let data = range.access(h, Access::DiscardWrite)?;
        let temp = scratch.access(h, Access::Read)?;
        h.parallel_for(n, move |i| unsafe { data.set(i, temp.get(i)) })
    })
}

fn histogram<S, C>(
    ctx: &ExecutionContext,
    src: &S,
    counts: &Buffer<usize>,
    comp: &C,
    shift: u32,
    layout: Layout,
    after: &Event,
) -> Result<Event>
where
    S: Range,
    C: Compare<S::Item>,
{
    ctx.submit("radix_histogram", |h| {
        h.depends_on(after);
        let src = src.access(h, Access::Read)?;
        let dst = counts.access(h, Access::DiscardWrite)?;
        let local = h.local_accessor::<usize>(BUCKETS)?;
        let comp = comp.clone();
        h.parallel_for_work_group(layout.groups, layout.group_size, move |group| {
            let block = layout.block(group.id());
            let mut hist = group.local_memory(&local);
            // Workers of one group run a phase in turn, so plain increments suffice
            group.for_each_item(|item| {
                for i in block.clone().skip(item.local_id).step_by(item.local_size) {
                    hist[digit(comp.radix_key(&src.get(i)), shift)] += 1;
                }
            });
            group.for_each_item(|item| {
                for d in (item.local_id..BUCKETS).step_by(item.local_size) {
                    // SAFETY: column `group.id()` belongs to this group.
                    unsafe { dst.set(d * layout.groups + group.id(), hist[d]) };
                }
            });
        })
    })
}

#[allow(clippy::too_many_arguments)]
fn scatter<S, D, C, T>(
    ctx: &ExecutionContext,
    src: &S,
    dst: &D,
    offsets: &Buffer<usize>,
    comp: &C,
    shift: u32,
    layout: Layout,
    after: &Event,
) -> Result<Event>
where
    T: Element,
    S: Range<Item = T>,
    D: Range<Item = T>,
    D::Accessor: AccessorMut,
    C: Compare<T>,
{
    ctx.submit("radix_scatter", |h| {
        h.depends_on(after);
        let src = src.access(h, Access::Read)?;
        let dst = dst.access(h, Access::DiscardWrite)?;
        let offsets = offsets.access(h, Access::Read)?;
        let local = h.local_accessor::<usize>(BUCKETS)?;
        let comp = comp.clone();
        h.parallel_for_work_group(layout.groups, layout.group_size, move |group| {
            let g = group.id();
            let mut next = group.local_memory(&local);
            group.for_each_item(|item| {
                for d in (item.local_id..BUCKETS).step_by(item.local_size) {
                    next[d] = offsets.get(d * layout.groups + g);
                }
            });
            group.leader(|_| {
                for i in layout.block(g) {
                    let value = src.get(i);
                    let d = digit(comp.radix_key(&value), shift);
                    // SAFETY: slots of (digit, group) pairs are disjoint.
                    unsafe { dst.set(next[d], value) };
                    next[d] += 1;
                }
            });
        })
    })
}
