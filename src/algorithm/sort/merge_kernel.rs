//! Merge-path kernels shared by the merge sort, partial sort and standalone merge
//!
//! Every variant places elements of two sorted runs directly at their merged position:
//! an element of run 1 lands after all run-2 elements strictly less than it
//! (`lower_bound`), an element of run 2 after all run-1 elements not greater than it
//! (`upper_bound`). Ties therefore keep run 1 first, which makes every variant stable.

use crate::ops::Compare;
use crate::range::{Accessor, AccessorMut};

/// First position in `[lo, hi)` whose element is not less than `value`
pub(crate) fn lower_bound<A, C>(acc: &A, mut lo: usize, mut hi: usize, value: &A::Item, comp: &C) -> usize
where
    A: Accessor,
    C: Compare<A::Item>,
{
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if comp.less(&acc.get(mid), value) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// First position in `[lo, hi)` whose element is greater than `value`
pub(crate) fn upper_bound<A, C>(acc: &A, mut lo: usize, mut hi: usize, value: &A::Item, comp: &C) -> usize
where
    A: Accessor,
    C: Compare<A::Item>,
{
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if comp.less(value, &acc.get(mid)) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Two sorted runs `[start1, end1)` and `[start2, end2)` merged into the output
/// starting at `out`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MergeRuns {
    pub start1: usize,
    pub end1: usize,
    pub start2: usize,
    pub end2: usize,
    pub out: usize,
}

/// Merge kernel variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeKernel {
    /// One worker per element; `index` is the element's position in the shared
    /// input, which holds both runs
    Full,
    /// One worker per `chunk`-wide slice of both runs; `index` is the slice's offset
    /// from the start of each run. Only the slice's first and last elements search the
    /// whole opposite run, the elements between them search the window those two
    /// bound. Both runs must be non-empty.
    Bunched { chunk: usize },
    /// Like [`Full`](Self::Full), but only the first `k` elements of the merged run
    /// are resolved; the rest of each run is appended unordered. Requires
    /// `end1 == start2`.
    Partial { k: usize },
}

impl MergeKernel {
    /// Run one worker of this kernel
    #[inline]
    pub(crate) fn run<A1, A2, O, C>(&self, index: usize, in1: &A1, in2: &A2, runs: MergeRuns, out: &O, comp: &C)
    where
        A1: Accessor,
        A2: Accessor<Item = A1::Item>,
        O: AccessorMut<Item = A1::Item>,
        C: Compare<A1::Item>,
    {
        // SAFETY (all variants): merged positions are a permutation of the output
        // window, so every output slot has exactly one writer.
        match *self {
            Self::Full => full(index, in1, in2, runs, out, comp),
            Self::Bunched { chunk } => bunched(index, in1, in2, runs, out, comp, chunk),
            Self::Partial { k } => partial(index, in1, in2, runs, out, comp, k),
        }
    }
}

fn full<A1, A2, O, C>(index: usize, in1: &A1, in2: &A2, r: MergeRuns, out: &O, comp: &C)
where
    A1: Accessor,
    A2: Accessor<Item = A1::Item>,
    O: AccessorMut<Item = A1::Item>,
    C: Compare<A1::Item>,
{
    if index >= r.start1 && index < r.end1 {
        let value = in1.get(index);
        let before = lower_bound(in2, r.start2, r.end2, &value, comp) - r.start2;
        unsafe { out.set(r.out + index - r.start1 + before, value) };
    } else if index >= r.start2 && index < r.end2 {
        let value = in2.get(index);
        let before = upper_bound(in1, r.start1, r.end1, &value, comp) - r.start1;
        unsafe { out.set(r.out + index - r.start2 + before, value) };
    }
}

//    start1      part1   end1 start2      part2   end2
//      |___________|_______|    |___________|_______|
//      |_____p1____|__p2___|    |_____p3____|__p4___|
//
// p1 and p3 are merged into the front of the output; p2 then p4 are copied after them.
// The first k merged elements are the k smallest of both runs.
fn partial<A1, A2, O, C>(index: usize, in1: &A1, in2: &A2, r: MergeRuns, out: &O, comp: &C, k: usize)
where
    A1: Accessor,
    A2: Accessor<Item = A1::Item>,
    O: AccessorMut<Item = A1::Item>,
    C: Compare<A1::Item>,
{
    debug_assert_eq!(r.end1, r.start2, "partial merge runs must be contiguous");
    let part1 = (r.start1 + k).min(r.end1);
    let part2 = (r.start2 + k).min(r.end2);

    if index >= r.start1 && index < part1 {
        let value = in1.get(index);
        let shift = index - r.start1 + lower_bound(in2, r.start2, part2, &value, comp) - r.start2;
        unsafe { out.set(r.out + shift, value) };
    } else if index >= part1 && index < r.end1 {
        let shift = (index - part1) + (part1 - r.start1) + (part2 - r.start2);
        unsafe { out.set(r.out + shift, in1.get(index)) };
    } else if index >= r.start2 && index < part2 {
        let value = in2.get(index);
        let shift = index - r.start2 + upper_bound(in1, r.start1, part1, &value, comp) - r.start1;
        unsafe { out.set(r.out + shift, value) };
    } else if index >= part2 && index < r.end2 {
        let shift = index - r.start2 + r.end1 - r.start1;
        unsafe { out.set(r.out + shift, in2.get(index)) };
    }
}

fn bunched<A1, A2, O, C>(index: usize, in1: &A1, in2: &A2, r: MergeRuns, out: &O, comp: &C, chunk: usize)
where
    A1: Accessor,
    A2: Accessor<Item = A1::Item>,
    O: AccessorMut<Item = A1::Item>,
    C: Compare<A1::Item>,
{
    let local_start1 = (r.start1 + index).min(r.end1);
    let local_end1 = (local_start1 + chunk).min(r.end1);
    let local_start2 = (r.start2 + index).min(r.end2);
    let local_end2 = (local_start2 + chunk).min(r.end2);

    let last1 = in1.get(r.end1 - 1);
    let first2 = in2.get(r.start2);

    // Run 1 entirely before run 2
    if !comp.less(&first2, &last1) {
        let shift1 = r.out + local_start1 - r.start1;
        let shift2 = r.out + r.end1 - r.start1 + local_start2 - r.start2;
        for i in local_start1..local_end1 {
            unsafe { out.set(shift1 + i - local_start1, in1.get(i)) };
        }
        for i in local_start2..local_end2 {
            unsafe { out.set(shift2 + i - local_start2, in2.get(i)) };
        }
        return;
    }
    // Run 2 entirely before run 1
    let first1 = in1.get(r.start1);
    let last2 = in2.get(r.end2 - 1);
    if comp.less(&last2, &first1) {
        let shift1 = r.out + r.end2 - r.start2 + local_start1 - r.start1;
        let shift2 = r.out + local_start2 - r.start2;
        for i in local_start1..local_end1 {
            unsafe { out.set(shift1 + i - local_start1, in1.get(i)) };
        }
        for i in local_start2..local_end2 {
            unsafe { out.set(shift2 + i - local_start2, in2.get(i)) };
        }
        return;
    }

    if local_start1 < local_end1 {
        let left = in1.get(local_start1);
        let mut lo2 = lower_bound(in2, r.start2, r.end2, &left, comp);
        unsafe { out.set(r.out + local_start1 - r.start1 + lo2 - r.start2, left) };
        let mut hi2 = lo2;
        if local_end1 - local_start1 > 1 {
            let right = in1.get(local_end1 - 1);
            hi2 = lower_bound(in2, lo2, r.end2, &right, comp);
            unsafe { out.set(r.out + local_end1 - 1 - r.start1 + hi2 - r.start2, right) };
        }
        for i in local_start1 + 1..local_end1.saturating_sub(1) {
            let value = in1.get(i);
            lo2 = lower_bound(in2, lo2, hi2, &value, comp);
            unsafe { out.set(r.out + i - r.start1 + lo2 - r.start2, value) };
        }
    }

    if local_start2 < local_end2 {
        let left = in2.get(local_start2);
        let mut lo1 = upper_bound(in1, r.start1, r.end1, &left, comp);
        unsafe { out.set(r.out + lo1 - r.start1 + local_start2 - r.start2, left) };
        let mut hi1 = lo1;
        if local_end2 - local_start2 > 1 {
            let right = in2.get(local_end2 - 1);
            hi1 = upper_bound(in1, lo1, r.end1, &right, comp);
            unsafe { out.set(r.out + hi1 - r.start1 + local_end2 - 1 - r.start2, right) };
        }
        for i in local_start2 + 1..local_end2.saturating_sub(1) {
            let value = in2.get(i);
            lo1 = upper_bound(in1, lo1, hi1, &value, comp);
            unsafe { out.set(r.out + lo1 - r.start1 + i - r.start2, value) };
        }
    }
}
