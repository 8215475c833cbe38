//! Find engine: early-exit search over index predicates
//!
//! Everything here reduces to [`find_or`]: test a predicate on every index and keep
//! the best match according to a [`FindTag`]. The best match lives in a global atomic
//! seeded with the tag's "not found" value. Each group snapshots it into a group-local
//! atomic, its workers scan their strided share and improve the local atomic on a
//! match, and the leader folds the local result into the global one. All updates are
//! compare-and-swap loops that only ever move the value in the tag's direction.
//!
//! Worker `w` of group `g` visits, with `s = min(group_size, 8)`,
//!
//! ```text
//! g * group_size * n_iter + (w / s) * s * n_iter + w % s + i * s,   i = 0 .. n_iter
//! ```
//!
//! so each `s` consecutive workers sweep one contiguous block together. Backward search
//! walks `i` in reverse.

use crate::error::Result;
use crate::ops::Compare;
use crate::policy::ExecutionContext;
use crate::range::{Access, Accessor, Range};
use crate::runtime::Handler;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

// Workers of one sub-block
const MAX_SHIFT: usize = 8;

// Iterations between two looks at the group-local result
const EARLY_EXIT_BATCH: usize = 4;

/// What [`find_or`] looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindTag {
    /// Lowest matching index; "not found" is the range length
    Forward,
    /// Highest matching index; "not found" is `-1`
    Backward,
    /// Whether any index matches; "not found" is `0`, found is `1`
    Or,
}

impl FindTag {
    /// Raw value meaning "no match" for a search over `len` indices
    pub fn not_found(self, len: usize) -> i64 {
        match self {
            Self::Forward => len as i64,
            Self::Backward => -1,
            Self::Or => 0,
        }
    }

    /// Raw value recorded for a match at `index`
    #[inline]
    fn candidate(self, index: usize) -> i64 {
        match self {
            Self::Or => 1,
            _ => index as i64,
        }
    }

    /// Whether `candidate` should replace `current`
    #[inline]
    fn improves(self, candidate: i64, current: i64) -> bool {
        match self {
            Self::Forward => candidate < current,
            Self::Backward => candidate > current,
            Self::Or => candidate == 1 && current == 0,
        }
    }

    /// Move `slot` to `candidate` if that is an improvement
    fn improve(self, slot: &AtomicI64, candidate: i64) {
        let mut current = slot.load(Ordering::Acquire);
        while self.improves(candidate, current) {
            match slot.compare_exchange_weak(current, candidate, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Outcome of [`find_or`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindResult {
    tag: FindTag,
    raw: i64,
    len: usize,
}

impl FindResult {
    fn not_found(tag: FindTag, len: usize) -> Self {
        Self {
            tag,
            raw: tag.not_found(len),
            len,
        }
    }

    /// Raw result: an index or sentinel for `Forward`/`Backward`, `0`/`1` for `Or`
    pub fn raw(&self) -> i64 {
        self.raw
    }

    /// Returns true if some index matched
    pub fn found(&self) -> bool {
        self.raw != self.tag.not_found(self.len)
    }

    /// Matching index, for `Forward` and `Backward` searches
    pub fn position(&self) -> Option<usize> {
        match self.tag {
            FindTag::Or => None,
            _ if self.found() => Some(self.raw as usize),
            _ => None,
        }
    }
}

/// Test `pred` on the indices `[0, count)`
fn find_core<B, P>(ctx: &ExecutionContext, stage: &str, count: usize, tag: FindTag, build: B) -> Result<FindResult>
where
    B: FnOnce(&mut Handler) -> Result<P>,
    P: Fn(usize) -> bool + Send + Sync + 'static,
{
    if count == 0 {
        return Ok(FindResult::not_found(tag, 0));
    }
    let group_size = ctx.work_group_size(stage, 0);
    let groups = count.div_ceil(group_size).min(ctx.compute_units()).max(1);
    let n_iter = count.div_ceil(groups * group_size);
    let best = Arc::new(AtomicI64::new(tag.not_found(count)));

    let event = {
        let best = best.clone();
        ctx.submit(stage, move |h| {
            let pred = build(h)?;
            h.parallel_for_work_group(groups, group_size, move |group| {
                let local = AtomicI64::new(group.leader(|_| best.load(Ordering::Acquire)));
                let shift = group.local_size().min(MAX_SHIFT);
                group.for_each_item(|item| {
                    let first = item.group_id * item.local_size * n_iter
                        + (item.local_id / shift) * shift * n_iter
                        + item.local_id % shift;
                    for i in 0..n_iter {
                        let step = match tag {
                            FindTag::Backward => n_iter - 1 - i,
                            _ => i,
                        };
                        let index = first + step * shift;
                        if i % EARLY_EXIT_BATCH == 0
                            && !tag.improves(tag.candidate(index), local.load(Ordering::Relaxed))
                        {
                            return;
                        }
                        if index < count && pred(index) {
                            tag.improve(&local, tag.candidate(index));
                            return;
                        }
                    }
                });
                group.leader(|_| tag.improve(&best, local.load(Ordering::Acquire)));
            })
        })?
    };
    event.wait()?;
    Ok(FindResult {
        tag,
        raw: best.load(Ordering::Acquire),
        len: count,
    })
}

// ============================================================================
// Primitive
// ============================================================================

/// Search `range` with an index predicate
///
/// `pred(i, acc)` decides whether index `i` matches, reading the range through `acc`,
/// so a predicate may look at neighboring elements. An empty range returns the tag's
/// "not found" result without touching the device.
pub fn find_or<R, P>(ctx: &ExecutionContext, range: R, pred: P, tag: FindTag) -> Result<FindResult>
where
    R: Range,
    P: Fn(usize, &R::Accessor) -> bool + Clone + Send + Sync + 'static,
{
    let n = range.len();
    first_where(ctx, "find_or", n, range, pred, tag)
}

/// [`find_or`] over the indices of `range1`, with `range2` also available to the
/// predicate
pub fn find_or_with<R1, R2, P>(
    ctx: &ExecutionContext,
    range1: R1,
    range2: R2,
    pred: P,
    tag: FindTag,
) -> Result<FindResult>
where
    R1: Range,
    R2: Range,
    P: Fn(usize, &R1::Accessor, &R2::Accessor) -> bool + Clone + Send + Sync + 'static,
{
    find_or_within(ctx, "find_or_with", range1.len(), range1, range2, pred, tag)
}

fn find_or_within<R1, R2, P>(
    ctx: &ExecutionContext,
    stage: &str,
    count: usize,
    range1: R1,
    range2: R2,
    pred: P,
    tag: FindTag,
) -> Result<FindResult>
where
    R1: Range,
    R2: Range,
    P: Fn(usize, &R1::Accessor, &R2::Accessor) -> bool + Clone + Send + Sync + 'static,
{
    find_core(ctx, stage, count, tag, |h| {
        let a = range1.access(h, Access::Read)?;
        let b = range2.access(h, Access::Read)?;
        Ok(move |i: usize| pred(i, &a, &b))
    })
}

fn first_where<R, P>(ctx: &ExecutionContext, stage: &str, count: usize, range: R, pred: P, tag: FindTag) -> Result<FindResult>
where
    R: Range,
    P: Fn(usize, &R::Accessor) -> bool + Clone + Send + Sync + 'static,
{
    find_core(ctx, stage, count, tag, |h| {
        let acc = range.access(h, Access::Read)?;
        Ok(move |i: usize| pred(i, &acc))
    })
}

// ============================================================================
// Queries
// ============================================================================

/// Index of the first element equal to `value`
pub fn find<R>(ctx: &ExecutionContext, range: R, value: R::Item) -> Result<Option<usize>>
where
    R: Range,
    R::Item: PartialEq,
{
    let n = range.len();
    first_where(ctx, "find", n, range, move |i, acc: &R::Accessor| acc.get(i) == value, FindTag::Forward)
        .map(|r| r.position())
}

/// Index of the first element satisfying `pred`
pub fn find_if<R, P>(ctx: &ExecutionContext, range: R, pred: P) -> Result<Option<usize>>
where
    R: Range,
    P: Fn(&R::Item) -> bool + Clone + Send + Sync + 'static,
{
    let n = range.len();
    first_where(ctx, "find_if", n, range, move |i, acc: &R::Accessor| pred(&acc.get(i)), FindTag::Forward)
        .map(|r| r.position())
}

/// Index of the first element not satisfying `pred`
pub fn find_if_not<R, P>(ctx: &ExecutionContext, range: R, pred: P) -> Result<Option<usize>>
where
    R: Range,
    P: Fn(&R::Item) -> bool + Clone + Send + Sync + 'static,
{
    let n = range.len();
    first_where(ctx, "find_if_not", n, range, move |i, acc: &R::Accessor| !pred(&acc.get(i)), FindTag::Forward)
        .map(|r| r.position())
}

/// Index of the last element satisfying `pred`
pub fn find_last_if<R, P>(ctx: &ExecutionContext, range: R, pred: P) -> Result<Option<usize>>
where
    R: Range,
    P: Fn(&R::Item) -> bool + Clone + Send + Sync + 'static,
{
    let n = range.len();
    first_where(ctx, "find_last_if", n, range, move |i, acc: &R::Accessor| pred(&acc.get(i)), FindTag::Backward)
        .map(|r| r.position())
}

/// Whether some element satisfies `pred`; false for an empty range
pub fn any_of<R, P>(ctx: &ExecutionContext, range: R, pred: P) -> Result<bool>
where
    R: Range,
    P: Fn(&R::Item) -> bool + Clone + Send + Sync + 'static,
{
    let n = range.len();
    first_where(ctx, "any_of", n, range, move |i, acc: &R::Accessor| pred(&acc.get(i)), FindTag::Or)
        .map(|r| r.found())
}

/// Whether every element satisfies `pred`; true for an empty range
pub fn all_of<R, P>(ctx: &ExecutionContext, range: R, pred: P) -> Result<bool>
where
    R: Range,
    P: Fn(&R::Item) -> bool + Clone + Send + Sync + 'static,
{
    let n = range.len();
    first_where(ctx, "all_of", n, range, move |i, acc: &R::Accessor| !pred(&acc.get(i)), FindTag::Or)
        .map(|r| !r.found())
}

/// Whether no element satisfies `pred`; true for an empty range
pub fn none_of<R, P>(ctx: &ExecutionContext, range: R, pred: P) -> Result<bool>
where
    R: Range,
    P: Fn(&R::Item) -> bool + Clone + Send + Sync + 'static,
{
    any_of(ctx, range, pred).map(|any| !any)
}

/// Index of the first element equal (by `eq`) to its successor
pub fn adjacent_find<R, E>(ctx: &ExecutionContext, range: R, eq: E) -> Result<Option<usize>>
where
    R: Range,
    E: Fn(&R::Item, &R::Item) -> bool + Clone + Send + Sync + 'static,
{
    let n = range.len();
    first_where(
        ctx,
        "adjacent_find",
        n.saturating_sub(1),
        range,
        move |i, acc: &R::Accessor| eq(&acc.get(i), &acc.get(i + 1)),
        FindTag::Forward,
    )
    .map(|r| r.position())
}

/// Whether the range is sorted according to `comp`
pub fn is_sorted<R, C>(ctx: &ExecutionContext, range: R, comp: C) -> Result<bool>
where
    R: Range,
    C: Compare<R::Item>,
{
    let n = range.len();
    first_where(
        ctx,
        "is_sorted",
        n.saturating_sub(1),
        range,
        move |i, acc: &R::Accessor| comp.less(&acc.get(i + 1), &acc.get(i)),
        FindTag::Or,
    )
    .map(|r| !r.found())
}

/// Whether both ranges have the same length and pairwise equal elements
pub fn equal<R1, R2, E>(ctx: &ExecutionContext, range1: R1, range2: R2, eq: E) -> Result<bool>
where
    R1: Range,
    R2: Range,
    E: Fn(&R1::Item, &R2::Item) -> bool + Clone + Send + Sync + 'static,
{
    if range1.len() != range2.len() {
        return Ok(false);
    }
    let n = range1.len();
    find_or_within(
        ctx,
        "equal",
        n,
        range1,
        range2,
        move |i, a: &R1::Accessor, b: &R2::Accessor| !eq(&a.get(i), &b.get(i)),
        FindTag::Or,
    )
    .map(|r| !r.found())
}

/// First index, within the shorter length, where the ranges differ
pub fn mismatch<R1, R2, E>(ctx: &ExecutionContext, range1: R1, range2: R2, eq: E) -> Result<Option<usize>>
where
    R1: Range,
    R2: Range,
    E: Fn(&R1::Item, &R2::Item) -> bool + Clone + Send + Sync + 'static,
{
    let n = range1.len().min(range2.len());
    find_or_within(
        ctx,
        "mismatch",
        n,
        range1,
        range2,
        move |i, a: &R1::Accessor, b: &R2::Accessor| !eq(&a.get(i), &b.get(i)),
        FindTag::Forward,
    )
    .map(|r| r.position())
}

/// Index of the first occurrence of `needle` in `haystack`
///
/// An empty needle matches at 0.
pub fn search<R1, R2, E>(ctx: &ExecutionContext, haystack: R1, needle: R2, eq: E) -> Result<Option<usize>>
where
    R1: Range,
    R2: Range,
    E: Fn(&R1::Item, &R2::Item) -> bool + Clone + Send + Sync + 'static,
{
    let (n, m) = (haystack.len(), needle.len());
    if m == 0 {
        return Ok(Some(0));
    }
    if m > n {
        return Ok(None);
    }
    find_or_within(
        ctx,
        "search",
        n - m + 1,
        haystack,
        needle,
        move |i, h: &R1::Accessor, s: &R2::Accessor| (0..m).all(|j| eq(&h.get(i + j), &s.get(j))),
        FindTag::Forward,
    )
    .map(|r| r.position())
}

/// Index of the last occurrence of `needle` in `haystack`
///
/// An empty needle never matches.
pub fn find_end<R1, R2, E>(ctx: &ExecutionContext, haystack: R1, needle: R2, eq: E) -> Result<Option<usize>>
where
    R1: Range,
    R2: Range,
    E: Fn(&R1::Item, &R2::Item) -> bool + Clone + Send + Sync + 'static,
{
    let (n, m) = (haystack.len(), needle.len());
    if m == 0 || m > n {
        return Ok(None);
    }
    find_or_within(
        ctx,
        "find_end",
        n - m + 1,
        haystack,
        needle,
        move |i, h: &R1::Accessor, s: &R2::Accessor| (0..m).all(|j| eq(&h.get(i + j), &s.get(j))),
        FindTag::Backward,
    )
    .map(|r| r.position())
}

/// Index of the first run of `count` consecutive elements equal (by `eq`) to `value`
///
/// A zero count matches at 0.
pub fn search_n<R, E>(ctx: &ExecutionContext, range: R, count: usize, value: R::Item, eq: E) -> Result<Option<usize>>
where
    R: Range,
    E: Fn(&R::Item, &R::Item) -> bool + Clone + Send + Sync + 'static,
{
    let n = range.len();
    if count == 0 {
        return Ok(Some(0));
    }
    if count > n {
        return Ok(None);
    }
    first_where(
        ctx,
        "search_n",
        n - count + 1,
        range,
        move |i, acc: &R::Accessor| (0..count).all(|j| eq(&acc.get(i + j), &value)),
        FindTag::Forward,
    )
    .map(|r| r.position())
}

/// Index of the first element of `range` equal (by `eq`) to any element of `set`
pub fn find_first_of<R1, R2, E>(ctx: &ExecutionContext, range: R1, set: R2, eq: E) -> Result<Option<usize>>
where
    R1: Range,
    R2: Range,
    E: Fn(&R1::Item, &R2::Item) -> bool + Clone + Send + Sync + 'static,
{
    let (n, m) = (range.len(), set.len());
    if m == 0 {
        return Ok(None);
    }
    find_or_within(
        ctx,
        "find_first_of",
        n,
        range,
        set,
        move |i, a: &R1::Accessor, s: &R2::Accessor| {
            let value = a.get(i);
            (0..m).any(|j| eq(&value, &s.get(j)))
        },
        FindTag::Forward,
    )
    .map(|r| r.position())
}
