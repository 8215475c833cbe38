//! Scan engine: single-pass prefix scan with decoupled lookback
//!
//! The input is cut into tiles of `2 * group_size` elements, one work-group per tile:
//!
//! ```text
//! claim tile id (atomic counter) ──► load tile into local memory
//!     ──► up-sweep / down-sweep: local inclusive scan
//!     ──► leader: wait for tile id-1 to be ready, publish own running total, flag ready
//!     ──► every worker writes its two results through the sink
//! ```
//!
//! Tile ids are claimed in start order rather than taken from the physical group id,
//! so the tile a group waits on always belongs to a group that is already running.
//! A group that panics marks its tile failed, and successors waiting on it fail too
//! instead of spinning forever.
//!
//! Without a seed, a single-worker kernel first writes the transformed first element
//! to the output and to a one-element device buffer, and the rest of the range is
//! scanned with that buffer as the seed. A one-element range still runs the tiled
//! kernel, over an empty remainder.

use super::dispatch::{SubDomain, output_mode, submit_for};
use super::reduce::combine;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::ops::{BinaryOp, Plus};
use crate::policy::ExecutionContext;
use crate::range::{Access, Accessor, AccessorMut, Buffer, DeviceAccessor, Range};
use crate::runtime::{Event, Handler};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread;

const TILE_PENDING: u32 = 0;
const TILE_READY: u32 = 1;
const TILE_FAILED: u32 = 2;

// Spins on a predecessor's flag before yielding the thread
const SPINS_BEFORE_YIELD: u32 = 64;

// ============================================================================
// Sinks
// ============================================================================

/// Destination of scanned values
pub(crate) trait ScanSink<T>: Clone + Send + Sync + 'static {
    /// Store the results for element `index`
    ///
    /// `inclusive` folds every element up to and including `index`; `exclusive` folds
    /// the ones before it, and is `None` only for the head of an unseeded scan.
    ///
    /// # Safety
    ///
    /// Called at most once per index, and only one worker handles a given index.
    unsafe fn write(&self, index: usize, inclusive: T, exclusive: Option<T>);
}

#[derive(Clone)]
struct Inclusive<O>(O);

impl<O: AccessorMut> ScanSink<O::Item> for Inclusive<O> {
    unsafe fn write(&self, index: usize, inclusive: O::Item, _: Option<O::Item>) {
        unsafe { self.0.set(index, inclusive) };
    }
}

#[derive(Clone)]
struct Exclusive<O>(O);

impl<O: AccessorMut> ScanSink<O::Item> for Exclusive<O> {
    unsafe fn write(&self, index: usize, _: O::Item, exclusive: Option<O::Item>) {
        if let Some(value) = exclusive {
            unsafe { self.0.set(index, value) };
        }
    }
}

/// Stores selected elements at their selected-count position
#[derive(Clone)]
struct Select<A, O> {
    input: A,
    output: O,
    len: usize,
}

impl<A, O> ScanSink<usize> for Select<A, O>
where
    A: Accessor,
    O: AccessorMut<Item = A::Item>,
{
    unsafe fn write(&self, index: usize, inclusive: usize, exclusive: Option<usize>) {
        let before = exclusive.unwrap_or(0);
        if inclusive > before && before < self.len {
            unsafe { self.output.set(before, self.input.get(index)) };
        }
    }
}

/// Stores selected elements in one output and the rest in another
#[derive(Clone)]
struct Partition<A, O1, O2> {
    input: A,
    selected: O1,
    rejected: O2,
    selected_len: usize,
    rejected_len: usize,
}

impl<A, O1, O2> ScanSink<usize> for Partition<A, O1, O2>
where
    A: Accessor,
    O1: AccessorMut<Item = A::Item>,
    O2: AccessorMut<Item = A::Item>,
{
    unsafe fn write(&self, index: usize, inclusive: usize, exclusive: Option<usize>) {
        let before = exclusive.unwrap_or(0);
        if inclusive > before {
            if before < self.selected_len {
                unsafe { self.selected.set(before, self.input.get(index)) };
            }
        } else {
            // Elements before `index` that were not selected
            let position = index - before;
            if position < self.rejected_len {
                unsafe { self.rejected.set(position, self.input.get(index)) };
            }
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

enum ScanInit<T> {
    Value(T),
    Device(Buffer<T>),
}

#[derive(Clone)]
enum InitAccessor<T> {
    Value(T),
    Device(DeviceAccessor<T>),
}

impl<T: Element> InitAccessor<T> {
    #[inline]
    fn get(&self) -> T {
        match self {
            Self::Value(v) => *v,
            Self::Device(acc) => acc.get(0),
        }
    }
}

/// Submitted scan; `total` folds the seed and every scanned element
pub(crate) struct ScanJob<T> {
    pub(crate) event: Event,
    last_total: Option<Buffer<T>>,
}

impl<T: Element> ScanJob<T> {
    pub(crate) fn total(&self) -> Result<Option<T>> {
        self.event.wait()?;
        match &self.last_total {
            Some(total) => total.get(0).map(Some),
            None => Ok(None),
        }
    }
}

/// Marks a claimed tile failed unless it was published
struct TileGuard<'a> {
    flags: &'a [AtomicU32],
    tile: usize,
    published: bool,
}

impl TileGuard<'_> {
    fn publish(&mut self) {
        self.flags[self.tile].store(TILE_READY, Ordering::Release);
        self.published = true;
    }
}

impl Drop for TileGuard<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.flags[self.tile].store(TILE_FAILED, Ordering::Release);
        }
    }
}

fn wait_ready(flags: &[AtomicU32], tile: usize) {
    let mut spins = 0u32;
    loop {
        match flags[tile].load(Ordering::Acquire) {
            TILE_READY => return,
            TILE_FAILED => panic!("scan tile {tile} failed"),
            _ => {}
        }
        spins += 1;
        if spins % SPINS_BEFORE_YIELD == 0 {
            thread::yield_now();
        } else {
            std::hint::spin_loop();
        }
    }
}

/// Scan elements `[start, n)` of `range`
#[allow(clippy::too_many_arguments)]
fn scan_tiles<R, T, Op, F, S, M>(
    ctx: &ExecutionContext,
    range: &R,
    start: usize,
    init: ScanInit<T>,
    op: Op,
    f: F,
    after: Option<&Event>,
    make_sink: &M,
) -> Result<ScanJob<T>>
where
    R: Range,
    T: Element,
    Op: BinaryOp<T>,
    F: Fn(R::Item) -> T + Clone + Send + Sync + 'static,
    S: ScanSink<T>,
    M: Fn(&mut Handler, &R::Accessor) -> Result<S>,
{
    let n = range.len();
    debug_assert!(start <= n);
    let group_size = ctx.work_group_size("scan", 2 * size_of::<Option<T>>());
    let tile = 2 * group_size;
    // An empty remainder still runs one tile, which publishes the seed as the total
    let tiles = (n - start).div_ceil(tile).max(1);
    let totals = Buffer::<T>::new(ctx.queue(), tiles)?;
    let flags: Arc<[AtomicU32]> = (0..tiles).map(|_| AtomicU32::new(TILE_PENDING)).collect();
    let next_tile = Arc::new(AtomicUsize::new(0));

    let event = ctx.submit("scan", |h| {
        if let Some(after) = after {
            h.depends_on(after);
        }
        let src = range.access(h, Access::Read)?;
        let sink = make_sink(h, &src)?;
        let init = match &init {
            ScanInit::Value(v) => InitAccessor::Value(*v),
            ScanInit::Device(seed) => InitAccessor::Device(seed.access(h, Access::Read)?),
        };
        let published = totals.access(h, Access::DiscardWrite)?;
        let scratch = h.local_accessor::<Option<T>>(tile)?;

        h.parallel_for_work_group(tiles, group_size, move |group| {
            let tile_id = group.leader(|_| next_tile.fetch_add(1, Ordering::Relaxed));
            let mut guard = TileGuard {
                flags: &flags,
                tile: tile_id,
                published: false,
            };
            let base = start + tile_id * tile;
            let end = (base + tile).min(n);
            let mut local = group.local_memory(&scratch);

            group.for_each_item(|item| {
                for j in [2 * item.local_id, 2 * item.local_id + 1] {
                    let i = base + j;
                    local[j] = (i < end).then(|| f(src.get(i)));
                }
            });

            // Up-sweep: local[(k+1)*2d - 1] accumulates its 2d-wide block
            let mut d = 1;
            while d < tile {
                group.for_each_item(|item| {
                    let i = (item.local_id + 1) * 2 * d - 1;
                    if i < tile {
                        local[i] = combine(&op, local[i - d], local[i]);
                    }
                });
                d *= 2;
            }
            // Down-sweep: push block sums into the gaps
            let mut d = tile / 4;
            while d > 0 {
                group.for_each_item(|item| {
                    let i = (item.local_id + 1) * 2 * d - 1;
                    if i + d < tile {
                        local[i + d] = combine(&op, local[i], local[i + d]);
                    }
                });
                d /= 2;
            }

            let incoming = group.leader(|_| {
                let incoming = if tile_id == 0 {
                    init.get()
                } else {
                    wait_ready(&flags, tile_id - 1);
                    published.get(tile_id - 1)
                };
                let total = match local[tile - 1] {
                    Some(sum) => op.apply(incoming, sum),
                    None => incoming,
                };
                // SAFETY: only this tile's leader writes slot `tile_id`.
                unsafe { published.set(tile_id, total) };
                guard.publish();
                incoming
            });

            group.for_each_item(|item| {
                for j in [2 * item.local_id, 2 * item.local_id + 1] {
                    // Sweeps fill padding slots past `end` too
                    if base + j >= end {
                        continue;
                    }
                    let Some(value) = local[j] else { continue };
                    let exclusive = match j {
                        0 => incoming,
                        _ => match local[j - 1] {
                            Some(before) => op.apply(incoming, before),
                            None => incoming,
                        },
                    };
                    // SAFETY: index `base + j` belongs to this worker alone.
                    unsafe { sink.write(base + j, op.apply(incoming, value), Some(exclusive)) };
                }
            });
        })
    })?;

    Ok(ScanJob {
        event,
        last_total: Some(totals.slice(tiles - 1..)?),
    })
}

/// Scan the whole range, seeded with `init` or with its own first element
pub(crate) fn scan<R, T, Op, F, S, M>(
    ctx: &ExecutionContext,
    range: &R,
    init: Option<T>,
    op: Op,
    f: F,
    make_sink: M,
) -> Result<ScanJob<T>>
where
    R: Range,
    T: Element,
    Op: BinaryOp<T>,
    F: Fn(R::Item) -> T + Clone + Send + Sync + 'static,
    S: ScanSink<T>,
    M: Fn(&mut Handler, &R::Accessor) -> Result<S>,
{
    let n = range.len();
    debug_assert!(n > 0);
    if let Some(init) = init {
        return scan_tiles(ctx, range, 0, ScanInit::Value(init), op, f, None, &make_sink);
    }

    let seed = Buffer::<T>::new(ctx.queue(), 1)?;
    let head = submit_for(ctx, "scan_seed", SubDomain::full(1), |h| {
        let src = range.access(h, Access::Read)?;
        let sink = make_sink(h, &src)?;
        let dst = seed.access(h, Access::DiscardWrite)?;
        let f = f.clone();
        Ok(move |_: usize| {
            let first = f(src.get(0));
            // SAFETY: single worker.
            unsafe {
                dst.set(0, first);
                sink.write(0, first, None);
            }
        })
    })?;
    scan_tiles(ctx, range, 1, ScanInit::Device(seed), op, f, Some(&head), &make_sink)
}

// ============================================================================
// Public algorithms
// ============================================================================

fn inclusive<I, O, Op, F>(
    ctx: &ExecutionContext,
    input: I,
    output: O,
    init: Option<O::Item>,
    op: Op,
    f: F,
) -> Result<Event>
where
    I: Range,
    O: Range,
    O::Accessor: AccessorMut,
    Op: BinaryOp<O::Item>,
    F: Fn(I::Item) -> O::Item + Clone + Send + Sync + 'static,
{
    let n = input.len();
    Error::check_len("output", output.len(), n)?;
    if n == 0 {
        return Ok(Event::completed());
    }
    let mode = output_mode(output.len(), n);
    let job = scan(ctx, &input, init, op, f, |h, _| {
        Ok(Inclusive(output.access(h, mode)?))
    })?;
    Ok(job.event)
}

/// `output[i] = input[0] op ... op input[i]`
pub fn inclusive_scan<I, O, Op>(ctx: &ExecutionContext, input: I, output: O, op: Op) -> Result<Event>
where
    I: Range,
    O: Range<Item = I::Item>,
    O::Accessor: AccessorMut,
    Op: BinaryOp<I::Item>,
{
    inclusive(ctx, input, output, None, op, |v: I::Item| v)
}

/// `output[i] = init op input[0] op ... op input[i]`
pub fn inclusive_scan_init<I, O, Op>(
    ctx: &ExecutionContext,
    input: I,
    output: O,
    op: Op,
    init: I::Item,
) -> Result<Event>
where
    I: Range,
    O: Range<Item = I::Item>,
    O::Accessor: AccessorMut,
    Op: BinaryOp<I::Item>,
{
    inclusive(ctx, input, output, Some(init), op, |v: I::Item| v)
}

/// `output[i] = f(input[0]) op ... op f(input[i])`
pub fn transform_inclusive_scan<I, O, Op, F>(
    ctx: &ExecutionContext,
    input: I,
    output: O,
    op: Op,
    f: F,
) -> Result<Event>
where
    I: Range,
    O: Range,
    O::Accessor: AccessorMut,
    Op: BinaryOp<O::Item>,
    F: Fn(I::Item) -> O::Item + Clone + Send + Sync + 'static,
{
    inclusive(ctx, input, output, None, op, f)
}

/// `output[0] = init`, `output[i] = init op input[0] op ... op input[i - 1]`
pub fn exclusive_scan<I, O, Op>(
    ctx: &ExecutionContext,
    input: I,
    output: O,
    init: I::Item,
    op: Op,
) -> Result<Event>
where
    I: Range,
    O: Range<Item = I::Item>,
    O::Accessor: AccessorMut,
    Op: BinaryOp<I::Item>,
{
    transform_exclusive_scan(ctx, input, output, init, op, |v: I::Item| v)
}

/// Exclusive scan of `f(input[i])`
pub fn transform_exclusive_scan<I, O, Op, F>(
    ctx: &ExecutionContext,
    input: I,
    output: O,
    init: O::Item,
    op: Op,
    f: F,
) -> Result<Event>
where
    I: Range,
    O: Range,
    O::Accessor: AccessorMut,
    Op: BinaryOp<O::Item>,
    F: Fn(I::Item) -> O::Item + Clone + Send + Sync + 'static,
{
    let n = input.len();
    Error::check_len("output", output.len(), n)?;
    if n == 0 {
        return Ok(Event::completed());
    }
    let mode = output_mode(output.len(), n);
    let job = scan(ctx, &input, Some(init), op, f, |h, _| {
        Ok(Exclusive(output.access(h, mode)?))
    })?;
    Ok(job.event)
}

/// Copy the elements satisfying `pred` to the front of `output`, keeping their order
///
/// Returns the number of selected elements. Fails if `output` is too short to hold
/// them; the elements that fit are still written.
pub fn copy_if<I, O, P>(ctx: &ExecutionContext, input: I, output: O, pred: P) -> Result<usize>
where
    I: Range,
    O: Range<Item = I::Item>,
    O::Accessor: AccessorMut,
    P: Fn(&I::Item) -> bool + Clone + Send + Sync + 'static,
{
    if input.is_empty() {
        return Ok(0);
    }
    let len = output.len();
    let job = scan(
        ctx,
        &input,
        Some(0usize),
        Plus,
        move |v| usize::from(pred(&v)),
        |h, src| {
            Ok(Select {
                input: src.clone(),
                output: output.access(h, Access::Write)?,
                len,
            })
        },
    )?;
    let selected = job.total()?.unwrap_or(0);
    if selected > len {
        return Err(Error::invalid_argument(
            "output",
            format!("{selected} elements selected but the output holds {len}"),
        ));
    }
    Ok(selected)
}

/// Copy the elements satisfying `pred` to `selected` and the others to `rejected`,
/// both in input order
///
/// Returns `(selected count, rejected count)`.
pub fn partition_copy<I, O1, O2, P>(
    ctx: &ExecutionContext,
    input: I,
    selected: O1,
    rejected: O2,
    pred: P,
) -> Result<(usize, usize)>
where
    I: Range,
    O1: Range<Item = I::Item>,
    O1::Accessor: AccessorMut,
    O2: Range<Item = I::Item>,
    O2::Accessor: AccessorMut,
    P: Fn(&I::Item) -> bool + Clone + Send + Sync + 'static,
{
    let n = input.len();
    if n == 0 {
        return Ok((0, 0));
    }
    let (selected_len, rejected_len) = (selected.len(), rejected.len());
    let job = scan(
        ctx,
        &input,
        Some(0usize),
        Plus,
        move |v| usize::from(pred(&v)),
        |h, src| {
            Ok(Partition {
                input: src.clone(),
                selected: selected.access(h, Access::Write)?,
                rejected: rejected.access(h, Access::Write)?,
                selected_len,
                rejected_len,
            })
        },
    )?;
    let hits = job.total()?.unwrap_or(0);
    let misses = n - hits;
    if hits > selected_len || misses > rejected_len {
        return Err(Error::invalid_argument(
            "output",
            format!(
                "{hits}/{misses} elements partitioned but the outputs hold {selected_len}/{rejected_len}"
            ),
        ));
    }
    Ok((hits, misses))
}
