//! Merge of two sorted ranges into a third
//!
//! One worker per `chunk`-wide slice of both inputs. A worker places every element of
//! its two slices directly at the merged position, searching only the window of the
//! opposite run that its slice's first and last elements bound.

use super::dispatch::{SubDomain, copy, output_mode, submit_for};
use super::sort::merge_kernel::{MergeKernel, MergeRuns};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::ops::Compare;
use crate::policy::ExecutionContext;
use crate::range::{Access, AccessorMut, Range};
use crate::runtime::Event;

const CPU_CHUNK: usize = 128;
const DEVICE_CHUNK: usize = 8;

/// Merge the sorted ranges `range1` and `range2` into `output`
///
/// Equal elements keep `range1` first. `output` must hold at least
/// `range1.len() + range2.len()` elements.
pub fn merge<T, R1, R2, O, C>(ctx: &ExecutionContext, range1: R1, range2: R2, output: O, comp: C) -> Result<Event>
where
    T: Element,
    R1: Range<Item = T>,
    R2: Range<Item = T>,
    O: Range<Item = T>,
    O::Accessor: AccessorMut,
    C: Compare<T>,
{
    let (n1, n2) = (range1.len(), range2.len());
    let n = n1 + n2;
    Error::check_len("output", output.len(), n)?;
    if n2 == 0 {
        return copy(ctx, range1, output);
    }
    if n1 == 0 {
        return copy(ctx, range2, output);
    }

    let chunk = if ctx.is_cpu() { CPU_CHUNK } else { DEVICE_CHUNK };
    let kernel = MergeKernel::Bunched { chunk };
    let runs = MergeRuns {
        start1: 0,
        end1: n1,
        start2: 0,
        end2: n2,
        out: 0,
    };
    let steps = n1.max(n2).div_ceil(chunk);
    submit_for(ctx, "merge", SubDomain::full(steps), |h| {
        let in1 = range1.access(h, Access::Read)?;
        let in2 = range2.access(h, Access::Read)?;
        let out = output.access(h, output_mode(output.len(), n))?;
        Ok(move |w: usize| kernel.run(w * chunk, &in1, &in2, runs, &out, &comp))
    })
}
