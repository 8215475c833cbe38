//! Parallel algorithms over [`Range`](crate::range::Range)s
//!
//! Every algorithm takes an [`ExecutionContext`](crate::policy::ExecutionContext) and
//! submits one or more kernels to its queue. Algorithms that produce data return the
//! [`Event`](crate::runtime::Event) of their last kernel; algorithms that produce a
//! scalar wait for it and return the value.
//!
//! | Family | Module | Kernel shape |
//! |--------|--------|--------------|
//! | element-wise | [`dispatch`] | one flat kernel |
//! | reductions | [`reduce`] | group kernel, then flat tree passes |
//! | prefix scans, stream compaction | [`scan`] | single pass with decoupled lookback |
//! | searches | [`find`] | group kernel with early exit |
//! | sorting | [`sort`] | radix rounds or merge passes |
//! | merging | [`merge`] | one flat kernel |
//!
//! Kernel names are `"{context name}::{stage}"`, e.g. `"sum::reduce_pass"`.

pub mod dispatch;
pub mod find;
pub mod merge;
pub mod reduce;
pub mod scan;
pub mod sort;

pub use dispatch::{copy, fill, for_each, reverse, transform, transform_binary};
pub use find::{
    FindResult, FindTag, adjacent_find, all_of, any_of, equal, find, find_end, find_first_of, find_if,
    find_if_not, find_last_if, find_or, find_or_with, is_sorted, mismatch, none_of, search, search_n,
};
pub use merge::merge;
pub use reduce::{count_if, max_element, min_element, reduce, transform_reduce, transform_reduce_binary};
pub use scan::{
    copy_if, exclusive_scan, inclusive_scan, inclusive_scan_init, partition_copy, transform_exclusive_scan,
    transform_inclusive_scan,
};
pub use sort::{partial_sort, sort, stable_sort};
