//! Integration tests for merging sorted ranges
//!
//! Tests verify:
//! - Interleaved, disjoint and overlapping inputs on CPU and GPU chunk sizes
//! - Stability: ties keep the first range's elements first
//! - Empty inputs and undersized outputs

mod common;

use common::{create_context, gpu_context, random_i32};
use devpar::algorithm::merge;
use devpar::error::Error;
use devpar::ops::Less;
use devpar::policy::ExecutionContext;
use devpar::range::Buffer;

fn sorted_random(n: usize, seed: u64) -> Vec<i32> {
    let mut data = random_i32(n, seed);
    data.sort();
    data
}

fn check_merge(ctx: &ExecutionContext, a: &[i32], b: &[i32]) {
    let ba = Buffer::from_slice(ctx.queue(), a).unwrap();
    let bb = Buffer::from_slice(ctx.queue(), b).unwrap();
    let out = Buffer::<i32>::new(ctx.queue(), a.len() + b.len()).unwrap();
    merge(ctx, &ba, &bb, &out, Less).unwrap();
    let mut expected = [a, b].concat();
    expected.sort();
    assert_eq!(out.to_vec().unwrap(), expected, "lengths {} and {}", a.len(), b.len());
}

#[test]
fn test_merge_small() {
    let ctx = create_context("merge_small");
    check_merge(&ctx, &[1, 3, 5], &[2, 4, 6]);
}

#[test]
fn test_merge_random_sizes() {
    for ctx in [create_context("merge_random"), gpu_context("merge_random_gpu")] {
        for (n1, n2) in [(1, 1), (1, 300), (300, 1), (127, 129), (1000, 999), (4096, 17)] {
            check_merge(&ctx, &sorted_random(n1, n1 as u64), &sorted_random(n2, 1000 + n2 as u64));
        }
    }
}

#[test]
fn test_merge_disjoint_runs() {
    let ctx = gpu_context("merge_disjoint");
    let low: Vec<i32> = (0..50).collect();
    let high: Vec<i32> = (100..170).collect();
    check_merge(&ctx, &low, &high);
    check_merge(&ctx, &high, &low);
}

#[test]
fn test_merge_is_stable() {
    let ctx = gpu_context("merge_stable");
    let a: Vec<(i32, char)> = vec![(1, 'a'), (2, 'a'), (2, 'a'), (5, 'a')];
    let b: Vec<(i32, char)> = vec![(2, 'b'), (3, 'b'), (5, 'b')];
    let ba = Buffer::from_slice(ctx.queue(), &a).unwrap();
    let bb = Buffer::from_slice(ctx.queue(), &b).unwrap();
    let out = Buffer::<(i32, char)>::new(ctx.queue(), 7).unwrap();
    merge(&ctx, &ba, &bb, &out, |x: &(i32, char), y: &(i32, char)| x.0 < y.0).unwrap();
    assert_eq!(
        out.to_vec().unwrap(),
        vec![(1, 'a'), (2, 'a'), (2, 'a'), (2, 'b'), (3, 'b'), (5, 'a'), (5, 'b')]
    );
}

#[test]
fn test_merge_empty_inputs() {
    let ctx = create_context("merge_empty");
    check_merge(&ctx, &[], &[1, 2, 3]);
    check_merge(&ctx, &[4, 5], &[]);

    let empty = Buffer::<i32>::new(ctx.queue(), 0).unwrap();
    let out = Buffer::<i32>::new(ctx.queue(), 0).unwrap();
    assert!(merge(&ctx, &empty, &empty, &out, Less).unwrap().is_complete());
}

#[test]
fn test_merge_output_too_short() {
    let ctx = create_context("merge_short");
    let a = Buffer::from_slice(ctx.queue(), &[1, 2]).unwrap();
    let b = Buffer::from_slice(ctx.queue(), &[3]).unwrap();
    let out = Buffer::<i32>::new(ctx.queue(), 2).unwrap();
    let err = merge(&ctx, &a, &b, &out, Less).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "output", .. }));
}
