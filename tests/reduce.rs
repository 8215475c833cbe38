//! Integration tests for reductions
//!
//! Tests verify:
//! - Built-in operators with known identities and custom closures without one
//! - Sizes around work-group and compute-unit boundaries
//! - Non-commutative operators keep element order
//! - count_if, min_element/max_element (first occurrence), inner products

mod common;

use common::{create_context, random_f64, random_i32, small_group_context};
use devpar::algorithm::{
    count_if, max_element, min_element, reduce, transform_reduce, transform_reduce_binary,
};
use devpar::error::Error;
use devpar::ops::{BitXor, Less, Maximum, Minimum, Multiplies, Plus};
use devpar::range::{Buffer, counting};

#[test]
fn test_reduce_sum_small() {
    let ctx = create_context("reduce_small");
    let data = Buffer::from_slice(ctx.queue(), &[5, 3, 8, 1, 9, 2]).unwrap();
    assert_eq!(reduce(&ctx, &data, 0, Plus).unwrap(), 28);
    assert_eq!(reduce(&ctx, &data, 100, Plus).unwrap(), 128);
}

#[test]
fn test_reduce_sizes() {
    let ctx = small_group_context("reduce_sizes");
    for n in [1usize, 2, 3, 4, 5, 11, 12, 13, 64, 100, 1000, 4097] {
        let data = random_i32(n, n as u64);
        let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
        let expected: i64 = data.iter().map(|&v| i64::from(v)).sum();
        let got = transform_reduce(&ctx, &buf, 0i64, Plus, |v: i32| i64::from(v)).unwrap();
        assert_eq!(got, expected, "n = {n}");
    }
}

#[test]
fn test_reduce_builtin_operators() {
    let ctx = create_context("reduce_builtin");
    let data = random_i32(777, 7);
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    assert_eq!(
        reduce(&ctx, &buf, i32::MAX, Minimum).unwrap(),
        *data.iter().min().unwrap()
    );
    assert_eq!(
        reduce(&ctx, &buf, i32::MIN, Maximum).unwrap(),
        *data.iter().max().unwrap()
    );
    assert_eq!(
        reduce(&ctx, &buf, 0, BitXor).unwrap(),
        data.iter().fold(0, |a, &b| a ^ b)
    );

    let small = Buffer::from_slice(ctx.queue(), &[1u64, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(reduce(&ctx, &small, 1, Multiplies).unwrap(), 720);
}

#[test]
fn test_reduce_float_sum() {
    let ctx = create_context("reduce_float");
    let data = random_f64(10_000, 3);
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    let expected: f64 = data.iter().sum();
    let got = reduce(&ctx, &buf, 0.0, Plus).unwrap();
    assert!((got - expected).abs() < 1e-9 * expected.abs());
}

#[test]
fn test_reduce_non_commutative_operator() {
    // Composition of affine maps x -> a * x + b, applied left to right
    let ctx = small_group_context("reduce_affine");
    let maps: Vec<(i64, i64)> = (0..200).map(|i| (1 + i % 3, i % 7 - 3)).collect();
    let buf = Buffer::from_slice(ctx.queue(), &maps).unwrap();
    let compose = |f: (i64, i64), g: (i64, i64)| {
        (f.0.wrapping_mul(g.0), f.1.wrapping_mul(g.0).wrapping_add(g.1))
    };
    let expected = maps.iter().copied().fold((1, 0), compose);
    assert_eq!(reduce(&ctx, &buf, (1, 0), compose).unwrap(), expected);
}

#[test]
fn test_reduce_empty_returns_init() {
    let ctx = create_context("reduce_empty");
    let empty = Buffer::<i32>::new(ctx.queue(), 0).unwrap();
    assert_eq!(reduce(&ctx, &empty, 42, Plus).unwrap(), 42);
    assert_eq!(count_if(&ctx, &empty, |_: &i32| true).unwrap(), 0);
    assert_eq!(min_element(&ctx, &empty, Less).unwrap(), None);
}

#[test]
fn test_count_if() {
    let ctx = small_group_context("reduce_count_if");
    let data = random_i32(3000, 11);
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    let expected = data.iter().filter(|&&v| v % 3 == 0).count();
    assert_eq!(count_if(&ctx, &buf, |v: &i32| v % 3 == 0).unwrap(), expected);
}

#[test]
fn test_min_max_element_first_occurrence() {
    let ctx = small_group_context("reduce_minmax");
    let data = [4, 1, 7, 1, 9, 3, 9, 0, 0, 5];
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    assert_eq!(min_element(&ctx, &buf, Less).unwrap(), Some(7));
    assert_eq!(max_element(&ctx, &buf, Less).unwrap(), Some(4));

    let by_abs = |a: &i32, b: &i32| a.abs() < b.abs();
    let signed = Buffer::from_slice(ctx.queue(), &[-5, 3, 5, -3]).unwrap();
    assert_eq!(min_element(&ctx, &signed, by_abs).unwrap(), Some(1));
    assert_eq!(max_element(&ctx, &signed, by_abs).unwrap(), Some(0));
}

#[test]
fn test_min_element_random() {
    let ctx = create_context("reduce_min_random");
    let data = random_i32(5000, 5);
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    let min = *data.iter().min().unwrap();
    let first = data.iter().position(|&v| v == min);
    assert_eq!(min_element(&ctx, &buf, Less).unwrap(), first);
}

#[test]
fn test_transform_reduce_binary_inner_product() {
    let ctx = create_context("reduce_inner_product");
    let a = Buffer::from_slice(ctx.queue(), &[1i64, 2, 3, 4]).unwrap();
    let b = Buffer::from_slice(ctx.queue(), &[5i64, 6, 7, 8]).unwrap();
    let dot = transform_reduce_binary(&ctx, &a, &b, 0, Plus, |x: i64, y: i64| x * y).unwrap();
    assert_eq!(dot, 70);

    let short = Buffer::from_slice(ctx.queue(), &[1i64]).unwrap();
    let err = transform_reduce_binary(&ctx, &a, &short, 0, Plus, |x: i64, y: i64| x * y).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "range2", .. }));
}

#[test]
fn test_reduce_counting() {
    let ctx = small_group_context("reduce_counting");
    let n = 10_000u64;
    assert_eq!(reduce(&ctx, counting(0u64, n as usize), 0, Plus).unwrap(), n * (n - 1) / 2);
}
