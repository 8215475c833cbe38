//! Integration tests for sorting
//!
//! Tests verify:
//! - Radix path for built-in comparators on integer and float keys
//! - Merge path for custom comparators, including stability
//! - partial_sort prefix guarantees
//! - Edge cases (empty, single element, duplicates, already sorted)

mod common;

use common::{create_context, gpu_context, random_f64, random_i32, small_group_context};
use devpar::algorithm::{is_sorted, partial_sort, sort, stable_sort};
use devpar::error::Error;
use devpar::ops::{Greater, Less};
use devpar::range::{Buffer, host_mut, zip};

#[test]
fn test_sort_small() {
    let ctx = create_context("sort_small");
    let data = Buffer::from_slice(ctx.queue(), &[5, 3, 8, 1, 9, 2]).unwrap();
    sort(&ctx, &data, Less).unwrap();
    assert_eq!(data.to_vec().unwrap(), vec![1, 2, 3, 5, 8, 9]);
}

#[test]
fn test_radix_sort_signed_sizes() {
    let ctx = small_group_context("sort_radix_sizes");
    for n in [1usize, 2, 3, 5, 16, 17, 255, 256, 257, 3000] {
        let mut data = random_i32(n, n as u64);
        let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
        stable_sort(&ctx, &buf, Less).unwrap();
        data.sort();
        assert_eq!(buf.to_vec().unwrap(), data, "n = {n}");
    }
}

#[test]
fn test_radix_sort_descending() {
    let ctx = create_context("sort_radix_desc");
    let mut data = random_i32(10_000, 3);
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    sort(&ctx, &buf, Greater).unwrap();
    data.sort_by(|a, b| b.cmp(a));
    assert_eq!(buf.to_vec().unwrap(), data);
}

#[test]
fn test_radix_sort_unsigned_extremes() {
    let ctx = create_context("sort_radix_unsigned");
    let data = [u64::MAX, 0, 1 << 63, 42, u64::MAX - 1, 7, 0];
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    sort(&ctx, &buf, Less).unwrap();
    let mut expected = data.to_vec();
    expected.sort();
    assert_eq!(buf.to_vec().unwrap(), expected);
}

#[test]
fn test_radix_sort_partial_histogram_tile() {
    // 600 elements give three radix groups, so the histogram table is not a whole
    // number of scan tiles
    let ctx = create_context("sort_radix_histogram_tile");
    for n in [6usize, 600, 1100] {
        let mut data = random_i32(n, 70 + n as u64);
        let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
        stable_sort(&ctx, &buf, Less).unwrap();
        data.sort();
        assert_eq!(buf.to_vec().unwrap(), data, "n = {n}");
    }
}

#[test]
fn test_radix_sort_keeps_signed_zeros_in_order() {
    let ctx = small_group_context("sort_radix_zeros");
    let data = [0.0f32, -0.0, 1.0, -0.0, 0.0, -1.0];
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    stable_sort(&ctx, &buf, Less).unwrap();
    let bits: Vec<u32> = buf.to_vec().unwrap().into_iter().map(f32::to_bits).collect();
    let expected: Vec<u32> = [-1.0f32, 0.0, -0.0, -0.0, 0.0, 1.0].into_iter().map(f32::to_bits).collect();
    assert_eq!(bits, expected);

    let merged = Buffer::from_slice(ctx.queue(), &data).unwrap();
    stable_sort(&ctx, &merged, |a: &f32, b: &f32| a < b).unwrap();
    let merged_bits: Vec<u32> = merged.to_vec().unwrap().into_iter().map(f32::to_bits).collect();
    assert_eq!(merged_bits, expected);
}

#[test]
fn test_radix_sort_floats() {
    let ctx = small_group_context("sort_radix_float");
    let mut data: Vec<f64> = random_f64(1000, 12).into_iter().map(|v| v * 200.0 - 100.0).collect();
    data.extend([f64::INFINITY, f64::NEG_INFINITY, 0.0, -1e-300, 1e-300]);
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    sort(&ctx, &buf, Less).unwrap();
    data.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(buf.to_vec().unwrap(), data);
}

#[test]
fn test_merge_sort_custom_comparator() {
    let ctx = small_group_context("sort_merge_custom");
    let mut data = random_i32(2049, 5);
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    let by_abs = |a: &i32, b: &i32| a.abs() < b.abs();
    stable_sort(&ctx, &buf, by_abs).unwrap();
    data.sort_by_key(|v| v.abs());
    assert_eq!(buf.to_vec().unwrap(), data);
    assert!(is_sorted(&ctx, &buf, by_abs).unwrap());
}

#[test]
fn test_merge_sort_is_stable() {
    let ctx = small_group_context("sort_merge_stable");
    let keys: Vec<u8> = random_i32(1000, 6).into_iter().map(|v| (v.rem_euclid(10)) as u8).collect();
    let tagged: Vec<(u8, u32)> = keys.iter().enumerate().map(|(i, &k)| (k, i as u32)).collect();
    let buf = Buffer::from_slice(ctx.queue(), &tagged).unwrap();
    stable_sort(&ctx, &buf, |a: &(u8, u32), b: &(u8, u32)| a.0 < b.0).unwrap();
    let mut expected = tagged.clone();
    expected.sort_by_key(|p| p.0);
    assert_eq!(buf.to_vec().unwrap(), expected);
}

#[test]
fn test_sort_key_value_pairs() {
    let ctx = gpu_context("sort_key_value");
    let keys = Buffer::from_slice(ctx.queue(), &[30u32, 10, 20, 10, 30]).unwrap();
    let values = Buffer::from_slice(ctx.queue(), &[0u8, 1, 2, 3, 4]).unwrap();
    stable_sort(&ctx, zip((&keys, &values)), |a: &(u32, u8), b: &(u32, u8)| a.0 < b.0).unwrap();
    assert_eq!(keys.to_vec().unwrap(), vec![10, 10, 20, 30, 30]);
    assert_eq!(values.to_vec().unwrap(), vec![1, 3, 2, 0, 4]);
}

#[test]
fn test_sort_host_slice() {
    let ctx = create_context("sort_host");
    let mut data = vec![9i16, -4, 7, 0, -4, 3];
    {
        let range = host_mut(&mut data);
        sort(&ctx, &range, Less).unwrap();
        range.finish().unwrap();
    }
    assert_eq!(data, vec![-4, -4, 0, 3, 7, 9]);
}

#[test]
fn test_sort_edge_cases() {
    let ctx = create_context("sort_edges");
    let empty = Buffer::<i32>::new(ctx.queue(), 0).unwrap();
    assert!(sort(&ctx, &empty, Less).unwrap().is_complete());

    let single = Buffer::from_slice(ctx.queue(), &[7]).unwrap();
    sort(&ctx, &single, Less).unwrap();
    assert_eq!(single.to_vec().unwrap(), vec![7]);

    let same = Buffer::from_slice(ctx.queue(), &[2u32; 300]).unwrap();
    sort(&ctx, &same, Less).unwrap();
    assert_eq!(same.to_vec().unwrap(), vec![2u32; 300]);

    let sorted: Vec<i64> = (0..500).collect();
    let buf = Buffer::from_slice(ctx.queue(), &sorted).unwrap();
    sort(&ctx, &buf, |a: &i64, b: &i64| a < b).unwrap();
    assert_eq!(buf.to_vec().unwrap(), sorted);
}

#[test]
fn test_partial_sort_prefix() {
    let ctx = small_group_context("sort_partial");
    let data = random_i32(1000, 31);
    for mid in [1usize, 7, 100, 1000] {
        let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
        partial_sort(&ctx, &buf, mid, Less).unwrap();
        let result = buf.to_vec().unwrap();

        let mut expected = data.clone();
        expected.sort();
        assert_eq!(result[..mid], expected[..mid], "mid = {mid}");

        let mut rest = result.clone();
        rest.sort();
        assert_eq!(rest, expected, "mid = {mid}: not a permutation");
    }
}

#[test]
fn test_partial_sort_bounds() {
    let ctx = create_context("sort_partial_bounds");
    let buf = Buffer::from_slice(ctx.queue(), &[3, 1, 2]).unwrap();
    let err = partial_sort(&ctx, &buf, 4, Less).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "mid", .. }));
    assert!(partial_sort(&ctx, &buf, 0, Less).unwrap().is_complete());
    assert_eq!(buf.to_vec().unwrap(), vec![3, 1, 2]);
}
