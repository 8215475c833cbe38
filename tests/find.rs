//! Integration tests for searches
//!
//! Tests verify:
//! - Forward, backward and existence searches through find_or
//! - Positions near the start, end and group boundaries
//! - Derived queries (find, adjacent_find, search, mismatch, ...)
//! - Empty ranges and empty needles

mod common;

use common::{create_context, gpu_context, random_i32, small_group_context};
use devpar::algorithm::{
    FindTag, adjacent_find, all_of, any_of, equal, find, find_end, find_first_of, find_if, find_if_not,
    find_last_if, find_or, find_or_with, is_sorted, mismatch, none_of, search, search_n,
};
use devpar::ops::Less;
use devpar::range::{Accessor, Buffer, DeviceAccessor, counting};

#[test]
fn test_find_small() {
    let ctx = create_context("find_small");
    let data = Buffer::from_slice(ctx.queue(), &[5, 3, 8, 1, 9, 2]).unwrap();
    assert_eq!(find(&ctx, &data, 8).unwrap(), Some(2));
    assert_eq!(find(&ctx, &data, 4).unwrap(), None);
}

#[test]
fn test_find_every_position() {
    let ctx = small_group_context("find_positions");
    let n = 203;
    let data: Vec<u32> = (0..n as u32).collect();
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    for target in [0usize, 1, 3, 4, 7, 8, 31, 32, 33, 100, 201, 202] {
        assert_eq!(find(&ctx, &buf, target as u32).unwrap(), Some(target), "target = {target}");
    }
}

#[test]
fn test_find_first_and_last_of_many() {
    let ctx = small_group_context("find_first_last");
    let data = random_i32(5000, 17);
    let buf = Buffer::from_slice(ctx.queue(), &data).unwrap();
    let pred = |v: &i32| v % 97 == 0;
    assert_eq!(find_if(&ctx, &buf, pred).unwrap(), data.iter().position(pred));
    assert_eq!(find_last_if(&ctx, &buf, pred).unwrap(), data.iter().rposition(pred));
    assert_eq!(
        find_if_not(&ctx, &buf, |v: &i32| *v < 900).unwrap(),
        data.iter().position(|&v| v >= 900)
    );
}

#[test]
fn test_find_or_tags() {
    let ctx = gpu_context("find_or_tags");
    let data = Buffer::from_slice(ctx.queue(), &[1, 4, 6, 4, 1]).unwrap();
    let is_four = |i: usize, acc: &DeviceAccessor<i32>| acc.get(i) == 4;

    let forward = find_or(&ctx, &data, is_four, FindTag::Forward).unwrap();
    assert_eq!(forward.position(), Some(1));
    assert_eq!(forward.raw(), 1);

    let backward = find_or(&ctx, &data, is_four, FindTag::Backward).unwrap();
    assert_eq!(backward.position(), Some(3));

    let any = find_or(&ctx, &data, is_four, FindTag::Or).unwrap();
    assert!(any.found());
    assert_eq!(any.raw(), 1);

    let none = find_or(&ctx, &data, |_, _: &DeviceAccessor<i32>| false, FindTag::Forward).unwrap();
    assert!(!none.found());
    assert_eq!(none.raw(), 5);
    let none = find_or(&ctx, &data, |_, _: &DeviceAccessor<i32>| false, FindTag::Backward).unwrap();
    assert_eq!(none.raw(), -1);
}

#[test]
fn test_find_or_with_two_ranges() {
    let ctx = create_context("find_or_with");
    let a = Buffer::from_slice(ctx.queue(), &[1, 2, 3, 4]).unwrap();
    let b = Buffer::from_slice(ctx.queue(), &[1, 2, 0, 4]).unwrap();
    let differs = |i: usize, x: &DeviceAccessor<i32>, y: &DeviceAccessor<i32>| x.get(i) != y.get(i);
    let result = find_or_with(&ctx, &a, &b, differs, FindTag::Forward).unwrap();
    assert_eq!(result.position(), Some(2));
}

#[test]
fn test_any_all_none() {
    let ctx = small_group_context("find_quantifiers");
    let data = Buffer::from_slice(ctx.queue(), &[2, 4, 6, 8, 10, 12, 14]).unwrap();
    assert!(all_of(&ctx, &data, |v: &i32| v % 2 == 0).unwrap());
    assert!(!any_of(&ctx, &data, |v: &i32| v % 2 == 1).unwrap());
    assert!(none_of(&ctx, &data, |v: &i32| *v > 14).unwrap());
    assert!(any_of(&ctx, &data, |v: &i32| *v == 14).unwrap());
    assert!(!all_of(&ctx, &data, |v: &i32| *v < 14).unwrap());

    let empty = Buffer::<i32>::new(ctx.queue(), 0).unwrap();
    assert!(!any_of(&ctx, &empty, |_: &i32| true).unwrap());
    assert!(all_of(&ctx, &empty, |_: &i32| false).unwrap());
    assert!(none_of(&ctx, &empty, |_: &i32| true).unwrap());
    assert_eq!(find(&ctx, &empty, 0).unwrap(), None);
}

#[test]
fn test_adjacent_find_and_is_sorted() {
    let ctx = small_group_context("find_adjacent");
    let data = Buffer::from_slice(ctx.queue(), &[1, 2, 3, 3, 4, 5, 5]).unwrap();
    assert_eq!(adjacent_find(&ctx, &data, |a: &i32, b: &i32| a == b).unwrap(), Some(2));
    assert!(is_sorted(&ctx, &data, Less).unwrap());

    let unsorted = Buffer::from_slice(ctx.queue(), &[1, 2, 3, 9, 4]).unwrap();
    assert!(!is_sorted(&ctx, &unsorted, Less).unwrap());
    assert_eq!(adjacent_find(&ctx, &unsorted, |a: &i32, b: &i32| a == b).unwrap(), None);

    let single = Buffer::from_slice(ctx.queue(), &[1]).unwrap();
    assert!(is_sorted(&ctx, &single, Less).unwrap());
    assert!(is_sorted(&ctx, counting(0u32, 1000), Less).unwrap());
}

#[test]
fn test_equal_and_mismatch() {
    let ctx = create_context("find_equal");
    let a = Buffer::from_slice(ctx.queue(), &[1, 2, 3, 4, 5]).unwrap();
    let b = Buffer::from_slice(ctx.queue(), &[1, 2, 3, 4, 5]).unwrap();
    let c = Buffer::from_slice(ctx.queue(), &[1, 2, 7, 4]).unwrap();
    let eq = |x: &i32, y: &i32| x == y;
    assert!(equal(&ctx, &a, &b, eq).unwrap());
    assert!(!equal(&ctx, &a, &c, eq).unwrap());
    assert_eq!(mismatch(&ctx, &a, &b, eq).unwrap(), None);
    assert_eq!(mismatch(&ctx, &a, &c, eq).unwrap(), Some(2));
}

#[test]
fn test_search_and_find_end() {
    let ctx = small_group_context("find_search");
    let hay = Buffer::from_slice(ctx.queue(), &[1, 2, 3, 1, 2, 3, 1, 2]).unwrap();
    let needle = Buffer::from_slice(ctx.queue(), &[1, 2, 3]).unwrap();
    let missing = Buffer::from_slice(ctx.queue(), &[3, 3]).unwrap();
    let empty = Buffer::<i32>::new(ctx.queue(), 0).unwrap();
    let eq = |x: &i32, y: &i32| x == y;

    assert_eq!(search(&ctx, &hay, &needle, eq).unwrap(), Some(0));
    assert_eq!(find_end(&ctx, &hay, &needle, eq).unwrap(), Some(3));
    assert_eq!(search(&ctx, &hay, &missing, eq).unwrap(), None);
    assert_eq!(find_end(&ctx, &hay, &missing, eq).unwrap(), None);
    assert_eq!(search(&ctx, &hay, &empty, eq).unwrap(), Some(0));
    assert_eq!(find_end(&ctx, &hay, &empty, eq).unwrap(), None);
    assert_eq!(search(&ctx, &needle, &hay, eq).unwrap(), None);
}

#[test]
fn test_search_n() {
    let ctx = create_context("find_search_n");
    let data = Buffer::from_slice(ctx.queue(), &[0, 7, 7, 0, 7, 7, 7, 0]).unwrap();
    let eq = |x: &i32, y: &i32| x == y;
    assert_eq!(search_n(&ctx, &data, 3, 7, eq).unwrap(), Some(4));
    assert_eq!(search_n(&ctx, &data, 2, 7, eq).unwrap(), Some(1));
    assert_eq!(search_n(&ctx, &data, 4, 7, eq).unwrap(), None);
    assert_eq!(search_n(&ctx, &data, 0, 7, eq).unwrap(), Some(0));
}

#[test]
fn test_find_first_of() {
    let ctx = create_context("find_first_of");
    let data = Buffer::from_slice(ctx.queue(), &[10, 20, 30, 40]).unwrap();
    let set = Buffer::from_slice(ctx.queue(), &[40, 30]).unwrap();
    let other = Buffer::from_slice(ctx.queue(), &[5]).unwrap();
    let empty = Buffer::<i32>::new(ctx.queue(), 0).unwrap();
    let eq = |x: &i32, y: &i32| x == y;
    assert_eq!(find_first_of(&ctx, &data, &set, eq).unwrap(), Some(2));
    assert_eq!(find_first_of(&ctx, &data, &other, eq).unwrap(), None);
    assert_eq!(find_first_of(&ctx, &data, &empty, eq).unwrap(), None);
}
