//! Combining operators and comparators
//!
//! Algorithms accept any closure with the right shape, but the built-in types here carry
//! static capabilities the engines check at compile time:
//!
//! - [`BinaryOp::known_identity`]: built-in associative operators on [`Arithmetic`] types
//!   report their identity, which unlocks the native group-reduce path.
//! - [`Compare::RADIX`]: [`Less`] and [`Greater`] over [`Arithmetic`] types route
//!   `stable_sort` to the radix specialization.
//!
//! Closures need annotated parameter types, since the traits are implemented for every
//! matching `Fn`:
//!
//! ```rust,ignore
//! reduce(&ctx, &buf, 0i64, |a: i64, b: i64| a.max(b))?;
//! stable_sort(&ctx, &buf, |a: &(u32, u32), b: &(u32, u32)| a.0 < b.0)?;
//! ```

use crate::dtype::Arithmetic;
use num_traits::PrimInt;

// ============================================================================
// Binary operators
// ============================================================================

/// Associative binary operator used by reductions and scans
pub trait BinaryOp<T>: Clone + Send + Sync + 'static {
    /// Combine two values
    fn apply(&self, a: T, b: T) -> T;

    /// Identity element, when the operator is a recognized built-in
    ///
    /// `Some` enables the native group-reduce primitive. Arbitrary closures return `None`
    /// and reduce through the explicit local-memory tree.
    #[inline]
    fn known_identity(&self) -> Option<T> {
        None
    }
}

impl<T, F> BinaryOp<T> for F
where
    F: Fn(T, T) -> T + Clone + Send + Sync + 'static,
{
    #[inline]
    fn apply(&self, a: T, b: T) -> T {
        self(a, b)
    }
}

macro_rules! builtin_op {
    ($(#[$doc:meta])* $name:ident<$t:ident: $($bound:path),+>, |$a:ident, $b:ident| $body:expr, $identity:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl<$t: $($bound +)+> BinaryOp<$t> for $name {
            #[inline]
            fn apply(&self, $a: $t, $b: $t) -> $t {
                $body
            }

            #[inline]
            fn known_identity(&self) -> Option<$t> {
                Some($identity)
            }
        }
    };
}

builtin_op!(
    /// Addition (`a + b`), identity `0`
    Plus<T: Arithmetic>, |a, b| a + b, T::zero()
);
builtin_op!(
    /// Multiplication (`a * b`), identity `1`
    Multiplies<T: Arithmetic>, |a, b| a * b, T::one()
);
builtin_op!(
    /// Minimum, identity is the type's largest value (`+inf` for floats)
    Minimum<T: Arithmetic>, |a, b| if b < a { b } else { a }, T::min_identity()
);
builtin_op!(
    /// Maximum, identity is the type's smallest value (`-inf` for floats)
    Maximum<T: Arithmetic>, |a, b| if a < b { b } else { a }, T::max_identity()
);
builtin_op!(
    /// Bitwise and, identity all ones
    BitAnd<T: Arithmetic, PrimInt>, |a, b| a & b, !T::zero()
);
builtin_op!(
    /// Bitwise or, identity `0`
    BitOr<T: Arithmetic, PrimInt>, |a, b| a | b, T::zero()
);
builtin_op!(
    /// Bitwise xor, identity `0`
    BitXor<T: Arithmetic, PrimInt>, |a, b| a ^ b, T::zero()
);

// ============================================================================
// Comparators
// ============================================================================

/// Strict weak ordering used by sorts, merges and order queries
pub trait Compare<T>: Clone + Send + Sync + 'static {
    /// Whether this comparator is plain ascending or descending order on an arithmetic
    /// type, so that [`radix_key`](Self::radix_key) is meaningful
    const RADIX: bool = false;

    /// Returns true if `a` is ordered before `b`
    fn less(&self, a: &T, b: &T) -> bool;

    /// Unsigned key whose ascending order matches this comparator
    ///
    /// Only called when [`RADIX`](Self::RADIX) is true.
    #[inline]
    fn radix_key(&self, _value: &T) -> u64 {
        0
    }

    /// Number of significant bits in [`radix_key`](Self::radix_key)
    #[inline]
    fn radix_bits(&self) -> u32 {
        0
    }
}

impl<T, F> Compare<T> for F
where
    F: Fn(&T, &T) -> bool + Clone + Send + Sync + 'static,
{
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}

/// Ascending order (`a < b`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Less;

/// Descending order (`a > b`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Greater;

impl<T: Arithmetic> Compare<T> for Less {
    const RADIX: bool = true;

    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        a < b
    }

    #[inline]
    fn radix_key(&self, value: &T) -> u64 {
        value.to_radix_key()
    }

    #[inline]
    fn radix_bits(&self) -> u32 {
        T::KEY_BITS
    }
}

impl<T: Arithmetic> Compare<T> for Greater {
    const RADIX: bool = true;

    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        b < a
    }

    #[inline]
    fn radix_key(&self, value: &T) -> u64 {
        !value.to_radix_key() & key_mask(T::KEY_BITS)
    }

    #[inline]
    fn radix_bits(&self) -> u32 {
        T::KEY_BITS
    }
}

#[inline]
fn key_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_of<T, Op: BinaryOp<T>>(op: Op) -> Option<T> {
        op.known_identity()
    }

    #[test]
    fn test_builtin_identities() {
        assert_eq!(identity_of::<i32, _>(Plus), Some(0));
        assert_eq!(identity_of::<f64, _>(Multiplies), Some(1.0));
        assert_eq!(identity_of::<u8, _>(Minimum), Some(u8::MAX));
        assert_eq!(identity_of::<f32, _>(Maximum), Some(f32::NEG_INFINITY));
        assert_eq!(identity_of::<u16, _>(BitAnd), Some(u16::MAX));
        assert_eq!(identity_of::<i64, _>(BitXor), Some(0));
    }

    #[test]
    fn test_closures_have_no_identity() {
        assert_eq!(identity_of::<i32, _>(|a: i32, b: i32| a + b), None);
        assert_eq!((|a: i32, b: i32| a - b).apply(5, 3), 2);
    }

    #[test]
    fn test_comparator_capabilities() {
        fn radix<T, C: Compare<T>>(_: &C) -> bool {
            C::RADIX
        }
        assert!(radix::<i32, _>(&Less));
        assert!(radix::<f32, _>(&Greater));
        assert!(!radix::<i32, _>(&|a: &i32, b: &i32| a < b));
    }

    #[test]
    fn test_greater_keys_reverse_order() {
        let keys: Vec<u64> = [-3i16, 0, 9]
            .iter()
            .map(|v| Compare::<i16>::radix_key(&Greater, v))
            .collect();
        assert!(keys[0] > keys[1] && keys[1] > keys[2]);
        assert!(keys.iter().all(|&k| k <= u16::MAX as u64));
        assert!(Compare::<i16>::less(&Greater, &9, &-3));
    }
}
