//! Element traits for mapping Rust types to range contents

use super::DType;
use bytemuck::Pod;
use num_traits::{Bounded, Num};

/// Trait for values a range can hold
///
/// Any plain, copyable, thread-shareable value qualifies, including the tuples
/// produced by zipped ranges. Local scratch is default-initialized, hence `Default`.
pub trait Element: Copy + Default + Send + Sync + 'static {}

impl<T: Copy + Default + Send + Sync + 'static> Element for T {}

/// Built-in numeric element types
///
/// This trait connects Rust's primitive numbers to the device's capability checks:
/// reductions over an `Arithmetic` type with a built-in operator take the native
/// group-reduce path, and sorts with [`Less`](crate::ops::Less) or
/// [`Greater`](crate::ops::Greater) take the radix path.
///
/// # Bounds
/// - `Pod` - Safe memory transmutation (bytemuck)
/// - `Num + Bounded` - identities for the built-in operators (num_traits)
/// - `PartialOrd` - comparison for min/max operations
pub trait Arithmetic: Element + Pod + PartialOrd + Num + Bounded {
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Number of significant bits in [`to_radix_key`](Self::to_radix_key)
    const KEY_BITS: u32 = Self::DTYPE.key_bits();

    /// Order-preserving unsigned key
    ///
    /// For any `a < b` (under `PartialOrd`), `a.to_radix_key() < b.to_radix_key()`.
    /// For floats `-0.0` and `+0.0` share a key; NaNs sort above `+inf` (positive) or
    /// below `-inf` (negative).
    fn to_radix_key(self) -> u64;

    /// Identity of the minimum operator
    #[inline]
    fn min_identity() -> Self {
        Self::max_value()
    }

    /// Identity of the maximum operator
    #[inline]
    fn max_identity() -> Self {
        Self::min_value()
    }
}

macro_rules! impl_unsigned {
    ($($t:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Arithmetic for $t {
                const DTYPE: DType = $dtype;

                #[inline]
                fn to_radix_key(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

macro_rules! impl_signed {
    ($($t:ty as $u:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Arithmetic for $t {
                const DTYPE: DType = $dtype;

                #[inline]
                fn to_radix_key(self) -> u64 {
                    // Flip the sign bit so negatives sort below positives
                    ((self as $u) ^ (1 << (<$u>::BITS - 1))) as u64
                }
            }
        )*
    };
}

macro_rules! impl_float {
    ($($t:ty as $u:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Arithmetic for $t {
                const DTYPE: DType = $dtype;

                #[inline]
                fn to_radix_key(self) -> u64 {
                    let sign: $u = 1 << (<$u>::BITS - 1);
                    let mut bits: $u = self.to_bits();
                    // -0.0 compares equal to +0.0, so both get the +0.0 key
                    if bits & !sign == 0 {
                        bits = 0;
                    }
                    let key = if bits & sign != 0 { !bits } else { bits | sign };
                    key as u64
                }

                #[inline]
                fn min_identity() -> Self {
                    <$t>::INFINITY
                }

                #[inline]
                fn max_identity() -> Self {
                    <$t>::NEG_INFINITY
                }
            }
        )*
    };
}

impl_unsigned!(u8 => DType::U8, u16 => DType::U16, u32 => DType::U32, u64 => DType::U64);
impl_signed!(
    i8 as u8 => DType::I8,
    i16 as u16 => DType::I16,
    i32 as u32 => DType::I32,
    i64 as u64 => DType::I64,
);
impl_float!(f32 as u32 => DType::F32, f64 as u64 => DType::F64);

#[cfg(target_pointer_width = "64")]
impl_unsigned!(usize => DType::U64);
#[cfg(target_pointer_width = "64")]
impl_signed!(isize as usize => DType::I64);
#[cfg(target_pointer_width = "32")]
impl_unsigned!(usize => DType::U32);
#[cfg(target_pointer_width = "32")]
impl_signed!(isize as usize => DType::I32);

#[cfg(feature = "f16")]
impl_float!(half::f16 as u16 => DType::F16, half::bf16 as u16 => DType::BF16);
