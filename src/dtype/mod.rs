//! Element type system for device ranges
//!
//! Two layers:
//! - [`Element`]: anything a range can hold (plain copyable values, including tuples
//!   produced by zipped ranges)
//! - [`Arithmetic`]: the built-in numeric types. Only these unlock the native
//!   group-reduce shortcut and the radix-sort fast path. Each carries a runtime
//!   [`DType`] tag, which sizes its radix key.

mod element;

pub use element::{Arithmetic, Element};

// ============================================================================
// DType Enum
// ============================================================================

/// Runtime tag of an [`Arithmetic`] element type
///
/// # Discriminant Values
///
/// - Floats: 0-9 (F64=0, F32=1, F16=2, BF16=3)
/// - Signed ints: 10-19 (I64=10, I32=11, I16=12, I8=13)
/// - Unsigned ints: 20-29 (U64=20, U32=21, U16=22, U8=23)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[repr(u8)]
pub enum DType {
    // Floating point types (0-9)
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point
    F32 = 1,
    /// 16-bit floating point (IEEE 754)
    F16 = 2,
    /// 16-bit brain floating point
    BF16 = 3,

    // Integer types
    /// 64-bit signed integer
    I64 = 10,
    /// 32-bit signed integer
    I32 = 11,
    /// 16-bit signed integer
    I16 = 12,
    /// 8-bit signed integer
    I8 = 13,

    // Unsigned integer types
    /// 64-bit unsigned integer
    U64 = 20,
    /// 32-bit unsigned integer
    U32 = 21,
    /// 16-bit unsigned integer
    U16 = 22,
    /// 8-bit unsigned integer
    U8 = 23,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 | Self::I64 | Self::U64 => 8,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::F16 | Self::BF16 | Self::I16 | Self::U16 => 2,
            Self::I8 | Self::U8 => 1,
        }
    }

    /// Number of significant bits in a radix key of this type
    #[inline]
    pub const fn key_bits(self) -> u32 {
        (self.size_in_bytes() * 8) as u32
    }
}
