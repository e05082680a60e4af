//! Unsigned integer storage for bitflag sets.

use std::fmt::{Debug, LowerHex};
use std::hash::Hash;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use serde::de::DeserializeOwned;
use serde::Serialize;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

mod sealed {
    pub trait Sealed {}
}

/// Raw storage of a bitflag set: one of `u8`, `u16`, `u32`, `u64`, `usize`.
///
/// No signed integers: subtraction complements every bit, sign included.
pub trait Flaggable:
    sealed::Sealed
    + Copy
    + Eq
    + Ord
    + Hash
    + Default
    + Debug
    + LowerHex
    + Send
    + Sync
    + 'static
    + BitOr<Output = Self>
    + BitOrAssign
    + BitAnd<Output = Self>
    + BitAndAssign
    + Not<Output = Self>
    + Serialize
    + DeserializeOwned
    + IntoBytes
    + FromBytes
    + Immutable
    + KnownLayout
{
    /// The empty set.
    const ZERO: Self;

    /// Storage width in bits.
    const BITS: u32;

    /// True if every bit of `other` is set in `self`.
    #[inline]
    fn contains_bits(self, other: Self) -> bool {
        self & other == other
    }
}

macro_rules! impl_flaggable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Flaggable for $ty {
                const ZERO: Self = 0;
                const BITS: u32 = <$ty>::BITS;
            }
        )*
    };
}

impl_flaggable!(u8, u16, u32, u64, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_match_primitives() {
        assert_eq!(<u8 as Flaggable>::BITS, 8);
        assert_eq!(<u16 as Flaggable>::BITS, 16);
        assert_eq!(<u32 as Flaggable>::BITS, 32);
        assert_eq!(<u64 as Flaggable>::BITS, 64);
    }

    #[test]
    fn contains_bits_is_superset_test() {
        assert!(0b101u16.contains_bits(0b001));
        assert!(0b101u16.contains_bits(0b101));
        assert!(0b101u16.contains_bits(0));
        assert!(!0b101u16.contains_bits(0b010));
        assert!(!0u8.contains_bits(0b1));
    }
}
