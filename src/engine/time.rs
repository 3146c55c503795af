//! Logical timestamps.
//!
//! The engine never looks at wall-clock time. A timestamp is any numeric
//! type that can be totally ordered, added, and compared against zero.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::ops::Add;

/// Numeric logical time.
///
/// Implemented for the primitive floats and integers. Floats are ordered
/// with [`f64::total_cmp`] so the event queue has a total order even if a
/// NaN slips through with validation disabled.
pub trait Timestamp: Copy + Debug + PartialOrd + Add<Output = Self> + 'static {
    /// The origin of the clock.
    const ZERO: Self;

    /// Value reported by `peek()` on an empty queue.
    ///
    /// `+inf` for floats, `MAX` for integers.
    const INFINITY: Self;

    /// Total order used to key the pending collection.
    fn total_order(&self, other: &Self) -> Ordering;

    /// Whether this value is usable as an event time (finite for floats).
    fn is_valid(&self) -> bool;

    /// `self + rhs`, or `None` if the sum is not representable.
    fn checked_add(self, rhs: Self) -> Option<Self>;

    /// Strictly below zero.
    #[must_use]
    fn is_negative(&self) -> bool {
        self.total_order(&Self::ZERO) == Ordering::Less
    }
}

macro_rules! impl_float_timestamp {
    ($($ty:ty),*) => {
        $(
            impl Timestamp for $ty {
                const ZERO: Self = 0.0;
                const INFINITY: Self = <$ty>::INFINITY;

                fn total_order(&self, other: &Self) -> Ordering {
                    self.total_cmp(other)
                }

                fn is_valid(&self) -> bool {
                    self.is_finite()
                }

                // Overflow saturates to infinity, which validation rejects.
                fn checked_add(self, rhs: Self) -> Option<Self> {
                    Some(self + rhs)
                }

                // total_cmp puts -0.0 below 0.0
                fn is_negative(&self) -> bool {
                    *self < 0.0
                }
            }
        )*
    };
}

macro_rules! impl_int_timestamp {
    ($($ty:ty),*) => {
        $(
            impl Timestamp for $ty {
                const ZERO: Self = 0;
                const INFINITY: Self = <$ty>::MAX;

                fn total_order(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }

                fn is_valid(&self) -> bool {
                    true
                }

                fn checked_add(self, rhs: Self) -> Option<Self> {
                    <$ty>::checked_add(self, rhs)
                }
            }
        )*
    };
}

impl_float_timestamp!(f32, f64);
impl_int_timestamp!(i32, i64, u32, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_total_order() {
        assert_eq!(1.0f64.total_order(&2.0), Ordering::Less);
        assert_eq!(2.0f64.total_order(&2.0), Ordering::Equal);
        assert_eq!((-0.5f64).total_order(&0.0), Ordering::Less);
    }

    #[test]
    fn test_float_validity() {
        assert!(1.5f64.is_valid());
        assert!(!f64::NAN.is_valid());
        assert!(!f64::INFINITY.is_valid());
        assert!(!f32::NEG_INFINITY.is_valid());
    }

    #[test]
    fn test_negative() {
        assert!(<f64 as Timestamp>::is_negative(&-1.0));
        assert!(!<f64 as Timestamp>::is_negative(&0.0));
        assert!(!Timestamp::is_negative(&-0.0f64));
        assert!(!Timestamp::is_negative(&-0.0f32));
        assert!(<i64 as Timestamp>::is_negative(&-3));
        assert!(!<u64 as Timestamp>::is_negative(&7));
    }

    #[test]
    fn test_checked_add() {
        assert_eq!(Timestamp::checked_add(2i64, 3), Some(5));
        assert_eq!(Timestamp::checked_add(i64::MAX, 1), None);
        assert_eq!(Timestamp::checked_add(u32::MAX, 1), None);
        assert_eq!(Timestamp::checked_add(1.5f64, 2.0), Some(3.5));
        assert_eq!(
            Timestamp::checked_add(f64::MAX, f64::MAX),
            Some(f64::INFINITY)
        );
    }

    #[test]
    fn test_infinity() {
        assert!(<f64 as Timestamp>::INFINITY.is_infinite());
        assert_eq!(<i64 as Timestamp>::INFINITY, i64::MAX);
        assert_eq!(<u32 as Timestamp>::INFINITY, u32::MAX);
    }

    #[test]
    fn test_integers_always_valid() {
        assert!(i64::MIN.is_valid());
        assert!(u64::MAX.is_valid());
    }
}
