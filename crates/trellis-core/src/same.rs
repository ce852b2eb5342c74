//! Identity comparison used for change detection.
//!
//! `Same` follows `Object.is`: shared pointers are the same only when they
//! point at the same allocation, scalars when their values are identical.
//! Two structurally equal values in different allocations are *not* the
//! same; callers signal a change by allocating a new value.

use std::rc::Rc;
use std::sync::Arc;

pub trait Same {
    fn same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Same for Rc<T> {
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Same for Arc<T> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl Same for &'static str {
    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

macro_rules! same_by_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl Same for $t {
                fn same(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_by_value!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, String,
);

macro_rules! same_float {
    ($($t:ty),*) => {
        $(
            impl Same for $t {
                // NaN is the same as NaN; +0.0 and -0.0 differ.
                fn same(&self, other: &Self) -> bool {
                    self.to_bits() == other.to_bits() || (self.is_nan() && other.is_nan())
                }
            }
        )*
    };
}

same_float!(f32, f64);

impl<T: Same> Same for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }
}

macro_rules! same_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Same),+> Same for ($($name,)+) {
            fn same(&self, other: &Self) -> bool {
                $(self.$idx.same(&other.$idx))&&+
            }
        }
    };
}

same_tuple!(A: 0);
same_tuple!(A: 0, B: 1);
same_tuple!(A: 0, B: 1, C: 2);
same_tuple!(A: 0, B: 1, C: 2, D: 3);
