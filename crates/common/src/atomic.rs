//! Atomic scalar aliases.
//!
//! `PyAtomic<T>` names the std atomic that holds a `T`, so struct fields can
//! be declared in terms of the plain scalar they logically store.

pub use core::sync::atomic::*;

mod sealed {
    pub trait Sealed {}
}

pub trait PyAtomicScalar: sealed::Sealed {
    type Atomic;
}

pub type PyAtomic<T> = <T as PyAtomicScalar>::Atomic;

macro_rules! impl_atomic_scalar {
    ($(($i:ty, $atomic:ty),)*) => {
        $(
            impl sealed::Sealed for $i {}
            impl PyAtomicScalar for $i {
                type Atomic = $atomic;
            }
        )*
    };
}

impl_atomic_scalar!(
    (u8, AtomicU8),
    (i8, AtomicI8),
    (u16, AtomicU16),
    (i16, AtomicI16),
    (u32, AtomicU32),
    (i32, AtomicI32),
    (u64, AtomicU64),
    (i64, AtomicI64),
    (usize, AtomicUsize),
    (isize, AtomicIsize),
    (bool, AtomicBool),
);
