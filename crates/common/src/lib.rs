//! Primitives common to all ferrotype components.
//!
//! The type model is a shared-memory, lock-based design: readers may race
//! mutators on any type object, so everything here is unconditionally
//! `Send + Sync`. There is no single-threaded fallback configuration.

pub mod atomic;
pub mod lock;
pub mod rc;
