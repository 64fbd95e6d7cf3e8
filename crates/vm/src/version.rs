//! The process-wide type version counter.
//!
//! Every observable mutation of any type's slot table or base list consumes
//! one value from this counter, so a single integer compare tells a call
//! site whether a cached resolution for a given type is still valid. The
//! counter is initialized once and lives for the process; exact ordering
//! across unrelated types carries no meaning, only per-type monotonicity.

use ferrotype_common::atomic::{AtomicU64, Ordering};

static MASTER_VERSION: AtomicU64 = AtomicU64::new(0);

/// Returns a version number unique across every mutation of every type in
/// the process. Never returns 0, so 0 can serve as an "empty" sentinel.
pub fn next_version() -> u64 {
    MASTER_VERSION.fetch_add(1, Ordering::Relaxed) + 1
}
