//! Attribute-name interning.
//!
//! Slot tables, instance dictionaries and call-site caches all key on
//! `&'static str`. Interning a name leaks it exactly once; the pool only
//! ever grows, which is fine because attribute names are drawn from source
//! code, not from data.

use std::collections::HashSet;

use ferrotype_common::lock::{LazyLock, PyRwLock};

static POOL: LazyLock<PyRwLock<HashSet<&'static str, ahash::RandomState>>> =
    LazyLock::new(|| PyRwLock::new(HashSet::default()));

/// Intern `name`, returning a `'static` copy that lives for the process.
pub fn intern(name: &str) -> &'static str {
    if let Some(found) = POOL.read().get(name) {
        return found;
    }
    let mut pool = POOL.write();
    // Racing interners may both miss the read; recheck under the write lock.
    if let Some(found) = pool.get(name) {
        return found;
    }
    let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
    pool.insert(leaked);
    leaked
}

/// Reserved names consulted by the resolution engine and the type object.
pub mod names {
    /// Full get-attribute override; shadows the generic protocol entirely.
    pub const GETATTRIBUTE: &str = "__getattribute__";
    /// Missing-attribute fallback, consulted after everything else failed.
    pub const GETATTR: &str = "__getattr__";
    pub const SETATTR: &str = "__setattr__";
    pub const DELATTR: &str = "__delattr__";
    pub const NEW: &str = "__new__";
    pub const INIT: &str = "__init__";
}
