//! Per-call-site inline caches for attribute lookup.
//!
//! A call site that repeatedly looks up the same name on values of
//! possibly-varying type owns a [`GetSite`]. A hit costs one pointer
//! compare and one atomic version load, then replays the captured
//! specialization: no allocation, no MRO walk, no table lookup beyond the
//! specialization's own dictionary probe. The version stamp is the only
//! invalidation signal; a specialization is never trusted across a
//! mismatch, however similar the shapes look.
//!
//! A miss runs the full resolution engine and re-caches. The version is
//! captured *before* resolving, so a mutation interleaving with the fill
//! can only leave behind an already-stale entry, never a wrongly-valid one.

use log::trace;

use crate::{
    context::Context,
    error::AttributeError,
    intern::intern,
    resolve::{self, Specialization},
    value::Value,
};

/// A resolution captured at a specific type version.
struct CacheEntry {
    type_id: usize,
    version: u64,
    spec: Specialization,
}

/// The cache a calling site holds for one attribute name.
pub struct GetSite {
    name: &'static str,
    entry: Option<CacheEntry>,
    hits: u64,
    misses: u64,
}

impl GetSite {
    pub fn new(name: &str) -> Self {
        Self {
            name: intern(name),
            entry: None,
            hits: 0,
            misses: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// The version the current entry was captured at, if any.
    pub fn cached_version(&self) -> Option<u64> {
        self.entry.as_ref().map(|e| e.version)
    }

    /// Drop the entry; the next load re-resolves.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Look up `self.name` on `obj`, through the cache.
    pub fn load(&mut self, ctx: &Context, obj: &Value) -> Result<Value, AttributeError> {
        let cls = obj.class(ctx);
        if let Some(entry) = &self.entry {
            if entry.type_id == cls.id() && entry.version == cls.version() {
                self.hits += 1;
                return entry.spec.execute(ctx, obj, self.name);
            }
        }
        self.misses += 1;
        let version = cls.version();
        let spec = resolve::specialize(&cls, self.name);
        let result = spec.execute(ctx, obj, self.name);
        trace!(
            "site '{}': cached against '{}' v{version}",
            self.name,
            cls.name()
        );
        self.entry = Some(CacheEntry {
            type_id: cls.id(),
            version,
            spec,
        });
        result
    }
}
