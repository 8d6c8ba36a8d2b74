//! Caller-owned parse cache
//!
//! Repeated requirement checks tend to parse the same handful of scope
//! strings. [`ScopeCache`] memoizes those parses. It is an ordinary value the
//! caller creates and passes in; nothing in the crate keeps a cache of its
//! own, so separate tenants or tests never observe each other's entries.

use crate::error::ScopeResult;
use crate::scopes::node::ScopeNode;
use crate::scopes::parser::ScopeParser;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe memo of parsed scope expressions
///
/// Failed parses are not stored, so a malformed string is re-parsed (and
/// rejected again) on every call.
#[derive(Debug, Default)]
pub struct ScopeCache {
    parser: ScopeParser,
    entries: DashMap<String, Arc<[ScopeNode]>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ScopeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache backed by a specific parser configuration
    pub fn with_parser(parser: ScopeParser) -> Self {
        Self {
            parser,
            ..Self::default()
        }
    }

    /// Parse `input`, reusing an earlier result for the same string
    pub fn parse(&self, input: &str) -> ScopeResult<Arc<[ScopeNode]>> {
        if let Some(scopes) = self.entries.get(input) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(input, "Scope cache hit");
            return Ok(Arc::clone(scopes.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(input, "Scope cache miss");

        let scopes: Arc<[ScopeNode]> = self.parser.parse(input)?.into();
        // a racing thread may have stored the same parse first; keep one copy
        let stored = self
            .entries
            .entry(input.to_string())
            .or_insert_with(|| scopes);
        Ok(Arc::clone(stored.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries and reset the counters
    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
