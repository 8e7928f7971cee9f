//! Unique-content registry.
//!
//! Counts how many *textually distinct* shaders were generated. Two keys may
//! well produce byte-identical source, so this is tracked independently of
//! the key-indexed cache by hashing the final source text with xxh3-128.

use rustc_hash::FxHashSet;
use xxhash_rust::xxh3::xxh3_128;

/// Set of content hashes of generated shader sources.
#[derive(Debug, Default)]
pub struct UniqueContentRegistry {
    hashes: FxHashSet<u128>,
}

impl UniqueContentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes `source` and records it. Returns `true` if the content had not
    /// been seen before.
    pub fn register(&mut self, source: &str) -> bool {
        self.hashes.insert(Self::content_hash(source))
    }

    /// The hash used to identify a source text.
    #[inline]
    #[must_use]
    pub fn content_hash(source: &str) -> u128 {
        xxh3_128(source.as_bytes())
    }

    /// Number of distinct sources registered.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }
}
