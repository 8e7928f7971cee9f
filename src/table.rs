//! In-memory shader table.
//!
//! Maps a [`ShaderKey`] to its [`CacheEntry`]. The table exclusively owns
//! every native handle it stores: overwriting an entry hands the previous
//! handle back for release, and [`ShaderTable::clear`] is the single teardown
//! routine that releases all of them before emptying the map.
//!
//! An entry without a handle is a *remembered failure*, not a pending
//! compile. Entries are never evicted individually.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::key::ShaderKey;

/// One cached shader.
#[derive(Debug)]
pub struct CacheEntry<H> {
    handle: Option<H>,
    last_bound_frame: Option<u64>,
    source: Option<String>,
}

impl<H> CacheEntry<H> {
    /// The native program, or `None` if generation or compilation failed.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    /// Most recent frame on which this entry was the bound shader. `None` for
    /// entries loaded from disk and never bound.
    #[inline]
    #[must_use]
    pub fn last_bound_frame(&self) -> Option<u64> {
        self.last_bound_frame
    }

    /// Generated source text, when retained.
    #[inline]
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Records a binding on `frame`. Stamps never move backwards.
    pub fn stamp(&mut self, frame: u64) {
        self.last_bound_frame = Some(self.last_bound_frame.map_or(frame, |f| f.max(frame)));
    }
}

/// Key → entry map owning all native handles.
#[derive(Debug)]
pub struct ShaderTable<H> {
    entries: FxHashMap<ShaderKey, CacheEntry<H>>,
}

impl<H> Default for ShaderTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ShaderTable<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn lookup(&self, key: &ShaderKey) -> Option<&CacheEntry<H>> {
        self.entries.get(key)
    }

    #[inline]
    pub fn lookup_mut(&mut self, key: &ShaderKey) -> Option<&mut CacheEntry<H>> {
        self.entries.get_mut(key)
    }

    /// Inserts or overwrites the entry for `key`.
    ///
    /// `bound_frame` stamps the entry as bound on that frame; pass `None` for
    /// entries that are not activated on insertion. A handle held by a
    /// replaced entry is passed to `release`.
    pub fn insert(
        &mut self,
        key: ShaderKey,
        handle: Option<H>,
        source: Option<String>,
        bound_frame: Option<u64>,
        release: impl FnOnce(H),
    ) -> &mut CacheEntry<H> {
        let entry = CacheEntry {
            handle,
            last_bound_frame: bound_frame,
            source,
        };
        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => {
                if let Some(old_handle) = slot.insert(entry).handle {
                    release(old_handle);
                }
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(entry),
        }
    }

    /// Releases every stored handle, then empties the table. Returns the
    /// number of handles released.
    pub fn clear(&mut self, mut release: impl FnMut(H)) -> usize {
        let mut released = 0;
        for (_, entry) in self.entries.drain() {
            if let Some(handle) = entry.handle {
                release(handle);
                released += 1;
            }
        }
        released
    }

    /// Number of entries, failures included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries holding a native handle.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_valid()).count()
    }
}
