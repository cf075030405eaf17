//! Parsed-trie cache keyed by blob content.
//!
//! Read operations receive the same group blob over and over; decoding it
//! once and sharing the result behind an `Arc` keeps per-row cost at a walk.

use crate::error::Result;
use at_core::{codec, Trie};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, trace};

pub const DEFAULT_CAPACITY: usize = 64;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a.
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |h, b| (h ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { return 0.0; }
        self.hits as f64 / total as f64
    }
}

struct Entry {
    /// Kept to tell genuine hits from hash collisions.
    blob: Box<[u8]>,
    trie: Arc<Trie>,
}

struct Inner {
    /// `None` when caching is disabled.
    entries: Option<LruCache<u64, Entry>>,
    hits: u64,
    misses: u64,
}

/// Bounded LRU of decoded tries.
pub struct TrieCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl TrieCache {
    /// A capacity of 0 disables caching; every call decodes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: NonZeroUsize::new(capacity).map(LruCache::new),
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Decoded trie for `blob`, decoding and caching it on a miss.
    /// Decoding runs outside the lock.
    pub fn get_or_parse(&self, blob: &[u8]) -> Result<Arc<Trie>> {
        let key = fnv1a64(blob);
        {
            let mut inner = self.inner.lock();
            let hit = inner
                .entries
                .as_mut()
                .and_then(|lru| lru.get(&key))
                .filter(|e| *e.blob == *blob)
                .map(|e| Arc::clone(&e.trie));
            if let Some(trie) = hit {
                inner.hits += 1;
                trace!(key, "trie cache hit");
                return Ok(trie);
            }
            inner.misses += 1;
        }

        let trie = Arc::new(codec::decode(blob)?);
        debug!(key, len = blob.len(), nodes = trie.node_count(), "trie cache miss, decoded");
        self.insert(key, blob, Arc::clone(&trie));
        Ok(trie)
    }

    fn insert(&self, key: u64, blob: &[u8], trie: Arc<Trie>) {
        let mut inner = self.inner.lock();
        let Some(lru) = inner.entries.as_mut() else {
            return;
        };
        let entry = Entry {
            blob: blob.into(),
            trie,
        };
        if let Some((evicted, _)) = lru.push(key, entry) {
            if evicted != key {
                trace!(key = evicted, "trie cache evict");
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            len: inner.entries.as_ref().map_or(0, LruCache::len),
            capacity: self.capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(lru) = self.inner.lock().entries.as_mut() {
            lru.clear();
        }
    }
}

impl Default for TrieCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for TrieCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrieCache").field("stats", &self.stats()).finish()
    }
}
