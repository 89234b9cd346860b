//! Substring search index
//!
//! Values live under an outer key (tenant/collection) and an id:
//! `key -> id -> value`. Values are lowercased on write so that searches only
//! lowercase the query. A single reader/writer lock guards both levels.
//!
//! Invariants:
//! - an outer key is present iff its inner map is non-empty
//! - every stored value is already lowercase

mod result;

pub use result::{Page, SearchResult, format_elapsed};

use crate::error::Result;
use crate::snapshot::{self, Codec, SyncWrite};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// Two-level mapping owned by the index.
pub type Entries = HashMap<String, HashMap<String, String>>;

/// Size summary of the index contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of outer keys
    pub keys: usize,
    /// Number of id/value pairs across all keys
    pub entries: usize,
    /// UTF-8 bytes held in keys, ids and values
    pub bytes: usize,
}

pub struct SearchIndex {
    entries: RwLock<Entries>,
    codec: Codec,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            codec: Codec::default(),
        }
    }

    /// Sets the encoding used by future snapshots.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Rebuilds an index from snapshot bytes produced by [`SearchIndex::snapshot`].
    ///
    /// The restored index keeps the codec the snapshot was written with.
    /// Entries that would break the index invariants (empty inner maps,
    /// values that are not lowercase) are repaired rather than rejected.
    pub fn restore<R: Read>(src: R) -> Result<Self> {
        let (entries, codec) = snapshot::read_all(src)?;
        Ok(Self::from_entries(entries).with_codec(codec))
    }

    pub(crate) fn from_entries(mut entries: Entries) -> Self {
        let before = entries.len();
        entries.retain(|_, inner| !inner.is_empty());
        let dropped = before - entries.len();

        let mut lowered = 0usize;
        for value in entries.values_mut().flat_map(|inner| inner.values_mut()) {
            let normalized = value.to_lowercase();
            if normalized != *value {
                *value = normalized;
                lowered += 1;
            }
        }

        if dropped > 0 || lowered > 0 {
            tracing::warn!(
                "Repaired snapshot on restore: dropped {} empty keys, lowercased {} values",
                dropped,
                lowered
            );
        }

        Self {
            entries: RwLock::new(entries),
            codec: Codec::default(),
        }
    }

    // The map is consistent between statements, so a panic in another
    // holder leaves nothing half-applied and the guard can be recovered.
    fn read_lock(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` (lowercased) under `key`/`id`, replacing any previous value.
    pub fn set(&self, key: &str, id: &str, value: &str) {
        let normalized = value.to_lowercase();
        let mut entries = self.write_lock();
        entries
            .entry(key.to_string())
            .or_default()
            .insert(id.to_string(), normalized);
    }

    /// Removes `id` from `key`, dropping `key` once it holds no ids.
    pub fn delete(&self, key: &str, id: &str) {
        let mut entries = self.write_lock();
        let Some(inner) = entries.get_mut(key) else {
            return;
        };

        inner.remove(id);
        if inner.is_empty() {
            entries.remove(key);
        }
    }

    /// Finds ids under `key` whose value contains `query`, case-insensitively.
    ///
    /// See [`IndexView::search`] for the pagination rules.
    pub fn search(&self, key: &str, query: &str, start: i64, stop: i64) -> SearchResult {
        self.read().search(key, query, start, stop)
    }

    /// Discards every entry.
    pub fn flush(&self) {
        let mut entries = self.write_lock();
        *entries = HashMap::new();
    }

    /// Takes the shared lock and returns a consistent view of the index.
    ///
    /// Writers are blocked while the view is alive. Use it to combine several
    /// reads, or to snapshot from code that already holds the lock.
    pub fn read(&self) -> IndexView<'_> {
        IndexView {
            entries: self.read_lock(),
            codec: self.codec,
        }
    }

    /// Writes a point-in-time snapshot to `dest` and syncs it.
    ///
    /// Holds the shared lock for the duration. A caller that already holds a
    /// view must call [`IndexView::snapshot`] instead.
    pub fn snapshot<W: SyncWrite>(&self, dest: W) -> Result<()> {
        self.read().snapshot(dest)
    }

    pub fn stats(&self) -> IndexStats {
        self.read().stats()
    }
}

/// Read access to the index while the shared lock is held.
pub struct IndexView<'a> {
    entries: RwLockReadGuard<'a, Entries>,
    codec: Codec,
}

impl IndexView<'_> {
    pub fn get(&self, key: &str, id: &str) -> Option<&str> {
        self.entries.get(key)?.get(id).map(String::as_str)
    }

    /// Outer keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Ids stored under `key`, sorted.
    pub fn ids(&self, key: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .entries
            .get(key)
            .map(|inner| inner.keys().map(String::as_str).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Number of outer keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &Entries {
        &self.entries
    }

    /// Brute-force substring scan over one outer key.
    ///
    /// Pagination: `start > stop` pulls `start` back to `stop`, a negative
    /// `start` becomes 0, and `stop` beyond the match count (or `stop <= 0`)
    /// means "to the end". `count` is always the unpaginated match count.
    pub fn search(&self, key: &str, query: &str, start: i64, stop: i64) -> SearchResult {
        let Some(inner) = self.entries.get(key) else {
            return SearchResult::empty(key);
        };

        let started = Instant::now();
        let query = query.to_lowercase();
        let mut found: Vec<String> = inner
            .iter()
            .filter(|(_, value)| value.contains(query.as_str()))
            .map(|(id, _)| id.clone())
            .collect();
        let elapsed = started.elapsed();

        let count = found.len();
        let page = Page::clamp(start, stop, count);

        found.sort_unstable();
        found.truncate(page.stop);
        found.drain(..page.start);

        SearchResult {
            key: key.to_string(),
            found,
            count,
            start: page.start,
            stop: page.stop,
            elapsed,
        }
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            keys: self.entries.len(),
            ..IndexStats::default()
        };
        for (key, inner) in self.entries.iter() {
            stats.entries += inner.len();
            stats.bytes += key.len();
            stats.bytes += inner.iter().map(|(id, value)| id.len() + value.len()).sum::<usize>();
        }
        stats
    }

    /// Writes a snapshot using the lock this view already holds, then syncs `dest`.
    pub fn snapshot<W: SyncWrite>(&self, dest: W) -> Result<()> {
        self.snapshot_with(dest, self.codec)
    }

    /// Like [`IndexView::snapshot`], with an explicit encoding.
    pub fn snapshot_with<W: SyncWrite>(&self, mut dest: W, codec: Codec) -> Result<()> {
        tracing::debug!("Search index syncing...");
        let started = Instant::now();

        let bytes = snapshot::encode(&self.entries, codec)?;
        dest.write_all(&bytes)?;

        tracing::debug!(
            "Search index written in {} ({} bytes, {} keys)",
            format_elapsed(started.elapsed()),
            bytes.len(),
            self.entries.len()
        );

        dest.sync_to_disk()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> SearchIndex {
        let index = SearchIndex::new();
        index.set("users", "1", "Alice Smith");
        index.set("users", "2", "bob jones");
        index
    }

    #[test]
    fn test_set_lowercases_value() {
        let index = SearchIndex::new();
        index.set("k", "id", "MiXeD Case ÄÖ");
        assert_eq!(index.read().get("k", "id"), Some("mixed case äö"));
    }

    #[test]
    fn test_set_overwrites() {
        let index = SearchIndex::new();
        index.set("k", "id", "first");
        index.set("k", "id", "Second");
        assert_eq!(index.read().get("k", "id"), Some("second"));
        assert_eq!(index.stats().entries, 1);
    }

    #[test]
    fn test_delete_last_id_removes_key() {
        let index = users();
        index.delete("users", "1");
        assert_eq!(index.read().keys(), vec!["users"]);

        index.delete("users", "2");
        assert!(index.read().keys().is_empty());
        assert!(index.read().is_empty());
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let index = users();
        index.delete("nobody", "1");
        index.delete("users", "99");
        assert_eq!(index.read().ids("users"), vec!["1", "2"]);
    }

    #[test]
    fn test_search_scenario() {
        let index = users();

        let result = index.search("users", "smith", 0, 0);
        assert_eq!(result.found, vec!["1"]);
        assert_eq!(result.count, 1);
        assert_eq!((result.start, result.stop), (0, 1));

        let result = index.search("users", "o", 0, 1);
        assert_eq!(result.found, vec!["2"]);
        assert_eq!(result.count, 1);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let index = users();
        let result = index.search("users", "ALICE", 0, 0);
        assert_eq!(result.found, vec!["1"]);
    }

    #[test]
    fn test_search_missing_key_is_empty() {
        let index = users();
        let result = index.search("orders", "a", 0, 0);
        assert_eq!(result, SearchResult::empty("orders"));
    }

    #[test]
    fn test_search_sorted_and_paginated() {
        let index = SearchIndex::new();
        for id in ["b", "d", "a", "e", "c"] {
            index.set("letters", id, "shared text");
        }

        let all = index.search("letters", "text", 0, 0);
        assert_eq!(all.found, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(all.count, 5);

        let page = index.search("letters", "text", 1, 3);
        assert_eq!(page.found, vec!["b", "c"]);
        assert_eq!(page.count, 5);
        assert_eq!((page.start, page.stop), (1, 3));

        let inverted = index.search("letters", "text", 5, 2);
        assert!(inverted.found.is_empty());
        assert_eq!((inverted.start, inverted.stop), (2, 2));
        assert_eq!(inverted.count, 5);
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let index = users();
        assert_eq!(index.search("users", "", 0, 0).found, vec!["1", "2"]);
    }

    #[test]
    fn test_flush_clears_everything() {
        let index = users();
        index.set("orders", "7", "pending");
        index.flush();

        for key in ["users", "orders"] {
            let result = index.search(key, "", 0, 0);
            assert_eq!(result.count, 0);
            assert!(result.found.is_empty());
        }
        assert_eq!(index.stats(), IndexStats::default());
    }

    #[test]
    fn test_stats() {
        let index = users();
        let stats = index.stats();
        assert_eq!(stats.keys, 1);
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.bytes, "users".len() + 1 + "alice smith".len() + 1 + "bob jones".len());
    }

    #[test]
    fn test_restore_repairs_invariants() {
        let mut entries: Entries = HashMap::new();
        entries.insert("empty".to_string(), HashMap::new());
        entries
            .entry("users".to_string())
            .or_default()
            .insert("1".to_string(), "Loud VALUE".to_string());

        let index = SearchIndex::from_entries(entries);
        let view = index.read();
        assert_eq!(view.keys(), vec!["users"]);
        assert_eq!(view.get("users", "1"), Some("loud value"));
    }

    #[test]
    fn test_view_snapshot_does_not_relock() {
        let index = users();
        let view = index.read();
        let mut buf = Vec::new();
        view.snapshot(&mut buf).unwrap();
        drop(view);

        let restored = SearchIndex::restore(buf.as_slice()).unwrap();
        assert_eq!(restored.search("users", "jones", 0, 0).found, vec!["2"]);
    }

    #[test]
    fn test_restore_keeps_snapshot_codec() {
        let index = users().with_codec(Codec::Zstd);
        let mut buf = Vec::new();
        index.snapshot(&mut buf).unwrap();

        let restored = SearchIndex::restore(buf.as_slice()).unwrap();
        assert_eq!(restored.codec(), Codec::Zstd);

        let mut again = Vec::new();
        restored.snapshot(&mut again).unwrap();
        assert!(again.starts_with(&snapshot::ZSTD_MAGIC));
    }

    #[test]
    fn test_snapshot_with_overrides_codec() {
        let index = users();
        let mut buf = Vec::new();
        index.read().snapshot_with(&mut buf, Codec::Zstd).unwrap();
        assert!(buf.starts_with(&snapshot::ZSTD_MAGIC));
    }
}
