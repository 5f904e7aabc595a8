//! Directory cache: external identity (email) → chat identity.
//!
//! Read on every inbound chat event and by every violator rebuild; written by
//! the weekly refresher. The backing map lives behind an `Arc` so that
//! [`DirectoryCache::replace`] is a single pointer swap and
//! [`DirectoryCache::snapshot`] hands readers an immutable, internally
//! consistent view without holding the lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tardy_core::{ChatId, ExternalId};

/// Full mapping installed by a refresh.
pub type DirectoryMap = HashMap<ExternalId, ChatId>;

/// Thread-safe email → chat id cache.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    inner: RwLock<Arc<DirectoryMap>>,
}

impl DirectoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-populated with `map`.
    pub fn with_entries(map: DirectoryMap) -> Self {
        Self {
            inner: RwLock::new(Arc::new(map)),
        }
    }

    /// Look up the chat id for `external_id`. A miss is `None`, not an error.
    pub fn get(&self, external_id: &ExternalId) -> Option<ChatId> {
        self.inner.read().get(external_id).cloned()
    }

    /// Insert or overwrite a single mapping.
    pub fn put(&self, external_id: ExternalId, chat_id: ChatId) {
        let mut guard = self.inner.write();
        let _ = Arc::make_mut(&mut guard).insert(external_id, chat_id);
    }

    /// Remove a single mapping. Removing a missing key is a no-op.
    pub fn delete(&self, external_id: &ExternalId) {
        let mut guard = self.inner.write();
        if guard.contains_key(external_id) {
            let _ = Arc::make_mut(&mut guard).remove(external_id);
        }
    }

    /// Install `map` as the whole cache in one step.
    ///
    /// The new map is fully built before the lock is taken; readers see
    /// either the old mapping or the new one, never an empty or partial cache.
    pub fn replace(&self, map: DirectoryMap) {
        let fresh = Arc::new(map);
        let previous = std::mem::replace(&mut *self.inner.write(), fresh);
        // drop the old map outside the lock
        drop(previous);
    }

    /// Immutable view of the current mapping.
    pub fn snapshot(&self) -> Arc<DirectoryMap> {
        Arc::clone(&self.inner.read())
    }

    /// Reverse lookup: which email maps to `chat_id`.
    pub fn external_id_for(&self, chat_id: &ChatId) -> Option<ExternalId> {
        self.inner
            .read()
            .iter()
            .find(|(_, c)| *c == chat_id)
            .map(|(e, _)| e.clone())
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use super::*;

    fn ext(s: &str) -> ExternalId {
        ExternalId::from(s)
    }

    fn chat(s: &str) -> ChatId {
        ChatId::from(s)
    }

    #[test]
    fn miss_is_none() {
        let cache = DirectoryCache::new();
        assert!(cache.get(&ext("nobody@x.org")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn put_then_get() {
        let cache = DirectoryCache::new();
        cache.put(ext("a@x.org"), chat("U1"));
        assert_eq!(cache.get(&ext("a@x.org")), Some(chat("U1")));
        assert_eq!(cache.get(&ext("A@X.ORG")), Some(chat("U1")));
    }

    #[test]
    fn put_overwrites_last_write_wins() {
        let cache = DirectoryCache::new();
        cache.put(ext("a@x.org"), chat("U1"));
        cache.put(ext("a@x.org"), chat("U2"));
        assert_eq!(cache.get(&ext("a@x.org")), Some(chat("U2")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn delete_removes_only_that_key() {
        let cache = DirectoryCache::new();
        cache.put(ext("a@x.org"), chat("U1"));
        cache.put(ext("b@x.org"), chat("U2"));
        cache.delete(&ext("a@x.org"));
        cache.delete(&ext("missing@x.org"));
        assert!(cache.get(&ext("a@x.org")).is_none());
        assert_eq!(cache.get(&ext("b@x.org")), Some(chat("U2")));
    }

    #[test]
    fn replace_drops_old_entries() {
        let cache = DirectoryCache::new();
        cache.put(ext("old@x.org"), chat("U0"));
        let mut fresh = DirectoryMap::new();
        let _ = fresh.insert(ext("new@x.org"), chat("U9"));
        cache.replace(fresh);
        assert!(cache.get(&ext("old@x.org")).is_none());
        assert_eq!(cache.get(&ext("new@x.org")), Some(chat("U9")));
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let cache = DirectoryCache::new();
        cache.put(ext("a@x.org"), chat("U1"));
        let snap = cache.snapshot();
        cache.put(ext("b@x.org"), chat("U2"));
        cache.replace(DirectoryMap::new());
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get(&ext("a@x.org")), Some(&chat("U1")));
    }

    #[test]
    fn reverse_lookup() {
        let cache = DirectoryCache::new();
        cache.put(ext("a@x.org"), chat("U1"));
        assert_eq!(cache.external_id_for(&chat("U1")), Some(ext("a@x.org")));
        assert!(cache.external_id_for(&chat("U2")).is_none());
    }

    /// Two full mappings that disagree on every key; a reader must only ever
    /// see all-"A" or all-"B".
    fn mapping(tag: &str, n: usize) -> DirectoryMap {
        (0..n)
            .map(|i| (ext(&format!("user{i}@x.org")), chat(&format!("{tag}{i}"))))
            .collect()
    }

    #[test]
    fn concurrent_replace_is_atomic_for_readers() {
        let cache = Arc::new(DirectoryCache::with_entries(mapping("A", 64)));
        let stop = Arc::new(AtomicBool::new(false));

        let writer = {
            let cache = Arc::clone(&cache);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut flip = false;
                while !stop.load(Ordering::Relaxed) {
                    cache.replace(mapping(if flip { "A" } else { "B" }, 64));
                    flip = !flip;
                }
            })
        };

        for _ in 0..2_000 {
            let snap = cache.snapshot();
            assert_eq!(snap.len(), 64);
            let first_tag = snap[&ext("user0@x.org")].as_str().chars().next().unwrap();
            assert!(
                snap.values()
                    .all(|c| c.as_str().starts_with(first_tag)),
                "observed a mixed mapping"
            );
        }

        stop.store(true, Ordering::Relaxed);
        writer.join().unwrap();
    }

    #[test]
    fn concurrent_puts_all_land() {
        let cache = Arc::new(DirectoryCache::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.put(ext(&format!("t{t}-{i}@x.org")), chat(&format!("U{t}{i}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
