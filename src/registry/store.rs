// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! TTL-bound keyed record store
//!
//! Entries are evicted purely by age. The sweep runs lazily at the start of
//! every insert instead of on a timer; insertion order equals age order, so
//! it only ever inspects the front of a queue and is amortized O(1).
//! Reads never return an entry older than the TTL, even before it is swept.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::SharedClock;

/// Field-wise last-write-wins merge for partial updates
pub trait Merge {
    /// Partial form of the record; `None` fields leave the target untouched
    type Patch;

    /// Apply a patch
    fn merge(&mut self, patch: Self::Patch);
}

/// A stored record with its native handle
#[derive(Debug, Clone)]
pub struct RegistryEntry<M, H = ()> {
    /// Native transport handle
    pub handle: H,
    /// Accumulated metadata
    pub metadata: M,
    /// Insertion time (ms)
    pub inserted_at: u64,
}

struct Inner<K, M, H> {
    entries: HashMap<K, RegistryEntry<M, H>>,
    /// Insertion order, oldest first
    order: VecDeque<(u64, K)>,
}

/// TTL registry keyed by a logical id
///
/// Locks are held only for the duration of each call and never while user
/// closures call out, so every method is safe to use from inside an
/// in-flight host callback. Closures passed to [`Registry::with_entry_mut`]
/// must not call back into the same registry.
pub struct Registry<K, M, H = ()> {
    name: &'static str,
    ttl_ms: u64,
    clock: SharedClock,
    inner: Mutex<Inner<K, M, H>>,
}

impl<K, M, H> Registry<K, M, H>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    /// Create an empty registry
    pub fn new(name: &'static str, ttl: Duration, clock: SharedClock) -> Self {
        Self {
            name,
            ttl_ms: ttl.as_millis() as u64,
            clock,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Sweep expired entries, then insert. Returns the entry previously stored under `id`.
    pub fn add_entry(&self, id: K, handle: H, metadata: M) -> Option<RegistryEntry<M, H>> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        let swept = Self::sweep_locked(&mut inner, now, self.ttl_ms);
        if swept > 0 {
            tracing::debug!(registry = self.name, swept, "Evicted expired entries");
        }

        inner.order.push_back((now, id.clone()));
        inner.entries.insert(
            id,
            RegistryEntry {
                handle,
                metadata,
                inserted_at: now,
            },
        )
    }

    /// Look up a live entry
    pub fn get_entry(&self, id: &K) -> Option<RegistryEntry<M, H>>
    where
        M: Clone,
        H: Clone,
    {
        let now = self.clock.now_ms();
        let inner = self.inner.lock();
        inner
            .entries
            .get(id)
            .filter(|entry| !self.is_expired(entry, now))
            .cloned()
    }

    /// Check for a live entry
    pub fn contains(&self, id: &K) -> bool {
        let now = self.clock.now_ms();
        self.inner
            .lock()
            .entries
            .get(id)
            .map(|entry| !self.is_expired(entry, now))
            .unwrap_or(false)
    }

    /// Shallow-merge a patch into a live entry's metadata
    pub fn update_entry(&self, id: &K, patch: M::Patch) -> bool
    where
        M: Merge,
    {
        self.with_entry_mut(id, |entry| entry.metadata.merge(patch))
            .is_some()
    }

    /// Run `f` against a live entry. The closure runs under the registry lock.
    pub fn with_entry_mut<R>(
        &self,
        id: &K,
        f: impl FnOnce(&mut RegistryEntry<M, H>) -> R,
    ) -> Option<R> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        match inner.entries.get_mut(id) {
            Some(entry) if !self.is_expired(entry, now) => Some(f(entry)),
            _ => None,
        }
    }

    /// Drop expired entries now. Returns the number dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        Self::sweep_locked(&mut inner, now, self.ttl_ms)
    }

    /// Empty the registry
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    fn is_expired(&self, entry: &RegistryEntry<M, H>, now: u64) -> bool {
        now.saturating_sub(entry.inserted_at) > self.ttl_ms
    }

    fn sweep_locked(inner: &mut Inner<K, M, H>, now: u64, ttl_ms: u64) -> usize {
        let mut swept = 0;
        while let Some((inserted_at, _)) = inner.order.front() {
            if now.saturating_sub(*inserted_at) <= ttl_ms {
                break;
            }
            let Some((inserted_at, id)) = inner.order.pop_front() else {
                break;
            };
            // Skip queue slots left behind by re-inserted ids
            let current = inner
                .entries
                .get(&id)
                .map(|entry| entry.inserted_at == inserted_at)
                .unwrap_or(false);
            if current {
                inner.entries.remove(&id);
                swept += 1;
            }
        }
        swept
    }
}

/// Monotonic id source; ids are never reused for the life of the process
#[derive(Debug)]
pub struct IdGenerator {
    prefix: &'static str,
    counter: AtomicU64,
}

impl IdGenerator {
    /// Create a generator producing `<prefix><n>`
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            counter: AtomicU64::new(0),
        }
    }

    /// Next id
    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Meta {
        status: u16,
        url: String,
    }

    #[derive(Default)]
    struct MetaPatch {
        status: Option<u16>,
        url: Option<String>,
    }

    impl Merge for Meta {
        type Patch = MetaPatch;

        fn merge(&mut self, patch: MetaPatch) {
            if let Some(status) = patch.status {
                self.status = status;
            }
            if let Some(url) = patch.url {
                self.url = url;
            }
        }
    }

    fn registry(clock: &ManualClock) -> Registry<String, Meta, u32> {
        Registry::new("test", Duration::from_secs(300), Arc::new(clock.clone()))
    }

    #[test]
    fn test_ttl_eviction_on_insert() {
        let clock = ManualClock::new(0);
        let reg = registry(&clock);

        reg.add_entry("a".into(), 1, Meta::default());
        clock.advance(Duration::from_secs(301));
        reg.add_entry("b".into(), 2, Meta::default());

        assert!(reg.get_entry(&"a".to_string()).is_none());
        assert_eq!(reg.get_entry(&"b".to_string()).unwrap().handle, 2);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_expired_entry_hidden_before_sweep() {
        let clock = ManualClock::new(0);
        let reg = registry(&clock);

        reg.add_entry("a".into(), 1, Meta::default());
        clock.advance(Duration::from_secs(360));

        assert!(reg.get_entry(&"a".to_string()).is_none());
        assert!(!reg.contains(&"a".to_string()));
        // Memory is only reclaimed by a sweep
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.sweep(), 1);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_entry_at_exact_ttl_survives() {
        let clock = ManualClock::new(0);
        let reg = registry(&clock);

        reg.add_entry("a".into(), 1, Meta::default());
        clock.advance(Duration::from_secs(300));
        reg.add_entry("b".into(), 2, Meta::default());

        assert!(reg.contains(&"a".to_string()));
    }

    #[test]
    fn test_update_entry_merges_fields() {
        let clock = ManualClock::new(0);
        let reg = registry(&clock);
        reg.add_entry(
            "a".into(),
            1,
            Meta {
                status: 0,
                url: "https://example.com".into(),
            },
        );

        assert!(reg.update_entry(
            &"a".to_string(),
            MetaPatch {
                status: Some(200),
                url: None,
            }
        ));

        let meta = reg.get_entry(&"a".to_string()).unwrap().metadata;
        assert_eq!(meta.status, 200);
        assert_eq!(meta.url, "https://example.com");
        assert!(!reg.update_entry(&"missing".to_string(), MetaPatch::default()));
    }

    #[test]
    fn test_reinserted_id_not_swept_by_stale_slot() {
        let clock = ManualClock::new(0);
        let reg = registry(&clock);

        reg.add_entry("a".into(), 1, Meta::default());
        clock.advance(Duration::from_secs(200));
        reg.add_entry("a".into(), 2, Meta::default());
        clock.advance(Duration::from_secs(200));
        reg.add_entry("b".into(), 3, Meta::default());

        assert_eq!(reg.get_entry(&"a".to_string()).unwrap().handle, 2);
    }

    #[test]
    fn test_clear() {
        let clock = ManualClock::new(0);
        let reg = registry(&clock);
        reg.add_entry("a".into(), 1, Meta::default());
        reg.add_entry("b".into(), 2, Meta::default());

        reg.clear();
        assert!(reg.is_empty());
        assert!(reg.get_entry(&"a".to_string()).is_none());
    }

    #[test]
    fn test_id_generator_monotonic() {
        let ids = IdGenerator::new("req_");
        assert_eq!(ids.next_id(), "req_1");
        assert_eq!(ids.next_id(), "req_2");
    }
}
