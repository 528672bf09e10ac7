//! Process-wide resource cache: URL → parsed JSON, never evicted.
//!
//! Entries live for the lifetime of the cache. Growth is bounded only by the
//! number of distinct URLs a session touches (one directory manifest plus one
//! manifest per visited segment), which is accepted for a single browsing
//! session.
//!
//! ## In-flight deduplication
//!
//! A slot is `Pending` while its first fetch runs. Other callers for the same
//! URL block on the condition variable instead of issuing a second request,
//! so at most one request per URL is outstanding. On failure the slot is
//! removed and the error goes to the caller that issued the fetch; waiters
//! wake up, find the slot empty and retry on their own. A panicking fetch
//! releases its slot the same way.
//!
//! ## Image prefetches
//!
//! Composite thumbnails are not JSON and never enter the slot map, but the
//! cache remembers which image URLs it already handed to the fetcher so each
//! one is downloaded at most once per session.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use log::{debug, trace};
use serde_json::Value;

use crate::error::FetchError;
use crate::fetch::Fetcher;

enum Slot {
    Pending,
    Ready(Arc<Value>),
}

pub struct ResourceCache {
    fetcher: Arc<dyn Fetcher>,
    slots: Mutex<HashMap<String, Slot>>,
    settled: Condvar,
    prefetched: Mutex<HashSet<String>>,
}

/// Clears a `Pending` slot and wakes waiters unless the fetch settled it.
struct PendingSlot<'a> {
    cache: &'a ResourceCache,
    url: &'a str,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        let mut slots = self.cache.lock();
        if matches!(slots.get(self.url), Some(Slot::Pending)) {
            slots.remove(self.url);
            debug!("cache: {} abandoned while pending", self.url);
        }
        drop(slots);
        self.cache.settled.notify_all();
    }
}

impl ResourceCache {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            slots: Mutex::new(HashMap::new()),
            settled: Condvar::new(),
            prefetched: Mutex::new(HashSet::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached document for `url`, fetching it on first use.
    pub fn get(&self, url: &str) -> Result<Arc<Value>, FetchError> {
        let mut slots = self.lock();
        loop {
            match slots.get(url) {
                Some(Slot::Ready(value)) => {
                    trace!("cache hit: {url}");
                    return Ok(Arc::clone(value));
                }
                Some(Slot::Pending) => {
                    trace!("cache wait: {url}");
                    slots = self
                        .settled
                        .wait(slots)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
                None => break,
            }
        }
        slots.insert(url.to_string(), Slot::Pending);
        drop(slots);
        let pending = PendingSlot { cache: self, url };

        debug!("cache miss: {url}");
        let result = self.fetcher.fetch_json(url);

        let mut slots = self.lock();
        let out = match result {
            Ok(value) => {
                let value = Arc::new(value);
                slots.insert(url.to_string(), Slot::Ready(Arc::clone(&value)));
                Ok(value)
            }
            Err(e) => {
                slots.remove(url);
                debug!("cache: {url} failed, not cached: {e}");
                Err(e)
            }
        };
        drop(slots);
        drop(pending);
        out
    }

    /// Hand `url` to the fetcher's image prefetch unless it was issued
    /// before. Returns whether a prefetch was queued.
    pub fn prefetch_image(&self, url: &str) -> bool {
        let fresh = lock_set(&self.prefetched).insert(url.to_string());
        if fresh {
            self.fetcher.prefetch_image(url);
        } else {
            trace!("prefetch: {url} already issued");
        }
        fresh
    }

    /// Whether `url` has a resolved entry.
    pub fn contains(&self, url: &str) -> bool {
        matches!(self.lock().get(url), Some(Slot::Ready(_)))
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|s| matches!(s, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_set(m: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    const URL: &str = "http://h/images/2024/01/entry_index.json?cb=t";

    #[test]
    fn second_get_is_served_from_cache() {
        let f = MemoryFetcher::new();
        f.insert(URL, r#"[{"name":"a.jpg","w":1,"h":1,"x":0,"y":0}]"#);
        let f = Arc::new(f);
        let cache = ResourceCache::new(f.clone());

        let a = cache.get(URL).unwrap();
        let b = cache.get(URL).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(f.fetch_count(URL), 1);
        assert!(cache.contains(URL));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_gets_issue_one_fetch() {
        let f = MemoryFetcher::new().with_latency(Duration::from_millis(50));
        f.insert(URL, "[1, 2, 3]");
        let f = Arc::new(f);
        let cache = ResourceCache::new(f.clone());

        let values: Vec<Arc<Value>> = thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| cache.get(URL).unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(f.fetch_count(URL), 1);
        assert_eq!(values.len(), 8);
        for v in &values {
            assert!(Arc::ptr_eq(v, &values[0]));
        }
    }

    #[test]
    fn failure_is_not_cached() {
        let f = MemoryFetcher::new();
        f.insert(URL, "[]");
        f.set_failing(URL, true);
        let f = Arc::new(f);
        let cache = ResourceCache::new(f.clone());

        assert!(cache.get(URL).is_err());
        assert!(!cache.contains(URL));
        assert!(cache.is_empty());

        f.set_failing(URL, false);
        assert!(cache.get(URL).is_ok());
        assert_eq!(f.fetch_count(URL), 2);
    }

    #[test]
    fn waiter_retries_after_in_flight_failure() {
        let f = MemoryFetcher::new().with_latency(Duration::from_millis(50));
        f.insert(URL, "[]");
        f.set_failing(URL, true);
        let f = Arc::new(f);
        let cache = ResourceCache::new(f.clone());

        let results: Vec<bool> = thread::scope(|s| {
            let first = s.spawn(|| cache.get(URL).is_ok());
            thread::sleep(Duration::from_millis(10));
            let second = s.spawn(|| cache.get(URL).is_ok());
            vec![first.join().unwrap(), second.join().unwrap()]
        });

        assert_eq!(results, [false, false]);
        assert_eq!(f.fetch_count(URL), 2);
        assert!(!cache.contains(URL));
    }

    /// Panics on the first `fetch_json`, serves `[]` afterwards.
    #[derive(Default)]
    struct PanicOnce {
        calls: AtomicUsize,
    }

    impl Fetcher for PanicOnce {
        fn fetch_json(&self, _url: &str) -> Result<Value, FetchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("fetch blew up");
            }
            Ok(Value::Array(Vec::new()))
        }

        fn prefetch_image(&self, _url: &str) {}
    }

    #[test]
    fn panicking_fetch_releases_pending_slot() {
        let f = Arc::new(PanicOnce::default());
        let cache = ResourceCache::new(f.clone());

        let caught = panic::catch_unwind(AssertUnwindSafe(|| cache.get(URL)));
        assert!(caught.is_err());
        assert!(!cache.contains(URL));

        // Would block forever on a leftover `Pending` slot.
        assert!(cache.get(URL).is_ok());
        assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn image_prefetch_is_issued_once_per_url() {
        let f = Arc::new(MemoryFetcher::new());
        let cache = ResourceCache::new(f.clone());

        assert!(cache.prefetch_image("http://h/a/thumbnails.jpg?cb=t"));
        assert!(!cache.prefetch_image("http://h/a/thumbnails.jpg?cb=t"));
        assert!(cache.prefetch_image("http://h/b/thumbnails.jpg?cb=t"));
        assert_eq!(
            f.prefetched(),
            ["http://h/a/thumbnails.jpg?cb=t", "http://h/b/thumbnails.jpg?cb=t"]
        );
        // Prefetches never occupy JSON slots.
        assert!(cache.is_empty());
    }

    #[test]
    fn distinct_urls_are_fetched_separately() {
        let f = MemoryFetcher::new();
        f.insert("http://h/a", "1");
        f.insert("http://h/b", "2");
        let f = Arc::new(f);
        let cache = ResourceCache::new(f.clone());

        assert_eq!(*cache.get("http://h/a").unwrap(), 1);
        assert_eq!(*cache.get("http://h/b").unwrap(), 2);
        assert_eq!(f.total_fetches(), 2);
        assert_eq!(cache.len(), 2);
    }
}
