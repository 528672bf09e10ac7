//! Resource fetching: the `Fetcher` seam plus HTTP and in-memory backends.
//!
//! `HttpFetcher` owns a `ureq` agent for JSON documents and a background
//! worker thread for fire-and-forget image prefetches. Prefetch requests
//! travel over an mpsc channel; the worker downloads and discards the body.
//! There is no HTTP cache here: callers go through
//! [`ResourceCache::prefetch_image`](crate::cache::ResourceCache::prefetch_image),
//! which issues each URL once. The worker exits when the fetcher is dropped
//! (sender closed).

use std::collections::{HashMap, HashSet};
use std::sync::mpsc;
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use serde_json::Value;

use crate::error::FetchError;

/// Source of JSON documents and image resources, addressed by URL.
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and parse the body as JSON.
    fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;

    /// Warm an image resource without waiting for it. Failures are ignored.
    fn prefetch_image(&self, url: &str);
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

pub struct HttpFetcher {
    agent: ureq::Agent,
    prefetch_tx: mpsc::Sender<String>,
    _worker: JoinHandle<()>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        let (prefetch_tx, prefetch_rx) = mpsc::channel::<String>();
        let worker_agent = agent.clone();
        let worker = thread::spawn(move || {
            debug!("prefetch worker: started");
            while let Ok(url) = prefetch_rx.recv() {
                let start = Instant::now();
                match download(&worker_agent, &url) {
                    Ok(len) => debug!(
                        "prefetch worker: {url} done in {:.1}ms ({len} bytes)",
                        start.elapsed().as_secs_f64() * 1000.0
                    ),
                    Err(e) => warn!("prefetch worker: {url} failed: {e}"),
                }
            }
            debug!("prefetch worker: channel closed, exiting");
        });

        Self {
            agent,
            prefetch_tx,
            _worker: worker,
        }
    }
}

fn download(agent: &ureq::Agent, url: &str) -> Result<usize, ureq::Error> {
    let mut resp = agent.get(url).call()?;
    Ok(resp.body_mut().read_to_vec()?.len())
}

impl Fetcher for HttpFetcher {
    fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let start = Instant::now();
        let mut resp = self.agent.get(url).call()?;
        let text = resp.body_mut().read_to_string()?;
        let value = serde_json::from_str(&text)?;
        debug!(
            "fetch: {url} in {:.1}ms ({} bytes)",
            start.elapsed().as_secs_f64() * 1000.0,
            text.len()
        );
        Ok(value)
    }

    fn prefetch_image(&self, url: &str) {
        trace!("prefetch: queue {url}");
        let _ = self.prefetch_tx.send(url.to_string());
    }
}

// ---------------------------------------------------------------------------
// MemoryFetcher
// ---------------------------------------------------------------------------

/// In-memory fetcher for offline use and tests.
///
/// Serves registered bodies, counts every `fetch_json` call per URL and
/// records prefetched image URLs. URLs can be made to fail on demand.
#[derive(Default)]
pub struct MemoryFetcher {
    bodies: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
    prefetched: Mutex<Vec<String>>,
    latency: Option<Duration>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `fetch_json` by `latency` (widens race windows in tests).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<String>) {
        lock(&self.bodies).insert(url.into(), body.into());
    }

    pub fn set_failing(&self, url: &str, failing: bool) {
        let mut set = lock(&self.failing);
        if failing {
            set.insert(url.to_string());
        } else {
            set.remove(url);
        }
    }

    /// Number of `fetch_json` calls seen for `url`.
    pub fn fetch_count(&self, url: &str) -> usize {
        lock(&self.calls).get(url).copied().unwrap_or(0)
    }

    /// Total `fetch_json` calls across all URLs.
    pub fn total_fetches(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    pub fn prefetched(&self) -> Vec<String> {
        lock(&self.prefetched).clone()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        *lock(&self.calls).entry(url.to_string()).or_insert(0) += 1;
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
        if lock(&self.failing).contains(url) {
            return Err(FetchError::Transport(format!("{url}: simulated failure")));
        }
        let body = lock(&self.bodies)
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Transport(format!("{url}: 404 Not Found")))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn prefetch_image(&self, url: &str) {
        lock(&self.prefetched).push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fetcher_serves_and_counts() {
        let f = MemoryFetcher::new();
        f.insert("http://h/a.json", r#"{"x": 1}"#);
        let v = f.fetch_json("http://h/a.json").unwrap();
        assert_eq!(v["x"], 1);
        f.fetch_json("http://h/a.json").unwrap();
        assert_eq!(f.fetch_count("http://h/a.json"), 2);
        assert_eq!(f.total_fetches(), 2);
    }

    #[test]
    fn memory_fetcher_missing_url_is_transport_error() {
        let f = MemoryFetcher::new();
        let err = f.fetch_json("http://h/missing.json").unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[test]
    fn memory_fetcher_bad_body_is_parse_error() {
        let f = MemoryFetcher::new();
        f.insert("http://h/bad.json", "{not json");
        let err = f.fetch_json("http://h/bad.json").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn memory_fetcher_failure_toggle() {
        let f = MemoryFetcher::new();
        f.insert("http://h/a.json", "[]");
        f.set_failing("http://h/a.json", true);
        assert!(f.fetch_json("http://h/a.json").is_err());
        f.set_failing("http://h/a.json", false);
        assert!(f.fetch_json("http://h/a.json").is_ok());
    }

    #[test]
    fn memory_fetcher_records_prefetch() {
        let f = MemoryFetcher::new();
        f.prefetch_image("http://h/t.jpg");
        assert_eq!(f.prefetched(), vec!["http://h/t.jpg"]);
    }
}
