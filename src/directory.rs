//! Segment directory: segment name → item count, sorted ascending.
//!
//! Global ordering is reverse-chronological: the last sorted segment holds
//! the lowest global indices. `reverse_starts[k]` is the global index of the
//! first item of sorted segment `k`.

use std::time::Instant;

use log::{debug, info};
use serde_json::Value;

use crate::cache::ResourceCache;
use crate::error::{FetchError, GalleryError, Result};
use crate::url::directory_url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct SegmentDirectory {
    segments: Vec<Segment>,
    reverse_starts: Vec<usize>,
    total: usize,
}

impl SegmentDirectory {
    /// Build from arbitrary `(name, count)` pairs; names are sorted ascending.
    pub fn new(entries: impl IntoIterator<Item = (String, usize)>) -> Self {
        let mut segments: Vec<Segment> = entries
            .into_iter()
            .map(|(name, count)| Segment { name, count })
            .collect();
        segments.sort_by(|a, b| a.name.cmp(&b.name));

        let mut reverse_starts = vec![0; segments.len()];
        let mut running = 0;
        for (k, seg) in segments.iter().enumerate().rev() {
            reverse_starts[k] = running;
            running += seg.count;
        }

        Self {
            segments,
            reverse_starts,
            total: running,
        }
    }

    /// Parse a `dir_index.json` document: an object of name → count.
    pub fn from_json(value: &Value) -> std::result::Result<Self, FetchError> {
        let entries: std::collections::BTreeMap<String, usize> =
            serde_json::from_value(value.clone())?;
        if entries
            .values()
            .try_fold(0usize, |acc, &c| acc.checked_add(c))
            .is_none()
        {
            return Err(FetchError::Parse(serde::de::Error::custom(
                "segment counts overflow the collection size",
            )));
        }
        Ok(Self::new(entries))
    }

    /// Fetch and parse the directory manifest through the resource cache.
    pub fn load(cache: &ResourceCache, origin: &str) -> Result<Self> {
        let start = Instant::now();
        let url = directory_url(origin);
        let value = cache
            .get(&url)
            .map_err(|e| GalleryError::manifest(&url, e))?;
        let dir = Self::from_json(&value).map_err(|e| GalleryError::manifest(&url, e))?;
        info!(
            "directory: {} segments, {} items loaded in {:.1}ms",
            dir.len(),
            dir.total(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        debug!(
            "directory: newest={:?} oldest={:?}",
            dir.segments.last().map(|s| &s.name),
            dir.segments.first().map(|s| &s.name)
        );
        Ok(dir)
    }

    /// Total item count across all segments.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, idx: usize) -> &Segment {
        &self.segments[idx]
    }

    /// Global index of the first item of sorted segment `idx`.
    pub fn start_of(&self, idx: usize) -> usize {
        self.reverse_starts[idx]
    }
}
