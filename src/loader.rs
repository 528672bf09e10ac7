//! Segment loader: fetch a window's manifests and merge them into the
//! global item list.
//!
//! Manifests of one window are fetched on scoped threads through the shared
//! resource cache; merging happens afterwards on the caller's thread, so the
//! item list never sees concurrent writes. Each segment's composite
//! thumbnail is handed to the fetcher as a fire-and-forget prefetch the
//! first time a window touches it.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{debug, info, trace, warn};
use serde::Deserialize as _;
use serde_json::Value;

use crate::cache::ResourceCache;
use crate::directory::SegmentDirectory;
use crate::error::{FetchError, GalleryError, Result};
use crate::items::{GlobalItemList, ItemDescriptor, ManifestEntry};
use crate::url::{HostTable, SegmentUrls};
use crate::window::SegmentWindow;

/// Everything the loader needs besides the item list.
pub struct LoadContext<'a> {
    pub directory: &'a SegmentDirectory,
    pub cache: &'a ResourceCache,
    pub hosts: &'a HostTable,
    pub cache_bust: &'a str,
}

/// Result of merging one window.
#[derive(Debug, Clone)]
pub struct LoadedWindow {
    pub cursor: usize,
    pub start_offset: usize,
    /// Descriptors in global-index order, starting at `start_offset`.
    pub items: Vec<ItemDescriptor>,
}

/// Decode a segment manifest (JSON array of entries).
pub fn parse_manifest(value: &Value) -> std::result::Result<Vec<ManifestEntry>, FetchError> {
    Ok(Vec::<ManifestEntry>::deserialize(value)?)
}

/// Expand manifest entries into descriptors, newest (last) entry first.
pub fn expand_segment(
    urls: &SegmentUrls,
    entries: &[ManifestEntry],
    first_index: usize,
) -> Vec<ItemDescriptor> {
    entries
        .iter()
        .rev()
        .enumerate()
        .map(|(i, entry)| ItemDescriptor {
            src: urls.image(&entry.name),
            width: entry.w,
            height: entry.h,
            atlas_x: entry.x,
            atlas_y: entry.y,
            atlas_src: urls.thumbnails.clone(),
            global_index: first_index + i,
        })
        .collect()
}

fn fetch_manifest(cache: &ResourceCache, urls: &SegmentUrls) -> Result<Vec<ManifestEntry>> {
    let value: Arc<Value> = cache
        .get(&urls.manifest)
        .map_err(|e| GalleryError::manifest(&urls.manifest, e))?;
    parse_manifest(&value).map_err(|e| GalleryError::manifest(&urls.manifest, e))
}

/// Fetch every segment of `window` and write its items into `items`.
///
/// Fails with the first manifest error in window order; nothing is merged in
/// that case.
pub fn load_window(
    ctx: &LoadContext<'_>,
    window: &SegmentWindow,
    items: &mut GlobalItemList,
) -> Result<LoadedWindow> {
    let start = Instant::now();
    let seg_urls: Vec<SegmentUrls> = window
        .segments
        .iter()
        .map(|&k| SegmentUrls::new(ctx.hosts, &ctx.directory.segment(k).name, ctx.cache_bust))
        .collect();

    for urls in &seg_urls {
        ctx.cache.prefetch_image(&urls.thumbnails);
    }

    let manifests: Vec<Result<Vec<ManifestEntry>>> = thread::scope(|s| {
        let handles: Vec<_> = seg_urls
            .iter()
            .map(|urls| s.spawn(move || fetch_manifest(ctx.cache, urls)))
            .collect();
        handles
            .into_iter()
            .zip(&seg_urls)
            .map(|(h, urls)| {
                h.join().unwrap_or_else(|_| {
                    Err(GalleryError::manifest(
                        &urls.manifest,
                        FetchError::Transport("manifest fetch thread panicked".into()),
                    ))
                })
            })
            .collect()
    });

    let mut merged: Vec<ItemDescriptor> = Vec::new();
    for (urls, manifest) in seg_urls.iter().zip(manifests) {
        let entries = manifest?;
        let first = window.start_offset + merged.len();
        trace!("loader: {} → {} entries at {first}", urls.base, entries.len());
        merged.extend(expand_segment(urls, &entries, first));
    }

    let mut dropped = 0;
    for item in &merged {
        if !items.put(item.clone()) {
            dropped += 1;
        }
    }
    if dropped > 0 {
        warn!(
            "loader: {dropped} item(s) beyond collection size {} dropped (manifest larger than directory count)",
            items.len()
        );
    }

    info!(
        "loader: window cursor={} start={} → {} items in {:.1}ms",
        window.cursor,
        window.start_offset,
        merged.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    debug!("loader: {} of {} slots filled", items.loaded_count(), items.len());

    Ok(LoadedWindow {
        cursor: window.cursor,
        start_offset: window.start_offset,
        items: merged,
    })
}
