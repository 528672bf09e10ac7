//! `GalleryEngine`: the single context object owning directory, item list,
//! resource cache and scheduler state.
//!
//! Two entry points mirror the two event families:
//! - [`GalleryEngine::render`]: scroll/resize path. Loads the window for the
//!   scroll position and rebuilds the grid only when the render signature
//!   changes.
//! - [`GalleryEngine::prefetch_around`]: viewer-focus path. Loads windows for
//!   the look-behind/look-ahead bounds of the focused item. Never touches the
//!   render signature.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use log::{debug, info, trace};

use crate::cache::ResourceCache;
use crate::directory::SegmentDirectory;
use crate::error::{GalleryError, Result};
use crate::fetch::Fetcher;
use crate::items::{GlobalItemList, ItemDescriptor};
use crate::layout::{
    GridFrame, GridParams, RenderSignature, Viewport, compute_geometry, place_items, target_index,
};
use crate::loader::{LoadContext, LoadedWindow, load_window};
use crate::url::{HostTable, cache_bust_token};
use crate::window;

/// Engine settings, resolved from configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub origin: String,
    pub hosts: BTreeMap<String, String>,
    /// Pinned cache-bust token; `None` derives the hourly token at startup.
    pub cache_bust: Option<String>,
    pub grid: GridParams,
    /// Items loaded on each side of the viewer's focused item.
    pub focus_radius: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8000".into(),
            hosts: BTreeMap::new(),
            cache_bust: None,
            grid: GridParams::default(),
            focus_radius: 30,
        }
    }
}

/// Outcome of a render request.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// Signature unchanged; the current grid stays as is.
    Skipped,
    Rebuilt(GridFrame),
}

#[derive(Debug, Default)]
struct SchedulerState {
    last_signature: Option<RenderSignature>,
    rebuilds: u64,
}

pub struct GalleryEngine {
    config: EngineConfig,
    hosts: HostTable,
    cache_bust: String,
    cache: ResourceCache,
    directory: Option<SegmentDirectory>,
    items: GlobalItemList,
    scheduler: SchedulerState,
}

impl GalleryEngine {
    pub fn new(config: EngineConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let hosts = HostTable::new(&config.origin, config.hosts.clone());
        let cache_bust = config
            .cache_bust
            .clone()
            .unwrap_or_else(|| cache_bust_token(SystemTime::now()));
        debug!("engine: origin={} cache_bust={cache_bust}", hosts.origin());
        Self {
            config,
            hosts,
            cache_bust,
            cache: ResourceCache::new(fetcher),
            directory: None,
            items: GlobalItemList::default(),
            scheduler: SchedulerState::default(),
        }
    }

    /// Fetch the segment directory and size the item list. Must succeed
    /// before any event has an effect.
    pub fn init(&mut self) -> Result<()> {
        let dir = SegmentDirectory::load(&self.cache, self.hosts.origin())?;
        self.items = GlobalItemList::with_len(dir.total());
        self.directory = Some(dir);
        self.scheduler = SchedulerState::default();
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.directory.is_some()
    }

    pub fn directory(&self) -> Option<&SegmentDirectory> {
        self.directory.as_ref()
    }

    pub fn cache_bust(&self) -> &str {
        &self.cache_bust
    }

    /// Total items in the collection (0 before `init`).
    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn item(&self, idx: usize) -> Option<&ItemDescriptor> {
        self.items.get(idx)
    }

    pub fn loaded_count(&self) -> usize {
        self.items.loaded_count()
    }

    /// Number of grid rebuilds performed so far.
    pub fn rebuild_count(&self) -> u64 {
        self.scheduler.rebuilds
    }

    /// Resolve and load the window covering `target`.
    ///
    /// Returns `Ok(None)` for an empty collection.
    pub fn load_index(&mut self, target: usize) -> Result<Option<LoadedWindow>> {
        let Some(dir) = self.directory.as_ref() else {
            return Err(GalleryError::LayoutPrecondition);
        };
        let Some(win) = window::resolve(dir, target) else {
            return Ok(None);
        };
        let ctx = LoadContext {
            directory: dir,
            cache: &self.cache,
            hosts: &self.hosts,
            cache_bust: &self.cache_bust,
        };
        load_window(&ctx, &win, &mut self.items).map(Some)
    }

    /// Scroll/resize path: load the window for `viewport` and rebuild the
    /// grid if the render signature changed.
    ///
    /// Before `init` this is a silent no-op (`Skipped`).
    pub fn render(&mut self, viewport: Viewport) -> Result<RenderOutcome> {
        if !self.is_ready() {
            debug!("render: directory not loaded, ignoring");
            return Ok(RenderOutcome::Skipped);
        }
        let start = Instant::now();
        let params = self.config.grid;
        let geometry = compute_geometry(&params, viewport.width, self.total());
        let target = target_index(&params, &geometry, viewport.scroll_top);

        let Some(loaded) = self.load_index(target)? else {
            trace!("render: empty collection");
            return Ok(RenderOutcome::Skipped);
        };

        let signature = RenderSignature::new(&params, loaded.cursor, geometry.columns, viewport.width);
        if self.scheduler.last_signature == Some(signature) {
            debug!("render: signature unchanged ({signature:?}), skipping rebuild");
            return Ok(RenderOutcome::Skipped);
        }
        self.scheduler.last_signature = Some(signature);
        self.scheduler.rebuilds += 1;

        let placements = place_items(&geometry, loaded.start_offset, &loaded.items);
        info!(
            "render: rebuild #{} cursor={} columns={} target={target} ({} thumbnails) in {:.1}ms",
            self.scheduler.rebuilds,
            loaded.cursor,
            geometry.columns,
            placements.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(RenderOutcome::Rebuilt(GridFrame {
            geometry,
            placements,
        }))
    }

    /// Look-behind and look-ahead bounds for a focused index, clamped to the
    /// collection. `None` for an empty collection.
    pub fn focus_bounds(&self, focus: usize) -> Option<(usize, usize)> {
        let last = self.total().checked_sub(1)?;
        let radius = self.config.focus_radius;
        let behind = focus.saturating_sub(radius).min(last);
        let ahead = focus.saturating_add(radius).min(last);
        Some((behind, ahead))
    }

    /// Viewer-focus path: make sure the items around `focus` are loaded.
    ///
    /// Before `init` this is a silent no-op. Returns the number of windows
    /// that were loaded.
    pub fn prefetch_around(&mut self, focus: usize) -> Result<usize> {
        if !self.is_ready() {
            debug!("prefetch: directory not loaded, ignoring focus {focus}");
            return Ok(0);
        }
        let Some((behind, ahead)) = self.focus_bounds(focus) else {
            return Ok(0);
        };
        debug!("prefetch: focus={focus} bounds=[{behind}, {ahead}]");
        let mut loaded = 0;
        for bound in [behind, ahead] {
            if self.items.is_loaded(bound) {
                trace!("prefetch: {bound} already loaded");
                continue;
            }
            if self.load_index(bound)?.is_some() {
                loaded += 1;
            }
        }
        Ok(loaded)
    }
}
