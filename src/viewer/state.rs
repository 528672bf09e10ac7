//! Browser state: terminal layout, scroll position, focus and the last grid.
//!
//! The terminal stands in for a browser page: each terminal column counts as
//! [`PX_PER_COL`] pixels of viewport width, and each grid row occupies one
//! terminal line. Scroll offsets handed to the engine are in pixels, so the
//! engine's grid math is the same one a pixel front-end would use.

use crate::layout::{GridFrame, GridGeometry, GridParams, Placement, Viewport, compute_geometry};

/// Horizontal pixels represented by one terminal column.
pub(super) const PX_PER_COL: u32 = 8;

// ---------------------------------------------------------------------------
// Layout / BrowseState
// ---------------------------------------------------------------------------

pub(super) struct Layout {
    pub cols: u16,
    pub grid_rows: u16,  // lines available for grid rows (= term_rows - 1)
    pub status_row: u16, // status bar line (= term_rows - 1)
}

pub(super) fn compute_layout(term_cols: u16, term_rows: u16) -> Layout {
    Layout {
        cols: term_cols,
        grid_rows: term_rows.saturating_sub(1).max(1),
        status_row: term_rows.saturating_sub(1),
    }
}

#[derive(Default)]
pub(super) struct BrowseState {
    /// First grid row shown on screen.
    pub top_row: u32,
    /// Viewer cursor (global index), if open.
    pub focus: Option<usize>,
    /// Last rebuilt grid.
    pub frame: Option<GridFrame>,
    /// One-shot message, cleared on next keypress.
    pub flash: Option<String>,
}

impl BrowseState {
    pub(super) fn viewport(&self, layout: &Layout, params: &GridParams) -> Viewport {
        Viewport {
            width: layout.cols as u32 * PX_PER_COL,
            scroll_top: self.top_row.saturating_mul(params.cell_size()),
        }
    }

    pub(super) fn geometry(&self, layout: &Layout, params: &GridParams, total: usize) -> GridGeometry {
        compute_geometry(params, self.viewport(layout, params).width, total)
    }

    /// Move the top row, clamped to the last full screen. Returns whether it
    /// changed.
    pub(super) fn scroll_to(&mut self, row: u32, geometry: &GridGeometry, layout: &Layout) -> bool {
        let row = row.min(max_top_row(geometry, layout));
        let changed = row != self.top_row;
        self.top_row = row;
        changed
    }

    /// Set the focus (clamped to the collection) and scroll so its row is on
    /// screen. Returns whether the top row changed.
    pub(super) fn focus_on(
        &mut self,
        idx: usize,
        total: usize,
        geometry: &GridGeometry,
        layout: &Layout,
    ) -> bool {
        let Some(last) = total.checked_sub(1) else {
            return false;
        };
        let idx = idx.min(last);
        self.focus = Some(idx);
        let row = (idx / geometry.columns as usize) as u32;
        let visible = layout.grid_rows as u32;
        if row < self.top_row {
            self.scroll_to(row, geometry, layout)
        } else if row >= self.top_row + visible {
            self.scroll_to(row + 1 - visible, geometry, layout)
        } else {
            false
        }
    }
}

pub(super) fn max_top_row(geometry: &GridGeometry, layout: &Layout) -> u32 {
    geometry.total_rows.saturating_sub(layout.grid_rows as u32)
}

/// Placement for a global index in the last rebuilt grid.
///
/// Placements of a frame are consecutive in global index, so this is a
/// direct offset.
pub(super) fn placement_for(frame: &GridFrame, idx: usize) -> Option<&Placement> {
    let first = frame.placements.first()?.global_index;
    frame.placements.get(idx.checked_sub(first)?)
}

/// Display name of an item: the last path component of its link.
pub(super) fn item_label(href: &str) -> &str {
    href.rsplit('/').next().unwrap_or(href)
}

/// Fit `text` into exactly `width` characters (truncating with `~`).
pub(super) fn fit(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len <= width {
        format!("{text:<width$}")
    } else if width == 0 {
        String::new()
    } else {
        let mut s: String = text.chars().take(width - 1).collect();
        s.push('~');
        s
    }
}
