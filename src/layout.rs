//! Grid geometry, render signature and thumbnail placement.
//!
//! Pure logic, no I/O. The engine feeds a viewport in and gets back either
//! "skip" (signature unchanged) or a fresh set of placements.

use serde::Serialize;

use crate::items::ItemDescriptor;

/// Grid parameters (pixels / rows), resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridParams {
    pub thumbnail_size: u32,
    pub thumbnail_margin: u32,
    /// Rows kept loaded above the first visible row.
    pub look_behind_rows: u32,
    /// Width granularity (px) of the render signature.
    pub width_bucket: u32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            thumbnail_size: 150,
            thumbnail_margin: 16,
            look_behind_rows: 9,
            width_bucket: 10,
        }
    }
}

impl GridParams {
    pub fn cell_size(&self) -> u32 {
        self.thumbnail_size + self.thumbnail_margin
    }
}

/// Viewport as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub scroll_top: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridGeometry {
    pub columns: u32,
    pub cell_size: u32,
    pub margin_left: u32,
    /// Saturates at `u32::MAX`; `container_height` uses the exact count.
    pub total_rows: u32,
    pub container_height: u64,
}

/// Compute grid geometry for a viewport width and collection size.
///
/// Columns never drop below one, so a viewport narrower than a cell still
/// lays out a single column.
pub fn compute_geometry(params: &GridParams, width: u32, total_items: usize) -> GridGeometry {
    let cell = params.cell_size().max(1);
    let columns = (width / cell).max(1);
    let slack = width.saturating_sub(columns * cell);
    let margin_left = slack.div_ceil(2);
    let rows = (total_items as u64).div_ceil(columns as u64);
    GridGeometry {
        columns,
        cell_size: cell,
        margin_left,
        total_rows: u32::try_from(rows).unwrap_or(u32::MAX),
        container_height: rows.saturating_mul(cell as u64),
    }
}

/// First item index to load for a scroll offset, `look_behind_rows` above
/// the first visible row.
pub fn target_index(params: &GridParams, geometry: &GridGeometry, scroll_top: u32) -> usize {
    let row = (scroll_top / geometry.cell_size).saturating_sub(params.look_behind_rows);
    row as usize * geometry.columns as usize
}

/// Key used to skip redundant grid rebuilds. Only equality is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderSignature {
    cursor: usize,
    columns: u32,
    width_bucket: u32,
}

impl RenderSignature {
    pub fn new(params: &GridParams, cursor: usize, columns: u32, width: u32) -> Self {
        Self {
            cursor,
            columns,
            width_bucket: width / params.width_bucket.max(1),
        }
    }
}

/// One positioned thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub top: u64,
    pub left: u32,
    pub row: u32,
    pub column: u32,
    /// Full-size image link.
    pub href: String,
    pub atlas_src: String,
    /// Background offset into the composite thumbnail (`-x`, `-y`).
    pub atlas_offset: (i64, i64),
    pub global_index: usize,
}

/// Place `items` (consecutive, starting at `start_offset`) on the grid.
pub fn place_items(
    geometry: &GridGeometry,
    start_offset: usize,
    items: &[ItemDescriptor],
) -> Vec<Placement> {
    let columns = geometry.columns as usize;
    let cell = geometry.cell_size;
    let mut col = start_offset % columns;
    let mut row = (start_offset - col) / columns;

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(Placement {
            top: row as u64 * cell as u64,
            left: geometry.margin_left + col as u32 * cell,
            row: row as u32,
            column: col as u32,
            href: item.src.clone(),
            atlas_src: item.atlas_src.clone(),
            atlas_offset: (-(item.atlas_x as i64), -(item.atlas_y as i64)),
            global_index: item.global_index,
        });
        col += 1;
        if col >= columns {
            col = 0;
            row += 1;
        }
    }
    out
}

/// A rebuilt grid, ready to hand to whatever draws it.
#[derive(Debug, Clone, Serialize)]
pub struct GridFrame {
    pub geometry: GridGeometry,
    pub placements: Vec<Placement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(idx: usize) -> ItemDescriptor {
        ItemDescriptor {
            src: format!("http://o/images/s/{idx}.jpg"),
            width: 800,
            height: 600,
            atlas_x: 152 * (idx as u32 % 10),
            atlas_y: 152 * (idx as u32 / 10),
            atlas_src: "http://o/images/s/thumbnails.jpg?cb=t".into(),
            global_index: idx,
        }
    }

    #[test]
    fn geometry_642px() {
        let g = compute_geometry(&GridParams::default(), 642, 10);
        assert_eq!(g.cell_size, 166);
        assert_eq!(g.columns, 3);
        assert_eq!(g.margin_left, 72);
        assert_eq!(g.total_rows, 4);
        assert_eq!(g.container_height, 4 * 166);
    }

    #[test]
    fn margin_rounds_half_up() {
        // 500 - 3 * 166 = 2 → 1; 501 → 3 / 2 = 1.5 → 2
        assert_eq!(compute_geometry(&GridParams::default(), 500, 1).margin_left, 1);
        assert_eq!(compute_geometry(&GridParams::default(), 501, 1).margin_left, 2);
    }

    #[test]
    fn narrow_viewport_keeps_one_column() {
        let g = compute_geometry(&GridParams::default(), 100, 5);
        assert_eq!(g.columns, 1);
        assert_eq!(g.margin_left, 0);
        assert_eq!(g.total_rows, 5);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn huge_single_column_saturates_rows() {
        let total = u32::MAX as usize + 5;
        let g = compute_geometry(&GridParams::default(), 100, total);
        assert_eq!(g.columns, 1);
        assert_eq!(g.total_rows, u32::MAX);
        assert_eq!(g.container_height, total as u64 * 166);
    }

    #[test]
    fn empty_collection_has_no_rows() {
        let g = compute_geometry(&GridParams::default(), 1000, 0);
        assert_eq!(g.total_rows, 0);
        assert_eq!(g.container_height, 0);
    }

    #[test]
    fn target_index_with_look_behind() {
        let p = GridParams::default();
        let g = compute_geometry(&p, 642, 1000);
        // floor(2000 / 166) = 12 → 12 - 9 = 3 → 3 * 3
        assert_eq!(target_index(&p, &g, 2000), 9);
        assert_eq!(target_index(&p, &g, 0), 0);
        assert_eq!(target_index(&p, &g, 166 * 9), 0);
        assert_eq!(target_index(&p, &g, 166 * 10), 3);
    }

    #[test]
    fn signature_buckets_width() {
        let p = GridParams::default();
        assert_eq!(
            RenderSignature::new(&p, 4, 3, 642),
            RenderSignature::new(&p, 4, 3, 649)
        );
        assert_ne!(
            RenderSignature::new(&p, 4, 3, 642),
            RenderSignature::new(&p, 4, 3, 650)
        );
        assert_ne!(
            RenderSignature::new(&p, 4, 3, 642),
            RenderSignature::new(&p, 5, 3, 642)
        );
    }

    #[test]
    fn placement_starts_mid_row() {
        let g = compute_geometry(&GridParams::default(), 642, 100);
        let items: Vec<_> = (7..12).map(item).collect();
        let placed = place_items(&g, 7, &items);

        // 7 → row 2 col 1; wraps after col 2
        let pos: Vec<(u32, u32)> = placed.iter().map(|p| (p.row, p.column)).collect();
        assert_eq!(pos, vec![(2, 1), (2, 2), (3, 0), (3, 1), (3, 2)]);
        assert_eq!(placed[0].top, 2 * 166);
        assert_eq!(placed[0].left, 72 + 166);
        assert_eq!(placed[2].left, 72);
        assert_eq!(placed[2].global_index, 9);
    }

    #[test]
    fn placement_carries_atlas_offset() {
        let g = compute_geometry(&GridParams::default(), 642, 100);
        let placed = place_items(&g, 12, &[item(12)]);
        assert_eq!(placed[0].atlas_offset, (-304, -152));
        assert_eq!(placed[0].href, "http://o/images/s/12.jpg");
    }
}
