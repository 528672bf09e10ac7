//! Windowing resolver: target global index → segment window to load.
//!
//! The window is always two segments, newest first: the cursor segment and
//! its older neighbor. If the target lies in the oldest segment, the cursor
//! moves one segment newer so the pair still covers the target. A
//! one-segment directory yields a one-segment window.

use log::trace;

use crate::directory::SegmentDirectory;

/// Number of segments loaded per window.
pub const WINDOW_SEGMENTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentWindow {
    /// Sorted position of the window's newest segment.
    pub cursor: usize,
    /// Global index of the cursor segment's first item.
    pub start_offset: usize,
    /// Sorted segment positions in merge order (newest first).
    pub segments: Vec<usize>,
}

impl SegmentWindow {
    /// Global index range covered once every window segment is loaded.
    pub fn covered(&self, dir: &SegmentDirectory) -> std::ops::Range<usize> {
        let len: usize = self.segments.iter().map(|&k| dir.segment(k).count).sum();
        self.start_offset..self.start_offset + len
    }
}

/// Sorted position of the segment whose range contains `target`.
///
/// `target` is clamped to the last item. Returns `None` for an empty
/// collection.
pub fn owning_segment(dir: &SegmentDirectory, target: usize) -> Option<usize> {
    if dir.total() == 0 {
        return None;
    }
    let target = target.min(dir.total() - 1);
    let mut start = 0;
    for k in (0..dir.len()).rev() {
        let count = dir.segment(k).count;
        if target < start + count {
            return Some(k);
        }
        start += count;
    }
    None
}

/// Resolve the segment window for `target`.
pub fn resolve(dir: &SegmentDirectory, target: usize) -> Option<SegmentWindow> {
    let owner = owning_segment(dir, target)?;
    let cursor = if owner + 1 < WINDOW_SEGMENTS {
        (WINDOW_SEGMENTS - 1).min(dir.len() - 1)
    } else {
        owner
    };
    let oldest = cursor.saturating_sub(WINDOW_SEGMENTS - 1);
    let segments: Vec<usize> = (oldest..=cursor).rev().collect();
    let window = SegmentWindow {
        cursor,
        start_offset: dir.start_of(cursor),
        segments,
    };
    trace!(
        "window: target={target} owner={owner} cursor={} start={} segments={:?}",
        window.cursor, window.start_offset, window.segments
    );
    Some(window)
}
