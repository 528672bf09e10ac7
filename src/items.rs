//! Item descriptors and the sparse global item list.

use serde::{Deserialize, Serialize};

/// One entry of a segment manifest (`entry_index.json`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub w: u32,
    pub h: u32,
    /// Offset of the thumbnail inside the segment's composite image.
    pub x: u32,
    pub y: u32,
}

/// A fully resolved item, addressable by its global index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDescriptor {
    pub src: String,
    pub width: u32,
    pub height: u32,
    pub atlas_x: u32,
    pub atlas_y: u32,
    pub atlas_src: String,
    pub global_index: usize,
}

/// Fixed-length list with one slot per item in the collection.
///
/// Slots start empty and are filled as segments load. A later load for the
/// same index replaces the slot; values are deterministic per index so this
/// is equivalent to keeping the first.
#[derive(Debug, Default)]
pub struct GlobalItemList {
    slots: Vec<Option<ItemDescriptor>>,
    filled: usize,
}

impl GlobalItemList {
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: vec![None; len],
            filled: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ItemDescriptor> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    pub fn is_loaded(&self, idx: usize) -> bool {
        self.get(idx).is_some()
    }

    /// Number of populated slots.
    pub fn loaded_count(&self) -> usize {
        self.filled
    }

    /// Store `item` at its global index. Returns false (and drops the item)
    /// when the index is outside the list.
    pub fn put(&mut self, item: ItemDescriptor) -> bool {
        let Some(slot) = self.slots.get_mut(item.global_index) else {
            return false;
        };
        if slot.is_none() {
            self.filled += 1;
        }
        *slot = Some(item);
        true
    }
}
