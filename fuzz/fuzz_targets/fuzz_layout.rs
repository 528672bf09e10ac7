#![no_main]

use galleon::layout::{GridParams, compute_geometry, target_index};
use libfuzzer_sys::fuzz_target;

fn word(data: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    for (i, b) in data.iter().skip(at).take(4).enumerate() {
        buf[i] = *b;
    }
    u32::from_le_bytes(buf)
}

fuzz_target!(|data: &[u8]| {
    let width = word(data, 0) % 100_000;
    let scroll_top = word(data, 4);
    let total = (word(data, 8) % 10_000_000) as usize;
    let params = GridParams {
        thumbnail_size: 1 + word(data, 12) % 1000,
        thumbnail_margin: word(data, 16) % 100,
        look_behind_rows: word(data, 20) % 50,
        width_bucket: 1 + word(data, 24) % 100,
    };

    let g = compute_geometry(&params, width, total);
    assert!(g.columns >= 1);
    assert!(g.margin_left as u64 * 2 <= g.cell_size as u64);
    assert!(g.total_rows as u64 * g.columns as u64 >= total as u64);
    let rows = (total as u64).div_ceil(g.columns as u64);
    assert_eq!(g.container_height, rows * g.cell_size as u64);

    // The load target never lies below the first visible row.
    let target = target_index(&params, &g, scroll_top);
    let first_visible = (scroll_top / g.cell_size) as u64 * g.columns as u64;
    assert!(target as u64 <= first_visible);
    assert_eq!(target % g.columns as usize, 0);
});
