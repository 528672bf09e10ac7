#![no_main]

use galleon::directory::SegmentDirectory;
use galleon::loader::parse_manifest;
use galleon::window::{WINDOW_SEGMENTS, resolve};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // Manifest parsing must not panic on arbitrary JSON.
    let _ = parse_manifest(&value);

    let Ok(dir) = SegmentDirectory::from_json(&value) else {
        return;
    };

    // Starts must tile [0, total) from newest to oldest.
    let mut expected = 0;
    for k in (0..dir.len()).rev() {
        assert_eq!(dir.start_of(k), expected, "segment {k} start");
        expected += dir.segment(k).count;
    }
    assert_eq!(expected, dir.total());

    if dir.total() == 0 {
        assert!(resolve(&dir, 0).is_none());
        return;
    }

    // Every probed target must be covered by its window.
    let last = dir.total() - 1;
    let step = (dir.total() / 64).max(1);
    for target in (0..=last).step_by(step).chain([last]) {
        let w = resolve(&dir, target).expect("non-empty directory resolves");
        assert!(
            w.covered(&dir).contains(&target),
            "target {target} not covered by {w:?}"
        );
        assert_eq!(w.segments.len(), WINDOW_SEGMENTS.min(dir.len()));
        assert_eq!(w.segments[0], w.cursor);
    }
});
