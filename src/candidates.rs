//! Anchor generation for one footprint at one height.
//!
//! Anchors are the (x, y) positions of the lower-left corner the search will
//! try. They come from the container corners, from the edges of items that
//! start or end at the target height, from a dense sweep along the walls and
//! from a coarse interior grid.

use std::collections::HashSet;

use crate::ledger::Ledger;
use crate::optimizer::PackingConfig;
use crate::types::{BOUNDS_EPSILON, LEVEL_EPSILON, quantize};

/// Resolution at which two anchors are considered the same.
pub const ANCHOR_RESOLUTION: f64 = 0.1;

/// Insertion-ordered anchor set that only admits in-bounds positions.
struct AnchorSet {
    length: f64,
    width: f64,
    max_x: f64,
    max_y: f64,
    seen: HashSet<(i64, i64)>,
    anchors: Vec<(f64, f64)>,
}

impl AnchorSet {
    fn new(container_length: f64, container_width: f64, length: f64, width: f64) -> Self {
        Self {
            length,
            width,
            max_x: container_length,
            max_y: container_width,
            seen: HashSet::new(),
            anchors: Vec::new(),
        }
    }

    fn add(&mut self, x: f64, y: f64) {
        if x < 0.0
            || y < 0.0
            || x + self.length > self.max_x + BOUNDS_EPSILON
            || y + self.width > self.max_y + BOUNDS_EPSILON
        {
            return;
        }
        let key = (quantize(x, ANCHOR_RESOLUTION), quantize(y, ANCHOR_RESOLUTION));
        if self.seen.insert(key) {
            self.anchors.push((x, y));
        }
    }

    fn into_sorted(mut self) -> Vec<(f64, f64)> {
        self.anchors
            .sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.total_cmp(&b.0)));
        self.anchors
    }
}

/// Positions `0, step, 2·step, …` up to `limit`, where `limit` is the free
/// span truncated to whole centimetres. Empty if the footprint does not fit.
fn sweep(span: f64, step: f64) -> impl Iterator<Item = f64> {
    let step = step.max(PackingConfig::MIN_SEARCH_STEP);
    let limit = span.trunc();
    let count = if limit < 0.0 {
        0
    } else {
        (limit / step).floor() as u64 + 1
    };
    (0..count).map(move |i| i as f64 * step)
}

/// Anchors for a footprint of `length × width` whose base sits at height `z`.
///
/// The result is deduplicated at 0.1 cm, contains only anchors with the
/// footprint inside the container, and is ordered by `(y, x)` ascending.
pub fn anchor_points(
    ledger: &Ledger,
    length: f64,
    width: f64,
    z: f64,
    config: &PackingConfig,
) -> Vec<(f64, f64)> {
    let container = ledger.container();
    let free_x = container.length - length;
    let free_y = container.width - width;
    let mut set = AnchorSet::new(container.length, container.width, length, width);

    set.add(0.0, 0.0);
    set.add(free_x, 0.0);
    set.add(0.0, free_y);
    set.add(free_x, free_y);

    for placed in ledger.placed() {
        let bounds = placed.bounding_box();
        let (px, py) = (bounds.min.x, bounds.min.y);
        let (pmx, pmy) = (bounds.max.x, bounds.max.y);

        // Item standing at this level: slot in beside it.
        if (bounds.min.z - z).abs() < LEVEL_EPSILON {
            set.add(pmx, py);
            set.add(px, pmy);
            set.add(pmx, pmy);
            set.add(pmx, 0.0);
            set.add(0.0, pmy);
        }

        // Item ending at this level: sit on it.
        if (bounds.max.z - z).abs() < LEVEL_EPSILON {
            set.add(px, py);
            set.add(pmx, py);
            set.add(px, pmy);
            set.add(pmx, pmy);
            set.add(
                px + (pmx - px - length) / 2.0,
                py + (pmy - py - width) / 2.0,
            );
        }
    }

    for x in sweep(free_x, config.wall_step) {
        set.add(x, 0.0);
        set.add(x, free_y);
    }
    for y in sweep(free_y, config.wall_step) {
        set.add(0.0, y);
        set.add(free_x, y);
    }

    for x in sweep(free_x, config.grid_step) {
        for y in sweep(free_y, config.grid_step) {
            set.add(x, y);
        }
    }

    set.into_sorted()
}
