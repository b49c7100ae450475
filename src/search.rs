//! Lowest-top placement search for a single item.
//!
//! The search walks candidate base heights from the floor upwards. At each
//! height it tries every distinct orientation of the item at every anchor the
//! candidate generator proposes, keeps the placement whose top ends lowest,
//! and breaks ties by a contact score that prefers the back-left region and
//! positions flush against walls and neighbours.
//!
//! Heights are visited in ascending order, so once the current height is at or
//! above the best top found so far nothing later can win and the walk stops.

use serde::Serialize;
use utoipa::ToSchema;

use crate::candidates::anchor_points;
use crate::geometry::{footprint_overlap, side_face_contacts};
use crate::ledger::Ledger;
use crate::model::{Container, Item, PlacedItem};
use crate::optimizer::PackingConfig;
use crate::orientation::{self, Orientation};
use crate::support::{is_valid, level_admits};
use crate::types::{BOUNDS_EPSILON, LEVEL_EPSILON, Vec3, round_to};

/// Decimal places to which top heights are compared.
const TOP_DECIMALS: i32 = 2;

/// Where a committed item ended up resting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlacementTag {
    Floor,
    Shelf,
    Stacked,
}

impl std::fmt::Display for PlacementTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlacementTag::Floor => write!(f, "floor"),
            PlacementTag::Shelf => write!(f, "shelf"),
            PlacementTag::Stacked => write!(f, "stacked"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Best {
    top: f64,
    score: f64,
    orientation: Orientation,
    position: Vec3,
    dims: Vec3,
}

impl Best {
    /// Strictly lower top wins; equal tops fall back to the lower score.
    fn is_beaten_by(&self, top: f64, score: f64) -> bool {
        top < self.top || (top == self.top && score < self.score)
    }
}

/// Candidate base heights, ascending and unique: the floor, every shelf
/// level, and the top of every placed item (rounded to 0.01 cm).
pub fn height_levels(ledger: &Ledger) -> Vec<f64> {
    let mut levels = vec![0.0];
    levels.extend(ledger.placed().iter().map(|p| round_to(p.top_z(), TOP_DECIMALS)));
    levels.extend(ledger.container().shelf_levels());
    levels.sort_by(f64::total_cmp);
    levels.dedup();
    levels
}

/// Number of container walls the footprint sits flush against (0 to 4).
pub fn wall_contacts(position: Vec3, dims: Vec3, container: &Container) -> u32 {
    let flush = [
        position.x < LEVEL_EPSILON,
        position.y < LEVEL_EPSILON,
        (position.x + dims.x - container.length).abs() < LEVEL_EPSILON,
        (position.y + dims.y - container.width).abs() < LEVEL_EPSILON,
    ];
    flush.iter().filter(|&&touching| touching).count() as u32
}

/// Number of side faces flush against already placed items.
pub fn neighbor_contacts(position: Vec3, dims: Vec3, ledger: &Ledger) -> u32 {
    ledger
        .placed()
        .iter()
        .map(|p| side_face_contacts(position, dims, p, LEVEL_EPSILON))
        .sum()
}

/// Tie-break score; lower is better.
///
/// `2·y + x − wall_bonus·walls − neighbor_bonus·neighbours`
pub fn placement_score(position: Vec3, dims: Vec3, ledger: &Ledger, config: &PackingConfig) -> f64 {
    let walls = wall_contacts(position, dims, ledger.container());
    let neighbours = neighbor_contacts(position, dims, ledger);
    2.0 * position.y + position.x
        - config.wall_contact_bonus * f64::from(walls)
        - config.neighbor_contact_bonus * f64::from(neighbours)
}

/// Finds the lowest-resting valid placement of `item` in the current ledger.
///
/// Returns `None` if no orientation fits anywhere this round.
pub fn find_best_placement(
    item: &Item,
    ledger: &Ledger,
    config: &PackingConfig,
) -> Option<PlacedItem> {
    let container = ledger.container();
    let variants = orientation::variants(item);
    let mut best: Option<Best> = None;

    for z in height_levels(ledger) {
        if best.is_some_and(|b| z >= b.top) {
            break;
        }
        if !level_admits(item, z, container) {
            continue;
        }

        for variant in &variants {
            let top = z + variant.dims.z;
            if top > container.height + BOUNDS_EPSILON {
                continue;
            }
            if best.is_some_and(|b| top > b.top + BOUNDS_EPSILON) {
                continue;
            }
            let rounded_top = round_to(top, TOP_DECIMALS);

            for (x, y) in anchor_points(ledger, variant.dims.x, variant.dims.y, z, config) {
                let position = Vec3::new(x, y, z);
                if !is_valid(position, variant.dims, ledger, item, config) {
                    continue;
                }
                let score = placement_score(position, variant.dims, ledger, config);
                if best.is_none_or(|b| b.is_beaten_by(rounded_top, score)) {
                    best = Some(Best {
                        top: rounded_top,
                        score,
                        orientation: variant.orientation,
                        position,
                        dims: variant.dims,
                    });
                }
            }
        }
    }

    best.map(|b| PlacedItem::new(item.clone(), b.orientation, b.position, b.dims))
}

/// Classifies a placement that is about to be committed.
///
/// Must be called before `candidate` is added to `ledger`. A placement on a
/// shelf level counts as stacked when some item's top face at that level lies
/// under its footprint.
pub fn classify_placement(candidate: &PlacedItem, ledger: &Ledger) -> PlacementTag {
    let z = candidate.bottom_z();
    if z < LEVEL_EPSILON {
        return PlacementTag::Floor;
    }
    if ledger.container().shelf_level_at(z, LEVEL_EPSILON).is_none() {
        return PlacementTag::Stacked;
    }

    let resting_on_item = ledger.placed().iter().any(|p| {
        (p.top_z() - z).abs() < LEVEL_EPSILON
            && footprint_overlap(candidate.position, candidate.dims, p) > 0.0
    });
    if resting_on_item {
        PlacementTag::Stacked
    } else {
        PlacementTag::Shelf
    }
}
