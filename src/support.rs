//! Validity and support rules for a candidate placement.
//!
//! A candidate is valid when it fits the container, collides with nothing,
//! does not pass through a shelf level that is already in use, and rests on
//! the floor, on a clear shelf, or on enough non-fragile top faces.

use crate::geometry::{candidate_intersects, footprint_overlap};
use crate::ledger::Ledger;
use crate::model::{Container, Item};
use crate::optimizer::PackingConfig;
use crate::types::{BOUNDS_EPSILON, BoundingBox, LEVEL_EPSILON, SHELF_CLEARANCE, Vec3};

/// Decides whether `item` may rest at `position` with extents `dims`.
///
/// Short-circuits in order: level gate for fragile items, bounds, overlap,
/// shelf spanning, support.
pub fn is_valid(
    position: Vec3,
    dims: Vec3,
    ledger: &Ledger,
    item: &Item,
    config: &PackingConfig,
) -> bool {
    let container = ledger.container();
    level_admits(item, position.z, container)
        && within_bounds(position, dims, container)
        && !overlaps_any(position, dims, ledger)
        && !spans_occupied_shelf(position.z, dims.z, ledger)
        && is_supported(position, dims, ledger, config)
}

/// Fragile items only ever go on the floor or exactly onto a shelf level.
pub fn level_admits(item: &Item, z: f64, container: &Container) -> bool {
    if !item.fragile || z <= LEVEL_EPSILON {
        return true;
    }
    container.shelf_level_at(z, LEVEL_EPSILON).is_some()
}

pub fn within_bounds(position: Vec3, dims: Vec3, container: &Container) -> bool {
    BoundingBox::from_position_and_dims(position, dims).is_within(&container.extent(), BOUNDS_EPSILON)
}

pub fn overlaps_any(position: Vec3, dims: Vec3, ledger: &Ledger) -> bool {
    ledger
        .placed()
        .iter()
        .any(|placed| candidate_intersects(position, dims, placed))
}

/// True if `(z, z + height)` passes through a shelf level something rests on.
///
/// A shelf counts as passed through when it lies more than the shelf
/// clearance inside the vertical extent on both ends.
pub fn spans_occupied_shelf(z: f64, height: f64, ledger: &Ledger) -> bool {
    let top = z + height;
    ledger
        .container()
        .shelf_levels()
        .filter(|&level| z + SHELF_CLEARANCE < level && level < top - SHELF_CLEARANCE)
        .any(|level| {
            ledger
                .placed()
                .iter()
                .any(|p| (p.bottom_z() - level).abs() < SHELF_CLEARANCE)
        })
}

/// True if no placed item straddles `level`, so a shelf can be inserted there.
pub fn shelf_is_clear(level: f64, ledger: &Ledger) -> bool {
    let probe = level - SHELF_CLEARANCE;
    !ledger
        .placed()
        .iter()
        .any(|p| p.bottom_z() < probe && probe < p.top_z())
}

/// Footprint area resting on non-fragile top faces at height `position.z`.
pub fn supported_area(position: Vec3, dims: Vec3, ledger: &Ledger) -> f64 {
    ledger
        .placed()
        .iter()
        .filter(|p| !p.item.fragile)
        .filter(|p| (p.top_z() - position.z).abs() <= LEVEL_EPSILON)
        .map(|p| footprint_overlap(position, dims, p))
        .sum()
}

/// Checks whether the candidate is carried by the floor, a clear shelf, or
/// at least `support_ratio` of its footprint on non-fragile items.
pub fn is_supported(position: Vec3, dims: Vec3, ledger: &Ledger, config: &PackingConfig) -> bool {
    let z = position.z;
    if z.abs() < BOUNDS_EPSILON {
        return true;
    }

    if let Some(level) = ledger.container().shelf_level_at(z, BOUNDS_EPSILON) {
        if shelf_is_clear(level, ledger) {
            return true;
        }
    }

    supported_area(position, dims, ledger) >= dims.base_area() * config.support_ratio
}
