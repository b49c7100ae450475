//! Geometric helpers for collision and contact tests between placed items.
//!
//! All functions work on the oriented extents of `PlacedItem`s or on a raw
//! (position, dims) candidate that has not been committed yet.

use crate::model::PlacedItem;
use crate::types::{BoundingBox, Vec3};

/// Checks whether two placed items share positive volume.
///
/// Uses axis-aligned bounding boxes; touching faces are not a collision.
pub fn intersects(a: &PlacedItem, b: &PlacedItem) -> bool {
    a.bounding_box().intersects(&b.bounding_box())
}

/// Checks whether a candidate box collides with a placed item.
pub fn candidate_intersects(position: Vec3, dims: Vec3, placed: &PlacedItem) -> bool {
    BoundingBox::from_position_and_dims(position, dims).intersects(&placed.bounding_box())
}

/// Length of the overlap of two intervals, at least 0.0.
///
/// # Example
/// ```
/// use roll_pack::geometry::overlap_1d;
///
/// assert_eq!(overlap_1d(0.0, 5.0, 3.0, 8.0), 2.0);
/// assert_eq!(overlap_1d(0.0, 5.0, 6.0, 8.0), 0.0);
/// ```
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// True if the open intervals `(a1, a2)` and `(b1, b2)` overlap.
#[inline]
pub fn intervals_overlap(a1: f64, a2: f64, b1: f64, b2: f64) -> bool {
    a1.max(b1) < a2.min(b2)
}

/// Area of the XY projection shared by a candidate footprint and a placed item.
pub fn footprint_overlap(position: Vec3, dims: Vec3, placed: &PlacedItem) -> f64 {
    BoundingBox::from_position_and_dims(position, dims).overlap_area_xy(&placed.bounding_box())
}

/// Number of side faces of the candidate that sit flush against `placed`.
///
/// A face counts when the two boxes share some height range, the faces are
/// within `tolerance` of each other, and their extents overlap along the
/// perpendicular horizontal axis. At most one face per axis is counted.
pub fn side_face_contacts(position: Vec3, dims: Vec3, placed: &PlacedItem, tolerance: f64) -> u32 {
    let (x, y, z) = position.as_tuple();
    let (l, w, h) = dims.as_tuple();
    let other = placed.bounding_box();

    if !intervals_overlap(z, z + h, other.min.z, other.max.z) {
        return 0;
    }

    let mut contacts = 0;
    let touches_x =
        (x + l - other.min.x).abs() < tolerance || (other.max.x - x).abs() < tolerance;
    if touches_x && intervals_overlap(y, y + w, other.min.y, other.max.y) {
        contacts += 1;
    }
    let touches_y =
        (y + w - other.min.y).abs() < tolerance || (other.max.y - y).abs() < tolerance;
    if touches_y && intervals_overlap(x, x + l, other.min.x, other.max.x) {
        contacts += 1;
    }
    contacts
}
