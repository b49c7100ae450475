//! Common types and tolerances for 3D geometry.
//!
//! Every geometric comparison in the engine goes through one of the three
//! tolerance constants below. Mixing ad hoc epsilons between the overlap check
//! and the shelf/support checks silently breaks the support invariant.

use std::ops::Add;

use crate::geometry::overlap_1d;

/// Tolerance for container bounds and box overlap checks (cm).
pub const BOUNDS_EPSILON: f64 = 0.01;

/// Tolerance for matching heights and levels (cm).
///
/// Used when a top face is compared with a target level, for wall and
/// neighbour contact, and for fragile shelf gating.
pub const LEVEL_EPSILON: f64 = 0.1;

/// Clearance used for shelf occupancy and shelf straddling checks (cm).
pub const SHELF_CLEARANCE: f64 = 0.5;

/// Represents a 3D vector or point in space.
///
/// Used for positions and oriented dimensions. `x` runs along the container
/// length, `y` along its width, `z` upwards.
///
/// # Examples
/// ```
/// use roll_pack::types::Vec3;
///
/// let position = Vec3::new(1.0, 2.0, 3.0);
/// let dimensions = Vec3::new(10.0, 20.0, 30.0);
/// let far_corner = position + dimensions;
/// assert_eq!(far_corner, Vec3::new(11.0, 22.0, 33.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Converts to tuple format for API compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Creates from tuple format.
    #[inline]
    pub const fn from_tuple(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    /// Product of all components. Meaningful for dimension vectors.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Footprint area (X × Y).
    #[inline]
    pub fn base_area(&self) -> f64 {
        self.x * self.y
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    #[inline]
    pub fn fits_within(&self, container: &Self, tolerance: f64) -> bool {
        self.x <= container.x + tolerance
            && self.y <= container.y + tolerance
            && self.z <= container.z + tolerance
    }

    /// Same vector with the two horizontal components swapped.
    #[inline]
    pub const fn quarter_turn(&self) -> Self {
        Self::new(self.y, self.x, self.z)
    }

    /// Key for deduplicating dimension triples at a fixed resolution.
    #[inline]
    pub fn quantized(&self, resolution: f64) -> (i64, i64, i64) {
        (
            quantize(self.x, resolution),
            quantize(self.y, resolution),
            quantize(self.z, resolution),
        )
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Rounds `value` to a multiple of `resolution` and returns the multiple.
///
/// Used as a hash/ordering key wherever values must compare equal after
/// rounding (anchor and orientation-variant deduplication).
#[inline]
pub fn quantize(value: f64, resolution: f64) -> i64 {
    (value / resolution).round() as i64
}

/// Rounds `value` to `decimals` decimal places.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Represents an Axis-Aligned Bounding Box (AABB).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + dimensions)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a bounding box from position and dimensions.
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Checks if two bounding boxes share positive volume.
    ///
    /// Boxes that only touch along a face do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
            || self.max.z <= other.min.z
            || other.max.z <= self.min.z)
    }

    /// Calculates the overlap area of the two XY projections.
    #[inline]
    pub fn overlap_area_xy(&self, other: &Self) -> f64 {
        let overlap_x = overlap_1d(self.min.x, self.max.x, other.min.x, other.max.x);
        let overlap_y = overlap_1d(self.min.y, self.max.y, other.min.y, other.max.y);
        overlap_x * overlap_y
    }

    /// Checks whether the box lies inside `[0, extent]` on every axis.
    #[inline]
    pub fn is_within(&self, extent: &Vec3, tolerance: f64) -> bool {
        self.min.x >= -tolerance
            && self.min.y >= -tolerance
            && self.min.z >= -tolerance
            && self.max.fits_within(extent, tolerance)
    }
}

/// Validation helpers shared by the container and item descriptors.
pub mod validation {

    /// Validates a single dimension.
    ///
    /// # Returns
    /// `Ok(())` for positive finite values, otherwise error text
    pub fn validate_dimension(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        Ok(())
    }

    /// Validates an item weight. Zero is allowed.
    pub fn validate_weight(value: f64) -> Result<(), String> {
        if value.is_nan() {
            return Err("Weight must not be NaN".to_string());
        }
        if value < 0.0 {
            return Err(format!("Weight must not be negative, got: {}", value));
        }
        if value.is_infinite() {
            return Err("Weight must not be infinite".to_string());
        }
        Ok(())
    }

    /// Validates all three dimensions of a 3D object.
    pub fn validate_dimensions_3d(dims: (f64, f64, f64)) -> Result<(), String> {
        validate_dimension(dims.0, "Length")?;
        validate_dimension(dims.1, "Width")?;
        validate_dimension(dims.2, "Height")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(a.quarter_turn(), Vec3::new(2.0, 1.0, 3.0));
    }

    #[test]
    fn test_vec3_volume_and_area() {
        let dims = Vec3::new(10.0, 20.0, 30.0);
        assert!((dims.volume() - 6000.0).abs() < EPS);
        assert!((dims.base_area() - 200.0).abs() < EPS);
    }

    #[test]
    fn test_quantize_merges_close_values() {
        assert_eq!(quantize(12.34, 0.1), quantize(12.31, 0.1));
        assert_ne!(quantize(12.34, 0.01), quantize(12.31, 0.01));
        assert_eq!(round_to(19.996, 2), 20.0);
        assert_eq!(round_to(37.123, 2), 37.12);
        assert_eq!(
            Vec3::new(30.004, 20.0, 10.0).quantized(0.01),
            Vec3::new(30.0, 20.0, 10.0).quantized(0.01)
        );
    }

    #[test]
    fn test_bounding_box_touching_faces_do_not_intersect() {
        let a = BoundingBox::from_position_and_dims(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
        let touching = BoundingBox::from_position_and_dims(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 10.0, 10.0),
        );
        let overlapping = BoundingBox::from_position_and_dims(
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::new(10.0, 10.0, 10.0),
        );

        assert!(!a.intersects(&touching));
        assert!(a.intersects(&overlapping));
    }

    #[test]
    fn test_bounding_box_overlap_area() {
        let a = BoundingBox::from_position_and_dims(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
        let b = BoundingBox::from_position_and_dims(
            Vec3::new(5.0, 5.0, 0.0),
            Vec3::new(10.0, 10.0, 10.0),
        );

        assert!((a.overlap_area_xy(&b) - 25.0).abs() < EPS);
    }

    #[test]
    fn test_bounding_box_within_extent() {
        let extent = Vec3::new(100.0, 80.0, 170.0);
        let inside = BoundingBox::from_position_and_dims(
            Vec3::new(40.0, 40.0, 150.0),
            Vec3::new(60.0, 40.005, 20.0),
        );
        let outside = BoundingBox::from_position_and_dims(
            Vec3::new(41.0, 0.0, 0.0),
            Vec3::new(60.0, 40.0, 20.0),
        );
        let negative = BoundingBox::from_position_and_dims(
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(10.0, 10.0, 10.0),
        );

        assert!(inside.is_within(&extent, BOUNDS_EPSILON));
        assert!(!outside.is_within(&extent, BOUNDS_EPSILON));
        assert!(!negative.is_within(&extent, BOUNDS_EPSILON));
    }

    #[test]
    fn test_validation_dimension() {
        assert!(validation::validate_dimension(10.0, "Length").is_ok());
        assert!(validation::validate_dimension(0.0, "Length").is_err());
        assert!(validation::validate_dimension(-1.0, "Length").is_err());
        assert!(validation::validate_dimension(f64::NAN, "Length").is_err());
        assert!(validation::validate_dimension(f64::INFINITY, "Length").is_err());
    }

    #[test]
    fn test_validation_weight_allows_zero() {
        assert!(validation::validate_weight(10.0).is_ok());
        assert!(validation::validate_weight(0.0).is_ok());
        assert!(validation::validate_weight(-1.0).is_err());
        assert!(validation::validate_weight(f64::NAN).is_err());
    }
}
