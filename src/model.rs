//! Data models for roll-container loading.
//!
//! This module defines the fundamental data structures of the engine:
//! - `Container`: the rigid roll container with its shelf grid and weight limit
//! - `Item`: an object to be loaded, either a cuboid or a cylinder
//! - `PlacedItem`: an item committed to a position and orientation

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::collections::HashSet;
use std::f64::consts::PI;
use utoipa::ToSchema;

use crate::error::{PackError, Result};
use crate::orientation::{CuboidOrientation, CylinderOrientation, Orientation};
use crate::types::{BoundingBox, Vec3, validation};

/// The roll container being loaded.
///
/// Shelves may be inserted at every multiple of `shelf_interval` up to the
/// container height. All lengths are in cm, weights in kg.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Roll Container",
    "length": 100.0,
    "width": 80.0,
    "height": 170.0,
    "max_weight": 300.0,
    "shelf_interval": 20.0
}))]
pub struct Container {
    #[serde(default)]
    pub name: Option<String>,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub max_weight: f64,
    pub shelf_interval: f64,
}

impl Container {
    pub const STANDARD_LENGTH: f64 = 100.0;
    pub const STANDARD_WIDTH: f64 = 80.0;
    pub const STANDARD_HEIGHT: f64 = 170.0;
    pub const STANDARD_MAX_WEIGHT: f64 = 300.0;
    pub const STANDARD_SHELF_INTERVAL: f64 = 20.0;

    /// Creates a container after validating its parameters.
    ///
    /// # Examples
    /// ```
    /// use roll_pack::model::Container;
    ///
    /// assert!(Container::new(100.0, 80.0, 170.0, 300.0, 20.0).is_ok());
    /// assert!(Container::new(100.0, 80.0, 170.0, 300.0, 200.0).is_err());
    /// ```
    pub fn new(
        length: f64,
        width: f64,
        height: f64,
        max_weight: f64,
        shelf_interval: f64,
    ) -> Result<Self> {
        let container = Self {
            name: None,
            length,
            width,
            height,
            max_weight,
            shelf_interval,
        };
        container.validate()?;
        Ok(container)
    }

    /// The standard 100 × 80 × 170 cm roll container, 300 kg, shelves every 20 cm.
    pub fn standard() -> Self {
        Self {
            name: Some("Standard Roll Container".to_string()),
            length: Self::STANDARD_LENGTH,
            width: Self::STANDARD_WIDTH,
            height: Self::STANDARD_HEIGHT,
            max_weight: Self::STANDARD_MAX_WEIGHT,
            shelf_interval: Self::STANDARD_SHELF_INTERVAL,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Checks dimensions, weight limit and shelf interval.
    pub fn validate(&self) -> Result<()> {
        validation::validate_dimensions_3d((self.length, self.width, self.height))
            .map_err(PackError::InvalidContainer)?;
        validation::validate_dimension(self.max_weight, "Max weight")
            .map_err(PackError::InvalidContainer)?;
        validation::validate_dimension(self.shelf_interval, "Shelf interval")
            .map_err(PackError::InvalidContainer)?;
        if self.shelf_interval > self.height {
            return Err(PackError::InvalidContainer(format!(
                "Shelf interval {} exceeds container height {}",
                self.shelf_interval, self.height
            )));
        }
        Ok(())
    }

    /// Inner extents as a vector.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }

    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// Heights of all possible shelves, ascending, excluding the floor.
    pub fn shelf_levels(&self) -> impl Iterator<Item = f64> + '_ {
        let count = (self.height / self.shelf_interval).floor() as u32;
        (1..=count).map(move |k| k as f64 * self.shelf_interval)
    }

    /// Returns the shelf level `z` lies on, if it is within `tolerance` of one.
    pub fn shelf_level_at(&self, z: f64, tolerance: f64) -> Option<f64> {
        let index = (z / self.shelf_interval).round();
        if index < 1.0 {
            return None;
        }
        let level = index * self.shelf_interval;
        ((z - level).abs() < tolerance).then_some(level)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::standard()
    }
}

/// Geometry of an item together with the orientations it may be loaded in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Cuboid {
        length: f64,
        width: f64,
        height: f64,
        orientations: Vec<CuboidOrientation>,
    },
    Cylinder {
        diameter: f64,
        height: f64,
        orientations: Vec<CylinderOrientation>,
    },
}

impl Shape {
    /// Canonical `(l, w, h)`; a cylinder reports `(d, d, h)`.
    pub fn dimensions(&self) -> Vec3 {
        match self {
            Shape::Cuboid {
                length,
                width,
                height,
                ..
            } => Vec3::new(*length, *width, *height),
            Shape::Cylinder {
                diameter, height, ..
            } => Vec3::new(*diameter, *diameter, *height),
        }
    }

    /// True material volume (cylinders are not counted as their bounding box).
    pub fn volume(&self) -> f64 {
        match self {
            Shape::Cuboid {
                length,
                width,
                height,
                ..
            } => length * width * height,
            Shape::Cylinder {
                diameter, height, ..
            } => {
                let radius = diameter / 2.0;
                PI * radius * radius * height
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Cuboid { .. } => "cuboid",
            Shape::Cylinder { .. } => "cylinder",
        }
    }

    fn orientation_count(&self) -> usize {
        match self {
            Shape::Cuboid { orientations, .. } => orientations.len(),
            Shape::Cylinder { orientations, .. } => orientations.len(),
        }
    }
}

/// An object to be loaded.
///
/// Fragile items may only rest on the floor or on a shelf and never carry
/// anything on top.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "BEV001",
    "name": "Water Crate 6x1.5L",
    "shape": {
        "kind": "cuboid",
        "length": 40.0,
        "width": 30.0,
        "height": 25.0,
        "orientations": ["bottom", "top"]
    },
    "weight": 10.5,
    "fragile": false
}))]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub shape: Shape,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub fragile: bool,
}

impl Item {
    /// Creates a cuboid item with canonical `(length, width, height)`.
    pub fn cuboid(
        id: impl Into<String>,
        dims: (f64, f64, f64),
        orientations: Vec<CuboidOrientation>,
        weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            shape: Shape::Cuboid {
                length: dims.0,
                width: dims.1,
                height: dims.2,
                orientations,
            },
            weight,
            fragile: false,
        }
    }

    /// Creates an upright cylinder item.
    pub fn cylinder(
        id: impl Into<String>,
        diameter: f64,
        height: f64,
        orientations: Vec<CylinderOrientation>,
        weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            shape: Shape::Cylinder {
                diameter,
                height,
                orientations,
            },
            weight,
            fragile: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_fragile(mut self, fragile: bool) -> Self {
        self.fragile = fragile;
        self
    }

    /// Label for log output: the name if present, otherwise the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn dimensions(&self) -> Vec3 {
        self.shape.dimensions()
    }

    pub fn volume(&self) -> f64 {
        self.shape.volume()
    }

    /// Canonical footprint `l × w`, used by the ordering strategies.
    pub fn footprint_area(&self) -> f64 {
        self.dimensions().base_area()
    }

    /// Checks dimensions, weight and orientation set.
    pub fn validate(&self) -> Result<()> {
        let dims = self.dimensions();
        validation::validate_dimensions_3d(dims.as_tuple())
            .map_err(|reason| PackError::invalid_item(&self.id, reason))?;
        validation::validate_weight(self.weight)
            .map_err(|reason| PackError::invalid_item(&self.id, reason))?;
        if self.shape.orientation_count() == 0 {
            return Err(PackError::invalid_item(
                &self.id,
                "At least one allowed orientation is required",
            ));
        }
        Ok(())
    }
}

/// Validates a catalog: every item on its own, plus unique ids.
pub fn validate_items(items: &[Item]) -> Result<()> {
    let mut ids = HashSet::with_capacity(items.len());
    for item in items {
        item.validate()?;
        if !ids.insert(item.id.as_str()) {
            return Err(PackError::DuplicateItemId(item.id.clone()));
        }
    }
    Ok(())
}

/// An item committed to the container.
///
/// Only the ledger creates these; once committed they are never modified.
///
/// # Fields
/// * `item` - The loaded item
/// * `orientation` - Face that rests down
/// * `position` - Lower corner (x, y, z) in the container
/// * `dims` - Oriented extents (length, width, height)
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedItem {
    pub item: Item,
    pub orientation: Orientation,
    pub position: Vec3,
    pub dims: Vec3,
}

impl PlacedItem {
    pub fn new(item: Item, orientation: Orientation, position: Vec3, dims: Vec3) -> Self {
        Self {
            item,
            orientation,
            position,
            dims,
        }
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(self.position, self.dims)
    }

    /// Z coordinate of the resting face.
    #[inline]
    pub fn bottom_z(&self) -> f64 {
        self.position.z
    }

    /// Z coordinate of the upper face.
    #[inline]
    pub fn top_z(&self) -> f64 {
        self.position.z + self.dims.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_rejects_bad_shelf_interval() {
        assert!(matches!(
            Container::new(100.0, 80.0, 170.0, 300.0, 0.0),
            Err(PackError::InvalidContainer(_))
        ));
        assert!(matches!(
            Container::new(100.0, 80.0, 170.0, 300.0, 171.0),
            Err(PackError::InvalidContainer(_))
        ));
        assert!(Container::new(100.0, 80.0, 170.0, 300.0, 170.0).is_ok());
    }

    #[test]
    fn container_name_is_optional_in_json() {
        let container: Container = serde_json::from_str(
            r#"{"length": 50.0, "width": 40.0, "height": 60.0, "max_weight": 20.0, "shelf_interval": 15.0}"#,
        )
        .expect("valid container JSON");
        assert_eq!(container.name, None);
        assert!(container.validate().is_ok());
        assert_eq!(container.with_name("Cage").name.as_deref(), Some("Cage"));
    }

    #[test]
    fn container_rejects_non_positive_dimensions() {
        assert!(Container::new(0.0, 80.0, 170.0, 300.0, 20.0).is_err());
        assert!(Container::new(100.0, -1.0, 170.0, 300.0, 20.0).is_err());
        assert!(Container::new(100.0, 80.0, 170.0, 0.0, 20.0).is_err());
    }

    #[test]
    fn shelf_levels_stop_below_the_roof() {
        let levels: Vec<f64> = Container::standard().shelf_levels().collect();
        assert_eq!(levels.len(), 8);
        assert_eq!(levels.first(), Some(&20.0));
        assert_eq!(levels.last(), Some(&160.0));
    }

    #[test]
    fn shelf_level_lookup_respects_tolerance() {
        let container = Container::standard();
        assert_eq!(container.shelf_level_at(40.05, 0.1), Some(40.0));
        assert_eq!(container.shelf_level_at(40.05, 0.01), None);
        assert_eq!(container.shelf_level_at(0.0, 0.1), None);
        assert_eq!(container.shelf_level_at(29.0, 0.1), None);
    }

    #[test]
    fn cylinder_volume_uses_circular_base() {
        let item = Item::cylinder("CYL", 20.0, 35.0, vec![CylinderOrientation::Bottom], 4.5);
        let expected = PI * 10.0 * 10.0 * 35.0;
        assert!((item.volume() - expected).abs() < 1e-9);
        assert_eq!(item.dimensions(), Vec3::new(20.0, 20.0, 35.0));
    }

    #[test]
    fn item_validation_rejects_empty_orientation_set() {
        let item = Item::cuboid("X", (10.0, 10.0, 10.0), Vec::new(), 1.0);
        assert!(matches!(
            item.validate(),
            Err(PackError::InvalidItem { ref id, .. }) if id == "X"
        ));
    }

    #[test]
    fn item_validation_allows_zero_weight() {
        let item = Item::cuboid("X", (10.0, 10.0, 10.0), vec![CuboidOrientation::Bottom], 0.0);
        assert!(item.validate().is_ok());

        let heavy = Item::cuboid("Y", (10.0, 0.0, 10.0), vec![CuboidOrientation::Bottom], 1.0);
        assert!(heavy.validate().is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let a = Item::cuboid("A", (10.0, 10.0, 10.0), vec![CuboidOrientation::Bottom], 1.0);
        let items = vec![a.clone(), a];
        assert_eq!(
            validate_items(&items),
            Err(PackError::DuplicateItemId("A".to_string()))
        );
    }

    #[test]
    fn item_deserializes_with_defaults() {
        let item: Item = serde_json::from_str(
            r#"{
                "id": "CYL002",
                "shape": {"kind": "cylinder", "diameter": 25.0, "height": 40.0, "orientations": ["B", "M"]}
            }"#,
        )
        .expect("valid item JSON");
        assert_eq!(item.weight, 0.0);
        assert!(!item.fragile);
        assert_eq!(item.shape.kind(), "cylinder");
        assert_eq!(item.label(), "CYL002");
    }
}
