//! Orientation codes and the shape/orientation resolver.
//!
//! Each shape kind has its own closed set of orientation codes. A code names
//! the face that rests on the floor; resolving it against the canonical
//! dimensions yields the oriented (length, width, height) triple.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::model::{Item, Shape};
use crate::types::Vec3;

/// Resolution used to decide that two oriented shapes are identical.
pub const VARIANT_RESOLUTION: f64 = 0.01;

/// Resting face of a cuboid.
///
/// Deserialization also accepts the single-letter catalog codes
/// (B, O, L, R, V, H).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CuboidOrientation {
    #[serde(alias = "B")]
    Bottom,
    #[serde(alias = "O")]
    Top,
    #[serde(alias = "L")]
    Left,
    #[serde(alias = "R")]
    Right,
    #[serde(alias = "V")]
    Front,
    #[serde(alias = "H")]
    Back,
}

impl CuboidOrientation {
    pub const ALL: [CuboidOrientation; 6] = [
        CuboidOrientation::Bottom,
        CuboidOrientation::Top,
        CuboidOrientation::Left,
        CuboidOrientation::Right,
        CuboidOrientation::Front,
        CuboidOrientation::Back,
    ];

    pub fn code(self) -> &'static str {
        match self {
            CuboidOrientation::Bottom => "bottom",
            CuboidOrientation::Top => "top",
            CuboidOrientation::Left => "left",
            CuboidOrientation::Right => "right",
            CuboidOrientation::Front => "front",
            CuboidOrientation::Back => "back",
        }
    }

    /// Permutes canonical `(l, w, h)` for this resting face.
    ///
    /// Opposite faces produce the same extents; the code is still kept so the
    /// loading instructions say which side goes down.
    pub fn orient(self, length: f64, width: f64, height: f64) -> Vec3 {
        match self {
            CuboidOrientation::Bottom | CuboidOrientation::Top => {
                Vec3::new(length, width, height)
            }
            CuboidOrientation::Left | CuboidOrientation::Right => {
                Vec3::new(height, width, length)
            }
            CuboidOrientation::Front | CuboidOrientation::Back => {
                Vec3::new(length, height, width)
            }
        }
    }
}

/// Resting face of a cylinder.
///
/// Deserialization also accepts the catalog codes B, O and M (lateral surface).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CylinderOrientation {
    #[serde(alias = "B")]
    Bottom,
    #[serde(alias = "O")]
    Top,
    #[serde(alias = "M")]
    Side,
}

impl CylinderOrientation {
    pub const ALL: [CylinderOrientation; 3] = [
        CylinderOrientation::Bottom,
        CylinderOrientation::Top,
        CylinderOrientation::Side,
    ];

    pub fn code(self) -> &'static str {
        match self {
            CylinderOrientation::Bottom => "bottom",
            CylinderOrientation::Top => "top",
            CylinderOrientation::Side => "side",
        }
    }

    /// Standing cylinders keep `(d, d, h)`; lying on the side gives `(h, d, d)`.
    pub fn orient(self, diameter: f64, height: f64) -> Vec3 {
        match self {
            CylinderOrientation::Bottom | CylinderOrientation::Top => {
                Vec3::new(diameter, diameter, height)
            }
            CylinderOrientation::Side => Vec3::new(height, diameter, diameter),
        }
    }
}

/// Orientation of a placed item, tagged by the shape kind it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Orientation {
    Cuboid(CuboidOrientation),
    Cylinder(CylinderOrientation),
}

impl Orientation {
    pub fn code(self) -> &'static str {
        match self {
            Orientation::Cuboid(o) => o.code(),
            Orientation::Cylinder(o) => o.code(),
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One distinct way to set an item down: a representative code plus the
/// resulting extents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientationVariant {
    pub orientation: Orientation,
    pub dims: Vec3,
}

/// Resolves an orientation against a shape.
///
/// Returns `None` when the code belongs to the other shape kind.
pub fn oriented_dimensions(shape: &Shape, orientation: Orientation) -> Option<Vec3> {
    match (shape, orientation) {
        (
            Shape::Cuboid {
                length,
                width,
                height,
                ..
            },
            Orientation::Cuboid(code),
        ) => Some(code.orient(*length, *width, *height)),
        (Shape::Cylinder { diameter, height, .. }, Orientation::Cylinder(code)) => {
            Some(code.orient(*diameter, *height))
        }
        _ => None,
    }
}

/// Allowed orientations of a shape, in catalog order.
pub fn allowed_orientations(shape: &Shape) -> Vec<Orientation> {
    match shape {
        Shape::Cuboid { orientations, .. } => {
            orientations.iter().copied().map(Orientation::Cuboid).collect()
        }
        Shape::Cylinder { orientations, .. } => orientations
            .iter()
            .copied()
            .map(Orientation::Cylinder)
            .collect(),
    }
}

/// All distinct oriented shapes the search should try for `item`.
///
/// Every allowed code contributes its oriented extents and the same extents
/// turned a quarter around the vertical axis. Variants whose three extents
/// agree at 0.01 cm are merged; the first code that produced a shape is the
/// one reported.
pub fn variants(item: &Item) -> Vec<OrientationVariant> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for orientation in allowed_orientations(&item.shape) {
        let Some(dims) = oriented_dimensions(&item.shape, orientation) else {
            continue;
        };
        for candidate in [dims, dims.quarter_turn()] {
            if seen.insert(candidate.quantized(VARIANT_RESOLUTION)) {
                out.push(OrientationVariant {
                    orientation,
                    dims: candidate,
                });
            }
        }
    }

    out
}
