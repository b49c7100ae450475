//! The packing ledger: committed placements of one strategy run.
//!
//! The ledger is append-only. Every commit attempt re-checks the weight limit,
//! container bounds and overlaps, so whatever the search proposes the
//! committed sequence always satisfies the physical invariants.

use thiserror::Error;

use crate::geometry::intersects;
use crate::model::{Container, Item, PlacedItem};
use crate::types::BOUNDS_EPSILON;

/// Why a commit attempt was refused.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommitRejection {
    #[error("item '{id}' would raise the load to {would_be} kg (limit {limit} kg)")]
    WeightExceeded { id: String, would_be: f64, limit: f64 },

    #[error("item '{id}' exceeds the container bounds")]
    OutOfBounds { id: String },

    #[error("item '{id}' overlaps already placed item '{other}'")]
    Overlap { id: String, other: String },
}

/// Placements, leftovers and running weight of one run.
#[derive(Clone, Debug)]
pub struct Ledger {
    container: Container,
    placed: Vec<PlacedItem>,
    unpacked: Vec<Item>,
    total_weight: f64,
}

impl Ledger {
    /// Creates an empty ledger for `container`.
    pub fn new(container: Container) -> Self {
        Self {
            container,
            placed: Vec::new(),
            unpacked: Vec::new(),
            total_weight: 0.0,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Committed placements in loading order.
    pub fn placed(&self) -> &[PlacedItem] {
        &self.placed
    }

    /// Items the run could not place.
    pub fn unpacked(&self) -> &[Item] {
        &self.unpacked
    }

    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn remaining_weight(&self) -> f64 {
        self.container.max_weight - self.total_weight
    }

    /// Sum of the true volumes of all placed items.
    pub fn used_volume(&self) -> f64 {
        self.placed.iter().map(|p| p.item.volume()).sum()
    }

    /// Volume utilization in percent (0.0 to 100.0).
    pub fn utilization(&self) -> f64 {
        let total = self.container.volume();
        if total <= 0.0 {
            return 0.0;
        }
        (self.used_volume() / total) * 100.0
    }

    /// Appends `candidate` if it keeps every ledger invariant.
    ///
    /// Checks, in order: weight limit, container bounds (0.01 cm), overlap with
    /// every committed placement. Nothing is modified on rejection.
    pub(crate) fn attempt_commit(&mut self, candidate: PlacedItem) -> Result<(), CommitRejection> {
        let would_be = self.total_weight + candidate.item.weight;
        if would_be > self.container.max_weight {
            return Err(CommitRejection::WeightExceeded {
                id: candidate.item.id.clone(),
                would_be,
                limit: self.container.max_weight,
            });
        }

        if !candidate
            .bounding_box()
            .is_within(&self.container.extent(), BOUNDS_EPSILON)
        {
            return Err(CommitRejection::OutOfBounds {
                id: candidate.item.id.clone(),
            });
        }

        if let Some(other) = self.placed.iter().find(|p| intersects(p, &candidate)) {
            return Err(CommitRejection::Overlap {
                id: candidate.item.id.clone(),
                other: other.item.id.clone(),
            });
        }

        self.total_weight = would_be;
        self.placed.push(candidate);
        Ok(())
    }

    pub(crate) fn record_unpacked(&mut self, items: Vec<Item>) {
        self.unpacked = items;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::{CuboidOrientation, CylinderOrientation, Orientation};
    use crate::types::Vec3;

    fn cuboid_at(id: &str, position: (f64, f64, f64), dims: (f64, f64, f64), weight: f64) -> PlacedItem {
        PlacedItem::new(
            Item::cuboid(id, dims, vec![CuboidOrientation::Bottom], weight),
            Orientation::Cuboid(CuboidOrientation::Bottom),
            Vec3::from_tuple(position),
            Vec3::from_tuple(dims),
        )
    }

    #[test]
    fn commits_non_overlapping_items_in_order() {
        let mut ledger = Ledger::new(Container::standard());
        assert!(ledger.attempt_commit(cuboid_at("a", (0.0, 0.0, 0.0), (60.0, 40.0, 20.0), 10.0)).is_ok());
        assert!(ledger.attempt_commit(cuboid_at("b", (0.0, 40.0, 0.0), (60.0, 40.0, 20.0), 10.0)).is_ok());

        let ids: Vec<&str> = ledger.placed().iter().map(|p| p.item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(ledger.total_weight(), 20.0);
        assert_eq!(ledger.remaining_weight(), 280.0);
    }

    #[test]
    fn rejects_overlap_without_side_effects() {
        let mut ledger = Ledger::new(Container::standard());
        ledger
            .attempt_commit(cuboid_at("a", (0.0, 0.0, 0.0), (60.0, 40.0, 20.0), 10.0))
            .unwrap();

        let result = ledger.attempt_commit(cuboid_at("b", (30.0, 20.0, 10.0), (60.0, 40.0, 20.0), 5.0));
        assert_eq!(
            result,
            Err(CommitRejection::Overlap {
                id: "b".to_string(),
                other: "a".to_string()
            })
        );
        assert_eq!(ledger.placed_count(), 1);
        assert_eq!(ledger.total_weight(), 10.0);
    }

    #[test]
    fn rejects_weight_over_limit() {
        let container = Container::new(100.0, 80.0, 170.0, 15.0, 20.0).unwrap();
        let mut ledger = Ledger::new(container);
        ledger
            .attempt_commit(cuboid_at("a", (0.0, 0.0, 0.0), (10.0, 10.0, 10.0), 10.0))
            .unwrap();

        let result = ledger.attempt_commit(cuboid_at("b", (20.0, 0.0, 0.0), (10.0, 10.0, 10.0), 6.0));
        assert!(matches!(result, Err(CommitRejection::WeightExceeded { .. })));

        // Exactly at the limit is fine.
        assert!(ledger
            .attempt_commit(cuboid_at("c", (20.0, 0.0, 0.0), (10.0, 10.0, 10.0), 5.0))
            .is_ok());
    }

    #[test]
    fn bounds_check_uses_small_tolerance() {
        let mut ledger = Ledger::new(Container::standard());
        assert!(ledger
            .attempt_commit(cuboid_at("a", (40.005, 0.0, 0.0), (60.0, 40.0, 20.0), 1.0))
            .is_ok());
        assert!(matches!(
            ledger.attempt_commit(cuboid_at("b", (0.0, 40.5, 0.0), (60.0, 40.0, 20.0), 1.0)),
            Err(CommitRejection::OutOfBounds { .. })
        ));
        assert!(matches!(
            ledger.attempt_commit(cuboid_at("c", (0.0, 0.0, 160.0), (10.0, 10.0, 20.0), 1.0)),
            Err(CommitRejection::OutOfBounds { .. })
        ));
    }

    #[test]
    fn utilization_counts_cylinders_by_true_volume() {
        let mut ledger = Ledger::new(Container::new(100.0, 100.0, 100.0, 300.0, 20.0).unwrap());
        let cylinder = PlacedItem::new(
            Item::cylinder("cyl", 20.0, 50.0, vec![CylinderOrientation::Bottom], 1.0),
            Orientation::Cylinder(CylinderOrientation::Bottom),
            Vec3::zero(),
            Vec3::new(20.0, 20.0, 50.0),
        );
        ledger.attempt_commit(cylinder).unwrap();

        let expected = std::f64::consts::PI * 100.0 * 50.0 / 1_000_000.0 * 100.0;
        assert!((ledger.utilization() - expected).abs() < 1e-9);
    }
}
