//! Shelf-aware loading planner for roll containers.
//!
//! Places cuboids and cylinders into a container with removable shelves,
//! respecting weight, bounds, support and fragility rules, and picks the best
//! of several item orderings. See [`optimizer::Optimizer`] for the entry point.

pub mod api;
pub mod candidates;
pub mod config;
pub mod error;
pub mod geometry;
pub mod ledger;
pub mod model;
pub mod optimizer;
pub mod orientation;
pub mod search;
pub mod support;
pub mod types;

pub use error::{PackError, Result};
pub use model::{Container, Item, PlacedItem, Shape};
pub use optimizer::{Optimizer, PackingConfig, PackingResult, Strategy};
