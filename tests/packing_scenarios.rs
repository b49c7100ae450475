use roll_pack::geometry::{footprint_overlap, intersects};
use roll_pack::model::{Container, Item};
use roll_pack::optimizer::{Optimizer, PackingConfig, Strategy, optimize_packing};
use roll_pack::orientation::{CuboidOrientation, CylinderOrientation};
use roll_pack::search::PlacementTag;

fn bottom_only(id: &str, dims: (f64, f64, f64), weight: f64) -> Item {
    Item::cuboid(id, dims, vec![CuboidOrientation::Bottom], weight)
}

fn sample_catalog() -> Vec<Item> {
    vec![
        Item::cuboid("BOX001", (40.0, 30.0, 25.0), vec![CuboidOrientation::Bottom, CuboidOrientation::Top], 10.5)
            .with_name("Electronics Box"),
        Item::cuboid("BOX002", (60.0, 40.0, 30.0), CuboidOrientation::ALL.to_vec(), 15.2)
            .with_name("Large Package"),
        Item::cylinder("CYL001", 20.0, 35.0, vec![CylinderOrientation::Bottom, CylinderOrientation::Side], 4.5)
            .with_name("Paint Can"),
        Item::cuboid("BOX003", (25.0, 20.0, 15.0), vec![CuboidOrientation::Bottom], 2.1)
            .with_name("Glassware")
            .with_fragile(true),
        Item::cuboid("BOX004", (80.0, 60.0, 20.0), vec![CuboidOrientation::Bottom], 25.0)
            .with_name("Flat Panel"),
        Item::cylinder("CYL002", 25.0, 40.0, vec![CylinderOrientation::Bottom], 8.3)
            .with_name("Water Jug"),
        Item::cuboid("BOX005", (30.0, 30.0, 30.0), vec![CuboidOrientation::Bottom], 5.0)
            .with_name("Bread Crate")
            .with_fragile(true),
    ]
}

#[test]
fn two_boxes_share_the_floor() {
    let items = vec![
        bottom_only("A", (60.0, 40.0, 20.0), 10.0),
        bottom_only("B", (60.0, 40.0, 20.0), 10.0),
    ];
    let result = optimize_packing(&Container::standard(), &items).expect("valid input");

    assert_eq!(result.placed_count(), 2);
    assert!(result.is_complete());
    let placed = result.placed();
    assert!(placed.iter().all(|p| p.position.z == 0.0));
    assert!(!intersects(&placed[0], &placed[1]));

    let expected = 2.0 * 48_000.0 / 1_360_000.0 * 100.0;
    assert!((result.utilization() - expected).abs() < 1e-9);
    assert_eq!(result.total_weight(), 20.0);
}

#[test]
fn nothing_rests_on_a_fragile_item() {
    let items = vec![
        bottom_only("eggs", (50.0, 30.0, 20.0), 3.0).with_fragile(true),
        bottom_only("crate", (50.0, 30.0, 10.0), 8.0),
    ];
    let result = optimize_packing(&Container::standard(), &items).expect("valid input");
    assert_eq!(result.placed_count(), 2);

    let eggs = result.placed().iter().find(|p| p.item.id == "eggs").unwrap();
    let others = result.placed().iter().filter(|p| p.item.id != "eggs");
    for other in others {
        let resting_on_top = (other.position.z - eggs.top_z()).abs() < 0.1
            && footprint_overlap(other.position, other.dims, eggs) > 0.0;
        assert!(!resting_on_top, "{} rests on the fragile item", other.item.id);
    }
}

#[test]
fn blocked_shelf_over_fragile_item_sends_the_next_item_higher() {
    // The fragile item fills the floor and ends at the first shelf level, so
    // that shelf cannot be inserted and its top must not carry anything.
    let container = Container::new(50.0, 30.0, 100.0, 100.0, 20.0).unwrap();
    let items = vec![
        bottom_only("eggs", (50.0, 30.0, 20.0), 3.0).with_fragile(true),
        bottom_only("crate", (50.0, 30.0, 10.0), 8.0),
    ];
    let optimizer = Optimizer::new(PackingConfig::builder().parallel_strategies(false).build());
    let result = optimizer
        .pack_with_strategy(&container, &items, Strategy::VolumeDesc)
        .expect("valid input");

    assert_eq!(result.placed_count(), 2);
    let crate_event = result.events().iter().find(|e| e.item_id == "crate").unwrap();
    assert_eq!(crate_event.position.z, 40.0);
    assert_eq!(crate_event.tag, PlacementTag::Shelf);
}

#[test]
fn item_taller_than_the_container_is_left_out() {
    let items = vec![
        Item::cuboid("pole", (10.0, 10.0, 200.0), vec![CuboidOrientation::Bottom, CuboidOrientation::Top], 2.0),
        bottom_only("box", (20.0, 20.0, 20.0), 2.0),
    ];
    let result = optimize_packing(&Container::standard(), &items).expect("valid input");

    assert_eq!(result.unpacked_ids(), vec!["pole"]);
    assert_eq!(result.placed_count(), 1);
    assert!(!result.is_complete());
}

#[test]
fn sample_catalog_respects_physical_rules() {
    let container = Container::standard();
    let result = optimize_packing(&container, &sample_catalog()).expect("valid input");

    assert_eq!(result.placed_count() + result.unpacked_ids().len(), 7);
    assert!(result.total_weight() <= container.max_weight);

    let placed = result.placed();
    for (i, a) in placed.iter().enumerate() {
        let bounds = a.bounding_box();
        assert!(bounds.is_within(&container.extent(), 0.01), "{} out of bounds", a.item.id);
        if a.item.fragile {
            let z = a.position.z;
            let k = (z / container.shelf_interval).round();
            assert!(z < 0.1 || (z - k * container.shelf_interval).abs() < 0.1);
        }
        for b in &placed[i + 1..] {
            assert!(!intersects(a, b), "{} overlaps {}", a.item.id, b.item.id);
        }
    }
}

#[test]
fn repeated_runs_are_identical() {
    let container = Container::standard();
    let first = optimize_packing(&container, &sample_catalog()).unwrap();
    let second = optimize_packing(&container, &sample_catalog()).unwrap();

    assert_eq!(first.strategy(), second.strategy());
    assert_eq!(first.placed_count(), second.placed_count());
    assert_eq!(first.utilization(), second.utilization());
    assert_eq!(first.events(), second.events());
}

#[test]
fn selected_run_is_the_best_summary() {
    let result = optimize_packing(&Container::standard(), &sample_catalog()).unwrap();
    let best = result
        .summaries()
        .iter()
        .map(|s| s.score)
        .fold(f64::MIN, f64::max);
    let selected = result
        .summaries()
        .iter()
        .position(|s| s.strategy == result.strategy())
        .unwrap();
    assert!((result.summaries()[selected].score - best).abs() < 1e-6);
    // No earlier run scored the same.
    assert!(
        result.summaries()[..selected]
            .iter()
            .all(|s| best - s.score > 1e-6)
    );
}

#[test]
fn returned_run_is_consistent_across_accessors() {
    let result = optimize_packing(&Container::standard(), &sample_catalog()).unwrap();
    let ledger = result.ledger();

    assert_eq!(ledger.placed(), result.placed());
    assert_eq!(result.events().len(), ledger.placed_count());
    for (event, placed) in result.events().iter().zip(ledger.placed()) {
        assert_eq!(event.item_id, placed.item.id);
        assert_eq!(event.position, placed.position);
    }
    assert_eq!(ledger.unpacked().len(), result.unpacked_ids().len());
}

#[test]
fn weight_limit_leaves_heavy_items_out() {
    let container = Container::new(100.0, 80.0, 170.0, 30.0, 20.0).unwrap();
    let items = vec![
        bottom_only("a", (20.0, 20.0, 20.0), 20.0),
        bottom_only("b", (20.0, 20.0, 20.0), 20.0),
        bottom_only("c", (20.0, 20.0, 20.0), 5.0),
    ];
    let result = optimize_packing(&container, &items).unwrap();

    assert_eq!(result.placed_count(), 2);
    assert_eq!(result.total_weight(), 25.0);
    assert_eq!(result.unpacked_ids().len(), 1);
}
