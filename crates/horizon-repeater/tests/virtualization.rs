//! End-to-end realization scenarios driven through `ItemsRepeater`.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{Row, RowElement, factory, init_tracing, keyed_repeater, layout_pass, row_id, rows};
use horizon_repeater::{
    ElementOwner, ItemsRepeater, ItemsSourceView, MasonryLayout, MasonryLayoutOptions, Rect,
    RepeaterConfig, Size, StackLayout, StackLayoutOptions, UniformGridLayout,
    UniformGridLayoutOptions,
};

fn assert_consistent(repeater: &ItemsRepeater<Row>) {
    let source = repeater.items_source().unwrap();
    for index in repeater.realized_indices() {
        assert!(index < source.count(), "index {index} past count {}", source.count());
        assert_eq!(
            row_id(repeater, index),
            source.item_at(index).map(|row| row.id),
            "element at {index} shows the wrong row"
        );
    }
}

#[test]
fn test_remove_reindexes_and_clears() {
    init_tracing();
    let mut repeater = keyed_repeater(1000, 20.0, Rect::new(0.0, 0.0, 100.0, 410.0));
    repeater
        .set_config(RepeaterConfig::new().with_vertical_cache_length(0.0))
        .unwrap();
    layout_pass(&mut repeater, 100.0);

    let realized = repeater.realized_indices();
    assert_eq!(realized[..21], (0..=20).collect::<Vec<_>>()[..]);

    let at_20 = repeater.try_get_element(20).unwrap();
    let at_19 = repeater.try_get_element(19).unwrap();
    let removed: Vec<_> = (5..10).map(|i| repeater.try_get_element(i).unwrap()).collect();

    let cleared = Arc::new(AtomicUsize::new(0));
    let cleared_clone = cleared.clone();
    repeater.signals().element_clearing.connect(move |_| {
        cleared_clone.fetch_add(1, Ordering::SeqCst);
    });

    repeater
        .update_source(|source| source.remove_range(5, 5))
        .unwrap();

    assert_eq!(repeater.element_index(at_20), Some(15));
    assert_eq!(repeater.element_index(at_19), Some(14));
    assert_eq!(cleared.load(Ordering::SeqCst), 5);
    for element in removed {
        assert_eq!(repeater.element_index(element), None);
        let owned_by_layout = repeater
            .elements()
            .info(element)
            .is_some_and(|info| info.owner() == ElementOwner::Layout);
        assert!(!owned_by_layout);
    }

    layout_pass(&mut repeater, 100.0);
    assert_consistent(&repeater);
    assert_eq!(row_id(&repeater, 15), Some(20));
}

#[test]
fn test_stack_average_drives_extent() {
    let mut items = rows(100, 25.0);
    items[0].height = 20.0;
    items[1].height = 30.0;
    items[2].height = 25.0;

    let mut repeater = ItemsRepeater::with_config(
        factory(),
        RepeaterConfig::new().with_vertical_cache_length(0.0),
    )
    .unwrap();
    repeater.set_items_source(Some(ItemsSourceView::new(items))).unwrap();
    repeater.set_visible_window(Rect::new(0.0, 0.0, 100.0, 45.0));

    let desired = layout_pass(&mut repeater, 100.0);
    assert_eq!(repeater.realized_indices(), vec![0, 1, 2]);
    assert_eq!(desired, Size::new(100.0, 2500.0));
}

#[test]
fn test_extent_exact_once_everything_is_realized() {
    let items: Vec<Row> = (0..30).map(|id| Row::new(id, 10.0 + id as f32)).collect();
    let expected: f32 = items.iter().map(|row| row.height).sum::<f32>() + 3.0 * 29.0;

    let mut repeater = ItemsRepeater::new(factory());
    repeater.set_items_source(Some(ItemsSourceView::new(items))).unwrap();
    repeater
        .set_layout(StackLayout::with_options(StackLayoutOptions::default().with_spacing(3.0)))
        .unwrap();

    let desired = layout_pass(&mut repeater, 100.0);
    assert_eq!(repeater.realized_indices().len(), 30);
    assert_eq!(desired.height, expected);
}

#[test]
fn test_pin_unpin_restores_recycling() {
    let mut repeater = keyed_repeater(500, 20.0, Rect::new(0.0, 0.0, 100.0, 100.0));
    layout_pass(&mut repeater, 100.0);
    let element = repeater.try_get_element(2).unwrap();

    for expected in 1..=3 {
        assert_eq!(repeater.pin_element(element).unwrap(), expected);
    }
    for expected in (0..3).rev() {
        assert_eq!(repeater.unpin_element(element).unwrap(), expected);
    }
    assert!(!repeater.elements().info(element).unwrap().is_pinned());

    repeater.set_visible_window(Rect::new(0.0, 4000.0, 100.0, 100.0));
    layout_pass(&mut repeater, 100.0);
    assert!(!repeater.elements().contains(element));
    assert_eq!(repeater.pinned_count(), 0);
}

#[test]
fn test_keyed_reset_reuses_elements() {
    let mut repeater = keyed_repeater(50, 20.0, Rect::new(0.0, 0.0, 100.0, 100.0));
    layout_pass(&mut repeater, 100.0);
    let first = repeater.try_get_element(0).unwrap();
    let third = repeater.try_get_element(3).unwrap();

    // Same rows, first two swapped.
    let mut reordered = rows(50, 20.0);
    reordered.swap(0, 1);
    repeater
        .update_source(|source| Ok(source.reset(reordered)))
        .unwrap();
    layout_pass(&mut repeater, 100.0);

    assert_eq!(repeater.try_get_element(3), Some(third));
    assert_eq!(repeater.try_get_element(1), Some(first));
    assert_eq!(row_id(&repeater, 1), Some(0));
    assert_consistent(&repeater);
}

#[test]
fn test_mutation_sequence_keeps_indices_in_range() {
    init_tracing();
    let mut repeater = keyed_repeater(200, 20.0, Rect::new(0.0, 0.0, 100.0, 200.0));
    layout_pass(&mut repeater, 100.0);

    repeater
        .update_source(|source| source.insert_many(3, (1000..1005).map(|id| Row::new(id, 30.0)).collect()))
        .unwrap();
    layout_pass(&mut repeater, 100.0);
    assert_consistent(&repeater);

    repeater.update_source(|source| source.remove_range(10, 10)).unwrap();
    layout_pass(&mut repeater, 100.0);
    assert_consistent(&repeater);

    repeater
        .update_source(|source| source.replace(7, Row::new(2000, 40.0)).map(|(_, change)| change))
        .unwrap();
    layout_pass(&mut repeater, 100.0);
    assert_consistent(&repeater);

    repeater.update_source(|source| source.move_item(0, 30)).unwrap();
    layout_pass(&mut repeater, 100.0);
    assert_consistent(&repeater);

    repeater.update_source(|source| source.remove_range(2, 150)).unwrap();
    layout_pass(&mut repeater, 100.0);
    assert_consistent(&repeater);

    repeater
        .update_source(|source| Ok(source.reset(rows(12, 20.0))))
        .unwrap();
    layout_pass(&mut repeater, 100.0);
    assert_consistent(&repeater);
    assert_eq!(repeater.realized_indices(), (0..12).collect::<Vec<_>>());

    repeater
        .update_source(|source| Ok(source.push(Row::new(3000, 20.0))))
        .unwrap();
    layout_pass(&mut repeater, 100.0);
    assert_consistent(&repeater);
}

#[test]
fn test_masonry_columns_fit_width() {
    let mut repeater = keyed_repeater(60, 20.0, Rect::new(0.0, 0.0, 350.0, 300.0));
    let options = MasonryLayoutOptions::default()
        .with_min_column_width(100.0)
        .with_min_column_spacing(10.0);
    repeater.set_layout(MasonryLayout::with_options(options)).unwrap();
    layout_pass(&mut repeater, 350.0);

    let realized = repeater.realized_indices();
    assert!(!realized.is_empty());
    let mut lefts = Vec::new();
    for index in realized {
        let element = repeater.try_get_element(index).unwrap();
        let bounds = repeater.elements().layout_bounds(element).unwrap();
        assert!(bounds.left() >= 0.0);
        assert!(bounds.right() <= 350.0 + 0.001, "item {index} at {bounds:?}");
        if !lefts.contains(&bounds.left()) {
            lefts.push(bounds.left());
        }
    }
    assert_eq!(lefts.len(), 3);
}

#[test]
fn test_uniform_grid_places_cells() {
    let mut repeater = keyed_repeater(100, 20.0, Rect::new(0.0, 0.0, 200.0, 100.0));
    let options = UniformGridLayoutOptions::default().with_min_item_size(50.0, 20.0);
    repeater.set_layout(UniformGridLayout::with_options(options)).unwrap();
    let desired = layout_pass(&mut repeater, 200.0);

    // Four cells per row, 25 rows.
    assert_eq!(desired.height, 500.0);
    let element = repeater.try_get_element(5).unwrap();
    let bounds = repeater.elements().layout_bounds(element).unwrap();
    assert_eq!(bounds, Rect::new(50.0, 20.0, 50.0, 20.0));
    assert!(repeater.realized_indices().iter().all(|&index| index < 100));
}

#[test]
fn test_cleared_elements_go_back_to_the_template() {
    let mut repeater = keyed_repeater(300, 20.0, Rect::new(0.0, 0.0, 100.0, 100.0));
    repeater.set_visible_window(Rect::new(0.0, 3000.0, 100.0, 100.0));
    layout_pass(&mut repeater, 100.0);
    let before = repeater.children().len();

    repeater.set_visible_window(Rect::new(0.0, 4000.0, 100.0, 100.0));
    layout_pass(&mut repeater, 100.0);
    // Same window size, so recycled elements cover the new rows.
    assert!(repeater.children().len() <= before);
    for index in repeater.realized_indices() {
        let element = repeater.try_get_element(index).unwrap();
        let row = repeater.elements().downcast_ref::<RowElement>(element).unwrap();
        assert_eq!(row.id, Some(index as u32));
    }
}
