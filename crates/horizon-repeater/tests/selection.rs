//! Selection scenarios through `ItemsView` and the bare selection model.

mod common;

use common::{Row, RowElement, factory, rows};
use horizon_repeater::{
    ItemsSourceView, ItemsView, Modifiers, Rect, SelectionMode, SelectionModel, Selector, Size,
};

fn view(count: usize) -> ItemsView<Row> {
    let mut view = ItemsView::new(factory());
    view.set_items_source(Some(ItemsSourceView::new(rows(count, 20.0))))
        .unwrap();
    view.set_visible_window(Rect::new(0.0, 0.0, 100.0, 100.0));
    view
}

fn layout_pass(view: &mut ItemsView<Row>) {
    let desired = view.measure(Size::new(100.0, f32::INFINITY)).unwrap();
    view.arrange(desired).unwrap();
}

fn shows_selected(view: &ItemsView<Row>, index: usize) -> bool {
    let element = view.repeater().try_get_element(index).unwrap();
    view.repeater()
        .elements()
        .downcast_ref::<RowElement>(element)
        .unwrap()
        .selected
}

#[test]
fn test_range_round_trip_is_empty() {
    for (a, b) in [(3, 9), (9, 3)] {
        let mut model = SelectionModel::with_item_count(20);
        model.select_range(a, b);
        assert_eq!(model.selected_count(), 7);
        model.deselect_range(a, b);
        assert_eq!(model.selected_count(), 0);
    }
}

#[test]
fn test_anchor_survives_preserving_deselect() {
    let mut model = SelectionModel::with_item_count(20);
    let selector = Selector::for_mode(SelectionMode::Extended);
    selector.on_interacted(&mut model, 5, Modifiers::NONE);
    selector.on_interacted(&mut model, 8, Modifiers::SHIFT);
    assert_eq!(model.anchor_index(), Some(5));

    selector.deselect_with_anchor_preservation(&mut model, 5);
    assert_eq!(model.anchor_index(), Some(5));
    assert_eq!(model.selected_indices(), vec![6, 7, 8]);
}

#[test]
fn test_realized_elements_follow_selection_while_scrolling() {
    let mut view = view(500);
    view.set_selection_mode(SelectionMode::Extended);
    view.process_interaction(2, Modifiers::NONE).unwrap();
    view.process_interaction(200, Modifiers::SHIFT).unwrap();
    layout_pass(&mut view);
    assert!(shows_selected(&view, 2));
    assert!(!shows_selected(&view, 1));

    // Recycled elements pick up the state of the rows they are bound to.
    view.set_visible_window(Rect::new(0.0, 4000.0, 100.0, 100.0));
    layout_pass(&mut view);
    assert!(shows_selected(&view, 200));
    assert!(!shows_selected(&view, 201));
}

#[test]
fn test_selected_items_survive_source_replacement() {
    let mut view = view(30);
    view.set_selection_mode(SelectionMode::Multiple);
    view.select(4);
    view.select(10);
    assert_eq!(view.selected_items(), &[Row::new(4, 20.0), Row::new(10, 20.0)]);

    let mut reversed = rows(30, 20.0);
    reversed.reverse();
    view.set_items_source(Some(ItemsSourceView::new(reversed))).unwrap();
    assert_eq!(view.selected_indices(), vec![19, 25]);

    view.set_items_source(Some(ItemsSourceView::new(rows(8, 20.0)))).unwrap();
    assert_eq!(view.selected_indices(), vec![4]);
    assert_eq!(view.selected_item(), Some(&Row::new(4, 20.0)));
}

#[test]
fn test_single_mode_focus_follows() {
    let mut view = view(10);
    view.process_focus(3, Modifiers::NONE).unwrap();
    view.process_focus(6, Modifiers::NONE).unwrap();
    assert_eq!(view.selected_indices(), vec![6]);
    assert_eq!(view.current_item_index(), Some(6));

    view.process_focus(7, Modifiers::CTRL).unwrap();
    assert_eq!(view.selected_indices(), vec![6]);
    assert_eq!(view.current_item_index(), Some(7));
}
