//! Masonry layout: fixed-width columns, each item dropped into the shortest.
//!
//! Masonry does not use the flow engine. Every measure walks the items from
//! the start, placing each into the currently shortest column and recording
//! its top and height. Heights are remembered, so only items that were never
//! measured (or that intersect the realization rect) are measured again.
//!
//! Because columns grow independently, the first item below the realization
//! rect does not end the pass: a shorter column may still receive visible
//! items later. Packing stops only once every column has placed an item
//! below the rect.

use serde::{Deserialize, Serialize};

use horizon_repeater_core::logging::targets;
use horizon_repeater_core::{Rect, Size};

use crate::element::ElementId;
use crate::error::{RepeaterError, Result};
use crate::layout::context::{
    ElementRealizationOptions, LayoutContext, ensure_state, release_state, with_state,
};
use crate::layout::{ItemsStretch, VirtualizingLayout};
use crate::source::{CollectionAction, CollectionChange};

/// Guards the column count against rounding when the width divides evenly.
const COLUMN_FIT_TOLERANCE: f32 = 0.0001;

/// Configuration of a [`MasonryLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasonryLayoutOptions {
    /// Desired column width. With [`ItemsStretch::Stretch`] columns grow
    /// past it to fill the width.
    pub min_column_width: f32,
    pub min_column_spacing: f32,
    pub row_spacing: f32,
    pub items_stretch: ItemsStretch,
    /// Estimated heights within this distance of the last reported one are
    /// not reported, so scrolling does not make the extent jitter.
    pub extent_hysteresis: f32,
}

impl Default for MasonryLayoutOptions {
    fn default() -> Self {
        Self {
            min_column_width: 250.0,
            min_column_spacing: 0.0,
            row_spacing: 0.0,
            items_stretch: ItemsStretch::Stretch,
            extent_hysteresis: 5.0,
        }
    }
}

impl MasonryLayoutOptions {
    pub fn with_min_column_width(mut self, width: f32) -> Self {
        self.min_column_width = width;
        self
    }

    pub fn with_min_column_spacing(mut self, spacing: f32) -> Self {
        self.min_column_spacing = spacing;
        self
    }

    pub fn with_row_spacing(mut self, spacing: f32) -> Self {
        self.row_spacing = spacing;
        self
    }

    pub fn with_items_stretch(mut self, stretch: ItemsStretch) -> Self {
        self.items_stretch = stretch;
        self
    }

    pub fn with_extent_hysteresis(mut self, hysteresis: f32) -> Self {
        self.extent_hysteresis = hysteresis;
        self
    }

    /// Column width and count for `available_width`.
    ///
    /// The count is at least one and the columns plus spacing never exceed
    /// a finite `available_width`. An unbounded width gets one column.
    pub fn columns_for_width(&self, available_width: f32) -> (f32, usize) {
        let spacing = self.min_column_spacing;
        if !available_width.is_finite() {
            return (self.min_column_width, 1);
        }

        let (column_width, mut columns) = if self.items_stretch == ItemsStretch::Stretch {
            if self.min_column_width.is_nan() || self.min_column_width > available_width {
                (available_width, 1)
            } else {
                let width = available_width + spacing - COLUMN_FIT_TOLERANCE;
                let columns = ((width / (self.min_column_width + spacing)).floor() as usize).max(1);
                (width / columns as f32 - spacing, columns)
            }
        } else {
            let column_width = if self.min_column_width.is_nan() {
                available_width
            } else {
                self.min_column_width.min(available_width)
            };
            let columns = ((available_width / (column_width + spacing)).floor() as usize).max(1);
            (column_width, columns)
        };

        let total = column_width + (columns - 1) as f32 * (column_width + spacing);
        if total > available_width && columns > 1 {
            columns -= 1;
        }
        (column_width, columns)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MasonryLayout {
    options: MasonryLayoutOptions,
}

impl MasonryLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MasonryLayoutOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &MasonryLayoutOptions {
        &self.options
    }

    /// Set the desired column width. Returns `true` if it changed.
    pub fn set_min_column_width(&mut self, width: f32) -> bool {
        if (self.options.min_column_width - width).abs() < f32::EPSILON {
            return false;
        }
        self.options.min_column_width = width;
        true
    }

    pub fn set_min_column_spacing(&mut self, spacing: f32) -> bool {
        if (self.options.min_column_spacing - spacing).abs() < f32::EPSILON {
            return false;
        }
        self.options.min_column_spacing = spacing;
        true
    }

    pub fn set_row_spacing(&mut self, spacing: f32) -> bool {
        if (self.options.row_spacing - spacing).abs() < f32::EPSILON {
            return false;
        }
        self.options.row_spacing = spacing;
        true
    }

    pub fn set_items_stretch(&mut self, stretch: ItemsStretch) -> bool {
        if self.options.items_stretch == stretch {
            return false;
        }
        self.options.items_stretch = stretch;
        true
    }
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct MasonryItem {
    index: usize,
    top: f32,
    /// `None` until the item is measured.
    height: Option<f32>,
    /// Element requested during the current measure, if any.
    element: Option<ElementId>,
}

impl MasonryItem {
    fn new(index: usize) -> Self {
        Self {
            index,
            top: 0.0,
            height: None,
            element: None,
        }
    }

    #[inline]
    fn height(&self) -> f32 {
        self.height.unwrap_or(0.0)
    }

    #[inline]
    fn bottom(&self) -> f32 {
        self.top + self.height()
    }
}

/// Item indices placed in one column, in placement order.
#[derive(Debug, Clone, Default)]
struct MasonryColumn {
    items: Vec<usize>,
}

/// Per-context state of a [`MasonryLayout`].
#[derive(Debug, Default)]
pub struct MasonryLayoutState {
    items: Vec<MasonryItem>,
    columns: Vec<MasonryColumn>,
    column_width: f32,
    row_spacing: f32,
    last_height: f32,
}

impl MasonryLayoutState {
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn column_width(&self) -> f32 {
        self.column_width
    }

    /// Number of items whose position has been computed.
    #[inline]
    pub fn placed_count(&self) -> usize {
        self.items.len()
    }

    /// Top and height of item `index`, if it has been placed.
    pub fn item_bounds(&self, index: usize) -> Option<(f32, f32)> {
        self.items.get(index).map(|item| (item.top, item.height()))
    }

    fn item_at(&mut self, index: usize) -> &mut MasonryItem {
        while self.items.len() <= index {
            let next = self.items.len();
            self.items.push(MasonryItem::new(next));
        }
        &mut self.items[index]
    }

    fn add_item_to_column(&mut self, index: usize, column: usize) {
        let column = &mut self.columns[column];
        if !column.items.contains(&index) {
            column.items.push(index);
        }
    }

    fn column_bottom(&self, column: &MasonryColumn) -> f32 {
        column
            .items
            .last()
            .and_then(|&index| self.items.get(index))
            .map_or(0.0, MasonryItem::bottom)
    }

    fn reset_columns(&mut self, count: usize) {
        self.columns = vec![MasonryColumn::default(); count];
    }

    /// Forget every computed position; items are measured again.
    fn clear(&mut self) {
        self.items.clear();
        for column in &mut self.columns {
            column.items.clear();
        }
    }

    /// Forget the positions of item `index` and everything after it.
    fn remove_from_index(&mut self, index: usize) {
        if index >= self.items.len() {
            // Not placed that far yet.
            return;
        }
        self.items.truncate(index);
        for column in &mut self.columns {
            if let Some(cut) = column.items.iter().position(|&placed| placed >= index) {
                column.items.truncate(cut);
            }
        }
    }

    /// Hand back the elements held for items in `range`.
    fn recycle_held(
        &mut self,
        context: &mut dyn LayoutContext,
        range: std::ops::Range<usize>,
    ) -> Result<()> {
        let end = range.end.min(self.items.len());
        for index in range.start.min(end)..end {
            if let Some(element) = self.items[index].element.take() {
                context.recycle_element(element)?;
            }
        }
        Ok(())
    }

    /// Content height; exact once every item is placed, estimated otherwise.
    fn height(&mut self, item_count: usize, hysteresis: f32) -> f32 {
        let bottoms: Vec<(f32, usize)> = self
            .columns
            .iter()
            .filter(|column| !column.items.is_empty())
            .map(|column| (self.column_bottom(column), column.items.len()))
            .collect();
        let mut desired = bottoms.iter().map(|(bottom, _)| *bottom).fold(0.0f32, f32::max);

        let placed: usize = bottoms.iter().map(|(_, count)| count).sum();
        if placed == item_count || bottoms.is_empty() {
            return desired;
        }

        let columns = bottoms.len() as f32;
        let average = bottoms
            .iter()
            .map(|(bottom, count)| bottom / *count as f32)
            .sum::<f32>()
            / columns;
        let estimated = average * item_count as f32 / columns;
        desired = desired.max(estimated);

        if (desired - self.last_height).abs() < hysteresis {
            return self.last_height;
        }
        self.last_height = desired;
        desired
    }
}

fn shortest_column(heights: &[f32]) -> usize {
    let mut shortest = 0;
    for (column, &height) in heights.iter().enumerate().skip(1) {
        if height < heights[shortest] {
            shortest = column;
        }
    }
    shortest
}

// ============================================================================
// Layout
// ============================================================================

impl MasonryLayout {
    fn measure_state(
        &self,
        state: &mut MasonryLayoutState,
        context: &mut dyn LayoutContext,
        available: Size,
    ) -> Result<Size> {
        let options = &self.options;
        let count = context.item_count();
        let realization = context.realization_rect();
        let mut available_width = available.width;

        let (column_width, columns) = options.columns_for_width(available_width);
        if (column_width - state.column_width).abs() > f32::EPSILON {
            // New width: every item needs measuring again.
            tracing::debug!(target: targets::MASONRY, column_width, columns, "column width changed");
            state.clear();
        }
        state.column_width = column_width;

        if !available_width.is_finite() {
            available_width = column_width + (columns - 1) as f32 * (column_width + options.min_column_spacing);
        }
        if columns != state.columns.len() {
            state.reset_columns(columns);
        }
        if (options.row_spacing - state.row_spacing).abs() > f32::EPSILON {
            state.reset_columns(columns);
            state.row_spacing = options.row_spacing;
        }

        // References from the previous pass are stale; the host recycles
        // whatever this pass does not request again.
        for item in &mut state.items {
            item.element = None;
        }

        let mut column_heights = vec![0.0f32; columns];
        let mut items_per_column = vec![0usize; columns];
        let mut dead_columns = vec![false; columns];
        let mut dead_count = 0;
        let measure_size = Size::new(column_width, available.height);

        for index in 0..count {
            let column = shortest_column(&column_heights);

            let mut measured = false;
            if state.item_at(index).height.is_none() {
                let element = context.get_or_create_element_at(index, ElementRealizationOptions::NONE)?;
                let desired = context.measure_element(element, measure_size)?;
                let item = state.item_at(index);
                item.height = Some(desired.height);
                item.element = Some(element);
                measured = true;
            }

            let spacing = if items_per_column[column] > 0 { options.row_spacing } else { 0.0 };
            let item = state.item_at(index);
            item.top = column_heights[column] + spacing;
            let (top, bottom) = (item.top, item.bottom());
            column_heights[column] = bottom;
            items_per_column[column] += 1;
            state.add_item_to_column(index, column);

            if bottom < realization.top() {
                state.recycle_held(context, index..index + 1)?;
            } else if top > realization.bottom() {
                state.recycle_held(context, index..index + 1)?;
                if !dead_columns[column] {
                    dead_columns[column] = true;
                    dead_count += 1;
                }
            } else if !measured {
                // Visible items are always measured again.
                let element = context.get_or_create_element_at(index, ElementRealizationOptions::NONE)?;
                let desired = context.measure_element(element, measure_size)?;
                let height = state.item_at(index).height();
                if (height - desired.height).abs() > f32::EPSILON {
                    state.remove_from_index(index + 1);
                    column_heights[column] = top + desired.height;
                }
                let item = state.item_at(index);
                item.height = Some(desired.height);
                item.element = Some(element);
            }

            if dead_count == columns {
                break;
            }
        }

        let height = state.height(count, options.extent_hysteresis);
        tracing::trace!(
            target: targets::MASONRY,
            columns,
            column_width,
            placed = state.placed_count(),
            height,
            "masonry measured"
        );
        Ok(Size::new(available_width, height))
    }

    fn arrange_state(
        &self,
        state: &MasonryLayoutState,
        context: &mut dyn LayoutContext,
        final_size: Size,
    ) -> Result<()> {
        let options = &self.options;
        let realization = context.realization_rect();
        let columns = state.columns.len();
        let column_width = state.column_width;
        let spacing = options.min_column_spacing;
        let empty_space = final_size.width
            - (column_width * columns as f32 + spacing * columns.saturating_sub(1) as f32);

        for (column_index, column) in state.columns.iter().enumerate() {
            let mut offset = (column_width + spacing) * column_index as f32;
            match options.items_stretch {
                ItemsStretch::End => offset += empty_space,
                ItemsStretch::Center => offset += empty_space / 2.0,
                ItemsStretch::Justify if columns > 1 => {
                    offset += empty_space / (columns - 1) as f32 * column_index as f32;
                }
                _ => {}
            }

            for &index in &column.items {
                let Some(item) = state.items.get(index) else {
                    break;
                };
                if item.bottom() < realization.top() {
                    continue;
                }
                if item.top > realization.bottom() {
                    break;
                }
                let element = context.get_or_create_element_at(item.index, ElementRealizationOptions::NONE)?;
                context.arrange_element(element, Rect::new(offset, item.top, column_width, item.height()))?;
            }
        }
        Ok(())
    }

    fn items_changed(
        state: &mut MasonryLayoutState,
        context: &mut dyn LayoutContext,
        change: &CollectionChange,
    ) -> Result<()> {
        match change.action {
            CollectionAction::Add => state.remove_from_index(change.new_start),
            CollectionAction::Replace => {
                // The replaced element must be rebuilt for its new item.
                state.recycle_held(context, change.old_start..change.old_start + change.old_count)?;
                state.remove_from_index(change.new_start);
            }
            CollectionAction::Move => {
                state.remove_from_index(change.old_start.min(change.new_start));
            }
            CollectionAction::Remove => state.remove_from_index(change.old_start),
            CollectionAction::Reset => {
                for item in &mut state.items {
                    item.element = None;
                }
                state.clear();
            }
        }
        Ok(())
    }
}

impl VirtualizingLayout for MasonryLayout {
    fn initialize_for_context(&self, context: &mut dyn LayoutContext) -> Result<()> {
        ensure_state(context, MasonryLayoutState::default)
    }

    fn uninitialize_for_context(&self, context: &mut dyn LayoutContext) -> Result<()> {
        release_state::<MasonryLayoutState>(context, |state, context| {
            let placed = state.items.len();
            state.recycle_held(context, 0..placed)
        })
    }

    fn measure(&self, context: &mut dyn LayoutContext, available: Size) -> Result<Size> {
        if context.item_count() == 0 {
            return Ok(Size::new(finite_or_zero(available.width), 0.0));
        }
        let realization = context.realization_rect();
        if realization.width() == 0.0 && realization.height() == 0.0 {
            return Ok(Size::new(finite_or_zero(available.width), 0.0));
        }
        ensure_state(context, MasonryLayoutState::default)?;
        with_state::<MasonryLayoutState, _>(context, |state, context| {
            self.measure_state(state, context, available)
        })
    }

    fn arrange(&self, context: &mut dyn LayoutContext, final_size: Size) -> Result<Size> {
        let realization = context.realization_rect();
        if realization.width() == 0.0 && realization.height() == 0.0 {
            return Ok(final_size);
        }
        match with_state::<MasonryLayoutState, _>(context, |state, context| {
            self.arrange_state(state, context, final_size)
        }) {
            // Nothing measured yet.
            Err(RepeaterError::MissingLayoutState) => {}
            other => other?,
        }
        Ok(final_size)
    }

    fn on_items_changed(&self, context: &mut dyn LayoutContext, change: &CollectionChange) -> Result<()> {
        ensure_state(context, MasonryLayoutState::default)?;
        with_state::<MasonryLayoutState, _>(context, |state, context| {
            Self::items_changed(state, context, change)
        })
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::test_support::TestElement;
    use crate::element::ElementArena;
    use crate::layout::context::{LayoutState, NonVirtualizingContext};
    use crate::layout::test_context::TestContext;

    fn masonry_state(context: &TestContext) -> &MasonryLayoutState {
        context
            .state
            .as_ref()
            .and_then(|state| state.downcast_ref::<MasonryLayoutState>())
            .unwrap()
    }

    fn two_columns() -> MasonryLayout {
        MasonryLayout::with_options(
            MasonryLayoutOptions::default()
                .with_min_column_width(100.0)
                .with_items_stretch(ItemsStretch::Start),
        )
    }

    #[test]
    fn test_stretch_columns_fill_width() {
        let options = MasonryLayoutOptions::default().with_min_column_spacing(10.0);
        let (width, columns) = options.columns_for_width(1000.0);
        assert_eq!(columns, 3);
        assert!(width > 250.0);
        assert!(width * 3.0 + 20.0 <= 1000.0);
    }

    #[test]
    fn test_columns_always_fit() {
        for stretch in [ItemsStretch::Stretch, ItemsStretch::Start, ItemsStretch::Justify] {
            for available in [1.0f32, 99.0, 100.0, 250.0, 333.3, 1000.0, 1920.0] {
                for min_width in [0.5f32, 50.0, 100.0, 250.0, 400.0] {
                    for spacing in [0.0f32, 4.0, 12.5, 60.0] {
                        let options = MasonryLayoutOptions::default()
                            .with_items_stretch(stretch)
                            .with_min_column_width(min_width)
                            .with_min_column_spacing(spacing);
                        let (width, columns) = options.columns_for_width(available);
                        assert!(columns >= 1);
                        let total = width * columns as f32 + spacing * (columns - 1) as f32;
                        assert!(
                            columns == 1 || total <= available + 0.001,
                            "{stretch:?} available {available} min {min_width} spacing {spacing}: {columns} x {width}"
                        );
                    }
                }
            }
        }
        let (_, columns) = MasonryLayoutOptions::default().columns_for_width(f32::INFINITY);
        assert_eq!(columns, 1);
    }

    #[test]
    fn test_items_go_to_shortest_column() {
        let mut context = TestContext::uniform(4, Size::new(100.0, 30.0));
        context.sizes[0].height = 100.0;
        context.sizes[1].height = 50.0;
        let layout = two_columns();

        let desired = layout.measure(&mut context, Size::new(200.0, f32::INFINITY)).unwrap();
        assert_eq!(desired, Size::new(200.0, 110.0));

        layout.arrange(&mut context, desired).unwrap();
        assert_eq!(context.arranged_rect(0).unwrap(), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(context.arranged_rect(2).unwrap(), Rect::new(100.0, 50.0, 100.0, 30.0));
        assert_eq!(context.arranged_rect(3).unwrap(), Rect::new(100.0, 80.0, 100.0, 30.0));
    }

    #[test]
    fn test_row_spacing_between_items_of_a_column() {
        let mut context = TestContext::uniform(4, Size::new(100.0, 40.0));
        let layout = MasonryLayout::with_options(
            MasonryLayoutOptions::default()
                .with_min_column_width(100.0)
                .with_row_spacing(8.0)
                .with_items_stretch(ItemsStretch::Start),
        );
        let desired = layout.measure(&mut context, Size::new(200.0, f32::INFINITY)).unwrap();
        assert_eq!(desired.height, 88.0);
        assert_eq!(masonry_state(&context).item_bounds(3), Some((48.0, 40.0)));
    }

    #[test]
    fn test_packing_continues_until_every_column_is_below() {
        let mut context = TestContext::uniform(100, Size::new(100.0, 20.0));
        context.sizes[0].height = 500.0;
        context.realization = Rect::new(0.0, 0.0, 200.0, 100.0);
        let layout = two_columns();
        layout.measure(&mut context, Size::new(200.0, f32::INFINITY)).unwrap();

        // Column 1 passes the bottom at item 7, but column 0 only receives
        // its second item (and goes below) at item 26.
        let state = masonry_state(&context);
        assert_eq!(state.placed_count(), 27);
        assert_eq!(state.item_bounds(26), Some((500.0, 20.0)));
        assert!(!context.live_indices().contains(&7));
        assert!(context.live_indices().contains(&6));
    }

    #[test]
    fn test_zero_height_items_are_measured_once() {
        let mut context = TestContext::uniform(6, Size::new(100.0, 30.0));
        context.sizes[1].height = 0.0;
        context.realization = Rect::new(0.0, 500.0, 200.0, 100.0);
        let layout = two_columns();
        let available = Size::new(200.0, f32::INFINITY);

        layout.measure(&mut context, available).unwrap();
        assert_eq!(masonry_state(&context).item_bounds(1), Some((0.0, 0.0)));
        let created = context.created;

        // Everything lies above the window, so nothing needs measuring again.
        layout.measure(&mut context, available).unwrap();
        assert_eq!(context.created, created);
        assert_eq!(masonry_state(&context).item_bounds(2), Some((0.0, 30.0)));
    }

    #[test]
    fn test_estimated_height_hysteresis() {
        let mut state = MasonryLayoutState::default();
        state.reset_columns(2);
        for index in 0..4 {
            let item = state.item_at(index);
            item.top = (index / 2) as f32 * 50.0;
            item.height = Some(50.0);
            state.add_item_to_column(index, index % 2);
        }
        // Four of forty items placed at 50px each.
        assert_eq!(state.height(40, 5.0), 1000.0);

        // Estimate moves to 1002, inside the band.
        state.item_at(3).height = Some(50.4);
        assert_eq!(state.height(40, 5.0), 1000.0);

        state.item_at(3).height = Some(70.0);
        assert!(state.height(40, 5.0) > 1000.0);
        // Fully placed content is exact.
        assert_eq!(state.height(4, 5.0), 120.0);
    }

    #[test]
    fn test_items_changed_forgets_later_positions() {
        let mut context = TestContext::uniform(6, Size::new(100.0, 30.0));
        let layout = two_columns();
        layout.measure(&mut context, Size::new(200.0, f32::INFINITY)).unwrap();
        assert_eq!(masonry_state(&context).placed_count(), 6);

        layout.on_items_changed(&mut context, &CollectionChange::add(4, 1)).unwrap();
        assert_eq!(masonry_state(&context).placed_count(), 4);

        layout
            .on_items_changed(&mut context, &CollectionChange::move_items(3, 1, 1))
            .unwrap();
        assert_eq!(masonry_state(&context).placed_count(), 1);

        layout.on_items_changed(&mut context, &CollectionChange::reset()).unwrap();
        assert_eq!(masonry_state(&context).placed_count(), 0);
    }

    #[test]
    fn test_replace_recycles_held_element() {
        let mut context = TestContext::uniform(4, Size::new(100.0, 30.0));
        let layout = two_columns();
        layout.measure(&mut context, Size::new(200.0, f32::INFINITY)).unwrap();
        let recycled_before = context.recycled.len();

        layout
            .on_items_changed(&mut context, &CollectionChange::replace(2, 1, 1))
            .unwrap();
        assert_eq!(context.recycled.len(), recycled_before + 1);
        assert!(!context.live_indices().contains(&2));
    }

    #[test]
    fn test_uninitialize_releases_elements() {
        let mut context = TestContext::uniform(10, Size::new(100.0, 30.0));
        let layout = two_columns();
        layout.initialize_for_context(&mut context).unwrap();
        layout.measure(&mut context, Size::new(200.0, f32::INFINITY)).unwrap();
        assert!(!context.held.is_empty());

        layout.uninitialize_for_context(&mut context).unwrap();
        assert!(context.held.is_empty());
        assert!(context.state.is_none());
    }

    #[test]
    fn test_runs_without_virtualization() {
        let mut arena = ElementArena::new();
        let children: Vec<ElementId> = [40.0, 20.0, 20.0]
            .into_iter()
            .map(|height| arena.insert(Box::new(TestElement::new(50.0, height))))
            .collect();
        let mut state: Option<LayoutState> = None;
        let mut context = NonVirtualizingContext::new(&children, &mut arena, &mut state);

        let layout = MasonryLayout::with_options(
            MasonryLayoutOptions::default()
                .with_min_column_width(50.0)
                .with_items_stretch(ItemsStretch::Start),
        );
        let desired = layout.measure(&mut context, Size::new(100.0, f32::INFINITY)).unwrap();
        assert_eq!(desired, Size::new(100.0, 40.0));
        layout.arrange(&mut context, desired).unwrap();

        let arranged = arena.downcast_ref::<TestElement>(children[2]).unwrap().arranged;
        assert_eq!(arranged, Some(Rect::new(50.0, 20.0, 50.0, 20.0)));
    }
}
