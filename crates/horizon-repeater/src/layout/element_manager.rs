//! The contiguous run of elements a flow layout has realized.
//!
//! Realized elements are kept as a window `[first_index, first_index + len)`
//! over the data indices together with the layout bounds computed for each.
//! A slot may hold `None`, a sentinel for an item inserted inside the window
//! whose element is created lazily on the next lookup.
//!
//! Under a non-virtualizing context every item counts as realized; only the
//! bounds table is used and elements come straight from the context.

use horizon_repeater_core::Rect;

use crate::element::ElementId;
use crate::error::Result;
use crate::layout::context::{ElementRealizationOptions, LayoutContext};
use crate::layout::orientation::{AxisMapper, ScrollOrientation};
use crate::source::{CollectionAction, CollectionChange};

#[derive(Debug, Default)]
pub struct ElementManager {
    elements: Vec<Option<ElementId>>,
    bounds: Vec<Rect>,
    first_index: usize,
    virtualizing: bool,
}

impl ElementManager {
    pub fn new() -> Self {
        Self {
            virtualizing: true,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_virtualizing(&self) -> bool {
        self.virtualizing
    }

    /// Prepare for a measure pass over `context`.
    ///
    /// Elements laid out outside the realization rect are released up front so
    /// they can be reused during the pass.
    pub fn on_begin_measure(
        &mut self,
        context: &mut dyn LayoutContext,
        scroll: ScrollOrientation,
    ) -> Result<()> {
        self.virtualizing = context.is_virtualizing();
        if self.virtualizing {
            let window = context.realization_rect();
            self.discard_elements_outside_rect(context, window, scroll)?;
        } else {
            let count = context.item_count();
            if self.bounds.len() != count {
                self.bounds.resize(count, Rect::ZERO);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Range bookkeeping
    // ========================================================================

    /// Number of realized slots (sentinels included).
    pub fn realized_count(&self) -> usize {
        if self.virtualizing {
            self.elements.len()
        } else {
            self.bounds.len()
        }
    }

    #[inline]
    pub fn data_index_from_realized(&self, realized_index: usize) -> usize {
        if self.virtualizing {
            realized_index + self.first_index
        } else {
            realized_index
        }
    }

    #[inline]
    fn realized_from_data_index(&self, data_index: usize) -> usize {
        if self.virtualizing {
            data_index - self.first_index
        } else {
            data_index
        }
    }

    pub fn is_data_index_realized(&self, data_index: usize) -> bool {
        let count = self.realized_count();
        if self.virtualizing {
            count > 0 && self.first_index <= data_index && data_index < self.first_index + count
        } else {
            data_index < count
        }
    }

    /// Data indices of the first and last realized slot.
    pub fn realized_bounds_range(&self) -> Option<(usize, usize)> {
        let count = self.realized_count();
        (count > 0).then(|| {
            (
                self.data_index_from_realized(0),
                self.data_index_from_realized(count - 1),
            )
        })
    }

    pub fn add(&mut self, element: ElementId, data_index: usize) {
        if self.elements.is_empty() {
            self.first_index = data_index;
        }
        self.elements.push(Some(element));
        self.bounds.push(Rect::ZERO);
    }

    pub fn insert(&mut self, realized_index: usize, data_index: usize, element: Option<ElementId>) {
        if realized_index == 0 {
            self.first_index = data_index;
        }
        self.elements.insert(realized_index, element);
        self.bounds.insert(realized_index, Rect::ZERO);
    }

    /// Recycle every realized element and empty the range.
    pub fn clear_realized_range(&mut self, context: &mut dyn LayoutContext) -> Result<()> {
        for element in self.elements.drain(..).flatten() {
            context.recycle_element(element)?;
        }
        self.bounds.clear();
        self.first_index = 0;
        Ok(())
    }

    /// Recycle `count` slots starting at `realized_index`.
    fn clear_realized_slots(
        &mut self,
        context: &mut dyn LayoutContext,
        realized_index: usize,
        count: usize,
    ) -> Result<()> {
        let end = (realized_index + count).min(self.elements.len());
        if realized_index >= end {
            return Ok(());
        }
        for element in self.elements.drain(realized_index..end).flatten() {
            context.recycle_element(element)?;
        }
        self.bounds.drain(realized_index..end);
        if realized_index == 0 {
            self.first_index = if self.elements.is_empty() {
                0
            } else {
                self.first_index + (end - realized_index)
            };
        }
        Ok(())
    }

    /// Release elements whose bounds miss `window` along the scroll axis.
    ///
    /// One element past each edge is kept: generation stops right after laying
    /// out the first element outside the window, and a bring-into-view anchor
    /// may sit just outside it.
    pub fn discard_elements_outside_rect(
        &mut self,
        context: &mut dyn LayoutContext,
        window: Rect,
        scroll: ScrollOrientation,
    ) -> Result<()> {
        let axis = AxisMapper::new(scroll);
        let overlaps = |bounds: &Rect| {
            axis.major_end(window) >= axis.major_start(*bounds)
                && axis.major_start(window) <= axis.major_end(*bounds)
        };

        let count = self.elements.len();
        let outside_front = self.bounds.iter().take_while(|bounds| !overlaps(bounds)).count();
        let outside_back = self
            .bounds
            .iter()
            .rev()
            .take_while(|bounds| !overlaps(bounds))
            .count();

        if outside_back > 1 {
            let start = count - outside_back + 1;
            self.clear_realized_slots(context, start, count - start)?;
        }
        if outside_front > 1 {
            let front = (outside_front - 1).min(self.elements.len());
            self.clear_realized_slots(context, 0, front)?;
        }
        Ok(())
    }

    /// Release everything past `data_index` (forward) or before it (backward),
    /// `data_index` itself included.
    pub fn discard_elements_outside_window(
        &mut self,
        context: &mut dyn LayoutContext,
        forward: bool,
        data_index: usize,
    ) -> Result<()> {
        if !self.virtualizing || !self.is_data_index_realized(data_index) {
            return Ok(());
        }
        let realized_index = self.realized_from_data_index(data_index);
        if forward {
            let count = self.elements.len() - realized_index;
            self.clear_realized_slots(context, realized_index, count)
        } else {
            self.clear_realized_slots(context, 0, realized_index + 1)
        }
    }

    /// Whether the realized range still touches `window`.
    pub fn is_window_connected(
        &self,
        window: Rect,
        scroll: ScrollOrientation,
        scroll_same_as_flow: bool,
    ) -> bool {
        let count = self.realized_count();
        if count == 0 {
            return false;
        }
        let effective = match (scroll_same_as_flow, scroll) {
            (false, scroll) => scroll,
            (true, ScrollOrientation::Vertical) => ScrollOrientation::Horizontal,
            (true, ScrollOrientation::Horizontal) => ScrollOrientation::Vertical,
        };
        let axis = AxisMapper::new(effective);
        let first = self.bounds[0];
        let last = self.bounds[count - 1];
        axis.major_start(first) <= axis.major_end(window)
            && axis.major_end(last) >= axis.major_start(window)
    }

    // ========================================================================
    // Elements & bounds
    // ========================================================================

    /// Realize `data_index` at the front or back of the range if needed.
    pub fn ensure_element_realized(
        &mut self,
        context: &mut dyn LayoutContext,
        forward: bool,
        data_index: usize,
    ) -> Result<()> {
        if self.is_data_index_realized(data_index) {
            return Ok(());
        }
        let element = context.get_or_create_element_at(data_index, ElementRealizationOptions::OWNED)?;
        if forward {
            self.add(element, data_index);
        } else {
            self.insert(0, data_index, Some(element));
        }
        Ok(())
    }

    /// The element for a realized index, filling in a sentinel slot if needed.
    pub fn realized_element(
        &mut self,
        context: &mut dyn LayoutContext,
        data_index: usize,
    ) -> Result<Option<ElementId>> {
        if !self.virtualizing {
            return context
                .get_or_create_element_at(data_index, ElementRealizationOptions::OWNED)
                .map(Some);
        }
        if !self.is_data_index_realized(data_index) {
            return Ok(None);
        }
        let realized_index = self.realized_from_data_index(data_index);
        match self.elements[realized_index] {
            Some(element) => Ok(Some(element)),
            None => {
                let element =
                    context.get_or_create_element_at(data_index, ElementRealizationOptions::OWNED)?;
                self.elements[realized_index] = Some(element);
                Ok(Some(element))
            }
        }
    }

    /// Element at `data_index` when it is within the realized range.
    pub fn element_if_realized(
        &mut self,
        context: &mut dyn LayoutContext,
        data_index: usize,
    ) -> Result<Option<ElementId>> {
        if self.is_data_index_realized(data_index) {
            self.realized_element(context, data_index)
        } else {
            Ok(None)
        }
    }

    /// Seed an empty range with the element for item 0.
    pub fn try_add_element0(&mut self, element: ElementId) -> bool {
        if self.realized_count() == 0 {
            self.add(element, 0);
            true
        } else {
            false
        }
    }

    pub fn bounds_for_data_index(&self, data_index: usize) -> Rect {
        self.bounds[self.realized_from_data_index(data_index)]
    }

    pub fn set_bounds_for_data_index(&mut self, data_index: usize, bounds: Rect) {
        let realized_index = self.realized_from_data_index(data_index);
        self.bounds[realized_index] = bounds;
    }

    pub fn bounds_for_realized_index(&self, realized_index: usize) -> Rect {
        self.bounds[realized_index]
    }

    pub fn bounds_for_realized_index_mut(&mut self, realized_index: usize) -> &mut Rect {
        &mut self.bounds[realized_index]
    }

    // ========================================================================
    // Collection changes
    // ========================================================================

    /// Shift the realized window to follow a source mutation.
    pub fn data_source_changed(
        &mut self,
        context: &mut dyn LayoutContext,
        change: &CollectionChange,
    ) -> Result<()> {
        if !self.virtualizing {
            return Ok(());
        }
        match change.action {
            CollectionAction::Add => self.on_items_added(change.new_start, change.new_count),
            CollectionAction::Remove => self.on_items_removed(context, change.old_start, change.old_count)?,
            CollectionAction::Replace => {
                let in_place = change.old_count == change.new_count
                    && change.old_start == change.new_start
                    && change.old_count > 0
                    && self.is_data_index_realized(change.old_start)
                    && self.is_data_index_realized(change.old_start + change.old_count - 1);
                if in_place {
                    // Keep the slots so the anchor survives; the next measure
                    // realizes fresh elements for the sentinels.
                    let start = self.realized_from_data_index(change.old_start);
                    for slot in &mut self.elements[start..start + change.old_count] {
                        if let Some(element) = slot.take() {
                            context.recycle_element(element)?;
                        }
                    }
                } else {
                    self.on_items_removed(context, change.old_start, change.old_count)?;
                    self.on_items_added(change.new_start, change.new_count);
                }
            }
            CollectionAction::Move => {
                self.on_items_removed(context, change.old_start, change.old_count)?;
                self.on_items_added(change.new_start, change.new_count);
            }
            CollectionAction::Reset => self.clear_realized_range(context)?,
        }
        Ok(())
    }

    fn on_items_added(&mut self, index: usize, count: usize) {
        let realized = self.elements.len();
        if realized == 0 {
            return;
        }
        let last = self.first_index + realized - 1;
        if index > self.first_index && index <= last {
            let start = index - self.first_index;
            for offset in 0..count {
                self.insert(start + offset, index + offset, None);
            }
        } else if index <= self.first_index {
            self.first_index += count;
        }
    }

    fn on_items_removed(
        &mut self,
        context: &mut dyn LayoutContext,
        index: usize,
        count: usize,
    ) -> Result<()> {
        if self.elements.is_empty() || count == 0 {
            return Ok(());
        }
        let last = self.first_index + self.elements.len() - 1;
        let start = self.first_index.max(index);
        let end = last.min(index + count - 1);
        let affects_first = index <= self.first_index;

        if end >= start {
            let realized_index = self.realized_from_data_index(start);
            self.clear_realized_slots(context, realized_index, end - start + 1)?;
        }
        if affects_first && !self.elements.is_empty() {
            self.first_index = self.first_index.saturating_sub(count);
        }
        Ok(())
    }
}
