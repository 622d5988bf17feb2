//! A selectable collection view on top of [`ItemsRepeater`].
//!
//! [`ItemsView`] keeps a [`SelectionModel`] in step with the items source of
//! its repeater, routes user gestures through the [`Selector`] of the
//! configured [`SelectionMode`] and pushes the selected state onto every
//! realized element.
//!
//! Focus and bring-into-view requests for items that are not realized yet
//! are recorded and resolved after the layout pass that realizes them.

use horizon_repeater_core::logging::targets;
use horizon_repeater_core::{Rect, Signal, Size};

use crate::element::{ElementFactory, ElementId};
use crate::error::{RepeaterError, Result};
use crate::layout::LayoutKind;
use crate::repeater::ItemsRepeater;
use crate::selection::{Modifiers, SelectionMode, SelectionModel, Selector, translate_index};
use crate::source::{CollectionAction, CollectionChange, ItemsSourceView};

/// Emitted when the item asked for by
/// [`ItemsView::start_bring_item_into_view`] has been arranged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BringIntoViewEvent {
    pub index: usize,
    pub element: ElementId,
    /// Arranged bounds, in repeater coordinates.
    pub bounds: Rect,
}

/// Emitted when an item is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemInvokedEvent {
    pub index: usize,
}

/// A collection view with selection, a current item and deferred focus.
///
/// Items must be `Clone + PartialEq` so the selected-items list can be kept
/// and written back by value.
pub struct ItemsView<T: 'static> {
    repeater: ItemsRepeater<T>,
    selection: SelectionModel,
    current: SelectionModel,
    selector: Selector,
    selected_items: Vec<T>,
    item_invoked_enabled: bool,
    pending_focus: Option<usize>,
    pending_bring_into_view: Option<usize>,

    /// Emitted when the current item changes. Args: the new current index.
    pub current_item_changed: Signal<Option<usize>>,
    /// Emitted when an item is invoked while invocation is enabled.
    pub item_invoked: Signal<ItemInvokedEvent>,
    /// Emitted after arrange once a bring-into-view target has bounds.
    pub bring_into_view_requested: Signal<BringIntoViewEvent>,
}

impl<T: 'static> std::fmt::Debug for ItemsView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemsView")
            .field("repeater", &self.repeater)
            .field("selection_mode", &self.selector.mode())
            .field("selected", &self.selection.selected_count())
            .field("current", &self.current.selected_index())
            .field("pending_focus", &self.pending_focus)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> ItemsView<T> {
    /// Create a view with a fresh repeater using `factory`.
    pub fn new(factory: impl ElementFactory<T> + 'static) -> Self {
        Self::with_repeater(ItemsRepeater::new(factory))
    }

    /// Wrap an existing repeater. Its source, if any, becomes the selection source.
    pub fn with_repeater(repeater: ItemsRepeater<T>) -> Self {
        let count = repeater.item_count();
        let selector = Selector::default();
        let mut selection = SelectionModel::with_item_count(count);
        selector.attach(&mut selection);
        let mut current = SelectionModel::with_item_count(count);
        current.set_single_select(true);

        Self {
            repeater,
            selection,
            current,
            selector,
            selected_items: Vec::new(),
            item_invoked_enabled: false,
            pending_focus: None,
            pending_bring_into_view: None,
            current_item_changed: Signal::new(),
            item_invoked: Signal::new(),
            bring_into_view_requested: Signal::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn repeater(&self) -> &ItemsRepeater<T> {
        &self.repeater
    }

    /// Direct access to the repeater.
    ///
    /// Source mutations made through it bypass selection tracking; use
    /// [`update_source`](Self::update_source) instead.
    #[inline]
    pub fn repeater_mut(&mut self) -> &mut ItemsRepeater<T> {
        &mut self.repeater
    }

    /// The selection model. Connect to its `selection_changed` signal to
    /// observe changes.
    #[inline]
    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    #[inline]
    pub fn selection_mode(&self) -> SelectionMode {
        self.selector.mode()
    }

    /// Swap the selector. `Single` trims the selection to one item and
    /// `None` clears it.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        if self.selector.mode() == mode {
            return;
        }
        self.selector = Selector::for_mode(mode);
        self.selector.attach(&mut self.selection);
        tracing::debug!(target: targets::SELECTION, ?mode, "selection mode changed");
        self.selection_updated();
    }

    #[inline]
    pub fn is_item_invoked_enabled(&self) -> bool {
        self.item_invoked_enabled
    }

    pub fn set_item_invoked_enabled(&mut self, enabled: bool) {
        self.item_invoked_enabled = enabled;
    }

    pub fn set_layout(&mut self, layout: impl Into<LayoutKind>) -> Result<()> {
        self.repeater.set_layout(layout)
    }

    pub fn set_item_template(&mut self, template: impl ElementFactory<T> + 'static) -> Result<()> {
        self.repeater.set_item_template(template)
    }

    pub fn set_visible_window(&mut self, window: Rect) -> bool {
        self.repeater.set_visible_window(window)
    }

    // =========================================================================
    // Layout passes
    // =========================================================================

    pub fn measure(&mut self, available: Size) -> Result<Size> {
        let desired = self.repeater.measure(available)?;
        self.sync_realized_elements();
        Ok(desired)
    }

    /// Arrange, then resolve pending focus and bring-into-view requests.
    pub fn arrange(&mut self, final_size: Size) -> Result<Size> {
        let arranged = self.repeater.arrange(final_size)?;
        self.sync_realized_elements();

        if let Some(index) = self.pending_bring_into_view
            && let Some(element) = self.repeater.try_get_element(index)
        {
            self.pending_bring_into_view = None;
            let bounds = self
                .repeater
                .elements()
                .info(element)
                .map(|info| info.arrange_bounds())
                .unwrap_or(Rect::INVALID);
            self.bring_into_view_requested.emit(BringIntoViewEvent {
                index,
                element,
                bounds,
            });
        }
        if let Some(index) = self.pending_focus
            && self.repeater.try_get_element(index).is_some()
        {
            self.try_focus_item(index)?;
        }
        Ok(arranged)
    }

    // =========================================================================
    // Source
    // =========================================================================

    /// Attach a new source (or detach with `None`).
    ///
    /// Written selected items that exist in the new source stay selected.
    pub fn set_items_source(&mut self, source: Option<ItemsSourceView<T>>) -> Result<()> {
        self.repeater.set_items_source(source)?;
        self.on_source_changed(&CollectionChange::reset());
        Ok(())
    }

    /// Mutate the source through the repeater and translate the selection.
    pub fn update_source<F>(&mut self, mutate: F) -> Result<CollectionChange>
    where
        F: FnOnce(&mut ItemsSourceView<T>) -> Result<CollectionChange>,
    {
        let change = self.repeater.update_source(mutate)?;
        self.on_source_changed(&change);
        Ok(change)
    }

    fn on_source_changed(&mut self, change: &CollectionChange) {
        let count = self.repeater.item_count();
        let written = std::mem::take(&mut self.selected_items);
        let previous_current = self.current.selected_index();

        self.selection.on_source_changed(change, count);
        self.current.on_source_changed(change, count);
        self.pending_focus = self.pending_focus.and_then(|index| translate_index(index, change));
        self.pending_bring_into_view = self
            .pending_bring_into_view
            .and_then(|index| translate_index(index, change));

        if change.action == CollectionAction::Reset {
            self.select_items_by_value(&written);
        }
        if self.current.selected_index() != previous_current {
            self.current_item_changed.emit(self.current.selected_index());
        }
        self.selection_updated();
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select `index` programmatically. Ignored while the mode is `None`.
    pub fn select(&mut self, index: usize) -> bool {
        if !self.selector.can_select() {
            tracing::trace!(target: targets::SELECTION, index, "select ignored, selection disabled");
            return false;
        }
        let changed = self.selection.select(index);
        self.selection_updated();
        changed
    }

    pub fn deselect(&mut self, index: usize) -> bool {
        let changed = self.selection.deselect(index);
        self.selection_updated();
        changed
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selection.is_selected(index)
    }

    /// Select every item. Only `Multiple` and `Extended` select more than one.
    pub fn select_all(&mut self) {
        self.selector.select_all(&mut self.selection);
        self.selection_updated();
    }

    pub fn deselect_all(&mut self) {
        self.selector.clear(&mut self.selection);
        self.selection_updated();
    }

    /// Flip the selected state of every item. Only `Multiple` and `Extended`.
    pub fn invert_selection(&mut self) {
        if !matches!(self.selector, Selector::Multiple | Selector::Extended) {
            return;
        }
        let count = self.selection.item_count();
        if count == 0 {
            return;
        }
        let unselected: Vec<usize> = (0..count).filter(|&i| !self.selection.is_selected(i)).collect();
        self.selection.deselect_range(0, count - 1);
        for index in unselected {
            self.selection.select_range(index, index);
        }
        self.selection_updated();
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selection.selected_index()
    }

    pub fn selected_indices(&self) -> Vec<usize> {
        self.selection.selected_indices()
    }

    /// The item at [`selected_index`](Self::selected_index).
    pub fn selected_item(&self) -> Option<&T> {
        let index = self.selection.selected_index()?;
        self.repeater.items_source()?.item_at(index)
    }

    /// Selected items in index order.
    #[inline]
    pub fn selected_items(&self) -> &[T] {
        &self.selected_items
    }

    /// Replace the selection with the given items. Items that are not in the
    /// source are dropped.
    ///
    /// Items are matched by value. Equal items claim distinct occurrences in
    /// source order, so two equal selected items select the first two copies
    /// whichever copies were selected before.
    pub fn set_selected_items(&mut self, items: Vec<T>) {
        self.selection.clear();
        self.select_items_by_value(&items);
        self.selection_updated();
    }

    fn select_items_by_value(&mut self, items: &[T]) {
        if !self.selector.can_select() {
            return;
        }
        let Some(source) = self.repeater.items_source() else {
            return;
        };
        let mut claimed = vec![false; source.count()];
        let mut indices = Vec::with_capacity(items.len());
        for item in items {
            let found = source
                .items()
                .iter()
                .enumerate()
                .position(|(index, candidate)| !claimed[index] && candidate == item);
            if let Some(index) = found {
                claimed[index] = true;
                indices.push(index);
            }
        }
        for index in indices {
            self.selection.select_range(index, index);
        }
    }

    /// Route a click or tap on `index` through the selector.
    ///
    /// The item becomes the current item and is focused when realized.
    /// Returns whether focus moved to it.
    pub fn process_interaction(&mut self, index: usize, modifiers: Modifiers) -> Result<bool> {
        self.check_index(index)?;
        self.set_current_item_index(Some(index));
        let focused = self.try_focus_item(index)?;
        self.selector.on_interacted(&mut self.selection, index, modifiers);
        self.selection_updated();
        Ok(focused)
    }

    /// Route a keyboard focus move onto `index` through the selector.
    pub fn process_focus(&mut self, index: usize, modifiers: Modifiers) -> Result<()> {
        self.check_index(index)?;
        self.set_current_item_index(Some(index));
        self.selector.on_focused(&mut self.selection, index, modifiers);
        self.selection_updated();
        Ok(())
    }

    /// A realized element's own selected state was toggled (for example by a
    /// check box in its template).
    ///
    /// The toggle goes through the selector. While the mode is `None` the
    /// element is snapped back to unselected. Returns the resulting state.
    pub fn on_element_selection_toggled(&mut self, element: ElementId, selected: bool) -> Result<bool> {
        let index = self
            .repeater
            .element_index(element)
            .ok_or(RepeaterError::UnknownElement(element))?;
        let selected = self.selector.on_item_toggled(&mut self.selection, index, selected);
        self.selection_updated();
        if let Some(element) = self.repeater.element_mut(element)
            && element.is_selected() != selected
        {
            element.set_selected(selected);
        }
        Ok(selected)
    }

    fn selection_updated(&mut self) {
        let items = match self.repeater.items_source() {
            Some(source) => self
                .selection
                .selected_indices()
                .into_iter()
                .filter_map(|index| source.item_at(index).cloned())
                .collect(),
            None => Vec::new(),
        };
        self.selected_items = items;
        self.sync_realized_elements();
    }

    /// Push the selected state onto every element the layout holds.
    fn sync_realized_elements(&mut self) {
        let elements = self.repeater.elements();
        let realized: Vec<(ElementId, usize)> = self
            .repeater
            .children()
            .iter()
            .filter_map(|&child| {
                let info = elements.info(child)?;
                if info.is_held_by_layout() { Some((child, info.index()?)) } else { None }
            })
            .collect();
        for (child, index) in realized {
            let selected = self.selection.is_selected(index);
            if let Some(element) = self.repeater.element_mut(child)
                && element.is_selected() != selected
            {
                element.set_selected(selected);
            }
        }
    }

    // =========================================================================
    // Current item, focus and invocation
    // =========================================================================

    #[inline]
    pub fn current_item_index(&self) -> Option<usize> {
        self.current.selected_index()
    }

    /// Move the current item. Returns `true` if it changed.
    pub fn set_current_item_index(&mut self, index: Option<usize>) -> bool {
        let previous = self.current.selected_index();
        match index {
            Some(index) => {
                self.current.select(index);
            }
            None => {
                self.current.clear();
            }
        }
        let current = self.current.selected_index();
        if current == previous {
            return false;
        }
        self.current_item_changed.emit(current);
        true
    }

    /// Realize `index` and make it the anchor of the next layout pass.
    ///
    /// [`bring_into_view_requested`](Self::bring_into_view_requested) fires
    /// from the arrange that positions it, so the host can scroll there.
    pub fn start_bring_item_into_view(&mut self, index: usize) -> Result<ElementId> {
        let element = self.repeater.get_or_create_element(index)?;
        self.pending_bring_into_view = Some(index);
        Ok(element)
    }

    /// Focus the element of `index`.
    ///
    /// If it is not realized, the request is kept and retried after the next
    /// arrange. A later request replaces it and removing the item cancels it.
    pub fn try_focus_item(&mut self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        let Some(element) = self.repeater.try_get_element(index) else {
            tracing::trace!(target: targets::REPEATER, index, "focus deferred until realized");
            self.pending_focus = Some(index);
            return Ok(false);
        };
        self.pending_focus = None;
        let focused = self
            .repeater
            .element_mut(element)
            .is_some_and(|element| element.focus());
        if focused {
            self.repeater.set_focused_element(Some(element))?;
        }
        Ok(focused)
    }

    /// Index whose focus is still waiting for its element.
    #[inline]
    pub fn pending_focus_index(&self) -> Option<usize> {
        self.pending_focus
    }

    /// Invoke `index`. Emits [`item_invoked`](Self::item_invoked) when enabled.
    pub fn invoke_item(&mut self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        if !self.item_invoked_enabled {
            return Ok(false);
        }
        self.item_invoked.emit(ItemInvokedEvent { index });
        Ok(true)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let count = self.repeater.item_count();
        if index >= count {
            return Err(RepeaterError::index_out_of_range(index, count));
        }
        Ok(())
    }
}
