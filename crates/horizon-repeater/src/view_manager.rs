//! The realize/clear state machine.
//!
//! [`ViewManager`] owns every element of a container and decides where a
//! requested element comes from (already held by the layout, the made
//! anchor, the unique-id reset pool, the pinned pool or the element factory)
//! and where a cleared element goes (reset pool, animator, pinned pool or
//! back to the factory). It also keeps element indices in step with source
//! mutations.
//!
//! The lowest and highest index held by the layout are cached as a range.
//! The cache is a hint: `None` means "unknown", in which case the next
//! lookup walks the children to rebuild it.

use horizon_repeater_core::logging::targets;

use crate::element::{ElementArena, ElementFactory, ElementFactoryGetArgs, ElementId};
use crate::error::{RepeaterError, Result};
use crate::events::{
    ContainerContentChangingEvent, ElementClearingEvent, ElementIndexChangedEvent,
    ElementPreparedEvent, FocusMovedEvent, RepeaterSignals,
};
use crate::pool::{PinnedPool, UniqueIdElementPool};
use crate::source::{CollectionAction, CollectionChange, ItemsSourceView};
use crate::transition::ItemTransitionProvider;

pub(crate) struct ViewManager<T> {
    pub(crate) elements: ElementArena,
    pub(crate) children: Vec<ElementId>,
    pub(crate) source: Option<ItemsSourceView<T>>,
    pub(crate) factory: Box<dyn ElementFactory<T>>,
    pub(crate) transitions: Option<Box<dyn ItemTransitionProvider>>,
    pub(crate) signals: RepeaterSignals,
    /// Element realized through `get_or_create_element` ahead of a bring-into-view.
    pub(crate) made_anchor: Option<ElementId>,
    /// Set when an unpin released the last pin; the next measure clears it.
    pub(crate) measure_invalidated: bool,
    pinned_pool: PinnedPool,
    reset_pool: UniqueIdElementPool,
    realized_range: Option<(usize, usize)>,
    stable_reset_pending: bool,
    last_focused: Option<ElementId>,
}

impl<T: 'static> ViewManager<T> {
    pub(crate) fn new(factory: Box<dyn ElementFactory<T>>) -> Self {
        Self {
            elements: ElementArena::new(),
            children: Vec::new(),
            source: None,
            factory,
            transitions: None,
            signals: RepeaterSignals::default(),
            made_anchor: None,
            measure_invalidated: false,
            pinned_pool: PinnedPool::new(),
            reset_pool: UniqueIdElementPool::new(),
            realized_range: None,
            stable_reset_pending: false,
            last_focused: None,
        }
    }

    pub(crate) fn item_count(&self) -> usize {
        self.source.as_ref().map_or(0, ItemsSourceView::count)
    }

    pub(crate) fn realized_range(&self) -> Option<(usize, usize)> {
        self.realized_range
    }

    pub(crate) fn is_stable_reset_pending(&self) -> bool {
        self.stable_reset_pending
    }

    pub(crate) fn pinned_count(&self) -> usize {
        self.pinned_pool.len()
    }

    pub(crate) fn reset_pool_len(&self) -> usize {
        self.reset_pool.len()
    }

    pub(crate) fn focused_element(&self) -> Option<ElementId> {
        self.last_focused
    }

    // ========================================================================
    // Realize
    // ========================================================================

    /// Resolve the element for `index`, realizing one if needed.
    pub(crate) fn get_element(
        &mut self,
        index: usize,
        force_create: bool,
        suppress_auto_recycle: bool,
    ) -> Result<ElementId> {
        let mut element_is_anchor = false;
        let mut element = if force_create {
            None
        } else {
            self.element_if_already_held_by_layout(index)
        };

        if element.is_none()
            && let Some(anchor) = self.made_anchor
            && self.elements.info(anchor).and_then(|info| info.index()) == Some(index)
        {
            element = Some(anchor);
            element_is_anchor = true;
        }

        if element.is_none() {
            element = self.element_from_unique_id_reset_pool(index);
        }

        if element.is_none() || element_is_anchor {
            // The anchor may also sit in the pinned pool, for example when it holds focus.
            let from_pool = self.element_from_pinned_pool(index);
            debug_assert!(from_pool.is_none() || element.is_none() || from_pool == element);
            if element.is_none() {
                element = from_pool;
            }
        }

        let element = match element {
            Some(element) => element,
            None => self.element_from_element_factory(index)?,
        };

        if let Some(info) = self.elements.info_mut(element) {
            if suppress_auto_recycle {
                info.auto_recycle_candidate = false;
            } else {
                info.auto_recycle_candidate = true;
                info.keep_alive = true;
            }
        }

        Ok(element)
    }

    fn element_if_already_held_by_layout(&mut self, index: usize) -> Option<ElementId> {
        let cached = self.realized_range;
        if let Some((first, last)) = cached
            && (index < first || index > last)
        {
            return None;
        }

        let mut element = None;
        for &child in &self.children {
            let Some(info) = self.elements.info(child) else {
                continue;
            };
            if !info.is_held_by_layout() {
                continue;
            }
            let Some(child_index) = info.index() else {
                continue;
            };
            self.realized_range = Some(match self.realized_range {
                Some((first, last)) => (first.min(child_index), last.max(child_index)),
                None => (child_index, child_index),
            });
            if child_index == index {
                element = Some(child);
                // A valid cached range cannot grow, so the rest of the walk is moot.
                if cached.is_some() {
                    break;
                }
            }
        }
        element
    }

    fn element_from_unique_id_reset_pool(&mut self, index: usize) -> Option<ElementId> {
        if !self.stable_reset_pending {
            return None;
        }
        let key = self.source.as_ref()?.key_from_index(index)?;
        let element = self.reset_pool.remove(&key)?;
        if let Some(info) = self.elements.info_mut(element) {
            info.move_ownership_to_layout_from_unique_id_reset_pool();
        }
        self.update_element_index(element, index);
        self.extend_realized_range(index);
        tracing::trace!(target: targets::VIEW_MANAGER, index, key = %key, "element reused from reset pool");
        Some(element)
    }

    fn element_from_pinned_pool(&mut self, index: usize) -> Option<ElementId> {
        let elements = &self.elements;
        let element = self
            .pinned_pool
            .take_first(|id| elements.info(id).and_then(|info| info.index()) == Some(index))?;
        if let Some(info) = self.elements.info_mut(element) {
            info.move_ownership_to_layout_from_pinned_pool();
        }
        self.extend_realized_range(index);
        tracing::trace!(target: targets::VIEW_MANAGER, index, "element taken from pinned pool");
        Some(element)
    }

    fn element_from_element_factory(&mut self, index: usize) -> Result<ElementId> {
        let source = self.source.as_ref().ok_or(RepeaterError::MissingItemsSource)?;
        let data = source
            .item_at(index)
            .ok_or_else(|| RepeaterError::index_out_of_range(index, source.count()))?;
        let unique_id = source.key_from_index(index);

        let element = self.factory.get_element(ElementFactoryGetArgs { data, index });
        let binds_data_context = self.factory.binds_data_context();
        let id = self.elements.insert(element);

        if binds_data_context && self.signals.container_content_changing.has_connections() {
            self.signals
                .container_content_changing
                .emit(ContainerContentChangingEvent {
                    element: id,
                    index,
                    phase: 0,
                });
        }

        if let Some(info) = self.elements.info_mut(id) {
            info.must_clear_data_context = binds_data_context;
            info.move_ownership_to_layout_from_element_factory(index, unique_id);
        }
        self.children.push(id);

        if let Some(transitions) = self.transitions.as_mut() {
            transitions.on_element_prepared(id, index);
        }
        self.signals
            .element_prepared
            .emit(ElementPreparedEvent { element: id, index });

        self.extend_realized_range(index);
        tracing::trace!(target: targets::VIEW_MANAGER, index, "element realized from factory");
        Ok(id)
    }

    fn extend_realized_range(&mut self, index: usize) {
        self.realized_range = Some(match self.realized_range {
            Some((first, last)) => (first.min(index), last.max(index)),
            None => (index, index),
        });
    }

    fn invalidate_realized_range(&mut self) {
        self.realized_range = None;
    }

    fn ensure_realized_range(&mut self) {
        if self.realized_range.is_none() {
            self.element_if_already_held_by_layout(0);
        }
    }

    // ========================================================================
    // Clear
    // ========================================================================

    /// Release an element from the layout.
    pub(crate) fn clear_element(
        &mut self,
        element: ElementId,
        cleared_due_to_collection_change: bool,
    ) -> Result<()> {
        let index = self
            .elements
            .info(element)
            .ok_or(RepeaterError::UnknownElement(element))?
            .index();

        let cleared = self.clear_element_to_unique_id_reset_pool(element)?
            || self.clear_element_to_animator(element, cleared_due_to_collection_change)?
            || self.clear_element_to_pinned_pool(element, cleared_due_to_collection_change);
        if !cleared {
            self.clear_element_to_element_factory(element)?;
        }

        if let (Some(index), Some((first, last))) = (index, self.realized_range) {
            if index == first && index == last {
                self.invalidate_realized_range();
            } else if index == first {
                self.realized_range = Some((first + 1, last));
            } else if index == last {
                self.realized_range = Some((first, last - 1));
            }
        }
        Ok(())
    }

    fn clear_element_to_unique_id_reset_pool(&mut self, element: ElementId) -> Result<bool> {
        if !self.stable_reset_pending {
            return Ok(false);
        }
        let Some(key) = self
            .elements
            .info(element)
            .and_then(|info| info.unique_id())
            .map(str::to_owned)
        else {
            return Ok(false);
        };
        self.reset_pool.add(&key, element)?;
        if let Some(info) = self.elements.info_mut(element) {
            info.move_ownership_to_unique_id_reset_pool();
        }
        tracing::trace!(target: targets::VIEW_MANAGER, key = %key, "element parked in reset pool");
        Ok(true)
    }

    fn clear_element_to_animator(
        &mut self,
        element: ElementId,
        cleared_due_to_collection_change: bool,
    ) -> Result<bool> {
        let Some(transitions) = self.transitions.as_mut() else {
            return Ok(false);
        };
        let Some(info) = self.elements.info_mut(element) else {
            return Ok(false);
        };
        let cleared_index = info.index();
        if !transitions.should_animate_departure(element, cleared_index, cleared_due_to_collection_change) {
            return Ok(false);
        }
        info.move_ownership_to_animator();
        if self.made_anchor == Some(element) {
            self.made_anchor = None;
        }
        if self.last_focused == Some(element) {
            self.move_focus_from_cleared_index(cleared_index.unwrap_or(0))?;
        }
        Ok(true)
    }

    fn clear_element_to_pinned_pool(
        &mut self,
        element: ElementId,
        cleared_due_to_collection_change: bool,
    ) -> bool {
        let Some(info) = self.elements.info_mut(element) else {
            return false;
        };
        if cleared_due_to_collection_change || !info.is_pinned() {
            return false;
        }
        info.move_ownership_to_pinned_pool();
        self.pinned_pool.push(element);
        true
    }

    /// Hand an element back to the element factory.
    pub(crate) fn clear_element_to_element_factory(&mut self, element: ElementId) -> Result<()> {
        self.signals
            .element_clearing
            .emit(ElementClearingEvent { element });

        let info = self
            .elements
            .info_mut(element)
            .ok_or(RepeaterError::UnknownElement(element))?;
        let cleared_index = info.index();
        let must_clear_data_context = info.must_clear_data_context;
        info.move_ownership_to_element_factory();

        if must_clear_data_context && let Some(view) = self.elements.element_mut(element) {
            view.clear_data_context();
        }

        self.children.retain(|&child| child != element);
        if self.made_anchor == Some(element) {
            self.made_anchor = None;
        }
        if let Some(view) = self.elements.remove(element) {
            self.factory.recycle_element(view);
        }
        tracing::trace!(target: targets::VIEW_MANAGER, index = ?cleared_index, "element recycled to factory");

        if self.last_focused == Some(element) {
            self.move_focus_from_cleared_index(cleared_index.unwrap_or(0))?;
        }
        Ok(())
    }

    /// Release an animated element once its departure transition finished.
    pub(crate) fn complete_transition(&mut self, element: ElementId) -> Result<()> {
        let info = self
            .elements
            .info(element)
            .ok_or(RepeaterError::UnknownElement(element))?;
        if info.owner() != crate::virtualization::ElementOwner::Animator {
            return Ok(());
        }
        self.clear_element_to_element_factory(element)
    }

    // ========================================================================
    // Focus & pinning
    // ========================================================================

    fn move_focus_from_cleared_index(&mut self, cleared_index: usize) -> Result<()> {
        match self.find_focus_candidate(cleared_index) {
            Some(candidate) => {
                if let Some(view) = self.elements.element_mut(candidate) {
                    view.focus();
                }
                self.last_focused = Some(candidate);
                self.update_pin(candidate, true)?;
                tracing::trace!(target: targets::VIEW_MANAGER, cleared_index, "focus moved to successor");
            }
            None => {
                self.last_focused = None;
            }
        }
        self.signals.focus_moved.emit(FocusMovedEvent {
            element: self.last_focused,
        });
        Ok(())
    }

    /// Nearest realized element around `cleared_index`, preferring the next one.
    ///
    /// After a removal the next element takes over the cleared index, which is
    /// why the forward search includes it.
    fn find_focus_candidate(&self, cleared_index: usize) -> Option<ElementId> {
        let mut previous: Option<(usize, ElementId)> = None;
        let mut next: Option<(usize, ElementId)> = None;

        for &child in &self.children {
            let Some(info) = self.elements.info(child) else {
                continue;
            };
            if !info.is_held_by_layout() {
                continue;
            }
            let Some(index) = info.index() else {
                continue;
            };
            if index < cleared_index {
                if previous.is_none_or(|(best, _)| index > best) {
                    previous = Some((index, child));
                }
            } else if next.is_none_or(|(best, _)| index < best) {
                next = Some((index, child));
            }
        }

        next.or(previous).map(|(_, element)| element)
    }

    /// Track the element holding keyboard focus, moving the focus pin along.
    pub(crate) fn update_focused_element(&mut self, focused: Option<ElementId>) -> Result<()> {
        let focused = focused.filter(|&element| {
            self.elements
                .info(element)
                .is_some_and(|info| info.is_realized())
        });
        if self.last_focused == focused {
            return Ok(());
        }
        if let Some(previous) = self.last_focused {
            self.update_pin(previous, false)?;
        }
        if let Some(element) = focused {
            self.update_pin(element, true)?;
        }
        self.last_focused = focused;
        Ok(())
    }

    pub(crate) fn update_pin(&mut self, element: ElementId, add_pin: bool) -> Result<()> {
        let Some(info) = self.elements.info_mut(element) else {
            return Ok(());
        };
        if !info.is_realized() {
            return Ok(());
        }
        if add_pin {
            info.add_pin()?;
        } else if info.is_pinned() && info.remove_pin()? == 0 {
            // The element is cleared during the next measure pass.
            self.measure_invalidated = true;
        }
        Ok(())
    }

    /// Index of an element that is realized or parked in the reset pool.
    pub(crate) fn element_index(&self, element: ElementId) -> Option<usize> {
        let info = self.elements.info(element)?;
        if info.is_realized() || info.is_in_unique_id_reset_pool() {
            info.index()
        } else {
            None
        }
    }

    /// Clear pinned-pool elements whose last pin was released.
    pub(crate) fn prune_pinned_elements(&mut self) -> Result<()> {
        let unpinned: Vec<ElementId> = self
            .pinned_pool
            .iter()
            .filter(|&element| {
                self.elements
                    .info(element)
                    .is_none_or(|info| !info.is_pinned())
            })
            .collect();

        for element in unpinned {
            self.pinned_pool.remove(element);
            if self.elements.contains(element) {
                self.clear_element_to_element_factory(element)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Source changes
    // ========================================================================

    fn update_element_index(&mut self, element: ElementId, new_index: usize) {
        let Some(info) = self.elements.info_mut(element) else {
            return;
        };
        let old_index = info.index();
        if old_index == Some(new_index) {
            return;
        }
        info.update_index(new_index);
        if let Some(old_index) = old_index {
            self.signals
                .element_index_changed
                .emit(ElementIndexChangedEvent {
                    element,
                    old_index,
                    new_index,
                });
        }
    }

    /// Realized children with their current index.
    fn realized_children(&self) -> Vec<(ElementId, usize)> {
        self.children
            .iter()
            .filter_map(|&child| {
                let info = self.elements.info(child)?;
                if info.is_realized() {
                    info.index().map(|index| (child, index))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Reindex (and clear) elements after a source mutation.
    pub(crate) fn on_items_source_changed(&mut self, change: &CollectionChange) -> Result<()> {
        change.validate()?;
        tracing::trace!(target: targets::VIEW_MANAGER, action = ?change.action, "processing collection change");

        match change.action {
            CollectionAction::Add => self.on_items_added(change.new_start, change.new_count),
            CollectionAction::Replace => {
                let delta = change.new_count as isize - change.old_count as isize;
                if delta != 0 {
                    let threshold = change.old_start + change.old_count;
                    for (element, index) in self.realized_children() {
                        if index >= threshold {
                            self.update_element_index(element, index.saturating_add_signed(delta));
                        }
                    }
                    self.ensure_realized_range();
                    if let Some((first, last)) = self.realized_range {
                        self.realized_range = Some((first, last.saturating_add_signed(delta)));
                    }
                }
            }
            CollectionAction::Remove => {
                self.on_items_removed(change.old_start, change.old_count)?;
            }
            CollectionAction::Move => {
                self.on_items_removed(change.old_start, change.old_count)?;
                self.on_items_added(change.new_start, change.new_count);
            }
            CollectionAction::Reset => {
                // Back-to-back resets before a layout pass only need one clear.
                if !self.stable_reset_pending {
                    if self
                        .source
                        .as_ref()
                        .is_some_and(ItemsSourceView::has_key_index_mapping)
                    {
                        self.stable_reset_pending = true;
                    }
                    for (element, _) in self.realized_children() {
                        let auto_recycle = self
                            .elements
                            .info(element)
                            .is_some_and(|info| info.auto_recycle_candidate());
                        if auto_recycle {
                            self.clear_element(element, true)?;
                        }
                    }
                }
                self.invalidate_realized_range();
            }
        }
        Ok(())
    }

    fn on_items_added(&mut self, new_start: usize, new_count: usize) {
        self.ensure_realized_range();
        match self.realized_range {
            Some((first, last)) if new_start <= last => {
                self.realized_range = Some((first, last + new_count));
                for (element, index) in self.realized_children() {
                    if index >= new_start {
                        self.update_element_index(element, index + new_count);
                    }
                }
            }
            _ => {
                // Indices held by the layout are unaffected, pinned elements may still move.
                let pinned: Vec<ElementId> = self.pinned_pool.iter().collect();
                for element in pinned {
                    let Some(info) = self.elements.info(element) else {
                        continue;
                    };
                    if let Some(index) = info.index()
                        && info.is_pinned()
                        && index >= new_start
                    {
                        self.update_element_index(element, index + new_count);
                    }
                }
            }
        }
    }

    fn on_items_removed(&mut self, old_start: usize, old_count: usize) -> Result<()> {
        let old_end = old_start + old_count;
        for (element, index) in self.realized_children() {
            let auto_recycle = self
                .elements
                .info(element)
                .is_some_and(|info| info.auto_recycle_candidate());
            if auto_recycle && (old_start..old_end).contains(&index) {
                self.clear_element(element, true)?;
            } else if index >= old_end {
                self.update_element_index(element, index - old_count);
            }
        }
        // Either edge may move depending on which elements were eligible.
        self.invalidate_realized_range();
        Ok(())
    }

    /// A new layout is attached; keyed elements survive through the reset pool.
    pub(crate) fn on_layout_changing(&mut self) {
        if self
            .source
            .as_ref()
            .is_some_and(ItemsSourceView::has_key_index_mapping)
        {
            self.stable_reset_pending = true;
        }
    }

    /// Flush the reset pool after the arrange pass that followed a reset.
    pub(crate) fn on_owner_arranged(&mut self) -> Result<()> {
        if !self.stable_reset_pending {
            return Ok(());
        }
        self.stable_reset_pending = false;
        for element in self.reset_pool.drain() {
            self.clear_element(element, true)?;
        }
        self.invalidate_realized_range();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::test_support::{SizedTemplate, TestElement};
    use crate::element::RecyclingElementFactory;
    use crate::virtualization::ElementOwner;
    use horizon_repeater_core::Size;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn manager(count: usize) -> ViewManager<Size> {
        let mut manager: ViewManager<Size> =
            ViewManager::new(Box::new(RecyclingElementFactory::new(SizedTemplate)));
        manager.source = Some(ItemsSourceView::new(vec![Size::new(100.0, 20.0); count]));
        manager
    }

    fn keyed_manager(count: usize) -> ViewManager<String> {
        let items = (0..count).map(|i| format!("item-{i}")).collect();
        struct LabelTemplate;
        impl crate::element::DataTemplate<String> for LabelTemplate {
            fn build(&mut self) -> Box<dyn crate::element::Element> {
                Box::new(TestElement::new(100.0, 20.0))
            }
            fn bind(&mut self, element: &mut (dyn crate::element::Element + 'static), _: &String, index: usize) {
                if let Some(element) = element.downcast_mut::<TestElement>() {
                    element.label = Some(index);
                }
            }
        }
        let mut manager: ViewManager<String> =
            ViewManager::new(Box::new(RecyclingElementFactory::new(LabelTemplate)));
        manager.source = Some(ItemsSourceView::with_key_mapping(items, |s: &String| s.clone()));
        manager
    }

    fn realize(manager: &mut ViewManager<Size>, range: std::ops::Range<usize>) -> Vec<ElementId> {
        range
            .map(|index| manager.get_element(index, false, false).unwrap())
            .collect()
    }

    #[test]
    fn test_realize_tracks_range_and_owner() {
        let mut manager = manager(50);
        let elements = realize(&mut manager, 3..8);
        assert_eq!(manager.realized_range(), Some((3, 7)));
        let info = manager.elements.info(elements[0]).unwrap();
        assert_eq!(info.owner(), ElementOwner::Layout);
        assert_eq!(info.index(), Some(3));
        assert!(info.auto_recycle_candidate());
        assert!(info.keep_alive());
        assert!(info.must_clear_data_context());
    }

    #[test]
    fn test_get_element_returns_held_element() {
        let mut manager = manager(10);
        let first = manager.get_element(4, false, false).unwrap();
        assert_eq!(manager.get_element(4, false, false).unwrap(), first);
        let forced = manager.get_element(4, true, true).unwrap();
        assert_ne!(forced, first);
        assert!(!manager.elements.info(forced).unwrap().auto_recycle_candidate());
    }

    #[test]
    fn test_get_element_out_of_range() {
        let mut manager = manager(3);
        let err = manager.get_element(3, false, false).unwrap_err();
        assert!(matches!(err, RepeaterError::IndexOutOfRange { index: 3, count: 3 }));
    }

    #[test]
    fn test_clear_shrinks_range_at_edges() {
        let mut manager = manager(10);
        let elements = realize(&mut manager, 0..4);
        manager.clear_element(elements[0], false).unwrap();
        assert_eq!(manager.realized_range(), Some((1, 3)));
        manager.clear_element(elements[3], false).unwrap();
        assert_eq!(manager.realized_range(), Some((1, 2)));
        manager.clear_element(elements[1], false).unwrap();
        manager.clear_element(elements[2], false).unwrap();
        assert_eq!(manager.realized_range(), None);
        assert!(manager.children.is_empty());
        assert!(manager.elements.is_empty());
    }

    #[test]
    fn test_pinned_element_survives_clear() {
        let mut manager = manager(10);
        let element = manager.get_element(2, false, false).unwrap();
        manager.update_pin(element, true).unwrap();
        manager.clear_element(element, false).unwrap();

        assert_eq!(manager.elements.info(element).unwrap().owner(), ElementOwner::PinnedPool);
        assert_eq!(manager.element_index(element), Some(2));
        assert_eq!(manager.pinned_count(), 1);

        // Re-requesting the index hands back the same element.
        assert_eq!(manager.get_element(2, false, false).unwrap(), element);
        assert_eq!(manager.pinned_count(), 0);
    }

    #[test]
    fn test_collection_change_clear_ignores_pins() {
        let mut manager = manager(10);
        let element = manager.get_element(2, false, false).unwrap();
        manager.update_pin(element, true).unwrap();
        manager.clear_element(element, true).unwrap();
        assert!(!manager.elements.contains(element));
    }

    #[test]
    fn test_prune_releases_unpinned_elements() {
        let mut manager = manager(10);
        let element = manager.get_element(2, false, false).unwrap();
        manager.update_pin(element, true).unwrap();
        manager.clear_element(element, false).unwrap();

        manager.update_pin(element, false).unwrap();
        assert!(manager.measure_invalidated);
        manager.prune_pinned_elements().unwrap();
        assert!(!manager.elements.contains(element));
        assert_eq!(manager.pinned_count(), 0);
    }

    #[test]
    fn test_add_shifts_following_elements() {
        let mut manager = manager(20);
        let elements = realize(&mut manager, 0..6);
        manager.source.as_mut().unwrap().insert_many(2, vec![Size::ZERO; 3]).unwrap();
        manager.on_items_source_changed(&CollectionChange::add(2, 3)).unwrap();

        let indices: Vec<_> = elements.iter().map(|&e| manager.element_index(e).unwrap()).collect();
        assert_eq!(indices, vec![0, 1, 5, 6, 7, 8]);
        assert_eq!(manager.realized_range(), Some((0, 8)));
    }

    #[test]
    fn test_add_after_range_only_shifts_pinned() {
        let mut manager = manager(20);
        let elements = realize(&mut manager, 0..3);
        let pinned = manager.get_element(15, false, false).unwrap();
        manager.update_pin(pinned, true).unwrap();
        manager.clear_element(pinned, false).unwrap();

        manager.on_items_source_changed(&CollectionChange::add(10, 2)).unwrap();
        assert_eq!(manager.element_index(pinned), Some(17));
        assert_eq!(manager.element_index(elements[2]), Some(2));
    }

    #[test]
    fn test_remove_clears_and_shifts() {
        let mut manager = manager(30);
        let elements = realize(&mut manager, 0..10);
        let changed = Arc::new(Mutex::new(Vec::new()));
        let changed_clone = changed.clone();
        manager.signals.element_index_changed.connect(move |event| {
            changed_clone.lock().push((event.old_index, event.new_index));
        });

        manager.source.as_mut().unwrap().remove_range(2, 3).unwrap();
        manager.on_items_source_changed(&CollectionChange::remove(2, 3)).unwrap();

        for &element in &elements[2..5] {
            assert!(!manager.elements.contains(element));
        }
        assert_eq!(manager.element_index(elements[5]), Some(2));
        assert_eq!(manager.element_index(elements[9]), Some(6));
        assert_eq!(manager.realized_range(), None);
        assert_eq!(changed.lock().len(), 5);
    }

    #[test]
    fn test_remove_keeps_non_recyclable_elements() {
        let mut manager = manager(10);
        let element = manager.get_element(3, true, true).unwrap();
        manager.on_items_source_changed(&CollectionChange::remove(3, 1)).unwrap();
        assert!(manager.elements.contains(element));
    }

    #[test]
    fn test_replace_with_different_count_shifts() {
        let mut manager = manager(10);
        let elements = realize(&mut manager, 0..5);
        manager.on_items_source_changed(&CollectionChange::replace(1, 1, 3)).unwrap();
        assert_eq!(manager.element_index(elements[1]), Some(1));
        assert_eq!(manager.element_index(elements[2]), Some(4));
        assert_eq!(manager.element_index(elements[4]), Some(6));
        assert_eq!(manager.realized_range(), Some((0, 6)));
    }

    #[test]
    fn test_invalid_replace_is_rejected() {
        let mut manager = manager(10);
        let err = manager
            .on_items_source_changed(&CollectionChange::replace(1, 0, 2))
            .unwrap_err();
        assert!(matches!(err, RepeaterError::InvalidCollectionChange(_)));
    }

    #[test]
    fn test_move_reindexes_like_remove_then_add() {
        let mut manager = manager(10);
        let elements = realize(&mut manager, 0..5);
        manager.on_items_source_changed(&CollectionChange::move_items(1, 3, 1)).unwrap();
        assert!(!manager.elements.contains(elements[1]));
        assert_eq!(manager.element_index(elements[0]), Some(0));
        assert_eq!(manager.element_index(elements[2]), Some(1));
        assert_eq!(manager.element_index(elements[3]), Some(2));
        assert_eq!(manager.element_index(elements[4]), Some(4));
    }

    #[test]
    fn test_stable_reset_reuses_element_for_same_key() {
        let mut manager = keyed_manager(10);
        let element = manager.get_element(4, false, false).unwrap();
        assert_eq!(
            manager.elements.info(element).unwrap().unique_id(),
            Some("item-4")
        );

        let source = manager.source.as_mut().unwrap();
        let mut items = source.items().to_vec();
        items.reverse();
        source.reset(items);
        manager.on_items_source_changed(&CollectionChange::reset()).unwrap();

        assert!(manager.is_stable_reset_pending());
        assert_eq!(manager.reset_pool_len(), 1);
        assert_eq!(manager.element_index(element), Some(4));

        // "item-4" now lives at index 5.
        let reused = manager.get_element(5, false, false).unwrap();
        assert_eq!(reused, element);
        assert_eq!(manager.element_index(element), Some(5));

        manager.on_owner_arranged().unwrap();
        assert!(!manager.is_stable_reset_pending());
        assert!(manager.elements.contains(element));
    }

    #[test]
    fn test_reset_pool_flush_recycles_orphans() {
        let mut manager = keyed_manager(4);
        let element = manager.get_element(1, false, false).unwrap();
        manager.source.as_mut().unwrap().reset(vec!["other".to_string()]);
        manager.on_items_source_changed(&CollectionChange::reset()).unwrap();
        manager.on_owner_arranged().unwrap();
        assert!(!manager.elements.contains(element));
        assert_eq!(manager.reset_pool_len(), 0);
    }

    #[test]
    fn test_unkeyed_reset_recycles_immediately() {
        let mut manager = manager(10);
        let elements = realize(&mut manager, 0..3);
        manager.on_items_source_changed(&CollectionChange::reset()).unwrap();
        assert!(!manager.is_stable_reset_pending());
        assert!(elements.iter().all(|&e| !manager.elements.contains(e)));
    }

    #[test]
    fn test_focus_moves_to_next_element() {
        let mut manager = manager(10);
        let elements = realize(&mut manager, 0..4);
        manager.update_focused_element(Some(elements[1])).unwrap();
        assert_eq!(manager.elements.info(elements[1]).unwrap().pin_count(), 1);

        manager.on_items_source_changed(&CollectionChange::remove(1, 1)).unwrap();

        // The old element 2 now sits at index 1 and takes over focus and the pin.
        assert_eq!(manager.focused_element(), Some(elements[2]));
        assert_eq!(manager.elements.info(elements[2]).unwrap().pin_count(), 1);
        assert!(manager.elements.downcast_ref::<TestElement>(elements[2]).unwrap().focused);
    }

    #[test]
    fn test_focus_falls_back_to_previous_element() {
        let mut manager = manager(10);
        let elements = realize(&mut manager, 0..3);
        manager.update_focused_element(Some(elements[2])).unwrap();
        manager.on_items_source_changed(&CollectionChange::remove(2, 1)).unwrap();
        assert_eq!(manager.focused_element(), Some(elements[1]));
    }

    #[test]
    fn test_clearing_emits_signal_and_clears_context() {
        let mut manager = manager(5);
        let count = Arc::new(Mutex::new(0));
        let count_clone = count.clone();
        manager.signals.element_clearing.connect(move |_| *count_clone.lock() += 1);

        let element = manager.get_element(0, false, false).unwrap();
        manager.clear_element(element, false).unwrap();
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_content_changing_only_when_observed() {
        let mut manager = manager(5);
        manager.get_element(0, false, false).unwrap();

        let phases = Arc::new(Mutex::new(Vec::new()));
        let phases_clone = phases.clone();
        manager
            .signals
            .container_content_changing
            .connect(move |event| phases_clone.lock().push((event.index, event.phase)));
        manager.get_element(1, false, false).unwrap();
        assert_eq!(*phases.lock(), vec![(1, 0)]);
    }
}
