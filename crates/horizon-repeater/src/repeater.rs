//! The virtualizing container.
//!
//! [`ItemsRepeater`] ties an items source, an element factory and a layout
//! together. The host drives it with `measure` and `arrange` calls and feeds
//! it source mutations through [`ItemsRepeater::update_source`]; the
//! repeater realizes and recycles elements so that only the items inside the
//! realization window hold an element.
//!
//! # Example
//!
//! ```ignore
//! use horizon_repeater::{ItemsRepeater, ItemsSourceView, RecyclingElementFactory, StackLayout};
//!
//! let mut repeater = ItemsRepeater::new(RecyclingElementFactory::new(RowTemplate));
//! repeater.set_items_source(Some(ItemsSourceView::new(rows)))?;
//! repeater.set_layout(StackLayout::new())?;
//! repeater.set_visible_window(Rect::new(0.0, 0.0, 400.0, 300.0));
//!
//! let desired = repeater.measure(Size::new(400.0, f32::INFINITY))?;
//! repeater.arrange(desired)?;
//! ```

use std::any::Any;

use horizon_repeater_core::logging::{span_names, targets};
use horizon_repeater_core::{PerfSpan, Point, Rect, Size};

use crate::config::RepeaterConfig;
use crate::element::{Element, ElementArena, ElementFactory, ElementId};
use crate::error::{RepeaterError, Result};
use crate::events::RepeaterSignals;
use crate::layout::context::{ElementRealizationOptions, LayoutContext, LayoutState};
use crate::layout::LayoutKind;
use crate::source::{CollectionAction, CollectionChange, ItemsSourceView};
use crate::transition::ItemTransitionProvider;
use crate::view_manager::ViewManager;
use crate::viewport::ViewportManager;
use crate::virtualization::ElementOwner;

/// Where elements that are not held by the layout are parked during arrange.
pub const CLEARED_ELEMENTS_ARRANGE_POSITION: Point = Point::new(-10000.0, -10000.0);

/// Log a broken calling contract before handing the error back.
fn violation(error: RepeaterError) -> RepeaterError {
    tracing::warn!(target: targets::REPEATER, %error, "contract violation");
    error
}

/// A container that realizes elements for the items of a source on demand.
pub struct ItemsRepeater<T: 'static> {
    view_manager: ViewManager<T>,
    viewport: ViewportManager,
    layout: LayoutKind,
    layout_state: Option<LayoutState>,
    layout_initialized: bool,
    layout_origin: Point,
    config: RepeaterConfig,
    is_layout_in_progress: bool,
    processing_change: Option<CollectionAction>,
    desired_size: Size,
}

impl<T: 'static> std::fmt::Debug for ItemsRepeater<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemsRepeater")
            .field("layout", &self.layout)
            .field("item_count", &self.view_manager.item_count())
            .field("children", &self.view_manager.children.len())
            .field("realized_range", &self.view_manager.realized_range())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> ItemsRepeater<T> {
    /// Create a repeater with the default stack layout and configuration.
    pub fn new(factory: impl ElementFactory<T> + 'static) -> Self {
        Self::from_parts(Box::new(factory), RepeaterConfig::default())
    }

    /// Create a repeater with a validated configuration.
    pub fn with_config(
        factory: impl ElementFactory<T> + 'static,
        config: RepeaterConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(Box::new(factory), config))
    }

    fn from_parts(factory: Box<dyn ElementFactory<T>>, config: RepeaterConfig) -> Self {
        Self {
            view_manager: ViewManager::new(factory),
            viewport: ViewportManager::new(&config),
            layout: LayoutKind::default(),
            layout_state: None,
            layout_initialized: false,
            layout_origin: Point::ZERO,
            config,
            is_layout_in_progress: false,
            processing_change: None,
            desired_size: Size::ZERO,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn config(&self) -> &RepeaterConfig {
        &self.config
    }

    /// Replace the configuration. Invalid values are rejected.
    pub fn set_config(&mut self, config: RepeaterConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.viewport.apply_config(&config);
        self.view_manager.measure_invalidated = true;
        Ok(())
    }

    #[inline]
    pub fn signals(&self) -> &RepeaterSignals {
        &self.view_manager.signals
    }

    #[inline]
    pub fn layout(&self) -> &LayoutKind {
        &self.layout
    }

    #[inline]
    pub fn items_source(&self) -> Option<&ItemsSourceView<T>> {
        self.view_manager.source.as_ref()
    }

    #[inline]
    pub fn item_count(&self) -> usize {
        self.view_manager.item_count()
    }

    /// Every element the repeater currently owns.
    #[inline]
    pub fn elements(&self) -> &ElementArena {
        &self.view_manager.elements
    }

    /// Mutable access to a single element.
    pub fn element_mut(&mut self, element: ElementId) -> Option<&mut (dyn Element + 'static)> {
        self.view_manager.elements.element_mut(element)
    }

    /// Child elements in realization order, including pinned and animating ones.
    #[inline]
    pub fn children(&self) -> &[ElementId] {
        &self.view_manager.children
    }

    /// Indices of the elements currently held by the layout, sorted.
    pub fn realized_indices(&self) -> Vec<usize> {
        let elements = &self.view_manager.elements;
        let mut indices: Vec<usize> = self
            .view_manager
            .children
            .iter()
            .filter_map(|&child| {
                let info = elements.info(child)?;
                if info.is_held_by_layout() { info.index() } else { None }
            })
            .collect();
        indices.sort_unstable();
        indices
    }

    #[inline]
    pub fn desired_size(&self) -> Size {
        self.desired_size
    }

    /// Bounds of the content: the layout origin and the last measured size.
    #[inline]
    pub fn layout_extent(&self) -> Rect {
        self.viewport.layout_extent()
    }

    #[inline]
    pub fn layout_origin(&self) -> Point {
        self.layout_origin
    }

    /// Whether something changed that needs a new measure pass.
    #[inline]
    pub fn is_measure_invalidated(&self) -> bool {
        self.view_manager.measure_invalidated
    }

    pub fn invalidate_measure(&mut self) {
        self.view_manager.measure_invalidated = true;
    }

    #[inline]
    pub fn is_layout_in_progress(&self) -> bool {
        self.is_layout_in_progress
    }

    /// Element that currently holds keyboard focus, as tracked by the repeater.
    #[inline]
    pub fn focused_element(&self) -> Option<ElementId> {
        self.view_manager.focused_element()
    }

    /// Number of elements kept alive only by pins.
    #[inline]
    pub fn pinned_count(&self) -> usize {
        self.view_manager.pinned_count()
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    /// Report the on-screen part of the repeater, in its own coordinates.
    pub fn set_visible_window(&mut self, window: Rect) -> bool {
        let changed = self.viewport.set_visible_window(window);
        if changed {
            self.view_manager.measure_invalidated = true;
        }
        changed
    }

    #[inline]
    pub fn visible_window(&self) -> Rect {
        self.viewport.visible_rect()
    }

    #[inline]
    pub fn realization_window(&self) -> Rect {
        self.viewport.realization_rect()
    }

    // ========================================================================
    // Layout passes
    // ========================================================================

    /// Realize the elements the layout needs and return the desired size.
    pub fn measure(&mut self, available: Size) -> Result<Size> {
        self.begin_layout_pass()?;
        let _span = PerfSpan::new(span_names::MEASURE);
        let result = self.measure_core(available);
        self.is_layout_in_progress = false;
        result
    }

    fn measure_core(&mut self, available: Size) -> Result<Size> {
        self.view_manager.prune_pinned_elements()?;

        let desired = {
            let (layout, mut context) = self.layout_and_context();
            layout.as_layout().measure(&mut context, available)?
        };
        self.viewport
            .set_layout_extent(Rect::from_origin_size(self.layout_origin, desired));

        // Elements the layout realized in an earlier pass but did not ask for again.
        let elements = &self.view_manager.elements;
        let stale: Vec<ElementId> = self
            .view_manager
            .children
            .iter()
            .copied()
            .filter(|&child| {
                elements.info(child).is_some_and(|info| {
                    info.owner() == ElementOwner::Layout
                        && info.auto_recycle_candidate()
                        && !info.keep_alive()
                })
            })
            .collect();
        if !stale.is_empty() {
            tracing::trace!(target: targets::REPEATER, count = stale.len(), "auto-recycling elements");
        }
        for element in stale {
            self.view_manager.clear_element(element, false)?;
        }

        self.view_manager.measure_invalidated = false;
        self.desired_size = desired;
        tracing::debug!(
            target: targets::REPEATER,
            layout = self.layout.name(),
            width = desired.width,
            height = desired.height,
            children = self.view_manager.children.len(),
            "measured"
        );
        Ok(desired)
    }

    /// Position the realized elements.
    pub fn arrange(&mut self, final_size: Size) -> Result<Size> {
        self.begin_layout_pass()?;
        let _span = PerfSpan::new(span_names::ARRANGE);
        let result = self.arrange_core(final_size);
        self.is_layout_in_progress = false;
        result
    }

    fn arrange_core(&mut self, final_size: Size) -> Result<Size> {
        let arranged = {
            let (layout, mut context) = self.layout_and_context();
            layout.as_layout().arrange(&mut context, final_size)?
        };

        self.view_manager.on_owner_arranged()?;

        let children = self.view_manager.children.clone();
        let elements = &mut self.view_manager.elements;
        for child in children {
            let Some(info) = elements.info_mut(child) else {
                continue;
            };
            info.keep_alive = false;
            let owner = info.owner();
            if matches!(owner, ElementOwner::ElementFactory | ElementOwner::PinnedPool) {
                let desired = elements.desired_size(child);
                elements.arrange(
                    child,
                    Rect::new(
                        CLEARED_ELEMENTS_ARRANGE_POSITION.x - desired.width,
                        CLEARED_ELEMENTS_ARRANGE_POSITION.y - desired.height,
                        0.0,
                        0.0,
                    ),
                );
            } else if let Some(bounds) = elements.layout_bounds(child)
                && let Some(info) = elements.info_mut(child)
            {
                info.set_arrange_bounds(bounds);
            }
        }

        // The made anchor only steers the pass that follows its creation.
        self.view_manager.made_anchor = None;
        Ok(arranged)
    }

    fn begin_layout_pass(&mut self) -> Result<()> {
        if self.is_layout_in_progress {
            return Err(violation(RepeaterError::LayoutReentrancy));
        }
        if self.processing_change.is_some() {
            return Err(violation(RepeaterError::LayoutDuringCollectionChange));
        }
        self.ensure_layout_initialized()?;
        self.is_layout_in_progress = true;
        Ok(())
    }

    fn ensure_layout_initialized(&mut self) -> Result<()> {
        if self.layout_initialized {
            return Ok(());
        }
        self.layout_initialized = true;
        let (layout, mut context) = self.layout_and_context();
        layout.as_layout().initialize_for_context(&mut context)
    }

    fn layout_and_context(&mut self) -> (&LayoutKind, RepeaterLayoutContext<'_, T>) {
        (
            &self.layout,
            RepeaterLayoutContext {
                view_manager: &mut self.view_manager,
                viewport: &self.viewport,
                layout_state: &mut self.layout_state,
                layout_origin: &mut self.layout_origin,
                processing_change: self.processing_change,
            },
        )
    }

    // ========================================================================
    // Element access
    // ========================================================================

    /// Index of the item an element represents, if it is realized.
    pub fn element_index(&self, element: ElementId) -> Option<usize> {
        self.view_manager.element_index(element)
    }

    /// The realized element for `index`, without realizing anything.
    pub fn try_get_element(&self, index: usize) -> Option<ElementId> {
        let elements = &self.view_manager.elements;
        self.view_manager.children.iter().copied().find(|&child| {
            elements
                .info(child)
                .is_some_and(|info| info.is_realized() && info.index() == Some(index))
        })
    }

    /// Realize the element for `index` outside of a layout pass.
    ///
    /// The element becomes the anchor of the next measure, so a layout that
    /// honors anchors generates around it. Use this to bring an item that is
    /// far outside the viewport into view.
    pub fn get_or_create_element(&mut self, index: usize) -> Result<ElementId> {
        let count = self
            .view_manager
            .source
            .as_ref()
            .ok_or(RepeaterError::MissingItemsSource)?
            .count();
        if index >= count {
            return Err(RepeaterError::index_out_of_range(index, count));
        }
        if self.is_layout_in_progress {
            return Err(violation(RepeaterError::ElementRequestDuringLayout));
        }
        self.ensure_layout_initialized()?;

        let element = match self.try_get_element(index) {
            Some(element) => element,
            None => {
                let element = self.view_manager.get_element(index, false, false)?;
                self.view_manager.elements.measure(element, Size::INFINITE);
                element
            }
        };

        self.view_manager.made_anchor = Some(element);
        self.view_manager.measure_invalidated = true;
        tracing::debug!(target: targets::REPEATER, index, "element made anchor");
        Ok(element)
    }

    /// Keep an element alive while it is outside the realization window.
    pub fn pin_element(&mut self, element: ElementId) -> Result<u32> {
        let info = self
            .view_manager
            .elements
            .info_mut(element)
            .ok_or(RepeaterError::UnknownElement(element))
            .map_err(violation)?;
        info.add_pin().map_err(violation)
    }

    /// Release one pin. The element is recycled by the next measure if it is
    /// outside the realization window and no pins remain.
    pub fn unpin_element(&mut self, element: ElementId) -> Result<u32> {
        let info = self
            .view_manager
            .elements
            .info_mut(element)
            .ok_or(RepeaterError::UnknownElement(element))
            .map_err(violation)?;
        let remaining = info.remove_pin().map_err(violation)?;
        if remaining == 0 {
            self.view_manager.measure_invalidated = true;
        }
        Ok(remaining)
    }

    /// The host moved keyboard focus. The focused element is pinned.
    pub fn set_focused_element(&mut self, element: Option<ElementId>) -> Result<()> {
        self.view_manager.update_focused_element(element)
    }

    /// Release an element whose departure transition finished.
    pub fn complete_transition(&mut self, element: ElementId) -> Result<()> {
        self.view_manager.complete_transition(element)
    }

    pub fn set_transition_provider(&mut self, provider: Option<Box<dyn ItemTransitionProvider>>) {
        self.view_manager.transitions = provider;
    }

    // ========================================================================
    // Layout, source and template changes
    // ========================================================================

    /// Replace the layout. Elements of the old layout are cleared; keyed
    /// elements are reused through the reset pool.
    pub fn set_layout(&mut self, layout: impl Into<LayoutKind>) -> Result<()> {
        if self.is_layout_in_progress {
            return Err(violation(RepeaterError::LayoutChangeDuringLayout));
        }
        self.view_manager.on_layout_changing();

        if self.layout_initialized {
            {
                let (old, mut context) = self.layout_and_context();
                old.as_layout().uninitialize_for_context(&mut context)?;
            }
            for element in self.held_by_layout() {
                self.view_manager.clear_element(element, false)?;
            }
            self.layout_state = None;
        }

        self.layout = layout.into();
        self.layout_initialized = true;
        {
            let (layout, mut context) = self.layout_and_context();
            layout.as_layout().initialize_for_context(&mut context)?;
        }
        self.viewport.on_layout_changed(true);
        self.view_manager.measure_invalidated = true;
        tracing::debug!(target: targets::REPEATER, layout = self.layout.name(), "layout changed");
        Ok(())
    }

    /// Attach a new source (or detach with `None`). Processed as a reset.
    pub fn set_items_source(&mut self, source: Option<ItemsSourceView<T>>) -> Result<()> {
        if self.is_layout_in_progress {
            return Err(violation(RepeaterError::CollectionChangeDuringLayout));
        }
        self.ensure_layout_initialized()?;
        self.view_manager.source = source;
        self.process_change(&CollectionChange::reset())
    }

    /// Replace the element factory. Realized elements go back to the old one.
    pub fn set_element_factory(&mut self, factory: impl ElementFactory<T> + 'static) -> Result<()> {
        if self.is_layout_in_progress {
            return Err(violation(RepeaterError::TemplateChangeDuringLayout));
        }
        self.ensure_layout_initialized()?;

        self.processing_change = Some(CollectionAction::Reset);
        let result = self.clear_for_template_change();
        self.processing_change = None;
        result?;

        self.view_manager.factory = Box::new(factory);
        self.view_manager.measure_invalidated = true;
        Ok(())
    }

    /// Alias of [`set_element_factory`](Self::set_element_factory).
    pub fn set_item_template(&mut self, template: impl ElementFactory<T> + 'static) -> Result<()> {
        self.set_element_factory(template)
    }

    fn clear_for_template_change(&mut self) -> Result<()> {
        {
            let (layout, mut context) = self.layout_and_context();
            layout
                .as_layout()
                .on_items_changed(&mut context, &CollectionChange::reset())?;
        }
        for element in self.held_by_layout() {
            self.view_manager.clear_element(element, true)?;
        }
        Ok(())
    }

    /// Mutate the items source and process the change it reports.
    ///
    /// ```ignore
    /// repeater.update_source(|source| source.insert(3, item))?;
    /// repeater.update_source(|source| Ok(source.push(item)))?;
    /// ```
    pub fn update_source<F>(&mut self, mutate: F) -> Result<CollectionChange>
    where
        F: FnOnce(&mut ItemsSourceView<T>) -> Result<CollectionChange>,
    {
        if self.is_layout_in_progress {
            return Err(violation(RepeaterError::CollectionChangeDuringLayout));
        }
        if self.processing_change.is_some() {
            return Err(violation(RepeaterError::NestedCollectionChange));
        }
        let source = self
            .view_manager
            .source
            .as_mut()
            .ok_or(RepeaterError::MissingItemsSource)?;
        let change = mutate(source)?;
        self.ensure_layout_initialized()?;
        self.process_change(&change)?;
        Ok(change)
    }

    /// Process a change that was already applied to the source.
    fn process_change(&mut self, change: &CollectionChange) -> Result<()> {
        let _span = PerfSpan::new(span_names::COLLECTION_CHANGE);
        self.processing_change = Some(change.action);
        let result = self.process_change_core(change);
        self.processing_change = None;
        result
    }

    fn process_change_core(&mut self, change: &CollectionChange) -> Result<()> {
        self.view_manager.on_items_source_changed(change)?;
        {
            let (layout, mut context) = self.layout_and_context();
            layout.as_layout().on_items_changed(&mut context, change)?;
        }
        self.view_manager.measure_invalidated = true;
        tracing::debug!(
            target: targets::REPEATER,
            action = ?change.action,
            count = self.view_manager.item_count(),
            "collection change processed"
        );
        Ok(())
    }

    fn held_by_layout(&self) -> Vec<ElementId> {
        let elements = &self.view_manager.elements;
        self.view_manager
            .children
            .iter()
            .copied()
            .filter(|&child| elements.info(child).is_some_and(|info| info.is_held_by_layout()))
            .collect()
    }
}

/// The [`LayoutContext`] a repeater hands to its layout.
///
/// It borrows the repeater's parts for the duration of one layout call.
pub struct RepeaterLayoutContext<'a, T: 'static> {
    view_manager: &'a mut ViewManager<T>,
    viewport: &'a ViewportManager,
    layout_state: &'a mut Option<LayoutState>,
    layout_origin: &'a mut Point,
    processing_change: Option<CollectionAction>,
}

impl<T: 'static> LayoutContext for RepeaterLayoutContext<'_, T> {
    fn item_count(&self) -> usize {
        self.view_manager.item_count()
    }

    fn item_at(&self, index: usize) -> Option<&dyn Any> {
        self.view_manager
            .source
            .as_ref()?
            .item_at(index)
            .map(|item| item as &dyn Any)
    }

    fn get_or_create_element_at(
        &mut self,
        index: usize,
        options: ElementRealizationOptions,
    ) -> Result<ElementId> {
        self.view_manager
            .get_element(index, options.force_create, options.suppress_auto_recycle)
    }

    fn recycle_element(&mut self, element: ElementId) -> Result<()> {
        // Clearing for a collection change ignores pins.
        let cleared_due_to_collection_change = matches!(
            self.processing_change,
            Some(CollectionAction::Remove | CollectionAction::Replace | CollectionAction::Reset)
        );
        self.view_manager
            .clear_element(element, cleared_due_to_collection_change)
    }

    fn visible_rect(&self) -> Rect {
        self.viewport.visible_rect()
    }

    fn realization_rect(&self) -> Rect {
        self.viewport.realization_rect()
    }

    fn recommended_anchor_index(&self) -> Option<usize> {
        let anchor = self.view_manager.made_anchor?;
        self.view_manager.element_index(anchor)
    }

    fn layout_origin(&self) -> Point {
        *self.layout_origin
    }

    fn set_layout_origin(&mut self, origin: Point) -> Result<()> {
        *self.layout_origin = origin;
        Ok(())
    }

    fn take_layout_state(&mut self) -> Option<LayoutState> {
        self.layout_state.take()
    }

    fn set_layout_state(&mut self, state: Option<LayoutState>) {
        *self.layout_state = state;
    }

    fn measure_element(&mut self, element: ElementId, available: Size) -> Result<Size> {
        self.view_manager
            .elements
            .measure(element, available)
            .ok_or(RepeaterError::UnknownElement(element))
    }

    fn desired_size(&self, element: ElementId) -> Size {
        self.view_manager.elements.desired_size(element)
    }

    fn arrange_element(&mut self, element: ElementId, bounds: Rect) -> Result<()> {
        if self.view_manager.elements.arrange(element, bounds) {
            Ok(())
        } else {
            Err(RepeaterError::UnknownElement(element))
        }
    }
}
