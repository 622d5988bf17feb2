//! Elements, the element arena and element factories.
//!
//! The engine never owns a visual tree. Hosts hand it elements through the
//! [`Element`] trait and the engine stores them in an [`ElementArena`], keyed
//! by generation-checked [`ElementId`] handles. A stale handle (an element
//! that went back to its factory) simply stops resolving.
//!
//! Each arena slot carries the element's [`VirtualizationInfo`], its last
//! measured desired size and its last arranged bounds.

use std::any::Any;

use horizon_repeater_core::{Rect, Size};
use slotmap::{new_key_type, SlotMap};

use crate::virtualization::VirtualizationInfo;

new_key_type! {
    /// Handle to an element stored in an [`ElementArena`].
    pub struct ElementId;
}

/// A visual element that can be measured and arranged.
///
/// Only `measure` is required. The remaining hooks default to no-ops so simple
/// hosts can ignore selection and focus.
pub trait Element: Any + Send {
    /// Measure the element against an available size and return its desired size.
    fn measure(&mut self, available: Size) -> Size;

    /// Position the element.
    fn arrange(&mut self, _bounds: Rect) {}

    /// Push the selected visual state to the element.
    fn set_selected(&mut self, _selected: bool) {}

    fn is_selected(&self) -> bool {
        false
    }

    /// Drop the data context a template bound to this element.
    fn clear_data_context(&mut self) {}

    /// Request keyboard focus. Returns `true` if the element accepted it.
    fn focus(&mut self) -> bool {
        false
    }
}

impl dyn Element {
    /// Borrow the element as its concrete type.
    pub fn downcast_ref<E: Element>(&self) -> Option<&E> {
        let element: &dyn Any = self;
        element.downcast_ref::<E>()
    }

    pub fn downcast_mut<E: Element>(&mut self) -> Option<&mut E> {
        let element: &mut dyn Any = self;
        element.downcast_mut::<E>()
    }
}

/// One arena entry.
pub struct ElementSlot {
    element: Box<dyn Element>,
    info: VirtualizationInfo,
    desired_size: Size,
    layout_bounds: Option<Rect>,
}

impl std::fmt::Debug for ElementSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementSlot")
            .field("info", &self.info)
            .field("desired_size", &self.desired_size)
            .field("layout_bounds", &self.layout_bounds)
            .finish_non_exhaustive()
    }
}

/// Storage for elements, keyed by [`ElementId`].
#[derive(Debug, Default)]
pub struct ElementArena {
    slots: SlotMap<ElementId, ElementSlot>,
}

impl ElementArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an element and return its handle.
    pub fn insert(&mut self, element: Box<dyn Element>) -> ElementId {
        self.slots.insert(ElementSlot {
            element,
            info: VirtualizationInfo::default(),
            desired_size: Size::ZERO,
            layout_bounds: None,
        })
    }

    /// Remove an element from the arena, invalidating its handle.
    pub fn remove(&mut self, id: ElementId) -> Option<Box<dyn Element>> {
        self.slots.remove(id).map(|slot| slot.element)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.slots.keys()
    }

    pub fn element(&self, id: ElementId) -> Option<&dyn Element> {
        self.slots.get(id).map(|slot| slot.element.as_ref())
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut (dyn Element + 'static)> {
        self.slots.get_mut(id).map(|slot| slot.element.as_mut())
    }

    /// Borrow an element as its concrete type.
    pub fn downcast_ref<E: Element>(&self, id: ElementId) -> Option<&E> {
        self.slots.get(id)?.element.downcast_ref::<E>()
    }

    pub fn downcast_mut<E: Element>(&mut self, id: ElementId) -> Option<&mut E> {
        self.slots.get_mut(id)?.element.downcast_mut::<E>()
    }

    pub fn info(&self, id: ElementId) -> Option<&VirtualizationInfo> {
        self.slots.get(id).map(|slot| &slot.info)
    }

    pub fn info_mut(&mut self, id: ElementId) -> Option<&mut VirtualizationInfo> {
        self.slots.get_mut(id).map(|slot| &mut slot.info)
    }

    /// Measure an element and record its desired size.
    pub fn measure(&mut self, id: ElementId, available: Size) -> Option<Size> {
        let slot = self.slots.get_mut(id)?;
        slot.desired_size = slot.element.measure(available);
        Some(slot.desired_size)
    }

    /// Desired size from the last measure, or zero for unknown handles.
    pub fn desired_size(&self, id: ElementId) -> Size {
        self.slots
            .get(id)
            .map(|slot| slot.desired_size)
            .unwrap_or(Size::ZERO)
    }

    /// Arrange an element and record the bounds it was given.
    pub fn arrange(&mut self, id: ElementId, bounds: Rect) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) => {
                slot.element.arrange(bounds);
                slot.layout_bounds = Some(bounds);
                true
            }
            None => false,
        }
    }

    /// Bounds passed to the last `arrange` call.
    pub fn layout_bounds(&self, id: ElementId) -> Option<Rect> {
        self.slots.get(id).and_then(|slot| slot.layout_bounds)
    }
}

/// Arguments passed to [`ElementFactory::get_element`].
#[derive(Debug)]
pub struct ElementFactoryGetArgs<'a, T> {
    /// The item the element will represent.
    pub data: &'a T,
    /// Index of the item in the items source.
    pub index: usize,
}

/// Turns items into elements and takes cleared elements back.
pub trait ElementFactory<T>: Send {
    /// Produce an element for an item.
    fn get_element(&mut self, args: ElementFactoryGetArgs<'_, T>) -> Box<dyn Element>;

    /// Take back an element that no longer represents any item.
    fn recycle_element(&mut self, element: Box<dyn Element>);

    /// Whether produced elements have the item bound as their data context,
    /// which then has to be cleared when the element is recycled.
    fn binds_data_context(&self) -> bool {
        true
    }
}

/// Builds and binds elements for a [`RecyclingElementFactory`].
pub trait DataTemplate<T>: Send {
    /// Create a fresh, unbound element.
    fn build(&mut self) -> Box<dyn Element>;

    /// Bind an element (fresh or recycled) to an item.
    fn bind(&mut self, element: &mut (dyn Element + 'static), data: &T, index: usize);
}

/// The default template path: a [`DataTemplate`] plus a pool of recycled
/// elements that are rebound instead of rebuilt.
pub struct RecyclingElementFactory<D> {
    template: D,
    pool: Vec<Box<dyn Element>>,
    built: usize,
}

impl<D> RecyclingElementFactory<D> {
    pub fn new(template: D) -> Self {
        Self {
            template,
            pool: Vec::new(),
            built: 0,
        }
    }

    /// Number of recycled elements waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }

    /// Number of elements the template had to build from scratch.
    pub fn built(&self) -> usize {
        self.built
    }
}

impl<T, D: DataTemplate<T>> ElementFactory<T> for RecyclingElementFactory<D> {
    fn get_element(&mut self, args: ElementFactoryGetArgs<'_, T>) -> Box<dyn Element> {
        let mut element = match self.pool.pop() {
            Some(element) => element,
            None => {
                self.built += 1;
                self.template.build()
            }
        };
        self.template.bind(element.as_mut(), args.data, args.index);
        element
    }

    fn recycle_element(&mut self, element: Box<dyn Element>) {
        self.pool.push(element);
    }
}

/// Items that already are (or can directly produce) their own element.
pub trait IntoElement {
    fn to_element(&self) -> Box<dyn Element>;
}

/// The passthrough path for sources whose items are elements themselves.
///
/// No data context is bound, so recycling just drops the element.
#[derive(Debug, Default, Clone, Copy)]
pub struct ItemIsElementFactory;

impl<T: IntoElement> ElementFactory<T> for ItemIsElementFactory {
    fn get_element(&mut self, args: ElementFactoryGetArgs<'_, T>) -> Box<dyn Element> {
        args.data.to_element()
    }

    fn recycle_element(&mut self, _element: Box<dyn Element>) {}

    fn binds_data_context(&self) -> bool {
        false
    }
}
