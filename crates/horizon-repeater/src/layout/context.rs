//! The capability boundary between a layout and its host.
//!
//! Layouts never talk to a container directly. Everything they need (item
//! count, element realization, the realization window, the layout origin and
//! a slot for per-context state) goes through [`LayoutContext`]. Containers
//! provide a virtualizing implementation; [`NonVirtualizingContext`] runs the
//! same layouts over a plain, fully realized child list.

use std::any::Any;

use horizon_repeater_core::{Point, Rect, Size};

use crate::element::{ElementArena, ElementId};
use crate::error::{RepeaterError, Result};

/// Per-context layout state. Owned by the context, not by the layout.
pub type LayoutState = Box<dyn Any + Send>;

/// Options for [`LayoutContext::get_or_create_element_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ElementRealizationOptions {
    /// Skip the lookup of an element the layout already holds for the index.
    pub force_create: bool,
    /// The layout recycles the element itself; the container must not
    /// auto-clear it at the end of measure.
    pub suppress_auto_recycle: bool,
}

impl ElementRealizationOptions {
    pub const NONE: Self = Self {
        force_create: false,
        suppress_auto_recycle: false,
    };

    /// Options used by layouts that manage element lifetimes themselves.
    pub const OWNED: Self = Self {
        force_create: true,
        suppress_auto_recycle: true,
    };
}

/// What a layout may ask of its host.
pub trait LayoutContext {
    fn item_count(&self) -> usize;

    /// The data item at `index`, type-erased.
    fn item_at(&self, index: usize) -> Option<&dyn Any>;

    /// Realize (or look up) the element for `index`.
    fn get_or_create_element_at(
        &mut self,
        index: usize,
        options: ElementRealizationOptions,
    ) -> Result<ElementId>;

    /// Hand an element the layout no longer needs back to the host.
    fn recycle_element(&mut self, element: ElementId) -> Result<()>;

    /// The viewport in layout coordinates.
    fn visible_rect(&self) -> Rect;

    /// The viewport grown by the cache buffer; the area to fill with elements.
    fn realization_rect(&self) -> Rect;

    /// Index the layout should start generating from, if the host has one.
    fn recommended_anchor_index(&self) -> Option<usize>;

    fn layout_origin(&self) -> Point;

    fn set_layout_origin(&mut self, origin: Point) -> Result<()>;

    fn take_layout_state(&mut self) -> Option<LayoutState>;

    fn set_layout_state(&mut self, state: Option<LayoutState>);

    /// Measure an element and return its desired size.
    fn measure_element(&mut self, element: ElementId, available: Size) -> Result<Size>;

    /// Desired size from the element's last measure.
    fn desired_size(&self, element: ElementId) -> Size;

    fn arrange_element(&mut self, element: ElementId, bounds: Rect) -> Result<()>;

    /// `false` for hosts where every item is permanently realized.
    fn is_virtualizing(&self) -> bool {
        true
    }
}

/// Run `f` with the typed layout state borrowed out of the context.
///
/// The state is put back afterwards whether `f` succeeds or not.
pub fn with_state<S, R>(
    context: &mut dyn LayoutContext,
    f: impl FnOnce(&mut S, &mut dyn LayoutContext) -> Result<R>,
) -> Result<R>
where
    S: Any + Send,
{
    let mut state = context
        .take_layout_state()
        .ok_or(RepeaterError::MissingLayoutState)?;
    let result = match (*state).downcast_mut::<S>() {
        Some(typed) => f(typed, context),
        None => Err(RepeaterError::layout_state_mismatch::<S>()),
    };
    context.set_layout_state(Some(state));
    result
}

/// Ensure the context holds a state of type `S`, creating one with `create`.
///
/// A state of another type is a configuration error and is left in place.
pub fn ensure_state<S>(context: &mut dyn LayoutContext, create: impl FnOnce() -> S) -> Result<()>
where
    S: Any + Send,
{
    match context.take_layout_state() {
        None => {
            context.set_layout_state(Some(Box::new(create())));
            Ok(())
        }
        Some(state) if (*state).is::<S>() => {
            context.set_layout_state(Some(state));
            Ok(())
        }
        Some(state) => {
            context.set_layout_state(Some(state));
            Err(RepeaterError::layout_state_mismatch::<S>())
        }
    }
}

/// Remove the typed state from the context, letting `f` release what it holds.
///
/// An empty slot is not an error; a state of another type is put back.
pub fn release_state<S>(
    context: &mut dyn LayoutContext,
    f: impl FnOnce(&mut S, &mut dyn LayoutContext) -> Result<()>,
) -> Result<()>
where
    S: Any + Send,
{
    let Some(mut state) = context.take_layout_state() else {
        return Ok(());
    };
    match (*state).downcast_mut::<S>() {
        Some(typed) => f(typed, context),
        None => {
            context.set_layout_state(Some(state));
            Err(RepeaterError::layout_state_mismatch::<S>())
        }
    }
}

/// Adapter that runs a layout over children that are all realized.
///
/// Item `i` is child `i`; recycling is a no-op and the realization window is
/// unbounded, so the layout origin has to stay at (0, 0).
pub struct NonVirtualizingContext<'a> {
    children: &'a [ElementId],
    elements: &'a mut ElementArena,
    state: &'a mut Option<LayoutState>,
}

impl<'a> NonVirtualizingContext<'a> {
    pub fn new(
        children: &'a [ElementId],
        elements: &'a mut ElementArena,
        state: &'a mut Option<LayoutState>,
    ) -> Self {
        Self {
            children,
            elements,
            state,
        }
    }

    fn child(&self, index: usize) -> Result<ElementId> {
        self.children
            .get(index)
            .copied()
            .ok_or_else(|| RepeaterError::index_out_of_range(index, self.children.len()))
    }
}

impl LayoutContext for NonVirtualizingContext<'_> {
    fn item_count(&self) -> usize {
        self.children.len()
    }

    fn item_at(&self, index: usize) -> Option<&dyn Any> {
        let id = self.children.get(index)?;
        self.elements.element(*id).map(|element| element as &dyn Any)
    }

    fn get_or_create_element_at(
        &mut self,
        index: usize,
        _options: ElementRealizationOptions,
    ) -> Result<ElementId> {
        self.child(index)
    }

    fn recycle_element(&mut self, _element: ElementId) -> Result<()> {
        Ok(())
    }

    fn visible_rect(&self) -> Rect {
        Rect::INFINITE
    }

    fn realization_rect(&self) -> Rect {
        Rect::INFINITE
    }

    fn recommended_anchor_index(&self) -> Option<usize> {
        None
    }

    fn layout_origin(&self) -> Point {
        Point::ZERO
    }

    fn set_layout_origin(&mut self, origin: Point) -> Result<()> {
        if origin != Point::ZERO {
            return Err(RepeaterError::NonZeroLayoutOrigin);
        }
        Ok(())
    }

    fn take_layout_state(&mut self) -> Option<LayoutState> {
        self.state.take()
    }

    fn set_layout_state(&mut self, state: Option<LayoutState>) {
        *self.state = state;
    }

    fn measure_element(&mut self, element: ElementId, available: Size) -> Result<Size> {
        self.elements
            .measure(element, available)
            .ok_or(RepeaterError::UnknownElement(element))
    }

    fn desired_size(&self, element: ElementId) -> Size {
        self.elements.desired_size(element)
    }

    fn arrange_element(&mut self, element: ElementId, bounds: Rect) -> Result<()> {
        if self.elements.arrange(element, bounds) {
            Ok(())
        } else {
            Err(RepeaterError::UnknownElement(element))
        }
    }

    fn is_virtualizing(&self) -> bool {
        false
    }
}
