//! A virtualizing [`LayoutContext`] over plain sizes, for layout tests.

use std::any::Any;

use horizon_repeater_core::{Point, Rect, Size};

use crate::element::test_support::TestElement;
use crate::element::{ElementArena, ElementId};
use crate::error::{RepeaterError, Result};
use crate::layout::context::{ElementRealizationOptions, LayoutContext, LayoutState};

pub(crate) struct TestContext {
    pub elements: ElementArena,
    /// Desired size of each item; the item count is its length.
    pub sizes: Vec<Size>,
    pub realization: Rect,
    pub anchor: Option<usize>,
    pub origin: Point,
    pub state: Option<LayoutState>,
    pub created: usize,
    pub recycled: Vec<ElementId>,
    /// Live elements and the item each one was created for.
    pub held: Vec<(ElementId, usize)>,
}

impl TestContext {
    /// `count` items of 100 x `height`.
    pub fn new(count: usize, height: f32) -> Self {
        Self::uniform(count, Size::new(100.0, height))
    }

    pub fn uniform(count: usize, size: Size) -> Self {
        Self {
            elements: ElementArena::new(),
            sizes: vec![size; count],
            realization: Rect::INFINITE,
            anchor: None,
            origin: Point::ZERO,
            state: None,
            created: 0,
            recycled: Vec::new(),
            held: Vec::new(),
        }
    }

    /// Arranged bounds of the newest live element for `index`.
    pub fn arranged_rect(&self, index: usize) -> Option<Rect> {
        let (id, _) = self.held.iter().rev().find(|(_, held)| *held == index)?;
        self.elements.downcast_ref::<TestElement>(*id)?.arranged
    }

    /// Indices of live elements, sorted.
    pub fn live_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.held.iter().map(|(_, index)| *index).collect();
        indices.sort_unstable();
        indices
    }
}

impl LayoutContext for TestContext {
    fn item_count(&self) -> usize {
        self.sizes.len()
    }

    fn item_at(&self, index: usize) -> Option<&dyn Any> {
        self.sizes.get(index).map(|size| size as &dyn Any)
    }

    fn get_or_create_element_at(
        &mut self,
        index: usize,
        options: ElementRealizationOptions,
    ) -> Result<ElementId> {
        let size = *self
            .sizes
            .get(index)
            .ok_or_else(|| RepeaterError::index_out_of_range(index, self.sizes.len()))?;
        if !options.force_create
            && let Some((id, _)) = self.held.iter().find(|(_, held)| *held == index)
        {
            return Ok(*id);
        }
        let mut element = TestElement::new(size.width, size.height);
        element.label = Some(index);
        let id = self.elements.insert(Box::new(element));
        self.held.push((id, index));
        self.created += 1;
        Ok(id)
    }

    fn recycle_element(&mut self, element: ElementId) -> Result<()> {
        if self.elements.remove(element).is_none() {
            return Err(RepeaterError::UnknownElement(element));
        }
        self.held.retain(|(id, _)| *id != element);
        self.recycled.push(element);
        Ok(())
    }

    fn visible_rect(&self) -> Rect {
        self.realization
    }

    fn realization_rect(&self) -> Rect {
        self.realization
    }

    fn recommended_anchor_index(&self) -> Option<usize> {
        self.anchor
    }

    fn layout_origin(&self) -> Point {
        self.origin
    }

    fn set_layout_origin(&mut self, origin: Point) -> Result<()> {
        self.origin = origin;
        Ok(())
    }

    fn take_layout_state(&mut self) -> Option<LayoutState> {
        self.state.take()
    }

    fn set_layout_state(&mut self, state: Option<LayoutState>) {
        self.state = state;
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
}
