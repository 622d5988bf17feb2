//! Incremental line-based layout engine shared by the stack, uniform grid and
//! flow layouts.
//!
//! Items are packed into lines along the minor axis and lines are stacked
//! along the major (scrolling) axis. Measure starts at an anchor item and
//! generates forward and then backward until the realization rect is filled,
//! so scrolling deep into a long list never touches the items in between.
//! Everything that differs between layouts (measure constraints, line
//! breaking, anchor estimation and extent estimation) is supplied through
//! [`FlowLayoutDelegates`].

use horizon_repeater_core::logging::targets;
use horizon_repeater_core::{Point, Rect, Size};

use crate::element::ElementId;
use crate::error::{RepeaterError, Result};
use crate::layout::context::{ElementRealizationOptions, LayoutContext};
use crate::layout::element_manager::ElementManager;
use crate::layout::orientation::{AxisMapper, ScrollOrientation};
use crate::source::CollectionChange;

/// Where generation should start for a realization rect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowLayoutAnchorInfo {
    /// `None` when the realization rect does not overlap the content.
    pub index: Option<usize>,
    /// Major-axis position of the line containing `index`.
    pub offset: f32,
}

impl FlowLayoutAnchorInfo {
    pub const NONE: Self = Self {
        index: None,
        offset: 0.0,
    };
}

/// Layout bounds of the first or last realized item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealizedBounds {
    pub index: usize,
    pub bounds: Rect,
}

/// How items are distributed along the minor axis of a line during arrange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineAlignment {
    #[default]
    Start,
    Center,
    End,
    SpaceAround,
    SpaceBetween,
    SpaceEvenly,
    /// Scale the items of every full line so the line fills the available
    /// minor size. The line holding the last item keeps natural sizes
    /// unless it overflows.
    Stretch,
}

/// Per-layout callbacks driving [`FlowLayoutAlgorithm`].
pub trait FlowLayoutDelegates {
    /// Constraint passed to the element's measure.
    fn measure_size(&mut self, index: usize, available: Size, context: &mut dyn LayoutContext) -> Size;

    /// Size the element occupies in the line before arrange.
    fn provisional_arrange_size(
        &mut self,
        index: usize,
        measure_size: Size,
        desired_size: Size,
        context: &mut dyn LayoutContext,
    ) -> Size;

    /// Whether item `index` starts a new line given the minor space left.
    fn should_break_line(&mut self, index: usize, remaining_space: f32) -> bool;

    /// Estimate the item whose line begins at the realization rect.
    fn anchor_for_realization_rect(
        &mut self,
        available: Size,
        last_extent: Rect,
        context: &mut dyn LayoutContext,
    ) -> Result<FlowLayoutAnchorInfo>;

    /// First item of the line that holds `target`.
    fn anchor_for_target_element(
        &mut self,
        target: usize,
        available: Size,
        last_extent: Rect,
        context: &mut dyn LayoutContext,
    ) -> Result<usize>;

    /// Total content bounds, blending realized bounds with an estimate for
    /// the rest.
    fn extent(
        &mut self,
        available: Size,
        context: &mut dyn LayoutContext,
        first: Option<RealizedBounds>,
        last: Option<RealizedBounds>,
    ) -> Result<Rect>;

    fn on_element_measured(
        &mut self,
        _element: ElementId,
        _index: usize,
        _available: Size,
        _measure_size: Size,
        _desired_size: Size,
        _provisional_size: Size,
    ) {
    }

    fn on_line_arranged(&mut self, _start_index: usize, _count: usize, _line_size: f32) {}
}

/// Measure `element` for `index` the way the delegates ask for and return the
/// provisional arrange size.
pub fn measure_element<D>(
    delegates: &mut D,
    context: &mut dyn LayoutContext,
    element: ElementId,
    index: usize,
    available: Size,
) -> Result<Size>
where
    D: FlowLayoutDelegates + ?Sized,
{
    let measure_size = delegates.measure_size(index, available, context);
    let desired = context.measure_element(element, measure_size)?;
    let provisional = delegates.provisional_arrange_size(index, measure_size, desired, context);
    delegates.on_element_measured(element, index, available, measure_size, desired, provisional);
    Ok(provisional)
}

/// Line-packing parameters of one measure pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowMeasure {
    pub is_wrapping: bool,
    pub min_item_spacing: f32,
    pub line_spacing: f32,
    pub max_items_per_line: usize,
    pub scroll: ScrollOrientation,
    pub disable_virtualization: bool,
    /// Lines are scaled to the available minor size at arrange. An item that
    /// overflows joins its line when shrinking the line to fit stays closer
    /// to natural sizes than enlarging the line without it.
    pub stretch_lines: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// The shared engine. One instance lives in each layout's per-context state.
#[derive(Debug)]
pub struct FlowLayoutAlgorithm {
    element_manager: ElementManager,
    axis: AxisMapper,
    last_extent: Rect,
    last_available_size: Size,
    last_item_spacing: f32,
    collection_change_pending: bool,
    first_in_window: Option<usize>,
    last_in_window: Option<usize>,
    /// The minor axis is unbounded, so the whole content is one line.
    scroll_same_as_flow: bool,
}

impl Default for FlowLayoutAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowLayoutAlgorithm {
    pub fn new() -> Self {
        Self {
            element_manager: ElementManager::new(),
            axis: AxisMapper::default(),
            last_extent: Rect::ZERO,
            last_available_size: Size::ZERO,
            last_item_spacing: 0.0,
            collection_change_pending: false,
            first_in_window: None,
            last_in_window: None,
            scroll_same_as_flow: false,
        }
    }

    /// Content bounds computed by the last measure.
    #[inline]
    pub fn last_extent(&self) -> Rect {
        self.last_extent
    }

    #[inline]
    pub fn element_manager(&self) -> &ElementManager {
        &self.element_manager
    }

    /// Data indices of the first and last realized element.
    pub fn realized_range(&self) -> Option<(usize, usize)> {
        self.element_manager.realized_bounds_range()
    }

    pub fn element_if_realized(
        &mut self,
        context: &mut dyn LayoutContext,
        data_index: usize,
    ) -> Result<Option<ElementId>> {
        self.element_manager.element_if_realized(context, data_index)
    }

    pub fn try_add_element0(&mut self, element: ElementId) -> bool {
        self.element_manager.try_add_element0(element)
    }

    fn element_at(&mut self, context: &mut dyn LayoutContext, data_index: usize) -> Result<ElementId> {
        self.element_manager
            .realized_element(context, data_index)?
            .ok_or_else(|| RepeaterError::index_out_of_range(data_index, context.item_count()))
    }

    // ========================================================================
    // Measure
    // ========================================================================

    pub fn measure<D>(
        &mut self,
        available: Size,
        context: &mut dyn LayoutContext,
        delegates: &mut D,
        params: FlowMeasure,
    ) -> Result<Size>
    where
        D: FlowLayoutDelegates + ?Sized,
    {
        self.axis = AxisMapper::new(params.scroll);
        self.scroll_same_as_flow = self.axis.minor(available).is_infinite();

        self.element_manager.on_begin_measure(context, params.scroll)?;

        let count = context.item_count();
        if let Some(suggested) = context.recommended_anchor_index()
            && suggested < count
            && !self.element_manager.is_data_index_realized(suggested)
        {
            self.make_anchor(context, delegates, suggested, available)?;
        }

        let anchor = self.anchor_index(available, context, delegates, params)?;
        self.generate(Direction::Forward, anchor, available, context, delegates, params)?;
        self.generate(Direction::Backward, anchor, available, context, delegates, params)?;

        if params.is_wrapping && self.is_reflow_required() {
            tracing::trace!(target: targets::FLOW, "reflowing from the first item");
            let bounds = self.element_manager.bounds_for_realized_index_mut(0);
            self.axis.set_minor_start(bounds, 0.0);
            self.generate(Direction::Forward, Some(0), available, context, delegates, params)?;
        }

        self.raise_line_arranged(context, delegates);
        self.collection_change_pending = false;
        self.last_extent = self.estimate_extent(available, context, delegates)?;
        if self.element_manager.is_virtualizing() {
            context.set_layout_origin(self.last_extent.origin)?;
        }

        tracing::trace!(
            target: targets::FLOW,
            anchor = ?anchor,
            realized = ?self.realized_range(),
            extent = ?self.last_extent,
            "flow measure complete"
        );
        Ok(self.last_extent.size)
    }

    /// Realize the line holding `index` from scratch ahead of a bring-into-view.
    fn make_anchor<D>(
        &mut self,
        context: &mut dyn LayoutContext,
        delegates: &mut D,
        index: usize,
        available: Size,
    ) -> Result<()>
    where
        D: FlowLayoutDelegates + ?Sized,
    {
        self.element_manager.clear_realized_range(context)?;
        let line_start = delegates
            .anchor_for_target_element(index, available, self.last_extent, context)?
            .min(index);
        for data_index in line_start..=index {
            let element = context.get_or_create_element_at(data_index, ElementRealizationOptions::OWNED)?;
            let measure_size = delegates.measure_size(data_index, available, context);
            context.measure_element(element, measure_size)?;
            self.element_manager.add(element, data_index);
        }
        tracing::trace!(target: targets::FLOW, index, line_start, "anchor made");
        Ok(())
    }

    fn anchor_index<D>(
        &mut self,
        available: Size,
        context: &mut dyn LayoutContext,
        delegates: &mut D,
        params: FlowMeasure,
    ) -> Result<Option<usize>>
    where
        D: FlowLayoutDelegates + ?Sized,
    {
        let count = context.item_count();
        let mut anchor = None;
        let mut position = Point::ZERO;

        if !self.element_manager.is_virtualizing() || params.disable_virtualization {
            anchor = (count > 0).then_some(0);
        } else {
            let realization = context.realization_rect();
            let connected = self.element_manager.is_window_connected(
                realization,
                params.scroll,
                self.scroll_same_as_flow,
            );
            // Reflowing changes which column the anchor lands in.
            let needs_column_revaluation = params.is_wrapping
                && (self.axis.minor(self.last_available_size) != self.axis.minor(available)
                    || self.last_item_spacing != params.min_item_spacing
                    || self.collection_change_pending);

            let suggested = context
                .recommended_anchor_index()
                .filter(|&index| self.element_manager.is_data_index_realized(index));

            if let Some(suggested) = suggested {
                let target = delegates
                    .anchor_for_target_element(suggested, available, self.last_extent, context)?
                    .min(suggested);
                if self.element_manager.is_data_index_realized(target) {
                    let bounds = self.element_manager.bounds_for_data_index(target);
                    position = if needs_column_revaluation {
                        self.axis.minor_major_point(0.0, self.axis.major_start(bounds))
                    } else {
                        bounds.origin
                    };
                } else {
                    // A collection change moved the line start before the range.
                    if let Some((first, _)) = self.element_manager.realized_bounds_range() {
                        for index in (target..first).rev() {
                            self.element_manager
                                .ensure_element_realized(context, false, index)?;
                        }
                    }
                    let bounds = self.element_manager.bounds_for_data_index(suggested);
                    position = self.axis.minor_major_point(0.0, self.axis.major_start(bounds));
                }
                anchor = Some(target);
            } else if needs_column_revaluation || !connected {
                let info = delegates.anchor_for_realization_rect(available, self.last_extent, context)?;
                anchor = info.index;
                position = self.axis.minor_major_point(0.0, info.offset);
            } else if let Some((first, _)) = self.element_manager.realized_bounds_range() {
                anchor = Some(first);
                position = self.element_manager.bounds_for_realized_index(0).origin;
            }
        }

        let anchor = anchor.filter(|&index| index < count);
        self.first_in_window = anchor;
        self.last_in_window = anchor;

        match anchor {
            Some(index) => {
                if !self.element_manager.is_data_index_realized(index) {
                    // Disconnected: start over from the new anchor.
                    self.element_manager.clear_realized_range(context)?;
                    let element =
                        context.get_or_create_element_at(index, ElementRealizationOptions::OWNED)?;
                    self.element_manager.add(element, index);
                }
                let element = self.element_at(context, index)?;
                let desired = measure_element(delegates, context, element, index, available)?;
                self.element_manager
                    .set_bounds_for_data_index(index, Rect::from_origin_size(position, desired));
            }
            None => self.element_manager.clear_realized_range(context)?,
        }

        self.last_available_size = available;
        self.last_item_spacing = params.min_item_spacing;
        Ok(anchor)
    }

    fn generate<D>(
        &mut self,
        direction: Direction,
        anchor: Option<usize>,
        available: Size,
        context: &mut dyn LayoutContext,
        delegates: &mut D,
        params: FlowMeasure,
    ) -> Result<()>
    where
        D: FlowLayoutDelegates + ?Sized,
    {
        let Some(anchor) = anchor else {
            return Ok(());
        };
        let count = context.item_count();
        let step = |index: usize| match direction {
            Direction::Forward => Some(index + 1).filter(|&next| next < count),
            Direction::Backward => index.checked_sub(1),
        };

        let axis = self.axis;
        let anchor_bounds = self.element_manager.bounds_for_data_index(anchor);
        let mut line_offset = axis.major_start(anchor_bounds);
        let mut line_major_size = axis.major_size(anchor_bounds);
        let mut count_in_line = 1usize;
        let mut line_needs_reposition = false;
        let mut previous = anchor;
        let mut current = step(anchor);

        while let Some(index) = current {
            if !params.disable_virtualization && !self.should_continue_filling_up_space(context, previous, direction) {
                break;
            }

            self.element_manager
                .ensure_element_realized(context, direction == Direction::Forward, index)?;
            let element = self.element_at(context, index)?;
            let desired = measure_element(delegates, context, element, index, available)?;

            let previous_bounds = self.element_manager.bounds_for_data_index(previous);
            let mut bounds = Rect::from_origin_size(Point::ZERO, desired);

            match direction {
                Direction::Forward => {
                    let remaining = axis.minor(available)
                        - (axis.minor_end(previous_bounds) + params.min_item_spacing + axis.minor(desired));
                    let breaks = count_in_line >= params.max_items_per_line
                        || (delegates.should_break_line(index, remaining)
                            && !(params.stretch_lines
                                && self.joins_line_by_shrinking(
                                    index - count_in_line,
                                    count_in_line,
                                    axis.minor(desired),
                                    axis.minor(available),
                                    params.min_item_spacing,
                                )));
                    if breaks {
                        axis.set_minor_start(&mut bounds, 0.0);
                        axis.set_major_start(
                            &mut bounds,
                            axis.major_start(previous_bounds) + line_major_size + params.line_spacing,
                        );
                        if line_needs_reposition {
                            for data_index in index - count_in_line..index {
                                let mut line_bounds = self.element_manager.bounds_for_data_index(data_index);
                                axis.set_major_size(&mut line_bounds, line_major_size);
                                self.element_manager.set_bounds_for_data_index(data_index, line_bounds);
                            }
                        }
                        line_major_size = axis.major_size(bounds);
                        line_offset = axis.major_start(bounds);
                        line_needs_reposition = false;
                        count_in_line = 1;
                    } else {
                        axis.set_minor_start(
                            &mut bounds,
                            axis.minor_end(previous_bounds) + params.min_item_spacing,
                        );
                        axis.set_major_start(&mut bounds, line_offset);
                        line_major_size = line_major_size.max(axis.major_size(bounds));
                        line_needs_reposition |= axis.major_size(previous_bounds) != axis.major_size(bounds);
                        count_in_line += 1;
                    }
                }
                Direction::Backward => {
                    let remaining = axis.minor_start(previous_bounds)
                        - (axis.minor(desired) + params.min_item_spacing);
                    let breaks = count_in_line >= params.max_items_per_line
                        || (delegates.should_break_line(index, remaining)
                            && !(params.stretch_lines
                                && self.joins_line_by_shrinking(
                                    index + 1,
                                    count_in_line,
                                    axis.minor(desired),
                                    axis.minor(available),
                                    params.min_item_spacing,
                                )));
                    if breaks {
                        let line_start = index + 1;
                        let line_end = index + count_in_line;
                        let below = line_end + 1;
                        if line_needs_reposition
                            && !(line_start..=line_end).contains(&anchor)
                            && self.element_manager.is_data_index_realized(below)
                        {
                            let below_offset =
                                axis.major_start(self.element_manager.bounds_for_data_index(below));
                            line_offset = below_offset - line_major_size - params.line_spacing;
                            for data_index in line_start..=line_end {
                                let mut line_bounds = self.element_manager.bounds_for_data_index(data_index);
                                axis.set_major_start(&mut line_bounds, line_offset);
                                axis.set_major_size(&mut line_bounds, line_major_size);
                                self.element_manager.set_bounds_for_data_index(data_index, line_bounds);
                            }
                        }

                        let available_minor = axis.minor(available);
                        let minor_limit = if available_minor.is_finite() {
                            available_minor
                        } else {
                            axis.minor_size(self.last_extent)
                        };
                        axis.set_minor_start(&mut bounds, minor_limit - axis.minor(desired));
                        axis.set_major_start(
                            &mut bounds,
                            line_offset - axis.major(desired) - params.line_spacing,
                        );
                        line_major_size = axis.major_size(bounds);
                        line_offset = axis.major_start(bounds);
                        line_needs_reposition = false;
                        count_in_line = 1;
                    } else {
                        axis.set_minor_start(
                            &mut bounds,
                            axis.minor_start(previous_bounds) - axis.minor(desired) - params.min_item_spacing,
                        );
                        axis.set_major_start(&mut bounds, line_offset);
                        line_major_size = line_major_size.max(axis.major_size(bounds));
                        line_needs_reposition |= axis.major_size(previous_bounds) != axis.major_size(bounds);
                        count_in_line += 1;
                    }
                }
            }

            self.element_manager.set_bounds_for_data_index(index, bounds);
            previous = index;
            current = step(index);
        }

        // Generation realizes one item past the window before noticing; it does
        // not count as inside.
        match direction {
            Direction::Forward => {
                let last = if previous + 1 == count {
                    previous
                } else {
                    previous.saturating_sub(1)
                };
                self.last_in_window = Some(last);
            }
            Direction::Backward => {
                let first = if previous == 0 { 0 } else { previous + 1 };
                self.first_in_window = Some(first.min(count.saturating_sub(1)));
            }
        }

        if let Some(next) = current {
            self.element_manager.discard_elements_outside_window(
                context,
                direction == Direction::Forward,
                next,
            )?;
        }
        Ok(())
    }

    /// Whether an item of minor size `item_minor` that overflows the line
    /// `[first, first + count)` should join it and shrink the whole line,
    /// rather than close the line and enlarge it.
    ///
    /// The scale closer to 1 wins. A line that already overflows always
    /// closes, since enlarging it would be a scale below 1.
    fn joins_line_by_shrinking(
        &self,
        first: usize,
        count: usize,
        item_minor: f32,
        available_minor: f32,
        spacing: f32,
    ) -> bool {
        if count == 0 || item_minor <= 0.0 || !available_minor.is_finite() {
            return false;
        }
        let axis = self.axis;
        let natural: f32 = (first..first + count)
            .map(|index| axis.minor_size(self.element_manager.bounds_for_data_index(index)))
            .sum();
        if natural <= 0.0 {
            return false;
        }
        let n = count as f32;
        let shrink = (available_minor - n * spacing) / (natural + item_minor);
        let enlarge = (available_minor - (n - 1.0) * spacing) / natural;
        shrink > 0.0 && 1.0 / shrink < enlarge
    }

    fn should_continue_filling_up_space(
        &self,
        context: &dyn LayoutContext,
        index: usize,
        direction: Direction,
    ) -> bool {
        if !self.element_manager.is_virtualizing() {
            return true;
        }
        let axis = self.axis;
        let window = context.realization_rect();
        let bounds = self.element_manager.bounds_for_data_index(index);
        // Both axes count so a single line also stops at the window edge.
        match direction {
            Direction::Forward => {
                axis.major_start(bounds) < axis.major_end(window)
                    && axis.minor_start(bounds) < axis.minor_end(window)
            }
            Direction::Backward => {
                axis.major_end(bounds) > axis.major_start(window)
                    && axis.minor_end(bounds) > axis.minor_start(window)
            }
        }
    }

    fn is_reflow_required(&self) -> bool {
        self.element_manager.realized_count() > 0
            && self.element_manager.data_index_from_realized(0) == 0
            && self
                .axis
                .minor_start(self.element_manager.bounds_for_realized_index(0))
                != 0.0
    }

    fn raise_line_arranged<D>(&self, context: &dyn LayoutContext, delegates: &mut D)
    where
        D: FlowLayoutDelegates + ?Sized,
    {
        let realization = context.realization_rect();
        if realization.width() == 0.0 && realization.height() == 0.0 {
            return;
        }
        let (Some(first), Some(last)) = (self.first_in_window, self.last_in_window) else {
            return;
        };
        if first > last
            || !self.element_manager.is_data_index_realized(first)
            || !self.element_manager.is_data_index_realized(last)
        {
            return;
        }

        let axis = self.axis;
        let first_bounds = self.element_manager.bounds_for_data_index(first);
        let mut line_offset = axis.major_start(first_bounds);
        let mut line_size = 0.0f32;
        let mut count_in_line = 0usize;
        for index in first..=last {
            let bounds = self.element_manager.bounds_for_data_index(index);
            if axis.major_start(bounds) != line_offset {
                delegates.on_line_arranged(index - count_in_line, count_in_line, line_size);
                count_in_line = 0;
                line_offset = axis.major_start(bounds);
                line_size = 0.0;
            }
            line_size = line_size.max(axis.major_size(bounds));
            count_in_line += 1;
        }
        if count_in_line > 0 {
            delegates.on_line_arranged(last + 1 - count_in_line, count_in_line, line_size);
        }
    }

    fn estimate_extent<D>(
        &mut self,
        available: Size,
        context: &mut dyn LayoutContext,
        delegates: &mut D,
    ) -> Result<Rect>
    where
        D: FlowLayoutDelegates + ?Sized,
    {
        let realized = self.element_manager.realized_count();
        let (first, last) = if realized > 0 {
            let first = RealizedBounds {
                index: self.element_manager.data_index_from_realized(0),
                bounds: self.element_manager.bounds_for_realized_index(0),
            };
            let last = RealizedBounds {
                index: self.element_manager.data_index_from_realized(realized - 1),
                bounds: self.element_manager.bounds_for_realized_index(realized - 1),
            };
            (Some(first), Some(last))
        } else {
            (None, None)
        };
        delegates.extent(available, context, first, last)
    }

    // ========================================================================
    // Arrange
    // ========================================================================

    /// Position the realized elements, aligning each line.
    ///
    /// Alignment only affects the arranged rects; the layout bounds recorded
    /// during measure are left untouched so repeated passes are stable.
    pub fn arrange(
        &mut self,
        final_size: Size,
        context: &mut dyn LayoutContext,
        is_wrapping: bool,
        alignment: LineAlignment,
        min_item_spacing: f32,
    ) -> Result<Size> {
        let realized = self.element_manager.realized_count();
        if realized > 0 {
            let axis = self.axis;
            let mut line_start = 0usize;
            let mut previous_bounds = self.element_manager.bounds_for_realized_index(0);
            let mut line_offset = axis.major_start(previous_bounds);
            let mut line_size = axis.major_size(previous_bounds);
            let mut space_at_start = axis.minor_start(previous_bounds);

            for realized_index in 1..realized {
                let bounds = self.element_manager.bounds_for_realized_index(realized_index);
                if axis.major_start(bounds) != line_offset {
                    let space_at_end = axis.minor(final_size) - axis.minor_end(previous_bounds);
                    self.perform_line_alignment(
                        context,
                        LineArrangement {
                            start: line_start,
                            count: realized_index - line_start,
                            space_at_start,
                            space_at_end,
                            line_size,
                        },
                        alignment,
                        is_wrapping,
                        final_size,
                        min_item_spacing,
                    )?;
                    line_start = realized_index;
                    space_at_start = axis.minor_start(bounds);
                    line_offset = axis.major_start(bounds);
                    line_size = 0.0;
                }
                line_size = line_size.max(axis.major_size(bounds));
                previous_bounds = bounds;
            }

            let space_at_end = axis.minor(final_size) - axis.minor_end(previous_bounds);
            self.perform_line_alignment(
                context,
                LineArrangement {
                    start: line_start,
                    count: realized - line_start,
                    space_at_start,
                    space_at_end,
                    line_size,
                },
                alignment,
                is_wrapping,
                final_size,
                min_item_spacing,
            )?;
        }

        Ok(Size::new(
            final_size.width.max(self.last_extent.width()),
            final_size.height.max(self.last_extent.height()),
        ))
    }

    fn perform_line_alignment(
        &mut self,
        context: &mut dyn LayoutContext,
        line: LineArrangement,
        alignment: LineAlignment,
        is_wrapping: bool,
        final_size: Size,
        min_item_spacing: f32,
    ) -> Result<()> {
        let axis = self.axis;
        let last_data_index = self.element_manager.data_index_from_realized(line.start + line.count - 1);
        let is_last_line = last_data_index + 1 >= context.item_count();

        let total_space = line.space_at_start + line.space_at_end;
        let n = line.count as f32;
        let mut alignment = alignment;
        let mut stretch_scale = None;
        if alignment == LineAlignment::Stretch && !self.scroll_same_as_flow {
            let natural: f32 = (line.start..line.start + line.count)
                .map(|realized_index| axis.minor_size(self.element_manager.bounds_for_realized_index(realized_index)))
                .sum();
            let target = axis.minor(final_size) - min_item_spacing * (n - 1.0);
            // The last line keeps natural sizes unless it has to shrink.
            if is_last_line && natural <= target {
                alignment = LineAlignment::Start;
            } else if natural > 0.0 && target > 0.0 {
                stretch_scale = Some(target / natural);
            }
        }
        let mut stretch_cursor = 0.0f32;

        for realized_index in line.start..line.start + line.count {
            let position = (realized_index - line.start) as f32;
            let mut bounds = self.element_manager.bounds_for_realized_index(realized_index);
            axis.set_major_size(&mut bounds, line.line_size);

            if !self.scroll_same_as_flow && (line.space_at_start != 0.0 || line.space_at_end != 0.0 || stretch_scale.is_some()) {
                let start = axis.minor_start(bounds) - line.space_at_start;
                let minor_start = match alignment {
                    LineAlignment::Start => start,
                    LineAlignment::End => axis.minor_start(bounds) + line.space_at_end,
                    LineAlignment::Center => start + total_space / 2.0,
                    LineAlignment::SpaceAround => start + total_space / (n * 2.0) * (position * 2.0 + 1.0),
                    LineAlignment::SpaceBetween => {
                        let gap = if line.count > 1 { total_space / (n - 1.0) } else { 0.0 };
                        start + gap * position
                    }
                    LineAlignment::SpaceEvenly => start + total_space / (n + 1.0) * (position + 1.0),
                    LineAlignment::Stretch => match stretch_scale {
                        Some(scale) => {
                            let width = axis.minor_size(bounds) * scale;
                            axis.set_minor_size(&mut bounds, width);
                            let minor_start = stretch_cursor;
                            stretch_cursor += width + min_item_spacing;
                            minor_start
                        }
                        None => start,
                    },
                };
                axis.set_minor_start(&mut bounds, minor_start);
            }

            bounds.origin.x -= self.last_extent.origin.x;
            bounds.origin.y -= self.last_extent.origin.y;

            if !is_wrapping {
                let minor = axis.minor_size(bounds).max(axis.minor(final_size));
                axis.set_minor_size(&mut bounds, minor);
            }

            let data_index = self.element_manager.data_index_from_realized(realized_index);
            let element = self.element_at(context, data_index)?;
            if stretch_scale.is_some() {
                context.measure_element(element, bounds.size)?;
            }
            context.arrange_element(element, bounds)?;
        }
        Ok(())
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    pub fn on_items_source_changed(
        &mut self,
        context: &mut dyn LayoutContext,
        change: &CollectionChange,
    ) -> Result<()> {
        self.element_manager.data_source_changed(context, change)?;
        self.collection_change_pending = true;
        Ok(())
    }

    /// Hand every realized element back to the context.
    pub fn uninitialize(&mut self, context: &mut dyn LayoutContext) -> Result<()> {
        if self.element_manager.is_virtualizing() {
            self.element_manager.clear_realized_range(context)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct LineArrangement {
    start: usize,
    count: usize,
    space_at_start: f32,
    space_at_end: f32,
    line_size: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::test_context::TestContext;

    /// Fixed-size items wrapping in lines; estimation assumes 10px lines of
    /// `per_line` items.
    struct GridDelegates {
        per_line: usize,
    }

    impl FlowLayoutDelegates for GridDelegates {
        fn measure_size(&mut self, _: usize, available: Size, _: &mut dyn LayoutContext) -> Size {
            available
        }

        fn provisional_arrange_size(&mut self, _: usize, _: Size, desired: Size, _: &mut dyn LayoutContext) -> Size {
            desired
        }

        fn should_break_line(&mut self, _: usize, remaining_space: f32) -> bool {
            remaining_space < 0.0
        }

        fn anchor_for_realization_rect(
            &mut self,
            _: Size,
            _: Rect,
            context: &mut dyn LayoutContext,
        ) -> Result<FlowLayoutAnchorInfo> {
            let line = (context.realization_rect().top().max(0.0) / 10.0) as usize;
            let index = (line * self.per_line).min(context.item_count().saturating_sub(1));
            Ok(FlowLayoutAnchorInfo {
                index: Some(index),
                offset: (index / self.per_line) as f32 * 10.0,
            })
        }

        fn anchor_for_target_element(&mut self, target: usize, _: Size, _: Rect, _: &mut dyn LayoutContext) -> Result<usize> {
            Ok(target / self.per_line * self.per_line)
        }

        fn extent(
            &mut self,
            available: Size,
            context: &mut dyn LayoutContext,
            _: Option<RealizedBounds>,
            _: Option<RealizedBounds>,
        ) -> Result<Rect> {
            let lines = context.item_count().div_ceil(self.per_line);
            Ok(Rect::new(0.0, 0.0, available.width, lines as f32 * 10.0))
        }
    }

    fn wrap(scroll: ScrollOrientation) -> FlowMeasure {
        FlowMeasure {
            is_wrapping: true,
            min_item_spacing: 0.0,
            line_spacing: 0.0,
            max_items_per_line: usize::MAX,
            scroll,
            disable_virtualization: false,
            stretch_lines: false,
        }
    }

    #[test]
    fn test_lines_break_when_space_runs_out() {
        let mut context = TestContext::uniform(20, Size::new(25.0, 10.0));
        context.realization = Rect::new(0.0, 0.0, 100.0, 30.0);
        let mut algorithm = FlowLayoutAlgorithm::new();
        let mut delegates = GridDelegates { per_line: 4 };

        let extent = algorithm
            .measure(Size::new(100.0, f32::INFINITY), &mut context, &mut delegates, wrap(ScrollOrientation::Vertical))
            .unwrap();
        assert_eq!(extent, Size::new(100.0, 50.0));

        // Lines 0..=2 fill the window, line 3 is the one extra past its edge.
        let (first, last) = algorithm.realized_range().unwrap();
        assert_eq!(first, 0);
        assert!((12..=15).contains(&last));
        let bounds = algorithm.element_manager().bounds_for_data_index(5);
        assert_eq!(bounds, Rect::new(25.0, 10.0, 25.0, 10.0));
    }

    #[test]
    fn test_scrolled_window_starts_from_estimated_anchor() {
        let mut context = TestContext::uniform(400, Size::new(25.0, 10.0));
        context.realization = Rect::new(0.0, 500.0, 100.0, 30.0);
        let mut algorithm = FlowLayoutAlgorithm::new();
        let mut delegates = GridDelegates { per_line: 4 };

        algorithm
            .measure(Size::new(100.0, f32::INFINITY), &mut context, &mut delegates, wrap(ScrollOrientation::Vertical))
            .unwrap();
        let (first, _) = algorithm.realized_range().unwrap();
        assert!(first >= 196, "realization started at {first}");
        assert!(context.created < 40);
    }

    #[test]
    fn test_arrange_centers_partial_line() {
        let mut context = TestContext::uniform(6, Size::new(25.0, 10.0));
        let mut algorithm = FlowLayoutAlgorithm::new();
        let mut delegates = GridDelegates { per_line: 4 };
        let available = Size::new(100.0, f32::INFINITY);

        algorithm
            .measure(available, &mut context, &mut delegates, wrap(ScrollOrientation::Vertical))
            .unwrap();
        algorithm
            .arrange(Size::new(100.0, 20.0), &mut context, true, LineAlignment::Center, 0.0)
            .unwrap();

        // Two items on the second line share 50px of slack.
        assert_eq!(context.arranged_rect(4).unwrap(), Rect::new(25.0, 10.0, 25.0, 10.0));
        assert_eq!(context.arranged_rect(0).unwrap().left(), 0.0);
    }

    #[test]
    fn test_stretch_scales_full_lines_only() {
        let mut context = TestContext::new(5, 10.0);
        for (index, width) in [30.0, 30.0, 20.0, 40.0, 10.0].into_iter().enumerate() {
            context.sizes[index].width = width;
        }
        let mut algorithm = FlowLayoutAlgorithm::new();
        let mut delegates = GridDelegates { per_line: 3 };
        let available = Size::new(100.0, f32::INFINITY);

        algorithm
            .measure(available, &mut context, &mut delegates, wrap(ScrollOrientation::Vertical))
            .unwrap();
        algorithm
            .arrange(Size::new(100.0, 20.0), &mut context, true, LineAlignment::Stretch, 0.0)
            .unwrap();

        // First line: 30 + 30 + 20 + 40 would overflow, so it holds three
        // items totalling 80px and is scaled by 1.25.
        assert_eq!(context.arranged_rect(0).unwrap(), Rect::new(0.0, 0.0, 37.5, 10.0));
        assert_eq!(context.arranged_rect(2).unwrap(), Rect::new(75.0, 0.0, 25.0, 10.0));
        // The last line keeps natural sizes.
        assert_eq!(context.arranged_rect(3).unwrap(), Rect::new(0.0, 10.0, 40.0, 10.0));
        assert_eq!(context.arranged_rect(4).unwrap(), Rect::new(40.0, 10.0, 10.0, 10.0));
    }

    #[test]
    fn test_stretch_lines_pick_the_scale_closer_to_one() {
        let mut context = TestContext::new(4, 10.0);
        for (index, width) in [60.0, 45.0, 50.0, 30.0].into_iter().enumerate() {
            context.sizes[index].width = width;
        }
        let mut algorithm = FlowLayoutAlgorithm::new();
        let mut delegates = GridDelegates { per_line: 2 };
        let available = Size::new(100.0, f32::INFINITY);
        let params = FlowMeasure {
            stretch_lines: true,
            ..wrap(ScrollOrientation::Vertical)
        };

        algorithm.measure(available, &mut context, &mut delegates, params).unwrap();
        // 45 joins 60 (shrink by 100/105 beats enlarge by 100/60); 50 does not
        // join the overflowing line.
        let manager = algorithm.element_manager();
        assert_eq!(manager.bounds_for_data_index(1), Rect::new(60.0, 0.0, 45.0, 10.0));
        assert_eq!(manager.bounds_for_data_index(2), Rect::new(0.0, 10.0, 50.0, 10.0));
        assert_eq!(manager.bounds_for_data_index(3), Rect::new(50.0, 10.0, 30.0, 10.0));

        algorithm
            .arrange(Size::new(100.0, 20.0), &mut context, true, LineAlignment::Stretch, 0.0)
            .unwrap();
        let first = context.arranged_rect(0).unwrap();
        assert!((first.width() - 6000.0 / 105.0).abs() < 0.01);
        assert!((context.arranged_rect(1).unwrap().right() - 100.0).abs() < 0.01);
        // The last line fits and keeps natural sizes.
        assert_eq!(context.arranged_rect(3).unwrap(), Rect::new(50.0, 10.0, 30.0, 10.0));
    }

    #[test]
    fn test_recommended_anchor_realizes_its_line() {
        let mut context = TestContext::uniform(400, Size::new(25.0, 10.0));
        context.realization = Rect::new(0.0, 0.0, 100.0, 30.0);
        context.anchor = Some(201);
        let mut algorithm = FlowLayoutAlgorithm::new();
        let mut delegates = GridDelegates { per_line: 4 };

        algorithm
            .measure(Size::new(100.0, f32::INFINITY), &mut context, &mut delegates, wrap(ScrollOrientation::Vertical))
            .unwrap();
        let (first, last) = algorithm.realized_range().unwrap();
        assert!(first <= 200 && last >= 201);
    }

    #[test]
    fn test_items_changed_marks_collection_change() {
        let mut context = TestContext::uniform(8, Size::new(25.0, 10.0));
        let mut algorithm = FlowLayoutAlgorithm::new();
        let mut delegates = GridDelegates { per_line: 4 };
        algorithm
            .measure(Size::new(100.0, f32::INFINITY), &mut context, &mut delegates, wrap(ScrollOrientation::Vertical))
            .unwrap();

        context.sizes.truncate(4);
        algorithm
            .on_items_source_changed(&mut context, &CollectionChange::remove(4, 4))
            .unwrap();
        assert!(algorithm.collection_change_pending);
        assert_eq!(algorithm.realized_range(), Some((0, 3)));
    }
}
