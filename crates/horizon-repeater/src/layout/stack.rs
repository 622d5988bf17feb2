//! Stack layout: one item per line along the orientation.
//!
//! Unrealized items are assumed to have the running average size of the
//! items measured so far, which is how the anchor for a scroll position and
//! the total extent are estimated.

use serde::{Deserialize, Serialize};

use horizon_repeater_core::logging::targets;
use horizon_repeater_core::{Rect, Size};

use crate::element::ElementId;
use crate::error::Result;
use crate::layout::context::{
    ElementRealizationOptions, LayoutContext, ensure_state, release_state, with_state,
};
use crate::layout::estimation::EstimationBuffer;
use crate::layout::flow_algorithm::{
    FlowLayoutAlgorithm, FlowLayoutAnchorInfo, FlowLayoutDelegates, FlowMeasure, LineAlignment,
    RealizedBounds, measure_element,
};
use crate::layout::orientation::{AxisMapper, Orientation, ScrollOrientation};
use crate::layout::VirtualizingLayout;
use crate::source::CollectionChange;

/// Configuration of a [`StackLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackLayoutOptions {
    pub orientation: Orientation,
    /// Gap between consecutive items.
    pub spacing: f32,
}

impl Default for StackLayoutOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::Vertical,
            spacing: 0.0,
        }
    }
}

impl StackLayoutOptions {
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct StackLayout {
    options: StackLayoutOptions,
}

impl StackLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: StackLayoutOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &StackLayoutOptions {
        &self.options
    }

    /// Set the spacing. Returns `true` if it changed.
    pub fn set_spacing(&mut self, spacing: f32) -> bool {
        if (self.options.spacing - spacing).abs() < f32::EPSILON {
            return false;
        }
        self.options.spacing = spacing;
        true
    }

    pub fn set_orientation(&mut self, orientation: Orientation) -> bool {
        if self.options.orientation == orientation {
            return false;
        }
        self.options.orientation = orientation;
        true
    }

    fn scroll_orientation(&self) -> ScrollOrientation {
        ScrollOrientation::along(self.options.orientation)
    }
}

/// Per-context state of a [`StackLayout`].
#[derive(Debug, Default)]
pub struct StackLayoutState {
    flow: FlowLayoutAlgorithm,
    estimation: EstimationBuffer,
    /// Widest minor size seen during the current measure.
    max_arrange_bounds: f32,
}

impl StackLayoutState {
    #[inline]
    pub fn flow(&self) -> &FlowLayoutAlgorithm {
        &self.flow
    }

    #[inline]
    pub fn estimation(&self) -> &EstimationBuffer {
        &self.estimation
    }
}

struct StackDelegates<'a> {
    spacing: f32,
    axis: AxisMapper,
    estimation: &'a mut EstimationBuffer,
    max_arrange_bounds: &'a mut f32,
}

impl StackDelegates<'_> {
    /// Rounded average major size, measuring item 0 if nothing was measured yet.
    fn average_element_size(&mut self, available: Size, context: &mut dyn LayoutContext) -> Result<f32> {
        if context.item_count() == 0 {
            return Ok(0.0);
        }
        if self.estimation.measured() == 0 {
            let element: ElementId =
                context.get_or_create_element_at(0, ElementRealizationOptions::OWNED)?;
            measure_element(self, context, element, 0, available)?;
            context.recycle_element(element)?;
        }
        Ok(self.estimation.average().map_or(0.0, f32::round))
    }
}

impl FlowLayoutDelegates for StackDelegates<'_> {
    fn measure_size(&mut self, _index: usize, available: Size, _context: &mut dyn LayoutContext) -> Size {
        available
    }

    fn provisional_arrange_size(
        &mut self,
        _index: usize,
        measure_size: Size,
        desired_size: Size,
        _context: &mut dyn LayoutContext,
    ) -> Size {
        let measure_minor = self.axis.minor(measure_size);
        let minor = if measure_minor.is_finite() {
            measure_minor.max(self.axis.minor(desired_size))
        } else {
            self.axis.minor(desired_size)
        };
        self.axis.minor_major_size(minor, self.axis.major(desired_size))
    }

    fn should_break_line(&mut self, _index: usize, _remaining_space: f32) -> bool {
        true
    }

    fn anchor_for_realization_rect(
        &mut self,
        available: Size,
        last_extent: Rect,
        context: &mut dyn LayoutContext,
    ) -> Result<FlowLayoutAnchorInfo> {
        let count = context.item_count();
        if count == 0 {
            return Ok(FlowLayoutAnchorInfo::NONE);
        }
        let axis = self.axis;
        let realization = context.realization_rect();
        let average = self.average_element_size(available, context)? + self.spacing;
        let offset_in_extent = axis.major_start(realization) - axis.major_start(last_extent);
        let major_size = if axis.major_size(last_extent) == 0.0 {
            (average * count as f32 - self.spacing).max(0.0)
        } else {
            axis.major_size(last_extent)
        };

        // A zero-height window still gets an anchor when it touches the
        // extent, so a nested container keeps one element realized.
        if axis.major_size(realization) >= 0.0
            && offset_in_extent + axis.major_size(realization) >= 0.0
            && offset_in_extent <= major_size
        {
            let raw = if average > 0.0 { (offset_in_extent / average) as isize } else { 0 };
            let index = raw.clamp(0, count as isize - 1) as usize;
            return Ok(FlowLayoutAnchorInfo {
                index: Some(index),
                offset: index as f32 * average + axis.major_start(last_extent),
            });
        }
        Ok(FlowLayoutAnchorInfo::NONE)
    }

    fn anchor_for_target_element(
        &mut self,
        target: usize,
        _available: Size,
        _last_extent: Rect,
        _context: &mut dyn LayoutContext,
    ) -> Result<usize> {
        Ok(target)
    }

    fn extent(
        &mut self,
        available: Size,
        context: &mut dyn LayoutContext,
        first: Option<RealizedBounds>,
        last: Option<RealizedBounds>,
    ) -> Result<Rect> {
        let axis = self.axis;
        let count = context.item_count();
        let average = self.average_element_size(available, context)? + self.spacing;

        let mut extent = Rect::ZERO;
        axis.set_minor_size(&mut extent, *self.max_arrange_bounds);
        axis.set_major_size(&mut extent, (count as f32 * average - self.spacing).max(0.0));
        if count > 0
            && let (Some(first), Some(last)) = (first, last)
        {
            let start = axis.major_start(first.bounds) - first.index as f32 * average;
            let remaining = count - last.index - 1;
            axis.set_major_start(&mut extent, start);
            axis.set_major_size(
                &mut extent,
                axis.major_end(last.bounds) - start + remaining as f32 * average,
            );
        }
        Ok(extent)
    }

    fn on_element_measured(
        &mut self,
        _element: ElementId,
        index: usize,
        _available: Size,
        _measure_size: Size,
        _desired_size: Size,
        provisional_size: Size,
    ) {
        self.estimation.record(index, self.axis.major(provisional_size));
        *self.max_arrange_bounds = self.max_arrange_bounds.max(self.axis.minor(provisional_size));
    }
}

impl VirtualizingLayout for StackLayout {
    fn initialize_for_context(&self, context: &mut dyn LayoutContext) -> Result<()> {
        ensure_state(context, StackLayoutState::default)
    }

    fn uninitialize_for_context(&self, context: &mut dyn LayoutContext) -> Result<()> {
        release_state::<StackLayoutState>(context, |state, context| state.flow.uninitialize(context))
    }

    fn measure(&self, context: &mut dyn LayoutContext, available: Size) -> Result<Size> {
        let scroll = self.scroll_orientation();
        let spacing = self.options.spacing;
        ensure_state(context, StackLayoutState::default)?;
        with_state::<StackLayoutState, _>(context, |state, context| {
            state.max_arrange_bounds = 0.0;
            let mut delegates = StackDelegates {
                spacing,
                axis: AxisMapper::new(scroll),
                estimation: &mut state.estimation,
                max_arrange_bounds: &mut state.max_arrange_bounds,
            };
            let desired = state.flow.measure(
                available,
                context,
                &mut delegates,
                FlowMeasure {
                    is_wrapping: false,
                    min_item_spacing: 0.0,
                    line_spacing: spacing,
                    max_items_per_line: usize::MAX,
                    scroll,
                    disable_virtualization: false,
                    stretch_lines: false,
                },
            )?;
            tracing::trace!(target: targets::LAYOUT, ?desired, "stack measured");
            Ok(desired)
        })
    }

    fn arrange(&self, context: &mut dyn LayoutContext, final_size: Size) -> Result<Size> {
        with_state::<StackLayoutState, _>(context, |state, context| {
            state
                .flow
                .arrange(final_size, context, false, LineAlignment::Start, 0.0)
        })
    }

    fn on_items_changed(&self, context: &mut dyn LayoutContext, change: &CollectionChange) -> Result<()> {
        with_state::<StackLayoutState, _>(context, |state, context| {
            state.flow.on_items_source_changed(context, change)
        })
    }
}
