//! Wrapping flow layout with natural item sizes.
//!
//! Items are measured against a fixed line height and keep their desired
//! minor size; lines break greedily when the next item would overflow. The
//! average minor size of measured items drives anchor and extent estimates.

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
    FlowLayoutAlgorithm, FlowLayoutAnchorInfo, FlowLayoutDelegates, FlowMeasure, RealizedBounds,
    measure_element,
};
use crate::layout::orientation::{AxisMapper, Orientation, ScrollOrientation};
use crate::layout::{ItemsStretch, VirtualizingLayout};
use crate::source::CollectionChange;

/// Default height of a line.
pub const DEFAULT_LINE_HEIGHT: f32 = 200.0;

/// Configuration of a [`FlowLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowLayoutOptions {
    /// Direction items flow within a line. `Horizontal` scrolls vertically.
    pub orientation: Orientation,
    pub line_spacing: f32,
    pub min_item_spacing: f32,
    /// Major-axis size every item is measured against.
    pub line_height: f32,
    pub items_stretch: ItemsStretch,
}

impl Default for FlowLayoutOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::Horizontal,
            line_spacing: 0.0,
            min_item_spacing: 0.0,
            line_height: DEFAULT_LINE_HEIGHT,
            items_stretch: ItemsStretch::Stretch,
        }
    }
}

impl FlowLayoutOptions {
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_line_spacing(mut self, spacing: f32) -> Self {
        self.line_spacing = spacing;
        self
    }

    pub fn with_min_item_spacing(mut self, spacing: f32) -> Self {
        self.min_item_spacing = spacing;
        self
    }

    pub fn with_line_height(mut self, height: f32) -> Self {
        self.line_height = height;
        self
    }

    pub fn with_items_stretch(mut self, stretch: ItemsStretch) -> Self {
        self.items_stretch = stretch;
        self
    }

    fn scroll_orientation(&self) -> ScrollOrientation {
        ScrollOrientation::across(self.orientation)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlowLayout {
    options: FlowLayoutOptions,
}

impl FlowLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FlowLayoutOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &FlowLayoutOptions {
        &self.options
    }

    /// Set the line height. Returns `true` if it changed.
    pub fn set_line_height(&mut self, height: f32) -> bool {
        if (self.options.line_height - height).abs() < f32::EPSILON {
            return false;
        }
        self.options.line_height = height;
        true
    }

    pub fn set_line_spacing(&mut self, spacing: f32) -> bool {
        if (self.options.line_spacing - spacing).abs() < f32::EPSILON {
            return false;
        }
        self.options.line_spacing = spacing;
        true
    }

    pub fn set_min_item_spacing(&mut self, spacing: f32) -> bool {
        if (self.options.min_item_spacing - spacing).abs() < f32::EPSILON {
            return false;
        }
        self.options.min_item_spacing = spacing;
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

/// Per-context state of a [`FlowLayout`].
#[derive(Debug, Default)]
pub struct FlowLayoutState {
    flow: FlowLayoutAlgorithm,
    /// Minor sizes of measured items.
    estimation: EstimationBuffer,
}

impl FlowLayoutState {
    #[inline]
    pub fn flow(&self) -> &FlowLayoutAlgorithm {
        &self.flow
    }

    #[inline]
    pub fn estimation(&self) -> &EstimationBuffer {
        &self.estimation
    }
}

struct FlowDelegates<'a> {
    options: &'a FlowLayoutOptions,
    axis: AxisMapper,
    estimation: &'a mut EstimationBuffer,
}

impl FlowDelegates<'_> {
    fn line_size(&self) -> f32 {
        self.options.line_height + self.options.line_spacing
    }

    /// Estimated items per line; at least one, unbounded on an infinite minor axis.
    fn average_items_per_line(&mut self, available: Size, context: &mut dyn LayoutContext) -> Result<f32> {
        if context.item_count() == 0 {
            return Ok(1.0);
        }
        if self.estimation.measured() == 0 {
            let element: ElementId =
                context.get_or_create_element_at(0, ElementRealizationOptions::OWNED)?;
            measure_element(self, context, element, 0, available)?;
            context.recycle_element(element)?;
        }
        let average = self.estimation.average().unwrap_or(0.0);
        if average <= 0.0 {
            return Ok(1.0);
        }
        let spacing = self.options.min_item_spacing;
        Ok(((self.axis.minor(available) + spacing) / (average + spacing))
            .floor()
            .max(1.0))
    }
}

impl FlowLayoutDelegates for FlowDelegates<'_> {
    fn measure_size(&mut self, _index: usize, _available: Size, _context: &mut dyn LayoutContext) -> Size {
        self.axis.minor_major_size(f32::INFINITY, self.options.line_height)
    }

    fn provisional_arrange_size(
        &mut self,
        _index: usize,
        _measure_size: Size,
        desired_size: Size,
        _context: &mut dyn LayoutContext,
    ) -> Size {
        desired_size
    }

    fn should_break_line(&mut self, _index: usize, remaining_space: f32) -> bool {
        remaining_space < 0.0
    }

    fn anchor_for_realization_rect(
        &mut self,
        available: Size,
        last_extent: Rect,
        context: &mut dyn LayoutContext,
    ) -> Result<FlowLayoutAnchorInfo> {
        let count = context.item_count();
        let realization = context.realization_rect();
        let axis = self.axis;
        if count == 0 || axis.major_size(realization) <= 0.0 {
            return Ok(FlowLayoutAnchorInfo::NONE);
        }

        let line_size = self.line_size();
        let per_line = self.average_items_per_line(available, context)?;
        let major_size = if axis.major_size(last_extent) == 0.0 {
            (count as f32 / per_line).ceil() * line_size - self.options.line_spacing
        } else {
            axis.major_size(last_extent)
        };

        let extent_start = axis.major_start(last_extent);
        let overlaps = axis.major_end(realization) >= extent_start
            && axis.major_start(realization) <= extent_start + major_size;
        if !overlaps {
            return Ok(FlowLayoutAnchorInfo::NONE);
        }

        let start_in_extent = axis.major_start(realization) - extent_start;
        let offset = (start_in_extent + self.options.line_spacing).max(0.0);
        let line = if line_size > 0.0 { (offset / line_size) as usize } else { 0 };
        let index = if line == 0 {
            0
        } else {
            ((line as f32 * per_line) as usize).min(count - 1)
        };
        Ok(FlowLayoutAnchorInfo {
            index: Some(index),
            offset: line as f32 * line_size + extent_start,
        })
    }

    fn anchor_for_target_element(
        &mut self,
        target: usize,
        _available: Size,
        _last_extent: Rect,
        _context: &mut dyn LayoutContext,
    ) -> Result<usize> {
        // Line starts depend on natural sizes; generation finds the real line.
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
        let mut extent = Rect::ZERO;
        if count == 0 {
            return Ok(extent);
        }

        let line_size = self.line_size();
        let per_line = self.average_items_per_line(available, context)?;
        let available_minor = axis.minor(available);

        match (first, last) {
            (Some(first), Some(last)) => {
                let lines_before = (first.index as f32 / per_line) as usize;
                let start = axis.major_start(first.bounds) - lines_before as f32 * line_size;
                let remaining_items = count - last.index - 1;
                let lines_after = (remaining_items as f32 / per_line) as usize;
                axis.set_major_start(&mut extent, start);
                axis.set_major_size(
                    &mut extent,
                    axis.major_end(last.bounds) - start + lines_after as f32 * line_size,
                );
                // Unbounded minor axis: everything sits on one line.
                let minor = if available_minor.is_finite() {
                    available_minor
                } else {
                    axis.minor_end(last.bounds).max(0.0)
                };
                axis.set_minor_size(&mut extent, minor);
            }
            _ => {
                let line_spacing = self.options.line_spacing;
                if available_minor.is_finite() {
                    let lines = (count as f32 / per_line).ceil();
                    axis.set_minor_size(&mut extent, available_minor);
                    axis.set_major_size(&mut extent, (lines * line_size - line_spacing).max(0.0));
                } else {
                    let spacing = self.options.min_item_spacing;
                    let minor = (self.options.line_height + spacing) * count as f32 - spacing;
                    axis.set_minor_size(&mut extent, minor.max(0.0));
                    axis.set_major_size(&mut extent, (line_size - line_spacing).max(0.0));
                }
            }
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
        self.estimation.record(index, self.axis.minor(provisional_size));
    }
}

impl VirtualizingLayout for FlowLayout {
    fn initialize_for_context(&self, context: &mut dyn LayoutContext) -> Result<()> {
        ensure_state(context, FlowLayoutState::default)
    }

    fn uninitialize_for_context(&self, context: &mut dyn LayoutContext) -> Result<()> {
        release_state::<FlowLayoutState>(context, |state, context| state.flow.uninitialize(context))
    }

    fn measure(&self, context: &mut dyn LayoutContext, available: Size) -> Result<Size> {
        let options = &self.options;
        let scroll = options.scroll_orientation();
        ensure_state(context, FlowLayoutState::default)?;
        with_state::<FlowLayoutState, _>(context, |state, context| {
            let mut delegates = FlowDelegates {
                options,
                axis: AxisMapper::new(scroll),
                estimation: &mut state.estimation,
            };
            let desired = state.flow.measure(
                available,
                context,
                &mut delegates,
                FlowMeasure {
                    is_wrapping: true,
                    min_item_spacing: options.min_item_spacing,
                    line_spacing: options.line_spacing,
                    max_items_per_line: usize::MAX,
                    scroll,
                    disable_virtualization: false,
                    stretch_lines: options.items_stretch == ItemsStretch::Stretch,
                },
            )?;
            tracing::trace!(target: targets::LAYOUT, ?desired, "flow measured");
            Ok(desired)
        })
    }

    fn arrange(&self, context: &mut dyn LayoutContext, final_size: Size) -> Result<Size> {
        let alignment = self.options.items_stretch.line_alignment();
        let spacing = self.options.min_item_spacing;
        with_state::<FlowLayoutState, _>(context, |state, context| {
            state.flow.arrange(final_size, context, true, alignment, spacing)
        })
    }

    fn on_items_changed(&self, context: &mut dyn LayoutContext, change: &CollectionChange) -> Result<()> {
        with_state::<FlowLayoutState, _>(context, |state, context| {
            state.flow.on_items_source_changed(context, change)
        })
    }
}
