//! Uniform grid layout: every cell has the size of item 0.
//!
//! The cell size comes from the first item (or the configured minimum item
//! size), optionally grown to use up the spare minor-axis space. Because all
//! cells match, anchors and extents are computed exactly from line counts.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use horizon_repeater_core::logging::targets;
use horizon_repeater_core::{Rect, Size};

use crate::element::ElementId;
use crate::error::{RepeaterError, Result};
use crate::layout::context::{
    ElementRealizationOptions, LayoutContext, ensure_state, release_state, with_state,
};
use crate::layout::flow_algorithm::{
    FlowLayoutAlgorithm, FlowLayoutAnchorInfo, FlowLayoutDelegates, FlowMeasure, LineAlignment,
    RealizedBounds,
};
use crate::layout::orientation::{AxisMapper, Orientation, ScrollOrientation};
use crate::layout::VirtualizingLayout;
use crate::source::{CollectionAction, CollectionChange};

/// Placement of the cells of a line within the available minor space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UniformGridLayoutItemsJustification {
    #[default]
    Start,
    Center,
    End,
    SpaceAround,
    SpaceBetween,
    SpaceEvenly,
}

impl UniformGridLayoutItemsJustification {
    fn line_alignment(self) -> LineAlignment {
        match self {
            Self::Start => LineAlignment::Start,
            Self::Center => LineAlignment::Center,
            Self::End => LineAlignment::End,
            Self::SpaceAround => LineAlignment::SpaceAround,
            Self::SpaceBetween => LineAlignment::SpaceBetween,
            Self::SpaceEvenly => LineAlignment::SpaceEvenly,
        }
    }
}

impl FromStr for UniformGridLayoutItemsJustification {
    type Err = RepeaterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "center" => Ok(Self::Center),
            "end" => Ok(Self::End),
            "spacearound" | "space-around" => Ok(Self::SpaceAround),
            "spacebetween" | "space-between" => Ok(Self::SpaceBetween),
            "spaceevenly" | "space-evenly" => Ok(Self::SpaceEvenly),
            _ => Err(RepeaterError::unknown_option("UniformGridLayoutItemsJustification", s)),
        }
    }
}

/// How cells grow into spare minor-axis space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UniformGridLayoutItemsStretch {
    /// Keep the measured size.
    #[default]
    None,
    /// Grow along the minor axis only.
    Fill,
    /// Grow along both axes, keeping the aspect ratio.
    Uniform,
}

impl FromStr for UniformGridLayoutItemsStretch {
    type Err = RepeaterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "fill" => Ok(Self::Fill),
            "uniform" => Ok(Self::Uniform),
            _ => Err(RepeaterError::unknown_option("UniformGridLayoutItemsStretch", s)),
        }
    }
}

/// Configuration of a [`UniformGridLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformGridLayoutOptions {
    /// Direction cells flow within a line. `Horizontal` fills rows and
    /// scrolls vertically.
    pub orientation: Orientation,
    /// Cell width; the measured width of item 0 when unset.
    pub min_item_width: Option<f32>,
    /// Cell height; the measured height of item 0 when unset.
    pub min_item_height: Option<f32>,
    pub min_row_spacing: f32,
    pub min_column_spacing: f32,
    pub items_justification: UniformGridLayoutItemsJustification,
    pub items_stretch: UniformGridLayoutItemsStretch,
    /// Upper bound on cells per line; unbounded when unset.
    pub maximum_rows_or_columns: Option<usize>,
}

impl Default for UniformGridLayoutOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::Horizontal,
            min_item_width: None,
            min_item_height: None,
            min_row_spacing: 0.0,
            min_column_spacing: 0.0,
            items_justification: UniformGridLayoutItemsJustification::Start,
            items_stretch: UniformGridLayoutItemsStretch::None,
            maximum_rows_or_columns: None,
        }
    }
}

impl UniformGridLayoutOptions {
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_min_item_size(mut self, width: f32, height: f32) -> Self {
        self.min_item_width = Some(width);
        self.min_item_height = Some(height);
        self
    }

    pub fn with_spacing(mut self, row: f32, column: f32) -> Self {
        self.min_row_spacing = row;
        self.min_column_spacing = column;
        self
    }

    pub fn with_items_justification(mut self, justification: UniformGridLayoutItemsJustification) -> Self {
        self.items_justification = justification;
        self
    }

    pub fn with_items_stretch(mut self, stretch: UniformGridLayoutItemsStretch) -> Self {
        self.items_stretch = stretch;
        self
    }

    pub fn with_maximum_rows_or_columns(mut self, maximum: usize) -> Self {
        self.maximum_rows_or_columns = Some(maximum);
        self
    }

    fn max_items_per_line(&self) -> usize {
        self.maximum_rows_or_columns.unwrap_or(usize::MAX).max(1)
    }

    /// Gap between lines.
    fn line_spacing(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.min_row_spacing,
            Orientation::Vertical => self.min_column_spacing,
        }
    }

    /// Gap between cells of a line.
    fn min_item_spacing(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.min_column_spacing,
            Orientation::Vertical => self.min_row_spacing,
        }
    }

    fn scroll_orientation(&self) -> ScrollOrientation {
        ScrollOrientation::across(self.orientation)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UniformGridLayout {
    options: UniformGridLayoutOptions,
}

impl UniformGridLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: UniformGridLayoutOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &UniformGridLayoutOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut UniformGridLayoutOptions {
        &mut self.options
    }
}

/// Per-context state of a [`UniformGridLayout`].
#[derive(Debug, Default)]
pub struct UniformGridLayoutState {
    flow: FlowLayoutAlgorithm,
    effective_item_width: f32,
    effective_item_height: f32,
    /// Item 0, realized only to size the cells, while the flow range does not own it.
    cached_first_element: Option<ElementId>,
}

impl UniformGridLayoutState {
    #[inline]
    pub fn flow(&self) -> &FlowLayoutAlgorithm {
        &self.flow
    }

    /// Size every cell is measured and arranged at.
    pub fn effective_item_size(&self) -> Size {
        Size::new(self.effective_item_width, self.effective_item_height)
    }

    fn ensure_element_size(
        &mut self,
        available: Size,
        context: &mut dyn LayoutContext,
        options: &UniformGridLayoutOptions,
    ) -> Result<()> {
        if context.item_count() == 0 {
            return Ok(());
        }
        if let Some(element) = self.flow.element_if_realized(context, 0)? {
            let desired = context.measure_element(element, available)?;
            self.set_size(desired, available, options);
            return Ok(());
        }

        let element = match self.cached_first_element {
            Some(element) => element,
            None => context.get_or_create_element_at(0, ElementRealizationOptions::OWNED)?,
        };
        let desired = context.measure_element(element, available)?;
        self.set_size(desired, available, options);
        self.cached_first_element = if self.flow.try_add_element0(element) {
            None
        } else {
            Some(element)
        };
        Ok(())
    }

    fn set_size(&mut self, desired: Size, available: Size, options: &UniformGridLayoutOptions) {
        let max_items_per_line = options.max_items_per_line() as f32;
        self.effective_item_width = options.min_item_width.unwrap_or(desired.width);
        self.effective_item_height = options.min_item_height.unwrap_or(desired.height);

        let horizontal = options.orientation == Orientation::Horizontal;
        let available_minor = if horizontal { available.width } else { available.height };
        let minor_spacing = options.min_item_spacing();
        let item_minor = if horizontal {
            self.effective_item_width
        } else {
            self.effective_item_height
        };

        let mut extra_minor = 0.0f32;
        if available_minor.is_finite() {
            let per_line = max_items_per_line
                .min((available_minor / (item_minor + minor_spacing)).floor().max(1.0));
            let used = per_line * (item_minor + minor_spacing) - minor_spacing;
            extra_minor = ((available_minor - used) / per_line).trunc();
        }

        match options.items_stretch {
            UniformGridLayoutItemsStretch::None => {}
            UniformGridLayoutItemsStretch::Fill => {
                if horizontal {
                    self.effective_item_width += extra_minor;
                } else {
                    self.effective_item_height += extra_minor;
                }
            }
            UniformGridLayoutItemsStretch::Uniform => {
                let item_major = if horizontal {
                    self.effective_item_height
                } else {
                    self.effective_item_width
                };
                let extra_major = if item_minor > 0.0 {
                    item_major * (extra_minor / item_minor)
                } else {
                    0.0
                };
                if horizontal {
                    self.effective_item_width += extra_minor;
                    self.effective_item_height += extra_major;
                } else {
                    self.effective_item_height += extra_minor;
                    self.effective_item_width += extra_major;
                }
            }
        }
    }

    /// Once the flow range holds item 0 the cached copy is redundant.
    fn ensure_first_element_ownership(&mut self, context: &mut dyn LayoutContext) -> Result<()> {
        if let Some(cached) = self.cached_first_element
            && self.flow.element_if_realized(context, 0)?.is_some()
        {
            context.recycle_element(cached)?;
            self.cached_first_element = None;
        }
        Ok(())
    }

    /// Drop the cached item 0 when a change may have replaced it.
    fn clear_element_on_data_source_change(
        &mut self,
        context: &mut dyn LayoutContext,
        change: &CollectionChange,
    ) -> Result<()> {
        let Some(cached) = self.cached_first_element else {
            return Ok(());
        };
        let touches_first = match change.action {
            CollectionAction::Add => change.new_start == 0,
            CollectionAction::Replace => change.new_start == 0 || change.old_start == 0,
            CollectionAction::Remove => change.old_start == 0,
            CollectionAction::Move => change.new_start == 0 || change.old_start == 0,
            CollectionAction::Reset => true,
        };
        if touches_first {
            context.recycle_element(cached)?;
            self.cached_first_element = None;
        }
        Ok(())
    }
}

struct GridDelegates<'a> {
    options: &'a UniformGridLayoutOptions,
    axis: AxisMapper,
    item_size: Size,
}

impl GridDelegates<'_> {
    fn items_per_line(&self, available: Size) -> usize {
        let spacing = self.options.min_item_spacing();
        let per_line = ((self.axis.minor(available) + spacing)
            / (self.axis.minor(self.item_size) + spacing))
            .max(1.0);
        // Saturating cast; an unbounded minor axis yields usize::MAX.
        (per_line as usize).min(self.options.max_items_per_line()).max(1)
    }

    fn major_size_with_spacing(&self) -> f32 {
        self.axis.major(self.item_size) + self.options.line_spacing()
    }

    fn minor_size_with_spacing(&self) -> f32 {
        self.axis.minor(self.item_size) + self.options.min_item_spacing()
    }

    fn layout_rect_for_index(&self, available: Size, index: usize, last_extent: Rect) -> Rect {
        let per_line = self.items_per_line(available);
        let line = index / per_line;
        let in_line = index - line * per_line;
        self.axis.minor_major_rect(
            in_line as f32 * self.minor_size_with_spacing() + self.axis.minor_start(last_extent),
            line as f32 * self.major_size_with_spacing() + self.axis.major_start(last_extent),
            self.axis.minor(self.item_size),
            self.axis.major(self.item_size),
        )
    }
}

impl FlowLayoutDelegates for GridDelegates<'_> {
    fn measure_size(&mut self, _index: usize, _available: Size, _context: &mut dyn LayoutContext) -> Size {
        self.item_size
    }

    fn provisional_arrange_size(
        &mut self,
        _index: usize,
        _measure_size: Size,
        _desired_size: Size,
        _context: &mut dyn LayoutContext,
    ) -> Size {
        self.item_size
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

        let per_line = self.items_per_line(available);
        let line_size = self.major_size_with_spacing();
        let major_size = if axis.major_size(last_extent) == 0.0 {
            (count / per_line + 1) as f32 * line_size
        } else {
            axis.major_size(last_extent)
        };
        let start_in_extent = axis.major_start(realization) - axis.major_start(last_extent);
        if start_in_extent + axis.major_size(realization) < 0.0 || start_in_extent > major_size {
            return Ok(FlowLayoutAnchorInfo::NONE);
        }

        let offset = (start_in_extent + self.options.line_spacing()).max(0.0);
        let line = if line_size > 0.0 { (offset / line_size) as usize } else { 0 };
        let index = line.saturating_mul(per_line).min(count - 1);
        let bounds = self.layout_rect_for_index(available, index, last_extent);
        Ok(FlowLayoutAnchorInfo {
            index: Some(index),
            offset: axis.major_start(bounds),
        })
    }

    fn anchor_for_target_element(
        &mut self,
        target: usize,
        available: Size,
        _last_extent: Rect,
        _context: &mut dyn LayoutContext,
    ) -> Result<usize> {
        let per_line = self.items_per_line(available);
        Ok(target / per_line * per_line)
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

        let per_line = self.items_per_line(available);
        let line_size = self.major_size_with_spacing();
        let line_spacing = self.options.line_spacing();
        let available_minor = axis.minor(available);
        let minor = if available_minor.is_finite() {
            available_minor
        } else {
            (count as f32 * self.minor_size_with_spacing() - self.options.min_item_spacing()).max(0.0)
        };
        axis.set_minor_size(&mut extent, minor);

        let lines = count.div_ceil(per_line);
        axis.set_major_size(&mut extent, (lines as f32 * line_size - line_spacing).max(0.0));

        if let (Some(first), Some(last)) = (first, last) {
            let start = axis.major_start(first.bounds) - (first.index / per_line) as f32 * line_size;
            let remaining_lines = (count - 1) / per_line - last.index / per_line;
            axis.set_major_start(&mut extent, start);
            axis.set_major_size(
                &mut extent,
                axis.major_end(last.bounds) - start + remaining_lines as f32 * line_size,
            );
        }
        Ok(extent)
    }
}

impl VirtualizingLayout for UniformGridLayout {
    fn initialize_for_context(&self, context: &mut dyn LayoutContext) -> Result<()> {
        ensure_state(context, UniformGridLayoutState::default)
    }

    fn uninitialize_for_context(&self, context: &mut dyn LayoutContext) -> Result<()> {
        release_state::<UniformGridLayoutState>(context, |state, context| {
            if let Some(cached) = state.cached_first_element.take() {
                context.recycle_element(cached)?;
            }
            state.flow.uninitialize(context)
        })
    }

    fn measure(&self, context: &mut dyn LayoutContext, available: Size) -> Result<Size> {
        let options = &self.options;
        ensure_state(context, UniformGridLayoutState::default)?;
        with_state::<UniformGridLayoutState, _>(context, |state, context| {
            state.ensure_element_size(available, context, options)?;

            let mut delegates = GridDelegates {
                options,
                axis: AxisMapper::new(options.scroll_orientation()),
                item_size: state.effective_item_size(),
            };
            let desired = state.flow.measure(
                available,
                context,
                &mut delegates,
                FlowMeasure {
                    is_wrapping: true,
                    min_item_spacing: options.min_item_spacing(),
                    line_spacing: options.line_spacing(),
                    max_items_per_line: options.max_items_per_line(),
                    scroll: options.scroll_orientation(),
                    disable_virtualization: false,
                    stretch_lines: false,
                },
            )?;

            state.ensure_first_element_ownership(context)?;
            tracing::trace!(
                target: targets::LAYOUT,
                item_size = ?state.effective_item_size(),
                ?desired,
                "uniform grid measured"
            );
            Ok(desired)
        })
    }

    fn arrange(&self, context: &mut dyn LayoutContext, final_size: Size) -> Result<Size> {
        let alignment = self.options.items_justification.line_alignment();
        let spacing = self.options.min_item_spacing();
        with_state::<UniformGridLayoutState, _>(context, |state, context| {
            state.flow.arrange(final_size, context, true, alignment, spacing)
        })
    }

    fn on_items_changed(&self, context: &mut dyn LayoutContext, change: &CollectionChange) -> Result<()> {
        with_state::<UniformGridLayoutState, _>(context, |state, context| {
            state.clear_element_on_data_source_change(context, change)?;
            state.flow.on_items_source_changed(context, change)
        })
    }
}
