//! Layouts decide which items are realized and where they go.
//!
//! Every layout implements [`VirtualizingLayout`] and talks to its host only
//! through a [`LayoutContext`]. Per-context state (the realized range, size
//! estimates, packing tables) lives in the context's layout-state slot, so a
//! single layout value can serve several containers.
//!
//! The built-in layouts are a closed set collected in [`LayoutKind`]; anything
//! else plugs in through [`LayoutKind::Custom`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use horizon_repeater_core::Size;

use crate::error::{RepeaterError, Result};
use crate::source::CollectionChange;

pub mod context;
pub mod element_manager;
pub mod estimation;
pub mod flow;
pub mod flow_algorithm;
pub mod masonry;
pub mod orientation;
pub mod stack;
pub mod uniform_grid;

#[cfg(test)]
pub(crate) mod test_context;

pub use context::{
    ElementRealizationOptions, LayoutContext, LayoutState, NonVirtualizingContext,
};
pub use flow::{FlowLayout, FlowLayoutOptions};
pub use flow_algorithm::{FlowLayoutAlgorithm, FlowLayoutAnchorInfo, LineAlignment};
pub use masonry::{MasonryLayout, MasonryLayoutOptions};
pub use orientation::{Orientation, ScrollOrientation};
pub use stack::{StackLayout, StackLayoutOptions};
pub use uniform_grid::{
    UniformGridLayout, UniformGridLayoutItemsJustification, UniformGridLayoutItemsStretch,
    UniformGridLayoutOptions,
};

/// The contract between a container and a layout.
pub trait VirtualizingLayout: Send + Sync {
    /// Create the per-context state. Called when the layout is attached.
    fn initialize_for_context(&self, _context: &mut dyn LayoutContext) -> Result<()> {
        Ok(())
    }

    /// Release the per-context state and any elements it holds.
    fn uninitialize_for_context(&self, _context: &mut dyn LayoutContext) -> Result<()> {
        Ok(())
    }

    /// Realize and measure the items the context needs; returns the extent size.
    fn measure(&self, context: &mut dyn LayoutContext, available: Size) -> Result<Size>;

    /// Position the elements realized by the last measure.
    fn arrange(&self, context: &mut dyn LayoutContext, final_size: Size) -> Result<Size>;

    /// The item source changed; fix up whatever the state caches.
    fn on_items_changed(
        &self,
        _context: &mut dyn LayoutContext,
        _change: &CollectionChange,
    ) -> Result<()> {
        Ok(())
    }
}

/// The layout slot of a container.
pub enum LayoutKind {
    Stack(StackLayout),
    Flow(FlowLayout),
    UniformGrid(UniformGridLayout),
    Masonry(MasonryLayout),
    Custom(Box<dyn VirtualizingLayout>),
}

impl LayoutKind {
    pub fn as_layout(&self) -> &dyn VirtualizingLayout {
        match self {
            Self::Stack(layout) => layout,
            Self::Flow(layout) => layout,
            Self::UniformGrid(layout) => layout,
            Self::Masonry(layout) => layout,
            Self::Custom(layout) => layout.as_ref(),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stack(_) => "stack",
            Self::Flow(_) => "flow",
            Self::UniformGrid(_) => "uniform_grid",
            Self::Masonry(_) => "masonry",
            Self::Custom(_) => "custom",
        }
    }
}

impl Default for LayoutKind {
    fn default() -> Self {
        Self::Stack(StackLayout::default())
    }
}

impl std::fmt::Debug for LayoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stack(layout) => f.debug_tuple("Stack").field(layout).finish(),
            Self::Flow(layout) => f.debug_tuple("Flow").field(layout).finish(),
            Self::UniformGrid(layout) => f.debug_tuple("UniformGrid").field(layout).finish(),
            Self::Masonry(layout) => f.debug_tuple("Masonry").field(layout).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<StackLayout> for LayoutKind {
    fn from(layout: StackLayout) -> Self {
        Self::Stack(layout)
    }
}

impl From<FlowLayout> for LayoutKind {
    fn from(layout: FlowLayout) -> Self {
        Self::Flow(layout)
    }
}

impl From<UniformGridLayout> for LayoutKind {
    fn from(layout: UniformGridLayout) -> Self {
        Self::UniformGrid(layout)
    }
}

impl From<MasonryLayout> for LayoutKind {
    fn from(layout: MasonryLayout) -> Self {
        Self::Masonry(layout)
    }
}

impl From<Box<dyn VirtualizingLayout>> for LayoutKind {
    fn from(layout: Box<dyn VirtualizingLayout>) -> Self {
        Self::Custom(layout)
    }
}

/// How the flow and masonry layouts use spare minor-axis space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemsStretch {
    Start,
    End,
    Center,
    /// Spread the spare space between items.
    Justify,
    /// Grow the items to fill the space.
    #[default]
    Stretch,
}

impl FromStr for ItemsStretch {
    type Err = RepeaterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            "center" => Ok(Self::Center),
            "justify" => Ok(Self::Justify),
            "stretch" => Ok(Self::Stretch),
            _ => Err(RepeaterError::unknown_option("ItemsStretch", s)),
        }
    }
}

impl ItemsStretch {
    /// The equivalent line alignment of the flow engine.
    pub fn line_alignment(self) -> LineAlignment {
        match self {
            Self::Start => LineAlignment::Start,
            Self::End => LineAlignment::End,
            Self::Center => LineAlignment::Center,
            Self::Justify => LineAlignment::SpaceBetween,
            Self::Stretch => LineAlignment::Stretch,
        }
    }
}
