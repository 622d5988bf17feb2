//! Horizon Repeater - a virtualizing collection-view engine.
//!
//! Only the items that intersect the viewport (plus a configurable cache
//! buffer) hold a visual element. Elements that scroll out are recycled and
//! rebound to other items, so the cost of a list stays proportional to what
//! is on screen rather than to the size of the source.
//!
//! - **Realization**: [`ItemsRepeater`] owns the elements and drives the
//!   realize/clear state machine, the pinned pool and the keyed reset pool
//! - **Layouts**: stack, wrapping flow, uniform grid and masonry layouts, all
//!   built on a shared incremental flow engine or column packing
//! - **Selection**: [`SelectionModel`] plus the selector policies of each
//!   [`SelectionMode`], synchronized with realized elements by [`ItemsView`]
//! - **Configuration**: [`RepeaterConfig`] with TOML loading
//!
//! # Example
//!
//! ```
//! use horizon_repeater::{
//!     DataTemplate, Element, ItemsRepeater, ItemsSourceView, RecyclingElementFactory, Rect, Size,
//! };
//!
//! struct Row(Size);
//!
//! impl Element for Row {
//!     fn measure(&mut self, _available: Size) -> Size {
//!         self.0
//!     }
//! }
//!
//! struct RowTemplate;
//!
//! impl DataTemplate<f32> for RowTemplate {
//!     fn build(&mut self) -> Box<dyn Element> {
//!         Box::new(Row(Size::ZERO))
//!     }
//!
//!     fn bind(&mut self, element: &mut (dyn Element + 'static), height: &f32, _index: usize) {
//!         if let Some(row) = element.downcast_mut::<Row>() {
//!             row.0 = Size::new(200.0, *height);
//!         }
//!     }
//! }
//!
//! let mut repeater = ItemsRepeater::new(RecyclingElementFactory::new(RowTemplate));
//! repeater.set_items_source(Some(ItemsSourceView::new(vec![30.0; 10_000])))?;
//! repeater.set_visible_window(Rect::new(0.0, 0.0, 200.0, 300.0));
//!
//! let desired = repeater.measure(Size::new(200.0, f32::INFINITY))?;
//! repeater.arrange(desired)?;
//! assert!(repeater.children().len() < 50);
//! # Ok::<(), horizon_repeater::RepeaterError>(())
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod events;
pub mod items_view;
pub mod layout;
pub mod pool;
pub mod repeater;
pub mod selection;
pub mod source;
pub mod transition;
mod view_manager;
pub mod viewport;
pub mod virtualization;

pub use horizon_repeater_core::{Point, Rect, Signal, Size};

pub use config::{DEFAULT_CACHE_LENGTH, RepeaterConfig};
pub use element::{
    DataTemplate, Element, ElementArena, ElementFactory, ElementFactoryGetArgs, ElementId,
    IntoElement, ItemIsElementFactory, RecyclingElementFactory,
};
pub use error::{RepeaterError, Result};
pub use events::{
    ContainerContentChangingEvent, ElementClearingEvent, ElementIndexChangedEvent,
    ElementPreparedEvent, FocusMovedEvent, RepeaterSignals,
};
pub use items_view::{BringIntoViewEvent, ItemInvokedEvent, ItemsView};
pub use layout::{
    FlowLayout, FlowLayoutOptions, ItemsStretch, LayoutContext, LayoutKind, LineAlignment,
    MasonryLayout, MasonryLayoutOptions, NonVirtualizingContext, Orientation, StackLayout,
    StackLayoutOptions, UniformGridLayout, UniformGridLayoutItemsJustification,
    UniformGridLayoutItemsStretch, UniformGridLayoutOptions, VirtualizingLayout,
};
pub use repeater::ItemsRepeater;
pub use selection::{Modifiers, SelectionMode, SelectionModel, Selector};
pub use source::{CollectionAction, CollectionChange, ItemsSourceView};
pub use transition::{DepartureTransition, DepartureTrigger, ItemTransitionProvider};
pub use viewport::ViewportManager;
pub use virtualization::{ElementOwner, VirtualizationInfo};

static_assertions::assert_impl_all!(ItemsRepeater<u32>: Send);
static_assertions::assert_impl_all!(SelectionModel: Send, Sync);
