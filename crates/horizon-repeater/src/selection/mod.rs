//! Selection state and the policies that drive it.
//!
//! - [`SelectionModel`]: selected indices, anchor and single-select flag
//! - [`Selector`]: translates interaction and focus gestures into model calls
//! - [`SelectionMode`]: picks the selector a view uses

mod model;
mod selector;

pub use model::SelectionModel;
pub(crate) use model::translate_index;
pub use selector::{Modifiers, SelectionMode, Selector};
