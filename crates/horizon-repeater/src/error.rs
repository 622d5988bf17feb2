//! Error types for the virtualization engine.
//!
//! Every error here is a contract violation, a configuration problem or an
//! out-of-range request. Expected conditions during virtualized operation
//! (an index that is not realized, a key that is not in the reset pool) are
//! reported through `Option` and never through this type.

use crate::element::ElementId;

/// Result type alias for repeater operations.
pub type Result<T> = std::result::Result<T, RepeaterError>;

/// Errors that can occur while realizing, laying out or selecting items.
#[derive(Debug, thiserror::Error)]
pub enum RepeaterError {
    /// A layout pass was started while another one was running.
    #[error("Reentrancy detected during layout")]
    LayoutReentrancy,

    /// A layout pass was started while a collection change was being processed.
    #[error("Cannot run layout in the middle of a collection change")]
    LayoutDuringCollectionChange,

    /// The items source was mutated while a layout pass was running.
    #[error("Changes in data source are not allowed during layout")]
    CollectionChangeDuringLayout,

    /// The items source was mutated while a previous change was being processed.
    #[error("Changes in the data source are not allowed during another change in the data source")]
    NestedCollectionChange,

    /// `get_or_create_element` was called from inside a layout pass.
    #[error("GetOrCreateElement invocation is not allowed during layout")]
    ElementRequestDuringLayout,

    /// The layout slot was replaced from inside a layout pass.
    #[error("Layout cannot be changed during layout")]
    LayoutChangeDuringLayout,

    /// The item template was replaced from inside a layout pass.
    #[error("ItemTemplate cannot be changed during layout")]
    TemplateChangeDuringLayout,

    /// Pin requested for an element that is not realized.
    #[error("You can't pin an unrealized element")]
    PinUnrealized,

    /// Unpin requested for an element that is not realized.
    #[error("You can't unpin an unrealized element")]
    UnpinUnrealized,

    /// More unpin calls than pin calls.
    #[error("UnpinElement was called more often than PinElement")]
    UnbalancedUnpin,

    /// Two elements were parked in the reset pool under the same key.
    #[error("The ID '{0}' is not unique")]
    DuplicateUniqueId(String),

    /// A collection change notification with an impossible shape.
    #[error("Invalid collection change: {0}")]
    InvalidCollectionChange(&'static str),

    /// The element handle does not belong to this container.
    #[error("Element {0:?} is not owned by this container")]
    UnknownElement(ElementId),

    /// A non-virtualizing context was asked to move its layout origin.
    #[error("LayoutOrigin must be at (0,0) when RealizationRect is infinite sized")]
    NonZeroLayoutOrigin,

    /// The requested index lies outside the items source.
    #[error("Index {index} is out of range for a source of {count} items")]
    IndexOutOfRange { index: usize, count: usize },

    /// An element was requested but no items source is attached.
    #[error("ItemsSource doesn't have a value")]
    MissingItemsSource,

    /// A selection mode name that does not match any selector.
    #[error("Unknown selection mode '{0}'")]
    UnknownSelectionMode(String),

    /// An option name that does not match any variant of the option enum.
    #[error("Unknown value '{value}' for option '{option}'")]
    UnknownOption { option: &'static str, value: String },

    /// The layout-state slot holds a state object of a different layout.
    #[error("Layout state type mismatch: expected {expected}")]
    LayoutStateMismatch { expected: &'static str },

    /// The layout was used before `initialize_for_context` created its state.
    #[error("Layout state is missing; the layout was not initialized for this context")]
    MissingLayoutState,

    /// A configuration value outside its legal range.
    #[error("Invalid value for '{option}': {message}")]
    InvalidConfig { option: &'static str, message: String },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl RepeaterError {
    /// Create an out-of-range error.
    pub fn index_out_of_range(index: usize, count: usize) -> Self {
        Self::IndexOutOfRange { index, count }
    }

    /// Create an unknown-option error.
    pub fn unknown_option(option: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownOption {
            option,
            value: value.into(),
        }
    }

    /// Create a layout-state mismatch error for the expected state type.
    pub fn layout_state_mismatch<S>() -> Self {
        Self::LayoutStateMismatch {
            expected: std::any::type_name::<S>(),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_config(option: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            option,
            message: message.into(),
        }
    }

    /// Whether this error reports a broken calling contract (reentrancy,
    /// pin balance, malformed notifications) rather than bad configuration or data.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::LayoutReentrancy
                | Self::LayoutDuringCollectionChange
                | Self::CollectionChangeDuringLayout
                | Self::NestedCollectionChange
                | Self::ElementRequestDuringLayout
                | Self::LayoutChangeDuringLayout
                | Self::TemplateChangeDuringLayout
                | Self::PinUnrealized
                | Self::UnpinUnrealized
                | Self::UnbalancedUnpin
                | Self::DuplicateUniqueId(_)
                | Self::InvalidCollectionChange(_)
                | Self::UnknownElement(_)
                | Self::NonZeroLayoutOrigin
        )
    }
}
