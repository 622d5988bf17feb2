//! Notifications raised by a container.

use horizon_repeater_core::Signal;

use crate::element::ElementId;

/// An element was realized for an item and added to the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementPreparedEvent {
    pub element: ElementId,
    pub index: usize,
}

/// An element is about to go back to its element factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementClearingEvent {
    pub element: ElementId,
}

/// A realized element now represents a different index after a source change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementIndexChangedEvent {
    pub element: ElementId,
    pub old_index: usize,
    pub new_index: usize,
}

/// Phased-rendering hook raised while an element is bound to its item.
///
/// Only raised when at least one slot is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerContentChangingEvent {
    pub element: ElementId,
    pub index: usize,
    pub phase: u32,
}

/// Focus was moved to a successor because the focused element was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusMovedEvent {
    /// The element that received focus, or `None` when no successor was found.
    pub element: Option<ElementId>,
}

/// All signals a container exposes.
#[derive(Debug, Default)]
pub struct RepeaterSignals {
    pub element_prepared: Signal<ElementPreparedEvent>,
    pub element_clearing: Signal<ElementClearingEvent>,
    pub element_index_changed: Signal<ElementIndexChangedEvent>,
    pub container_content_changing: Signal<ContainerContentChangingEvent>,
    pub focus_moved: Signal<FocusMovedEvent>,
}
