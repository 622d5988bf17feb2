//! Departure transitions.
//!
//! A container can hand cleared elements to an animator instead of recycling
//! them right away. The element stays in the container (owned by
//! [`ElementOwner::Animator`](crate::virtualization::ElementOwner::Animator))
//! until the host reports the animation as finished through
//! `ItemsRepeater::complete_transition`.

use crate::element::ElementId;

/// Decides which cleared elements play a departure animation.
pub trait ItemTransitionProvider: Send {
    /// An element was realized for `index`.
    fn on_element_prepared(&mut self, _element: ElementId, _index: usize) {}

    /// Return `true` to keep `element` alive for a departure animation.
    ///
    /// `cleared_due_to_collection_change` is set when the element is cleared
    /// because its item was removed, replaced or reset, as opposed to being
    /// scrolled out of the realization window.
    fn should_animate_departure(
        &mut self,
        element: ElementId,
        index: Option<usize>,
        cleared_due_to_collection_change: bool,
    ) -> bool;
}

/// When a [`DepartureTransition`] animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepartureTrigger {
    /// Only elements whose item left the source.
    #[default]
    CollectionChange,
    /// Only elements that were virtualized away.
    Virtualization,
    /// Every cleared element.
    Always,
}

/// A provider that animates departures matching a [`DepartureTrigger`].
#[derive(Debug, Clone, Default)]
pub struct DepartureTransition {
    trigger: DepartureTrigger,
    started: Vec<ElementId>,
}

impl DepartureTransition {
    pub fn new(trigger: DepartureTrigger) -> Self {
        Self {
            trigger,
            started: Vec::new(),
        }
    }

    /// Elements whose departure animation was started, oldest first.
    pub fn started(&self) -> &[ElementId] {
        &self.started
    }
}

impl ItemTransitionProvider for DepartureTransition {
    fn should_animate_departure(
        &mut self,
        element: ElementId,
        _index: Option<usize>,
        cleared_due_to_collection_change: bool,
    ) -> bool {
        let animate = match self.trigger {
            DepartureTrigger::CollectionChange => cleared_due_to_collection_change,
            DepartureTrigger::Virtualization => !cleared_due_to_collection_change,
            DepartureTrigger::Always => true,
        };
        if animate {
            self.started.push(element);
        }
        animate
    }
}
