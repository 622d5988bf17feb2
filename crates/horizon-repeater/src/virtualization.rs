//! Per-element virtualization records.
//!
//! Every element owned by a container carries exactly one
//! [`VirtualizationInfo`]. The record tracks which part of the engine
//! currently holds the element ([`ElementOwner`]), the data index it
//! represents, its pin count and the bookkeeping flags used by the auto
//! recycling pass at the end of measure.
//!
//! Ownership transitions form a closed state machine:
//!
//! ```text
//! ElementFactory -> Layout                      (realize)
//! Layout -> ElementFactory | PinnedPool
//!         | UniqueIdResetPool | Animator        (clear)
//! PinnedPool -> Layout                          (re-requested)
//! UniqueIdResetPool -> Layout                   (key matched after reset)
//! UniqueIdResetPool -> ElementFactory | Animator (reset pool flushed)
//! Animator -> ElementFactory                    (animation complete)
//! ```

use horizon_repeater_core::Rect;

use crate::error::{RepeaterError, Result};

/// Which part of the engine currently holds an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementOwner {
    /// Not realized. The element belongs to the element factory (or is about
    /// to be handed back to it).
    #[default]
    ElementFactory,
    /// Realized and held by the layout.
    Layout,
    /// Realized and kept alive by one or more pins.
    PinnedPool,
    /// Parked under its unique id while a stable reset is processed.
    UniqueIdResetPool,
    /// Playing a departure transition.
    Animator,
}

/// The virtualization record attached to an element.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualizationInfo {
    index: Option<usize>,
    owner: ElementOwner,
    pin_count: u32,
    unique_id: Option<String>,
    arrange_bounds: Rect,
    pub(crate) auto_recycle_candidate: bool,
    pub(crate) keep_alive: bool,
    pub(crate) must_clear_data_context: bool,
}

impl Default for VirtualizationInfo {
    fn default() -> Self {
        Self {
            index: None,
            owner: ElementOwner::ElementFactory,
            pin_count: 0,
            unique_id: None,
            arrange_bounds: Rect::INVALID,
            auto_recycle_candidate: false,
            keep_alive: false,
            must_clear_data_context: false,
        }
    }
}

impl VirtualizationInfo {
    /// Data index represented by the element, if it represents one.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn owner(&self) -> ElementOwner {
        self.owner
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    /// Stable key the element was realized for, when the source maps keys.
    pub fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    /// Bounds assigned during the last arrange pass, or [`Rect::INVALID`].
    pub fn arrange_bounds(&self) -> Rect {
        self.arrange_bounds
    }

    pub fn auto_recycle_candidate(&self) -> bool {
        self.auto_recycle_candidate
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn must_clear_data_context(&self) -> bool {
        self.must_clear_data_context
    }

    pub fn is_held_by_layout(&self) -> bool {
        self.owner == ElementOwner::Layout
    }

    /// An element is realized while the layout or the pinned pool holds it.
    pub fn is_realized(&self) -> bool {
        matches!(self.owner, ElementOwner::Layout | ElementOwner::PinnedPool)
    }

    pub fn is_in_unique_id_reset_pool(&self) -> bool {
        self.owner == ElementOwner::UniqueIdResetPool
    }

    pub(crate) fn set_arrange_bounds(&mut self, bounds: Rect) {
        self.arrange_bounds = bounds;
    }

    pub(crate) fn update_index(&mut self, index: usize) {
        debug_assert!(self.is_realized() || self.is_in_unique_id_reset_pool());
        self.index = Some(index);
    }

    // ========================================================================
    // Ownership transitions
    // ========================================================================

    pub(crate) fn move_ownership_to_layout_from_element_factory(
        &mut self,
        index: usize,
        unique_id: Option<String>,
    ) {
        debug_assert_eq!(self.owner, ElementOwner::ElementFactory);
        self.owner = ElementOwner::Layout;
        self.index = Some(index);
        self.unique_id = unique_id;
    }

    pub(crate) fn move_ownership_to_layout_from_unique_id_reset_pool(&mut self) {
        debug_assert_eq!(self.owner, ElementOwner::UniqueIdResetPool);
        self.owner = ElementOwner::Layout;
    }

    pub(crate) fn move_ownership_to_layout_from_pinned_pool(&mut self) {
        debug_assert_eq!(self.owner, ElementOwner::PinnedPool);
        self.owner = ElementOwner::Layout;
    }

    pub(crate) fn move_ownership_to_element_factory(&mut self) {
        debug_assert_ne!(self.owner, ElementOwner::ElementFactory);
        self.owner = ElementOwner::ElementFactory;
        self.pin_count = 0;
        self.index = None;
        self.unique_id = None;
        self.arrange_bounds = Rect::INVALID;
    }

    /// The pin count survives a stay in the reset pool.
    pub(crate) fn move_ownership_to_unique_id_reset_pool(&mut self) {
        debug_assert!(self.is_realized());
        self.owner = ElementOwner::UniqueIdResetPool;
    }

    pub(crate) fn move_ownership_to_animator(&mut self) {
        debug_assert!(self.is_realized() || self.is_in_unique_id_reset_pool());
        self.owner = ElementOwner::Animator;
        self.index = None;
        self.pin_count = 0;
    }

    pub(crate) fn move_ownership_to_pinned_pool(&mut self) {
        debug_assert_eq!(self.owner, ElementOwner::Layout);
        self.owner = ElementOwner::PinnedPool;
    }

    // ========================================================================
    // Pinning
    // ========================================================================

    /// Adds a pin and returns the new pin count.
    pub fn add_pin(&mut self) -> Result<u32> {
        if !self.is_realized() {
            return Err(RepeaterError::PinUnrealized);
        }
        self.pin_count += 1;
        Ok(self.pin_count)
    }

    /// Removes a pin and returns the remaining pin count.
    pub fn remove_pin(&mut self) -> Result<u32> {
        if !self.is_realized() {
            return Err(RepeaterError::UnpinUnrealized);
        }
        if self.pin_count == 0 {
            return Err(RepeaterError::UnbalancedUnpin);
        }
        self.pin_count -= 1;
        Ok(self.pin_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn realized(index: usize) -> VirtualizationInfo {
        let mut info = VirtualizationInfo::default();
        info.move_ownership_to_layout_from_element_factory(index, Some(format!("key-{index}")));
        info
    }

    #[test]
    fn test_default_is_unrealized() {
        let info = VirtualizationInfo::default();
        assert_eq!(info.owner(), ElementOwner::ElementFactory);
        assert_eq!(info.index(), None);
        assert_eq!(info.arrange_bounds(), Rect::INVALID);
        assert!(!info.is_realized());
    }

    #[test]
    fn test_realize_then_return_to_factory_resets_record() {
        let mut info = realized(7);
        assert!(info.is_held_by_layout());
        assert_eq!(info.unique_id(), Some("key-7"));
        info.add_pin().unwrap();
        info.set_arrange_bounds(Rect::new(0.0, 0.0, 10.0, 10.0));

        info.move_ownership_to_element_factory();
        assert_eq!(info.index(), None);
        assert_eq!(info.pin_count(), 0);
        assert_eq!(info.unique_id(), None);
        assert_eq!(info.arrange_bounds(), Rect::INVALID);
    }

    #[test]
    fn test_pinned_pool_counts_as_realized() {
        let mut info = realized(1);
        info.add_pin().unwrap();
        info.move_ownership_to_pinned_pool();
        assert!(info.is_realized());
        assert!(!info.is_held_by_layout());
        info.move_ownership_to_layout_from_pinned_pool();
        assert!(info.is_held_by_layout());
    }

    #[test]
    fn test_reset_pool_keeps_pin_count() {
        let mut info = realized(3);
        info.add_pin().unwrap();
        info.move_ownership_to_unique_id_reset_pool();
        assert!(!info.is_realized());
        assert!(info.is_in_unique_id_reset_pool());
        assert_eq!(info.pin_count(), 1);
    }

    #[test]
    fn test_animator_drops_index_and_pins() {
        let mut info = realized(3);
        info.add_pin().unwrap();
        info.move_ownership_to_animator();
        assert_eq!(info.owner(), ElementOwner::Animator);
        assert_eq!(info.index(), None);
        assert_eq!(info.pin_count(), 0);
    }

    #[test]
    fn test_pin_unrealized_fails() {
        let mut info = VirtualizationInfo::default();
        assert!(matches!(info.add_pin(), Err(RepeaterError::PinUnrealized)));
        assert!(matches!(info.remove_pin(), Err(RepeaterError::UnpinUnrealized)));
    }

    #[test]
    fn test_unbalanced_unpin_fails() {
        let mut info = realized(0);
        assert_eq!(info.add_pin().unwrap(), 1);
        assert_eq!(info.add_pin().unwrap(), 2);
        assert_eq!(info.remove_pin().unwrap(), 1);
        assert_eq!(info.remove_pin().unwrap(), 0);
        assert!(matches!(info.remove_pin(), Err(RepeaterError::UnbalancedUnpin)));
    }
}
