//! Selection policies.
//!
//! A [`Selector`] turns raw gestures (an item was clicked or tapped, or
//! keyboard focus moved onto it) into calls on a [`SelectionModel`]. The
//! variant in use is picked from the configured [`SelectionMode`].

use std::str::FromStr;

use horizon_repeater_core::logging::targets;
use serde::{Deserialize, Serialize};

use super::model::SelectionModel;
use crate::error::RepeaterError;

/// How many items a view lets the user select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Selection is disabled.
    None,
    /// At most one item is selected (default).
    #[default]
    Single,
    /// Each interaction toggles one item.
    Multiple,
    /// Plain clicks select one item, ctrl toggles and shift selects ranges.
    Extended,
}

impl FromStr for SelectionMode {
    type Err = RepeaterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "single" => Ok(Self::Single),
            "multiple" => Ok(Self::Multiple),
            "extended" => Ok(Self::Extended),
            _ => Err(RepeaterError::UnknownSelectionMode(s.to_string())),
        }
    }
}

/// Modifier keys held during a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        shift: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        shift: true,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        shift: true,
    };
}

/// Gesture-to-selection policy for one [`SelectionMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Ignores every gesture.
    Null,
    /// Selects the interacted item. With `follows_focus` keyboard focus
    /// movement selects too.
    Single { follows_focus: bool },
    Multiple,
    Extended,
}

impl Default for Selector {
    fn default() -> Self {
        Self::for_mode(SelectionMode::default())
    }
}

impl Selector {
    pub fn for_mode(mode: SelectionMode) -> Self {
        match mode {
            SelectionMode::None => Self::Null,
            SelectionMode::Single => Self::Single {
                follows_focus: true,
            },
            SelectionMode::Multiple => Self::Multiple,
            SelectionMode::Extended => Self::Extended,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        match self {
            Self::Null => SelectionMode::None,
            Self::Single { .. } => SelectionMode::Single,
            Self::Multiple => SelectionMode::Multiple,
            Self::Extended => SelectionMode::Extended,
        }
    }

    /// Whether this policy ever selects anything.
    pub fn can_select(&self) -> bool {
        !matches!(self, Self::Null)
    }

    /// Put `model` into the state this policy expects.
    ///
    /// Single mode trims the selection to one item; no selection clears it.
    pub fn attach(&self, model: &mut SelectionModel) {
        match self {
            Self::Null => {
                model.set_single_select(false);
                model.clear();
            }
            Self::Single { .. } => model.set_single_select(true),
            Self::Multiple | Self::Extended => model.set_single_select(false),
        }
    }

    /// The user clicked, tapped or otherwise invoked `index`.
    pub fn on_interacted(&self, model: &mut SelectionModel, index: usize, modifiers: Modifiers) {
        tracing::trace!(target: targets::SELECTION, selector = ?self, index, ?modifiers, "interaction");
        match self {
            Self::Null => {}
            Self::Single { .. } => {
                if modifiers.ctrl && model.is_selected(index) {
                    model.deselect(index);
                } else {
                    model.select(index);
                }
            }
            Self::Multiple => {
                if modifiers.shift
                    && let Some(anchor) = model.anchor_index()
                {
                    range_from_anchor(model, anchor, index);
                } else if model.is_selected(index) {
                    model.deselect(index);
                } else {
                    model.select(index);
                }
            }
            Self::Extended => {
                if modifiers.shift {
                    replace_with_range(model, index);
                } else if modifiers.ctrl {
                    if model.is_selected(index) {
                        model.deselect(index);
                    } else {
                        model.select(index);
                    }
                } else if !(model.is_selected(index) && model.selected_count() == 1) {
                    model.clear();
                    model.select(index);
                }
            }
        }
    }

    /// Keyboard focus moved onto `index`.
    pub fn on_focused(&self, model: &mut SelectionModel, index: usize, modifiers: Modifiers) {
        tracing::trace!(target: targets::SELECTION, selector = ?self, index, ?modifiers, "focus");
        match self {
            Self::Null => {}
            Self::Single { follows_focus } => {
                if *follows_focus && !modifiers.ctrl {
                    model.select(index);
                }
            }
            Self::Multiple => {
                if modifiers.shift
                    && let Some(anchor) = model.anchor_index()
                {
                    range_from_anchor(model, anchor, index);
                }
            }
            Self::Extended => {
                if modifiers.shift && modifiers.ctrl {
                    let anchor = model.anchor_index().unwrap_or(index);
                    model.select_range(anchor, index);
                } else if modifiers.shift {
                    replace_with_range(model, index);
                } else if !modifiers.ctrl {
                    model.clear();
                    model.select(index);
                }
            }
        }
    }

    pub fn select_all(&self, model: &mut SelectionModel) {
        match self {
            Self::Multiple | Self::Extended => {
                model.select_all();
            }
            Self::Null | Self::Single { .. } => {}
        }
    }

    pub fn clear(&self, model: &mut SelectionModel) {
        model.clear();
    }

    /// Deselect `index` for a reason other than a user gesture.
    pub fn deselect_with_anchor_preservation(&self, model: &mut SelectionModel, index: usize) {
        model.deselect_with_anchor_preservation(index);
    }

    /// Apply a per-item selected toggle that did not come from a gesture.
    ///
    /// Returns the selected state the item ends up in.
    pub fn on_item_toggled(&self, model: &mut SelectionModel, index: usize, selected: bool) -> bool {
        match self {
            Self::Null => false,
            _ if selected => {
                model.select(index);
                model.is_selected(index)
            }
            _ => {
                self.deselect_with_anchor_preservation(model, index);
                model.is_selected(index)
            }
        }
    }
}

/// Select or deselect `anchor..=index` depending on whether the anchor is selected.
fn range_from_anchor(model: &mut SelectionModel, anchor: usize, index: usize) {
    if model.is_selected(anchor) {
        model.select_range(anchor, index);
    } else {
        model.deselect_range(anchor, index);
    }
}

/// Replace the selection with `anchor..=index`, keeping the anchor.
fn replace_with_range(model: &mut SelectionModel, index: usize) {
    let anchor = model.anchor_index().unwrap_or(index);
    model.clear();
    model.set_anchor_index(Some(anchor));
    model.select_range(anchor, index);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SelectionModel {
        SelectionModel::with_item_count(20)
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Extended".parse::<SelectionMode>().unwrap(), SelectionMode::Extended);
        assert_eq!("none".parse::<SelectionMode>().unwrap(), SelectionMode::None);
        let err = "Bogus".parse::<SelectionMode>().unwrap_err();
        assert!(matches!(err, RepeaterError::UnknownSelectionMode(ref s) if s == "Bogus"));
    }

    #[test]
    fn test_for_mode_round_trip() {
        for mode in [
            SelectionMode::None,
            SelectionMode::Single,
            SelectionMode::Multiple,
            SelectionMode::Extended,
        ] {
            assert_eq!(Selector::for_mode(mode).mode(), mode);
        }
        assert!(!Selector::Null.can_select());
    }

    #[test]
    fn test_null_selector_ignores_gestures() {
        let mut model = model();
        let selector = Selector::Null;
        selector.on_interacted(&mut model, 3, Modifiers::NONE);
        selector.on_focused(&mut model, 4, Modifiers::NONE);
        selector.select_all(&mut model);
        assert!(!model.has_selection());
        assert!(!selector.on_item_toggled(&mut model, 2, true));
    }

    #[test]
    fn test_single_selector() {
        let mut model = model();
        let selector = Selector::for_mode(SelectionMode::Single);
        selector.attach(&mut model);

        selector.on_interacted(&mut model, 3, Modifiers::NONE);
        selector.on_interacted(&mut model, 5, Modifiers::NONE);
        assert_eq!(model.selected_indices(), vec![5]);

        // Plain click on the selected item keeps it.
        selector.on_interacted(&mut model, 5, Modifiers::NONE);
        assert_eq!(model.selected_indices(), vec![5]);

        selector.on_interacted(&mut model, 5, Modifiers::CTRL);
        assert!(!model.has_selection());
    }

    #[test]
    fn test_single_selector_follows_focus() {
        let mut model = model();
        let follows = Selector::Single { follows_focus: true };
        follows.attach(&mut model);
        follows.on_focused(&mut model, 7, Modifiers::NONE);
        assert_eq!(model.selected_indices(), vec![7]);
        follows.on_focused(&mut model, 8, Modifiers::CTRL);
        assert_eq!(model.selected_indices(), vec![7]);

        let stays = Selector::Single { follows_focus: false };
        stays.on_focused(&mut model, 9, Modifiers::NONE);
        assert_eq!(model.selected_indices(), vec![7]);
    }

    #[test]
    fn test_multiple_selector_toggles() {
        let mut model = model();
        let selector = Selector::Multiple;
        selector.on_interacted(&mut model, 1, Modifiers::NONE);
        selector.on_interacted(&mut model, 4, Modifiers::NONE);
        assert_eq!(model.selected_indices(), vec![1, 4]);
        selector.on_interacted(&mut model, 1, Modifiers::NONE);
        assert_eq!(model.selected_indices(), vec![4]);
    }

    #[test]
    fn test_multiple_selector_shift_range_follows_anchor_state() {
        let mut model = model();
        let selector = Selector::Multiple;

        // Anchor selected: shift extends.
        selector.on_interacted(&mut model, 2, Modifiers::NONE);
        selector.on_interacted(&mut model, 5, Modifiers::SHIFT);
        assert_eq!(model.selected_indices(), vec![2, 3, 4, 5]);

        // Anchor deselected: shift reduces.
        selector.on_interacted(&mut model, 3, Modifiers::NONE);
        assert_eq!(model.anchor_index(), Some(3));
        selector.on_interacted(&mut model, 5, Modifiers::SHIFT);
        assert_eq!(model.selected_indices(), vec![2]);
    }

    #[test]
    fn test_extended_selector() {
        let mut model = model();
        let selector = Selector::Extended;

        selector.on_interacted(&mut model, 3, Modifiers::NONE);
        selector.on_interacted(&mut model, 6, Modifiers::SHIFT);
        assert_eq!(model.selected_indices(), vec![3, 4, 5, 6]);
        assert_eq!(model.anchor_index(), Some(3));

        // Shift again replaces the range from the same anchor.
        selector.on_interacted(&mut model, 1, Modifiers::SHIFT);
        assert_eq!(model.selected_indices(), vec![1, 2, 3]);

        selector.on_interacted(&mut model, 10, Modifiers::CTRL);
        assert_eq!(model.selected_indices(), vec![1, 2, 3, 10]);
        selector.on_interacted(&mut model, 2, Modifiers::CTRL);
        assert_eq!(model.selected_indices(), vec![1, 3, 10]);

        selector.on_interacted(&mut model, 3, Modifiers::NONE);
        assert_eq!(model.selected_indices(), vec![3]);
    }

    #[test]
    fn test_extended_plain_click_on_sole_selection_is_kept() {
        let mut model = model();
        let selector = Selector::Extended;
        selector.on_interacted(&mut model, 4, Modifiers::NONE);
        model.set_anchor_index(Some(0));
        selector.on_interacted(&mut model, 4, Modifiers::NONE);
        assert_eq!(model.selected_indices(), vec![4]);
        assert_eq!(model.anchor_index(), Some(0));
    }

    #[test]
    fn test_extended_focus() {
        let mut model = model();
        let selector = Selector::Extended;
        selector.on_focused(&mut model, 2, Modifiers::NONE);
        selector.on_focused(&mut model, 4, Modifiers::SHIFT);
        assert_eq!(model.selected_indices(), vec![2, 3, 4]);

        selector.on_focused(&mut model, 9, Modifiers::CTRL);
        assert_eq!(model.selected_indices(), vec![2, 3, 4]);

        model.set_anchor_index(Some(8));
        selector.on_focused(&mut model, 10, Modifiers::CTRL_SHIFT);
        assert_eq!(model.selected_indices(), vec![2, 3, 4, 8, 9, 10]);
    }

    #[test]
    fn test_attach_none_clears() {
        let mut model = model();
        model.select_range(0, 3);
        Selector::Null.attach(&mut model);
        assert!(!model.has_selection());

        model.select_range(5, 8);
        Selector::for_mode(SelectionMode::Single).attach(&mut model);
        assert_eq!(model.selected_indices(), vec![5]);
    }

    #[test]
    fn test_item_toggled_preserves_anchor() {
        let mut model = model();
        let selector = Selector::Multiple;
        selector.on_interacted(&mut model, 6, Modifiers::NONE);
        assert!(selector.on_item_toggled(&mut model, 9, true));
        assert_eq!(model.anchor_index(), Some(9));
        assert!(!selector.on_item_toggled(&mut model, 9, false));
        assert_eq!(model.anchor_index(), Some(9));
    }
}
