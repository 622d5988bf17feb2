//! Index-based selection state.
//!
//! [`SelectionModel`] stores the selected indices of a flat items source, the
//! anchor used by range gestures and the single-select flag. Every change is
//! reported through [`SelectionModel::selection_changed`] as the pair
//! `(added, removed)`.
//!
//! # Example
//!
//! ```
//! use horizon_repeater::selection::SelectionModel;
//!
//! let mut selection = SelectionModel::with_item_count(10);
//! selection.select_range(2, 5);
//! assert_eq!(selection.selected_count(), 4);
//!
//! selection.deselect_range(5, 2);
//! assert!(selection.selected_indices().is_empty());
//! ```

use std::collections::BTreeSet;

use horizon_repeater_core::Signal;
use horizon_repeater_core::logging::targets;

use crate::source::{CollectionAction, CollectionChange};

/// Selected indices, anchor and single-select flag of one items source.
#[derive(Debug)]
pub struct SelectionModel {
    selected: BTreeSet<usize>,
    anchor: Option<usize>,
    single_select: bool,
    item_count: usize,

    /// Emitted when the selection changes. Args: (added, removed)
    pub selection_changed: Signal<(Vec<usize>, Vec<usize>)>,
}

impl Default for SelectionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionModel {
    /// Create an empty multi-select model over an empty source.
    pub fn new() -> Self {
        Self::with_item_count(0)
    }

    pub fn with_item_count(item_count: usize) -> Self {
        Self {
            selected: BTreeSet::new(),
            anchor: None,
            single_select: false,
            item_count,
            selection_changed: Signal::new(),
        }
    }

    #[inline]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Update the source size without a change notification.
    ///
    /// Indices at or past the new count are dropped.
    pub fn set_item_count(&mut self, item_count: usize) {
        self.item_count = item_count;
        let removed: Vec<usize> = self.selected.split_off(&item_count).into_iter().collect();
        if self.anchor.is_some_and(|anchor| anchor >= item_count) {
            self.anchor = None;
        }
        self.notify(Vec::new(), removed);
    }

    // =========================================================================
    // Mode
    // =========================================================================

    #[inline]
    pub fn single_select(&self) -> bool {
        self.single_select
    }

    /// Switch single-select on or off.
    ///
    /// Turning it on keeps only the lowest selected index.
    pub fn set_single_select(&mut self, single_select: bool) {
        self.single_select = single_select;
        if single_select && self.selected.len() > 1 {
            let keep = self.selected.first().copied();
            let removed: Vec<usize> = self
                .selected
                .iter()
                .copied()
                .filter(|index| Some(*index) != keep)
                .collect();
            self.selected.retain(|index| Some(*index) == keep);
            self.notify(Vec::new(), removed);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Selected indices in ascending order.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    /// The lowest selected index.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected.first().copied()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty()
    }

    // =========================================================================
    // Anchor
    // =========================================================================

    #[inline]
    pub fn anchor_index(&self) -> Option<usize> {
        self.anchor
    }

    pub fn set_anchor_index(&mut self, anchor: Option<usize>) {
        self.anchor = anchor.filter(|index| *index < self.item_count);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Select `index` and make it the anchor.
    ///
    /// In single-select mode every other index is deselected. Returns `true`
    /// if the selection changed.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.item_count {
            tracing::trace!(target: targets::SELECTION, index, count = self.item_count, "select ignored, index out of range");
            return false;
        }
        self.anchor = Some(index);

        let mut removed = Vec::new();
        if self.single_select {
            removed = self.selected.iter().copied().filter(|i| *i != index).collect();
            self.selected.retain(|i| *i == index);
        }
        let added = if self.selected.insert(index) { vec![index] } else { Vec::new() };
        self.notify(added, removed)
    }

    /// Deselect `index` and make it the anchor.
    pub fn deselect(&mut self, index: usize) -> bool {
        if index >= self.item_count {
            return false;
        }
        self.anchor = Some(index);
        if self.selected.remove(&index) {
            self.notify(Vec::new(), vec![index])
        } else {
            false
        }
    }

    /// Deselect `index` without touching the anchor.
    pub fn deselect_with_anchor_preservation(&mut self, index: usize) -> bool {
        let anchor = self.anchor;
        let changed = self.deselect(index);
        self.anchor = anchor;
        changed
    }

    /// Select every index between `start` and `end` inclusive, in either order.
    ///
    /// The anchor is left alone. In single-select mode only `end` is selected.
    pub fn select_range(&mut self, start: usize, end: usize) -> bool {
        if self.single_select {
            let anchor = self.anchor;
            let changed = self.select(end);
            self.anchor = anchor;
            return changed;
        }
        let Some((first, last)) = self.clamp_range(start, end) else {
            return false;
        };
        let added: Vec<usize> = (first..=last).filter(|index| self.selected.insert(*index)).collect();
        self.notify(added, Vec::new())
    }

    /// Deselect every index between `start` and `end` inclusive, in either order.
    pub fn deselect_range(&mut self, start: usize, end: usize) -> bool {
        let Some((first, last)) = self.clamp_range(start, end) else {
            return false;
        };
        let removed: Vec<usize> = self.selected.range(first..=last).copied().collect();
        for index in &removed {
            self.selected.remove(index);
        }
        self.notify(Vec::new(), removed)
    }

    /// Select every item. Does nothing in single-select mode.
    pub fn select_all(&mut self) -> bool {
        if self.single_select || self.item_count == 0 {
            return false;
        }
        self.select_range(0, self.item_count - 1)
    }

    /// Deselect everything and forget the anchor.
    pub fn clear(&mut self) -> bool {
        self.anchor = None;
        let removed: Vec<usize> = std::mem::take(&mut self.selected).into_iter().collect();
        self.notify(Vec::new(), removed)
    }

    // =========================================================================
    // Source changes
    // =========================================================================

    /// Translate selected indices and the anchor across a source mutation.
    ///
    /// Items that left the source are reported as removed; items that only
    /// moved are not reported.
    pub fn on_source_changed(&mut self, change: &CollectionChange, new_count: usize) {
        tracing::trace!(target: targets::SELECTION, action = ?change.action, new_count, "translating selection");
        let previous = std::mem::take(&mut self.selected);
        let mut removed = Vec::new();

        for index in previous {
            match translate_index(index, change).filter(|new_index| *new_index < new_count) {
                Some(new_index) => {
                    self.selected.insert(new_index);
                }
                None => removed.push(index),
            }
        }
        self.anchor = self
            .anchor
            .and_then(|anchor| translate_index(anchor, change))
            .filter(|index| *index < new_count);
        self.item_count = new_count;
        self.notify(Vec::new(), removed);
    }

    fn clamp_range(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let (first, last) = if start <= end { (start, end) } else { (end, start) };
        if self.item_count == 0 || first >= self.item_count {
            return None;
        }
        Some((first, last.min(self.item_count - 1)))
    }

    fn notify(&self, added: Vec<usize>, removed: Vec<usize>) -> bool {
        if added.is_empty() && removed.is_empty() {
            return false;
        }
        tracing::trace!(target: targets::SELECTION, added = added.len(), removed = removed.len(), "selection changed");
        self.selection_changed.emit((added, removed));
        true
    }
}

/// Where the item at `index` ends up after `change`, or `None` if it left the source.
pub(crate) fn translate_index(index: usize, change: &CollectionChange) -> Option<usize> {
    match change.action {
        CollectionAction::Add => Some(shift_for_add(index, change.new_start, change.new_count)),
        CollectionAction::Remove => shift_for_remove(index, change.old_start, change.old_count),
        CollectionAction::Replace => shift_for_remove(index, change.old_start, change.old_count)
            .map(|index| shift_for_add(index, change.new_start, change.new_count)),
        CollectionAction::Move => {
            if (change.old_start..change.old_start + change.old_count).contains(&index) {
                Some(change.new_start + (index - change.old_start))
            } else {
                shift_for_remove(index, change.old_start, change.old_count)
                    .map(|index| shift_for_add(index, change.new_start, change.new_count))
            }
        }
        CollectionAction::Reset => None,
    }
}

fn shift_for_add(index: usize, start: usize, count: usize) -> usize {
    if index >= start { index + count } else { index }
}

fn shift_for_remove(index: usize, start: usize, count: usize) -> Option<usize> {
    if index < start {
        Some(index)
    } else if index < start + count {
        None
    } else {
        Some(index - count)
    }
}
