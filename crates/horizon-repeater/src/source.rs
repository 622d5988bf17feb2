//! Items sources and collection change notifications.
//!
//! [`ItemsSourceView<T>`] is the indexable projection a container reads its
//! items from. Every mutation returns the [`CollectionChange`] describing it,
//! which the container feeds through its view manager, its layout and any
//! selection model bound to the same source.

use std::sync::Arc;

use horizon_repeater_core::Signal;

use crate::error::{RepeaterError, Result};

/// Kind of mutation reported by a [`CollectionChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionAction {
    Add,
    Remove,
    Replace,
    Move,
    Reset,
}

/// Description of a single source mutation.
///
/// Starting indices that do not apply to an action are zero, as are the
/// corresponding counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionChange {
    pub action: CollectionAction,
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
}

impl CollectionChange {
    /// `count` items inserted at `start`.
    pub fn add(start: usize, count: usize) -> Self {
        Self {
            action: CollectionAction::Add,
            old_start: 0,
            old_count: 0,
            new_start: start,
            new_count: count,
        }
    }

    /// `count` items removed starting at `start`.
    pub fn remove(start: usize, count: usize) -> Self {
        Self {
            action: CollectionAction::Remove,
            old_start: start,
            old_count: count,
            new_start: 0,
            new_count: 0,
        }
    }

    /// `old_count` items at `start` replaced by `new_count` items.
    pub fn replace(start: usize, old_count: usize, new_count: usize) -> Self {
        Self {
            action: CollectionAction::Replace,
            old_start: start,
            old_count,
            new_start: start,
            new_count,
        }
    }

    /// `count` items moved from `old_start` to `new_start`.
    pub fn move_items(old_start: usize, new_start: usize, count: usize) -> Self {
        Self {
            action: CollectionAction::Move,
            old_start,
            old_count: count,
            new_start,
            new_count: count,
        }
    }

    /// The source changed wholesale.
    pub fn reset() -> Self {
        Self {
            action: CollectionAction::Reset,
            old_start: 0,
            old_count: 0,
            new_start: 0,
            new_count: 0,
        }
    }

    /// Check the shape of a replace notification.
    ///
    /// Replace must keep its starting index and must touch at least one old
    /// and one new item; anything else is an insert or a remove.
    pub fn validate(&self) -> Result<()> {
        if self.action != CollectionAction::Replace {
            return Ok(());
        }
        if self.old_start != self.new_start {
            return Err(RepeaterError::InvalidCollectionChange(
                "Replace is only allowed with OldStartingIndex equals to NewStartingIndex.",
            ));
        }
        if self.old_count == 0 {
            return Err(RepeaterError::InvalidCollectionChange(
                "Replace notification with args.OldItemsCount value of 0 is not allowed. Use Insert action instead.",
            ));
        }
        if self.new_count == 0 {
            return Err(RepeaterError::InvalidCollectionChange(
                "Replace notification with args.NewItemCount value of 0 is not allowed. Use Remove action instead.",
            ));
        }
        Ok(())
    }
}

/// Type alias for a stable key extractor.
pub type KeyExtractor<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// An indexable item list with optional stable keys.
///
/// # Example
///
/// ```
/// use horizon_repeater::source::{CollectionAction, ItemsSourceView};
///
/// let mut source = ItemsSourceView::with_key_mapping(
///     vec!["a".to_string(), "b".to_string()],
///     |item| item.clone(),
/// );
/// let change = source.insert(1, "c".to_string()).unwrap();
/// assert_eq!(change.action, CollectionAction::Add);
/// assert_eq!(source.index_from_key("b"), Some(2));
/// ```
pub struct ItemsSourceView<T> {
    items: Vec<T>,
    key_extractor: Option<KeyExtractor<T>>,
    collection_changed: Signal<CollectionChange>,
}

impl<T> std::fmt::Debug for ItemsSourceView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemsSourceView")
            .field("count", &self.items.len())
            .field("has_key_index_mapping", &self.key_extractor.is_some())
            .finish()
    }
}

impl<T: 'static> ItemsSourceView<T> {
    /// Wrap a list of items without key mapping.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            key_extractor: None,
            collection_changed: Signal::new(),
        }
    }

    /// Wrap a list of items whose stable keys are computed by `key`.
    pub fn with_key_mapping<F>(items: Vec<T>, key: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            items,
            key_extractor: Some(Arc::new(key)),
            collection_changed: Signal::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_at(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn index_of(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.items.iter().position(|candidate| candidate == item)
    }

    pub fn has_key_index_mapping(&self) -> bool {
        self.key_extractor.is_some()
    }

    pub fn key_from_index(&self, index: usize) -> Option<String> {
        let key = self.key_extractor.as_ref()?;
        self.items.get(index).map(|item| key(item))
    }

    pub fn index_from_key(&self, wanted: &str) -> Option<usize> {
        let key = self.key_extractor.as_ref()?;
        self.items.iter().position(|item| key(item) == wanted)
    }

    /// Signal emitted after every mutation.
    pub fn collection_changed(&self) -> &Signal<CollectionChange> {
        &self.collection_changed
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    pub fn push(&mut self, item: T) -> CollectionChange {
        self.items.push(item);
        self.notify(CollectionChange::add(self.items.len() - 1, 1))
    }

    pub fn insert(&mut self, index: usize, item: T) -> Result<CollectionChange> {
        self.insert_many(index, vec![item])
    }

    pub fn insert_many(&mut self, index: usize, items: Vec<T>) -> Result<CollectionChange> {
        if index > self.items.len() {
            return Err(RepeaterError::index_out_of_range(index, self.items.len()));
        }
        let count = items.len();
        self.items.splice(index..index, items);
        Ok(self.notify(CollectionChange::add(index, count)))
    }

    pub fn remove(&mut self, index: usize) -> Result<(T, CollectionChange)> {
        if index >= self.items.len() {
            return Err(RepeaterError::index_out_of_range(index, self.items.len()));
        }
        let item = self.items.remove(index);
        Ok((item, self.notify(CollectionChange::remove(index, 1))))
    }

    pub fn remove_range(&mut self, start: usize, count: usize) -> Result<CollectionChange> {
        let end = start + count;
        if end > self.items.len() {
            return Err(RepeaterError::index_out_of_range(end.saturating_sub(1), self.items.len()));
        }
        self.items.drain(start..end);
        Ok(self.notify(CollectionChange::remove(start, count)))
    }

    /// Replace the item at `index`, returning the previous one.
    pub fn replace(&mut self, index: usize, item: T) -> Result<(T, CollectionChange)> {
        let count = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| RepeaterError::index_out_of_range(index, count))?;
        let old = std::mem::replace(slot, item);
        Ok((old, self.notify(CollectionChange::replace(index, 1, 1))))
    }

    /// Move one item from `from` to `to` (the index it has after the move).
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<CollectionChange> {
        let count = self.items.len();
        if from >= count {
            return Err(RepeaterError::index_out_of_range(from, count));
        }
        if to >= count {
            return Err(RepeaterError::index_out_of_range(to, count));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(self.notify(CollectionChange::move_items(from, to, 1)))
    }

    /// Swap the whole item list.
    pub fn reset(&mut self, items: Vec<T>) -> CollectionChange {
        self.items = items;
        self.notify(CollectionChange::reset())
    }

    pub fn clear(&mut self) -> CollectionChange {
        self.reset(Vec::new())
    }

    /// Mutate items in place without changing their count and report a reset.
    pub fn modify_all<F: FnOnce(&mut Vec<T>)>(&mut self, f: F) -> CollectionChange {
        f(&mut self.items);
        self.notify(CollectionChange::reset())
    }

    fn notify(&self, change: CollectionChange) -> CollectionChange {
        self.collection_changed.emit(change);
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn letters() -> ItemsSourceView<String> {
        ItemsSourceView::with_key_mapping(
            ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect(),
            |item: &String| format!("key-{item}"),
        )
    }

    #[test]
    fn test_key_mapping() {
        let source = letters();
        assert!(source.has_key_index_mapping());
        assert_eq!(source.key_from_index(2).as_deref(), Some("key-c"));
        assert_eq!(source.index_from_key("key-d"), Some(3));
        assert_eq!(source.index_from_key("key-z"), None);
        assert_eq!(source.key_from_index(10), None);
    }

    #[test]
    fn test_no_key_mapping() {
        let source = ItemsSourceView::new(vec![1, 2, 3]);
        assert!(!source.has_key_index_mapping());
        assert_eq!(source.key_from_index(0), None);
        assert_eq!(source.index_of(&3), Some(2));
    }

    #[test]
    fn test_mutations_report_changes() {
        let mut source = letters();
        assert_eq!(source.push("e".into()), CollectionChange::add(4, 1));
        assert_eq!(
            source.insert_many(1, vec!["x".into(), "y".into()]).unwrap(),
            CollectionChange::add(1, 2)
        );
        assert_eq!(source.remove_range(1, 2).unwrap(), CollectionChange::remove(1, 2));
        let (old, change) = source.replace(0, "z".into()).unwrap();
        assert_eq!(old, "a");
        assert_eq!(change, CollectionChange::replace(0, 1, 1));
        assert_eq!(source.move_item(0, 4).unwrap(), CollectionChange::move_items(0, 4, 1));
        assert_eq!(source.items().last().map(String::as_str), Some("z"));
        assert_eq!(source.clear().action, CollectionAction::Reset);
        assert!(source.is_empty());
    }

    #[test]
    fn test_out_of_range_mutations_fail() {
        let mut source = letters();
        assert!(source.insert(5, "x".into()).is_err());
        assert!(source.remove(4).is_err());
        assert!(source.remove_range(3, 2).is_err());
        assert!(source.replace(4, "x".into()).is_err());
        assert!(source.move_item(0, 4).is_err());
        assert_eq!(source.count(), 4);
    }

    #[test]
    fn test_collection_changed_signal() {
        let mut source = ItemsSourceView::new(vec![0u32; 3]);
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        source.collection_changed().connect(move |change| {
            if change.action == CollectionAction::Add {
                count_clone.fetch_add(change.new_count, Ordering::SeqCst);
            }
        });
        source.push(1);
        source.insert_many(0, vec![2, 3]).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_replace_validation() {
        assert!(CollectionChange::replace(2, 1, 1).validate().is_ok());
        let mut moved = CollectionChange::replace(2, 1, 1);
        moved.new_start = 3;
        assert!(moved.validate().is_err());
        assert!(CollectionChange::replace(2, 0, 1).validate().is_err());
        assert!(CollectionChange::replace(2, 1, 0).validate().is_err());
        assert!(CollectionChange::remove(0, 1).validate().is_ok());
    }
}
