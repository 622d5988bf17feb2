//! Element pools that keep realized elements alive outside the layout.

use std::collections::HashMap;

use crate::element::ElementId;
use crate::error::{RepeaterError, Result};

/// Elements parked under their stable key while a reset is processed.
///
/// If the same key shows up again (possibly at a new index) before the pool
/// is flushed, the parked element is handed back instead of instantiating a
/// new one.
#[derive(Debug, Default)]
pub struct UniqueIdElementPool {
    elements: HashMap<String, ElementId>,
}

impl UniqueIdElementPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an element under its key. Keys must be unique within the pool.
    pub fn add(&mut self, key: &str, element: ElementId) -> Result<()> {
        if self.elements.contains_key(key) {
            return Err(RepeaterError::DuplicateUniqueId(key.to_owned()));
        }
        self.elements.insert(key.to_owned(), element);
        Ok(())
    }

    /// Take the element parked under a key.
    pub fn remove(&mut self, key: &str) -> Option<ElementId> {
        self.elements.remove(key)
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.elements.values().any(|&id| id == element)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Empty the pool, returning every parked element.
    pub fn drain(&mut self) -> Vec<ElementId> {
        self.elements.drain().map(|(_, element)| element).collect()
    }
}

/// Realized elements that were cleared by the layout but are still pinned.
///
/// Kept in pin order so lookups by index return the oldest pinned element
/// first.
#[derive(Debug, Default)]
pub struct PinnedPool {
    elements: Vec<ElementId>,
}

impl PinnedPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: ElementId) {
        debug_assert!(!self.elements.contains(&element));
        self.elements.push(element);
    }

    /// Remove the first element matching a predicate.
    pub fn take_first(&mut self, mut matches: impl FnMut(ElementId) -> bool) -> Option<ElementId> {
        let position = self.elements.iter().position(|&id| matches(id))?;
        Some(self.elements.remove(position))
    }

    pub fn remove(&mut self, element: ElementId) -> bool {
        match self.elements.iter().position(|&id| id == element) {
            Some(position) => {
                self.elements.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.elements.contains(&element)
    }

    pub fn iter(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(count: usize) -> Vec<ElementId> {
        let mut map: SlotMap<ElementId, ()> = SlotMap::with_key();
        (0..count).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_unique_id_pool_round_trip() {
        let ids = ids(2);
        let mut pool = UniqueIdElementPool::new();
        pool.add("alpha", ids[0]).unwrap();
        pool.add("beta", ids[1]).unwrap();

        assert!(pool.contains(ids[1]));
        assert_eq!(pool.remove("alpha"), Some(ids[0]));
        assert_eq!(pool.remove("alpha"), None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_unique_id_pool_rejects_duplicate_keys() {
        let ids = ids(2);
        let mut pool = UniqueIdElementPool::new();
        pool.add("alpha", ids[0]).unwrap();
        let err = pool.add("alpha", ids[1]).unwrap_err();
        assert!(matches!(err, RepeaterError::DuplicateUniqueId(key) if key == "alpha"));
    }

    #[test]
    fn test_unique_id_pool_drain_empties() {
        let ids = ids(3);
        let mut pool = UniqueIdElementPool::new();
        for (i, id) in ids.iter().enumerate() {
            pool.add(&i.to_string(), *id).unwrap();
        }
        let mut drained = pool.drain();
        drained.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(drained, expected);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_pinned_pool_take_first() {
        let ids = ids(3);
        let mut pool = PinnedPool::new();
        for id in &ids {
            pool.push(*id);
        }
        assert_eq!(pool.take_first(|id| id == ids[1]), Some(ids[1]));
        assert_eq!(pool.take_first(|id| id == ids[1]), None);
        assert!(pool.remove(ids[0]));
        assert_eq!(pool.iter().collect::<Vec<_>>(), vec![ids[2]]);
    }
}
