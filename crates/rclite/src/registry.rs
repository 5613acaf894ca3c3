// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handle-keyed endpoint arena.
//!
//! Insertion-ordered storage keyed by stable handle. Removal tombstones the
//! slot so iteration order and slot indices stay stable within a cycle;
//! compaction runs only when tombstones outnumber live entries.

use crate::endpoint::Handle;
use std::collections::HashMap;
use std::sync::Arc;

struct ArenaEntry<T: ?Sized> {
    handle: Handle,
    value: Option<Arc<T>>,
}

/// Insertion-ordered arena keyed by stable [`Handle`].
pub(crate) struct HandleArena<T: ?Sized> {
    entries: Vec<ArenaEntry<T>>,
    index: HashMap<Handle, usize>,
    dead: usize,
}

impl<T: ?Sized> HandleArena<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            dead: 0,
        }
    }

    /// Insert a value under its handle. Returns `false` if the handle is
    /// already present (live).
    pub(crate) fn insert(&mut self, handle: Handle, value: Arc<T>) -> bool {
        if self.index.contains_key(&handle) {
            return false;
        }
        self.index.insert(handle, self.entries.len());
        self.entries.push(ArenaEntry {
            handle,
            value: Some(value),
        });
        true
    }

    /// Remove a value by handle, returning it if it was live.
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<Arc<T>> {
        let position = self.index.remove(&handle)?;
        let value = self.entries[position].value.take();
        if value.is_some() {
            self.dead += 1;
            if self.dead > self.len() {
                self.compact();
            }
        }
        value
    }

    pub(crate) fn get(&self, handle: Handle) -> Option<Arc<T>> {
        let position = *self.index.get(&handle)?;
        self.entries[position].value.clone()
    }

    /// Number of live entries.
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Live entries in insertion order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries
            .iter()
            .filter_map(|entry| entry.value.clone())
            .collect()
    }

    fn compact(&mut self) {
        self.entries.retain(|entry| entry.value.is_some());
        self.index.clear();
        for (position, entry) in self.entries.iter().enumerate() {
            self.index.insert(entry.handle, position);
        }
        self.dead = 0;
    }
}

impl<T: ?Sized> Default for HandleArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with(handles: &[Handle]) -> HandleArena<str> {
        let mut arena = HandleArena::new();
        for &handle in handles {
            let value: Arc<str> = Arc::from(format!("ep-{}", handle));
            assert!(arena.insert(handle, value));
        }
        arena
    }

    #[test]
    fn insert_and_get() {
        let arena = arena_with(&[10, 20]);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(10).as_deref(), Some("ep-10"));
        assert!(arena.get(30).is_none());
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut arena = arena_with(&[10]);
        assert!(!arena.insert(10, Arc::from("other")));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn snapshot_preserves_insertion_order_across_removal() {
        let mut arena = arena_with(&[3, 1, 2]);
        arena.remove(1);
        let order: Vec<_> = arena.snapshot();
        assert_eq!(order.len(), 2);
        assert_eq!(&*order[0], "ep-3");
        assert_eq!(&*order[1], "ep-2");
    }

    #[test]
    fn remove_twice_returns_none() {
        let mut arena = arena_with(&[5]);
        assert!(arena.remove(5).is_some());
        assert!(arena.remove(5).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn compaction_keeps_live_entries_reachable() {
        let mut arena = arena_with(&[1, 2, 3, 4, 5, 6]);
        for handle in [1, 2, 3, 4] {
            arena.remove(handle);
        }
        // compaction has run by now (tombstones outnumbered live entries)
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(5).as_deref(), Some("ep-5"));
        assert_eq!(arena.get(6).as_deref(), Some("ep-6"));
        let order = arena.snapshot();
        assert_eq!(&*order[0], "ep-5");
        assert_eq!(&*order[1], "ep-6");
    }
}
