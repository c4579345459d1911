//! Bounded undo/redo history of graph snapshots

use std::collections::VecDeque;
use tracing::debug;

use crate::core::DEFAULT_HISTORY_LIMIT;

use super::store::{DiagramStore, GraphSnapshot};

/// Linear snapshot history with a cursor
///
/// `entries[index]` always equals the store state as of the last commit,
/// undo, or redo. Committing after an undo discards the redo tail.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<GraphSnapshot>,
    index: usize,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::seeded(&DiagramStore::default(), DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// History whose only entry is the current state of `store`
    pub fn seeded(store: &DiagramStore, limit: usize) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(store.snapshot());
        Self {
            entries,
            index: 0,
            limit: limit.max(1),
        }
    }

    /// Record the current state of `store` as the newest entry
    pub fn commit(&mut self, store: &DiagramStore) {
        self.entries.truncate(self.index + 1);
        self.entries.push_back(store.snapshot());
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
        debug!(index = self.index, len = self.entries.len(), "History commit");
    }

    /// Step back one entry; false when already at the oldest
    pub fn undo(&mut self, store: &mut DiagramStore) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.index -= 1;
        self.restore_current(store);
        debug!(index = self.index, len = self.entries.len(), "Undo");
        true
    }

    /// Step forward one entry; false when already at the newest
    pub fn redo(&mut self, store: &mut DiagramStore) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.index += 1;
        self.restore_current(store);
        debug!(index = self.index, len = self.entries.len(), "Redo");
        true
    }

    fn restore_current(&self, store: &mut DiagramStore) {
        if let Some(snapshot) = self.entries.get(self.index) {
            store.restore(snapshot.clone());
        }
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the entry matching the live state
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
