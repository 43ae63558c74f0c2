//! The committed event collection plus its undo/redo stacks.

use std::collections::VecDeque;

use crate::event::BaseEvent;

/// Default number of snapshots kept on the undo stack
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Owns the committed, virtual-free collection. Every mutation goes through
/// [`Timeline::commit`] so the previous state lands on the undo stack.
#[derive(Debug, Clone)]
pub struct Timeline {
    events: Vec<BaseEvent>,
    /// Oldest snapshot at the front, dropped first once `limit` is reached
    undo: VecDeque<Vec<BaseEvent>>,
    redo: Vec<Vec<BaseEvent>>,
    limit: usize,
}

impl Timeline {
    pub fn new(events: Vec<BaseEvent>) -> Self {
        Timeline::with_limit(events, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(events: Vec<BaseEvent>, limit: usize) -> Self {
        Timeline {
            events,
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn events(&self) -> &[BaseEvent] {
        &self.events
    }

    /// Replace the collection, remembering the previous one.
    pub fn commit(&mut self, next: Vec<BaseEvent>) {
        let previous = std::mem::replace(&mut self.events, next);
        self.push_undo(previous);
        self.redo.clear();
        tracing::debug!(events = self.events.len(), undo = self.undo.len(), "committed");
    }

    /// Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.events, previous);
        self.redo.push(current);
        true
    }

    /// Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.events, next);
        self.push_undo(current);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn into_events(self) -> Vec<BaseEvent> {
        self.events
    }

    fn push_undo(&mut self, snapshot: Vec<BaseEvent>) {
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(snapshot);
    }
}
