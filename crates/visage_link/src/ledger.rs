//! Bounded memory of applied event ids.

use std::collections::{HashSet, VecDeque};

pub const DEFAULT_CAPACITY: usize = 200;
pub const DEFAULT_RETAIN: usize = 50;

/// Insertion-ordered id set. Once it grows past `capacity` it is cut back to
/// the `retain` most recent ids in one step.
#[derive(Debug, Clone)]
pub struct ProcessedEventLedger {
    capacity: usize,
    retain: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl Default for ProcessedEventLedger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_RETAIN)
    }
}

impl ProcessedEventLedger {
    /// `retain` is capped at `capacity`; a zero capacity is treated as one.
    pub fn new(capacity: usize, retain: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            retain: retain.min(capacity),
            order: VecDeque::with_capacity(capacity + 1),
            seen: HashSet::with_capacity(capacity + 1),
        }
    }

    /// Record `id`. Returns false when it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.to_string());
        self.order.push_back(id.to_string());
        if self.order.len() > self.capacity {
            self.trim();
        }
        true
    }

    fn trim(&mut self) {
        let excess = self.order.len() - self.retain;
        for id in self.order.drain(..excess) {
            self.seen.remove(&id);
        }
        tracing::debug!("Event ledger trimmed to {} ids", self.order.len());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}
