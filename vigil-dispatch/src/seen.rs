//! Bounded record of processed event ids.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use vigil_core::EventId;

/// One persisted dedup entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenEntry {
    /// The processed event.
    pub id: EventId,
    /// When it was marked, in milliseconds since the epoch.
    pub at_ms: u64,
}

/// Insertion-ordered set of event ids with a fixed capacity. When full,
/// the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct DedupSet {
    capacity: usize,
    order: VecDeque<EventId>,
    marked_at: HashMap<EventId, u64>,
}

impl DedupSet {
    /// Create an empty set. Returns `None` for a zero capacity.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            marked_at: HashMap::with_capacity(capacity),
        })
    }

    /// Rebuild from persisted entries (oldest first). Entries beyond the
    /// capacity are dropped from the old end.
    pub fn from_entries(capacity: usize, entries: Vec<SeenEntry>) -> Option<Self> {
        let mut set = Self::new(capacity)?;
        for entry in entries {
            set.insert(entry.id, entry.at_ms);
        }
        Some(set)
    }

    /// Whether `id` has been marked.
    pub fn contains(&self, id: &EventId) -> bool {
        self.marked_at.contains_key(id)
    }

    /// When `id` was marked.
    pub fn marked_at(&self, id: &EventId) -> Option<u64> {
        self.marked_at.get(id).copied()
    }

    /// Mark `id`. Returns false if it was already present, in which case
    /// nothing changes.
    pub fn insert(&mut self, id: EventId, at_ms: u64) -> bool {
        if self.marked_at.contains_key(&id) {
            return false;
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.marked_at.remove(&oldest);
            }
        }
        self.marked_at.insert(id.clone(), at_ms);
        self.order.push_back(id);
        true
    }

    /// Number of ids held.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of ids held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries oldest first, for persistence.
    pub fn entries(&self) -> Vec<SeenEntry> {
        self.order
            .iter()
            .map(|id| SeenEntry {
                id: id.clone(),
                at_ms: self.marked_at.get(id).copied().unwrap_or_default(),
            })
            .collect()
    }
}
