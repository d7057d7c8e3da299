//! Per-stream cursor and dedup state, persisted through a `StateStore`.

use crate::error::DispatchError;
use crate::seen::{DedupSet, SeenEntry};
use std::sync::Arc;
use vigil_core::state::{self, Scope, StateStore};
use vigil_core::{Cursor, EventId, StateError, StreamId};

const CURSOR_KEY: &str = "cursor";
const SEEN_KEY: &str = "seen";

/// Cursor and dedup set of one logical stream.
///
/// Only the dispatcher that owns the stream mutates it. The in-memory
/// cursor changes only after the new value has been persisted, so the
/// persisted cursor never runs ahead of dispatched events.
pub struct CursorStore {
    stream: StreamId,
    scope: Scope,
    store: Arc<dyn StateStore>,
    cursor: Cursor,
    seen: DedupSet,
    seen_dirty: bool,
}

impl CursorStore {
    /// Load the stream's state, or start at `start` when nothing has been
    /// persisted yet.
    pub async fn load(
        stream: StreamId,
        store: Arc<dyn StateStore>,
        dedup_capacity: usize,
        start: Cursor,
    ) -> Result<Self, DispatchError> {
        let scope = Scope::Stream(stream.clone());
        let persisted: Option<Cursor> = state::load(store.as_ref(), &scope, CURSOR_KEY).await?;
        let entries: Vec<SeenEntry> = state::load(store.as_ref(), &scope, SEEN_KEY)
            .await?
            .unwrap_or_default();
        let seen = DedupSet::from_entries(dedup_capacity, entries)
            .ok_or_else(|| DispatchError::Config("dedup capacity must be positive".into()))?;
        let resumed = persisted.is_some();
        let cursor = persisted.unwrap_or(start);
        tracing::debug!(
            stream = %stream,
            resumed,
            watermark_ms = cursor.watermark_ms,
            seen = seen.len(),
            "cursor loaded"
        );
        Ok(Self {
            stream,
            scope,
            store,
            cursor,
            seen,
            seen_dirty: false,
        })
    }

    /// The persisted cursor of `stream`, if it has one.
    pub async fn persisted(
        store: &dyn StateStore,
        stream: &StreamId,
    ) -> Result<Option<Cursor>, StateError> {
        state::load(store, &Scope::Stream(stream.clone()), CURSOR_KEY).await
    }

    /// The stream this store belongs to.
    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    /// Current (persisted) cursor.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Whether `id` was already dispatched.
    pub fn has_seen(&self, id: &EventId) -> bool {
        self.seen.contains(id)
    }

    /// Record `id` as dispatched. Returns false if it already was.
    pub fn mark_seen(&mut self, id: EventId, at_ms: u64) -> bool {
        let inserted = self.seen.insert(id, at_ms);
        self.seen_dirty |= inserted;
        inserted
    }

    /// Number of ids in the dedup set.
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Persist the dedup set and move the cursor to `next`.
    ///
    /// Returns whether the cursor moved. A `next` that would move the
    /// cursor backwards is ignored. On a write failure the in-memory
    /// cursor is unchanged.
    pub async fn advance(&mut self, next: Cursor) -> Result<bool, StateError> {
        let mut candidate = self.cursor.clone();
        let moved = candidate.advance(next);
        if !moved && !self.seen_dirty {
            return Ok(false);
        }
        if self.seen_dirty {
            state::save(self.store.as_ref(), &self.scope, SEEN_KEY, &self.seen.entries()).await?;
            self.seen_dirty = false;
        }
        if moved {
            state::save(self.store.as_ref(), &self.scope, CURSOR_KEY, &candidate).await?;
            self.cursor = candidate;
        }
        Ok(moved)
    }
}
