//! The Event Source protocol: a uniform polling interface over a remote
//! event feed.

use crate::error::SourceError;
use crate::event::{Cursor, EventFilter, FetchBatch};
use async_trait::async_trait;

/// Wraps a remote event query capability behind one call.
///
/// Implementations own no state beyond what the cursor carries and have
/// no side effects beyond the remote read. They do NOT deduplicate: the
/// remote may return duplicates or out-of-window events and the
/// dispatcher is responsible for filtering them.
///
/// Polling is one transport. A push-based source implements the same
/// trait by draining whatever arrived since the cursor.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch events after `cursor`.
    ///
    /// Fails with [`SourceError::Transient`] on network or remote errors
    /// (caller retries next tick) and [`SourceError::FatalConfig`] when
    /// the filter itself is invalid (caller must stop).
    async fn fetch(&self, filter: &EventFilter, cursor: &Cursor) -> Result<FetchBatch, SourceError>;
}
