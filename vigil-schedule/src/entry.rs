//! The persisted record of one delayed action.

use serde::{Deserialize, Serialize};
use vigil_core::{Action, ActionKey};

/// A deferred, retryable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// Unique key. At most one pending entry exists per key.
    pub key: ActionKey,
    /// Earliest execution time.
    pub not_before_ms: u64,
    /// What to do.
    pub action: Action,
    /// Attempts made so far.
    #[serde(default)]
    pub attempts: u32,
    /// When the entry is next due. Starts at `not_before_ms`.
    pub next_retry_at_ms: u64,
    /// Digest of a submission that was accepted without a final status.
    /// While set, ticks confirm it instead of executing again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting: Option<String>,
    /// Lookups of `awaiting` that came back without a verdict.
    #[serde(default)]
    pub unconfirmed_checks: u32,
    /// Error of the last failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// When the entry was enqueued.
    pub created_at_ms: u64,
}

impl ScheduledAction {
    /// A fresh entry, due at `not_before_ms`.
    pub fn new(key: ActionKey, not_before_ms: u64, action: Action, now_ms: u64) -> Self {
        Self {
            key,
            not_before_ms,
            action,
            attempts: 0,
            next_retry_at_ms: not_before_ms,
            awaiting: None,
            unconfirmed_checks: 0,
            last_error: None,
            created_at_ms: now_ms,
        }
    }

    /// Whether the entry should be attempted at `now_ms`.
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.next_retry_at_ms
    }
}
