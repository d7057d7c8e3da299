//! Events, stream filters, and cursors.

use crate::error::SourceError;
use crate::id::EventId;
use serde::{Deserialize, Serialize};

/// An immutable record of a state change emitted by the remote ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Identity used for deduplication.
    pub id: EventId,
    /// Fully qualified type, e.g. `0xabc::boss_battle::CombatEvent`.
    pub event_type: String,
    /// Remote-assigned timestamp in milliseconds. Monotonic-ish only.
    pub timestamp_ms: u64,
    /// Address of the transaction sender, when reported.
    pub sender: Option<String>,
    /// Event fields.
    pub payload: serde_json::Value,
}

impl Event {
    /// Create an event with an empty sender.
    pub fn new(
        id: EventId,
        event_type: impl Into<String>,
        timestamp_ms: u64,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            timestamp_ms,
            sender: None,
            payload,
        }
    }

    /// The unqualified type name: the last `::` segment of `event_type`.
    pub fn short_type(&self) -> &str {
        self.event_type
            .rsplit("::")
            .next()
            .unwrap_or(self.event_type.as_str())
    }

    /// A string field of the payload.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(|v| v.as_str())
    }

    /// A boolean field of the payload.
    pub fn field_bool(&self, name: &str) -> Option<bool> {
        self.payload.get(name).and_then(|v| v.as_bool())
    }

    /// An unsigned integer field. Ledgers commonly encode `u64` as a
    /// decimal string in JSON, so both encodings are accepted.
    pub fn field_u64(&self, name: &str) -> Option<u64> {
        json_u64(self.payload.get(name)?)
    }
}

/// Read a `u64` that may be encoded as a JSON number or decimal string.
pub fn json_u64(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Which events a stream selects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventFilter {
    /// Package (contract) id emitting the events.
    pub package: String,
    /// Module within the package. `None` selects the whole package.
    pub module: Option<String>,
    /// Single event type within the module. Requires `module`.
    pub event_type: Option<String>,
}

impl EventFilter {
    /// All events emitted by a module.
    pub fn module(package: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            module: Some(module.into()),
            event_type: None,
        }
    }

    /// A single event type of a module.
    pub fn event_type(
        package: impl Into<String>,
        module: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            module: Some(module.into()),
            event_type: Some(event_type.into()),
        }
    }

    /// Reject filters that can never match anything.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.package.trim().is_empty() {
            return Err(SourceError::FatalConfig("event filter has empty package id".into()));
        }
        if self.module.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(SourceError::FatalConfig("event filter has empty module".into()));
        }
        if self.event_type.is_some() && self.module.is_none() {
            return Err(SourceError::FatalConfig(
                "event filter names an event type without a module".into(),
            ));
        }
        Ok(())
    }

    /// `package::module::Type` when an event type is selected.
    pub fn qualified_event_type(&self) -> Option<String> {
        match (&self.module, &self.event_type) {
            (Some(module), Some(ty)) => Some(format!("{}::{module}::{ty}", self.package)),
            _ => None,
        }
    }
}

/// Ordering requested from the remote event query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

/// Resume position of a logical stream.
///
/// `position` is the remote query cursor (opaque to everything but the
/// source adapter); `watermark_ms` is the highest event timestamp that
/// has been dispatched. A cursor only ever moves forward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Remote resume token. `None` means "from the beginning".
    pub position: Option<EventId>,
    /// Highest dispatched event timestamp.
    pub watermark_ms: u64,
}

impl Cursor {
    /// A cursor that starts at the given watermark with no remote position.
    pub fn starting_at(watermark_ms: u64) -> Self {
        Self {
            position: None,
            watermark_ms,
        }
    }

    /// Move to `next` if it does not go backwards. Returns whether the
    /// cursor changed.
    pub fn advance(&mut self, next: Cursor) -> bool {
        if next.watermark_ms < self.watermark_ms {
            return false;
        }
        if next.position.is_none() && self.position.is_some() {
            return false;
        }
        if *self == next {
            return false;
        }
        *self = next;
        true
    }
}

/// One page of a remote event query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    /// Events in the order the remote returned them.
    pub data: Vec<Event>,
    /// Cursor to continue from.
    pub next_cursor: Option<EventId>,
    /// Whether more pages are available right now.
    pub has_next_page: bool,
}

/// What an [`EventSource`](crate::source::EventSource) returns per fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchBatch {
    /// New events, possibly including duplicates or out-of-window ones.
    pub events: Vec<Event>,
    /// Position after the fetched events.
    pub cursor: Cursor,
}
