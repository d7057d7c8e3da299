//! RecordingHandler: records every event it receives.

use crate::error::HandlerError;
use crate::event::Event;
use crate::handler::EventHandler;
use crate::id::EventId;
use async_trait::async_trait;
use std::sync::Mutex;

/// A handler that records event ids and can be told to fail.
pub struct RecordingHandler {
    name: String,
    types: Vec<String>,
    seen: Mutex<Vec<EventId>>,
    fail: bool,
}

impl RecordingHandler {
    /// Record every event type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            seen: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Only subscribe to the given short type names.
    pub fn for_types(mut self, types: &[&str]) -> Self {
        self.types = types.iter().map(|t| (*t).to_owned()).collect();
        self
    }

    /// Record, then return an error for every event.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Snapshot of received event ids, in delivery order.
    pub fn seen(&self) -> Vec<EventId> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn event_types(&self) -> &[String] {
        &self.types
    }

    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        self.seen.lock().unwrap().push(event.id.clone());
        if self.fail {
            return Err(HandlerError::Failed(format!("{} refused {}", self.name, event.id)));
        }
        Ok(())
    }
}
