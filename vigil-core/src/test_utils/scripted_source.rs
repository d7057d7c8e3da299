//! ScriptedSource: replays a fixed sequence of fetch results.

use crate::error::SourceError;
use crate::event::{Cursor, Event, EventFilter, FetchBatch};
use crate::source::EventSource;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// An event source that answers each fetch with the next scripted
/// result. Once the script runs out, fetches return no events.
///
/// The returned cursor position is the id of the last event in the
/// scripted batch (the order the "remote" returned them), mimicking a
/// paginated query cursor.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<Event>, SourceError>>>,
    cursors: Mutex<Vec<Cursor>>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    /// Create an empty script.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            cursors: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful batch.
    pub fn push_events(&self, events: Vec<Event>) {
        self.script.lock().unwrap().push_back(Ok(events));
    }

    /// Queue a failure.
    pub fn push_error(&self, err: SourceError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    /// Cursors passed to `fetch`, in call order.
    pub fn cursors(&self) -> Vec<Cursor> {
        self.cursors.lock().unwrap().clone()
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn fetch(&self, filter: &EventFilter, cursor: &Cursor) -> Result<FetchBatch, SourceError> {
        filter.validate()?;
        self.cursors.lock().unwrap().push(cursor.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        let events = match next {
            Some(result) => result?,
            None => Vec::new(),
        };
        let position = events
            .last()
            .map(|e| e.id.clone())
            .or_else(|| cursor.position.clone());
        Ok(FetchBatch {
            events,
            cursor: Cursor {
                position,
                watermark_ms: cursor.watermark_ms,
            },
        })
    }
}
