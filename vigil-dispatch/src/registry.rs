//! Handler registry.
//!
//! The [`HandlerRegistry`] routes each event to every handler whose
//! [`event_types`](EventHandler::event_types) include the event's short
//! type, in registration order. Handler errors are logged and the next
//! handler still runs: a failing handler cannot abort a dispatch tick or
//! hold back the cursor.

use std::sync::Arc;
use vigil_core::{Event, EventHandler};

/// What happened when one event was routed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Routed {
    /// Handlers that accepted the event.
    pub invoked: usize,
    /// Of those, how many returned an error.
    pub failed: usize,
}

/// An ordered list of event handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Add a handler to the end of the list.
    pub fn add(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Builder form of [`add`](Self::add).
    #[must_use]
    pub fn with(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.add(handler);
        self
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Route `event` to every handler registered for its type.
    pub async fn dispatch(&self, event: &Event) -> Routed {
        let mut routed = Routed::default();
        for handler in &self.handlers {
            if !handler.accepts(event) {
                continue;
            }
            routed.invoked += 1;
            if let Err(err) = handler.handle(event).await {
                routed.failed += 1;
                tracing::warn!(
                    handler = handler.name(),
                    event_id = %event.id,
                    event_type = event.short_type(),
                    error = %err,
                    "handler failed"
                );
            }
        }
        routed
    }
}
