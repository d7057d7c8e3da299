//! The Handler interface: reactions to dispatched events.

use crate::error::HandlerError;
use crate::event::Event;
use async_trait::async_trait;

/// Reacts to events routed to it by the dispatcher.
///
/// The dispatcher guarantees each event is handed to a handler at most
/// once per process lifetime (and at most once across restarts when the
/// dedup set is persisted). Handlers must still be idempotent: a crash
/// between dispatch and cursor persistence redelivers.
///
/// Returning an error does NOT abort the dispatch tick. It is logged
/// with the event id and the tick continues with the next handler.
///
/// Implementations:
/// - RespawnTrigger: schedule a delayed re-creation on kill events
/// - CycleTrigger: wake an agent's decision loop
/// - CombatLog: structured log line per event
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Short event type names (last `::` segment) this handler wants.
    /// An empty slice subscribes to every event.
    fn event_types(&self) -> &[String];

    /// Handle one event.
    async fn handle(&self, event: &Event) -> Result<(), HandlerError>;

    /// Whether this handler is registered for `event`.
    fn accepts(&self, event: &Event) -> bool {
        let types = self.event_types();
        types.is_empty() || types.iter().any(|t| t == event.short_type())
    }
}
