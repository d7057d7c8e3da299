//! Kill event → scheduled respawn.

use crate::scheduler::Scheduler;
use async_trait::async_trait;
use std::sync::Arc;
use vigil_core::{
    Action, ActionKey, DurationMs, Event, EventHandler, HandlerError, Ledger, ObjectId,
};

/// Event type the trigger listens to.
pub const COMBAT_EVENT: &str = "CombatEvent";

/// Default delay between a kill and the respawn.
pub const DEFAULT_RESPAWN_DELAY: DurationMs = DurationMs::from_secs(30);

/// Schedules a respawn of every entity reported killed.
///
/// The schedule key is the dead entity's id, so a kill event delivered
/// twice, or two kill events for the same entity, schedule one respawn.
/// The respawn is due `delay` after the entity's recorded `death_time`
/// (read from the event, else from the object when a ledger is
/// attached), falling back to the event timestamp.
pub struct RespawnTrigger {
    scheduler: Arc<Scheduler>,
    delay: DurationMs,
    ledger: Option<Arc<dyn Ledger>>,
    types: Vec<String>,
}

impl RespawnTrigger {
    /// Create a trigger with the default delay.
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            scheduler,
            delay: DEFAULT_RESPAWN_DELAY,
            ledger: None,
            types: vec![COMBAT_EVENT.to_owned()],
        }
    }

    /// Delay between death and respawn.
    #[must_use]
    pub fn with_delay(mut self, delay: DurationMs) -> Self {
        self.delay = delay;
        self
    }

    /// Read `death_time` from the dead object when the event lacks it.
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    async fn death_time(&self, event: &Event, boss: &ObjectId) -> u64 {
        if let Some(at) = event.field_u64("death_time") {
            return at;
        }
        let Some(ledger) = &self.ledger else {
            return event.timestamp_ms;
        };
        match ledger.get_object(boss).await {
            Ok(Some(object)) => object.field_u64("death_time").unwrap_or(event.timestamp_ms),
            Ok(None) => event.timestamp_ms,
            Err(err) => {
                tracing::debug!(boss = %boss, error = %err, "death time lookup failed, using event time");
                event.timestamp_ms
            }
        }
    }
}

#[async_trait]
impl EventHandler for RespawnTrigger {
    fn name(&self) -> &str {
        "respawn-trigger"
    }

    fn event_types(&self) -> &[String] {
        &self.types
    }

    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        if !event.field_bool("is_kill").unwrap_or(false) {
            return Ok(());
        }
        let boss = event
            .field_str("boss_id")
            .map(ObjectId::new)
            .ok_or_else(|| HandlerError::Payload(format!("kill event {} has no boss_id", event.id)))?;

        let died_at = self.death_time(event, &boss).await;
        let not_before = self.delay.after(died_at);
        let scheduled = self
            .scheduler
            .enqueue(
                ActionKey::new(boss.as_str()),
                not_before,
                Action::Respawn {
                    source_id: boss.clone(),
                },
            )
            .await;
        if scheduled {
            tracing::info!(
                boss = %boss,
                event_id = %event.id,
                not_before_ms = not_before,
                "kill observed, respawn scheduled"
            );
        }
        Ok(())
    }
}
