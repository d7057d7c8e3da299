//! The indexer's handler: one structured line per battle event.

use async_trait::async_trait;
use vigil_core::{Event, EventHandler, HandlerError, to_coin_units};

/// Event types the log reports.
pub const LOGGED_EVENTS: [&str; 2] = ["CombatEvent", "RewardEvent"];

/// Logs combat and reward events.
pub struct CombatLog {
    types: Vec<String>,
}

impl CombatLog {
    /// A log of [`LOGGED_EVENTS`].
    pub fn new() -> Self {
        Self {
            types: LOGGED_EVENTS.iter().map(|t| (*t).to_owned()).collect(),
        }
    }
}

impl Default for CombatLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for CombatLog {
    fn name(&self) -> &str {
        "combat-log"
    }

    fn event_types(&self) -> &[String] {
        &self.types
    }

    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        let boss = event.field_str("boss_id").unwrap_or("?");
        match event.short_type() {
            "CombatEvent" => {
                let kill = event.field_bool("is_kill").unwrap_or(false);
                tracing::info!(
                    event_id = %event.id,
                    boss,
                    attacker = event.field_str("attacker").or(event.sender.as_deref()).unwrap_or("?"),
                    damage = event.field_u64("damage").unwrap_or_default(),
                    remaining_hp = event.field_u64("remaining_hp").unwrap_or_default(),
                    kill,
                    "combat"
                );
            }
            "RewardEvent" => {
                let amount = event
                    .field_u64("amount")
                    .ok_or_else(|| HandlerError::Payload(format!("reward {} has no amount", event.id)))?;
                tracing::info!(
                    event_id = %event.id,
                    boss,
                    winner = event.field_str("winner").unwrap_or("?"),
                    amount = %to_coin_units(u128::from(amount)),
                    "reward"
                );
            }
            _ => {}
        }
        Ok(())
    }
}
