//! The derived battlefield view.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use vigil_core::{
    DecisionInput, Event, EventHandler, HandlerError, Ledger, LedgerError, ObjectId,
    ObjectSnapshot, Target, to_coin_units,
};

/// What an agent can see: the targets it knows about and its own balance.
///
/// Known target ids are seeded at construction and grown from observed
/// events. Every [`snapshot`](Self::snapshot) re-reads each known target
/// from the ledger and keeps only the alive ones, in the order they were
/// first seen. Targets that no longer exist are forgotten.
pub struct LedgerView {
    ledger: Arc<dyn Ledger>,
    address: String,
    known: Mutex<Vec<ObjectId>>,
}

impl LedgerView {
    /// A view for `address` starting from `seed` targets.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        address: impl Into<String>,
        seed: impl IntoIterator<Item = ObjectId>,
    ) -> Self {
        let mut known: Vec<ObjectId> = Vec::new();
        for id in seed {
            if !known.contains(&id) {
                known.push(id);
            }
        }
        Self {
            ledger,
            address: address.into(),
            known: Mutex::new(known),
        }
    }

    /// Wallet address whose balance is reported.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Start tracking `id`. Returns `false` if it was already known.
    pub fn observe(&self, id: ObjectId) -> bool {
        let mut known = self.known.lock().unwrap_or_else(|e| e.into_inner());
        if known.contains(&id) {
            return false;
        }
        known.push(id);
        true
    }

    /// Target ids currently tracked.
    pub fn known(&self) -> Vec<ObjectId> {
        self.known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Own balance in coin units.
    pub async fn balance(&self) -> Result<Decimal, LedgerError> {
        let base = self.ledger.get_balance(&self.address).await?;
        Ok(to_coin_units(base))
    }

    /// Read the current battlefield.
    pub async fn snapshot(&self) -> Result<DecisionInput, LedgerError> {
        let ids = self.known();
        let mut open_targets = Vec::with_capacity(ids.len());
        let mut gone = Vec::new();
        for id in ids {
            match self.ledger.get_object(&id).await? {
                Some(object) => open_targets.extend(open_target(&object)),
                None => gone.push(id),
            }
        }
        if !gone.is_empty() {
            tracing::debug!(count = gone.len(), "forgetting targets that no longer exist");
            self.known
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|id| !gone.contains(id));
        }
        let balance = self.balance().await?;
        Ok(DecisionInput {
            open_targets,
            balance,
        })
    }
}

/// Turn a target object into a [`Target`] if it is still alive.
///
/// An object is alive when `is_alive` is true or, when the flag is
/// absent, when `hp` is above zero.
pub fn open_target(object: &ObjectSnapshot) -> Option<Target> {
    let hp = object.field_u64("hp").unwrap_or_default();
    let alive = object.field_bool("is_alive").unwrap_or(hp > 0);
    if !alive {
        return None;
    }
    Some(Target {
        id: object.id.as_str().to_owned(),
        name: object.field_str("name").unwrap_or_default().to_owned(),
        cost: to_coin_units(object.field_u64("attack_cost").unwrap_or_default().into()),
        reward: to_coin_units(object.field_u64("pool").unwrap_or_default().into()),
        remaining: hp,
        max_remaining: object.field_u64("max_hp"),
    })
}

/// Grows a [`LedgerView`] from every event that names a `boss_id`.
pub struct TargetTracker {
    view: Arc<LedgerView>,
    types: Vec<String>,
}

impl TargetTracker {
    /// Track targets for `view`.
    pub fn new(view: Arc<LedgerView>) -> Self {
        Self {
            view,
            types: Vec::new(),
        }
    }
}

#[async_trait]
impl EventHandler for TargetTracker {
    fn name(&self) -> &str {
        "target-tracker"
    }

    fn event_types(&self) -> &[String] {
        &self.types
    }

    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        let Some(id) = event.field_str("boss_id") else {
            return Ok(());
        };
        if self.view.observe(ObjectId::new(id)) {
            tracing::info!(target_id = %id, event_id = %event.id, "tracking new target");
        }
        Ok(())
    }
}
