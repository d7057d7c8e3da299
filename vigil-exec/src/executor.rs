//! The ledger-backed action executor.

use crate::layout::ContractLayout;
use crate::normalize;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use vigil_core::{
    Action, ActionExecutor, Call, CallArg, Confirmation, ExecError, ExecutionOutcome, Ledger,
    LedgerError, ObjectId, ObjectSnapshot, OutcomeStatus, Signer,
};

/// Abort marker for a wallet that already joined the arena.
const ALREADY_REGISTERED: &str = "AlreadyRegistered";

/// Executes [`Action`]s as contract calls signed by one signer.
///
/// Respawn templates and attack costs are read from the ledger at
/// execution time, so a retried action always uses current object state.
pub struct LedgerExecutor {
    ledger: Arc<dyn Ledger>,
    signer: Arc<dyn Signer>,
    layout: ContractLayout,
}

impl LedgerExecutor {
    /// Create an executor. Fails if the layout is unusable.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        signer: Arc<dyn Signer>,
        layout: ContractLayout,
    ) -> Result<Self, ExecError> {
        layout.validate()?;
        Ok(Self {
            ledger,
            signer,
            layout,
        })
    }

    /// The signing address.
    pub fn address(&self) -> &str {
        self.signer.address()
    }

    /// The calls that `action` maps to, reading any object state it needs.
    pub async fn plan(&self, action: &Action) -> Result<Vec<Call>, ExecError> {
        match action {
            Action::Respawn { source_id } => {
                let dead = self.object(source_id).await?;
                let template = RespawnTemplate::from_object(&dead)?;
                Ok(vec![Call::move_call(
                    self.layout.function("create_boss"),
                    vec![
                        CallArg::Object(self.layout.admin_cap()?),
                        CallArg::Pure(json!(template.name)),
                        CallArg::Pure(json!(template.description)),
                        CallArg::Pure(json!(template.skill)),
                        CallArg::Pure(json!(template.difficulty)),
                        CallArg::Pure(json!(template.hp)),
                        CallArg::Pure(json!(template.attack_cost)),
                    ],
                )])
            }
            Action::Attack { target_id } => {
                let arena = self.layout.arena()?;
                let target = self.object(target_id).await?;
                if !is_alive(&target) {
                    return Err(ExecError::Failure(format!("target {target_id} is not alive")));
                }
                let cost = target.field_u64("attack_cost").ok_or_else(|| {
                    ExecError::Failure(format!("target {target_id} has no attack_cost"))
                })?;
                Ok(vec![Call::move_call(
                    self.layout.function("attack_boss"),
                    vec![
                        CallArg::Object(arena),
                        CallArg::Object(target_id.clone()),
                        CallArg::Coin(cost),
                        CallArg::Object(ObjectId::new(self.layout.random_id.as_str())),
                        CallArg::Object(ObjectId::new(self.layout.clock_id.as_str())),
                    ],
                )])
            }
            Action::Withdraw {
                destination,
                amount,
            } => {
                if destination.trim().is_empty() {
                    return Err(ExecError::FatalConfig("withdraw destination is empty".into()));
                }
                if *amount == 0 {
                    return Err(ExecError::Failure("withdraw amount is zero".into()));
                }
                Ok(vec![Call::Transfer {
                    recipient: destination.clone(),
                    amount: *amount,
                }])
            }
            Action::Register { name } => Ok(vec![Call::move_call(
                self.layout.function("register_agent"),
                vec![
                    CallArg::Object(self.layout.arena()?),
                    CallArg::Pure(json!(name)),
                ],
            )]),
            other => Err(ExecError::Failure(format!("unsupported action {other}"))),
        }
    }

    async fn object(&self, id: &ObjectId) -> Result<ObjectSnapshot, ExecError> {
        self.ledger
            .get_object(id)
            .await?
            .ok_or_else(|| ExecError::Failure(format!("object {id} not found")))
    }
}

/// Which emitted event carries the interesting effect of an action.
fn effect_type(action: &Action) -> Option<&'static str> {
    match action {
        Action::Attack { .. } => Some("CombatEvent"),
        _ => None,
    }
}

/// Narrow an emitted payload to what the action reports. A respawn
/// reports the id of the entity it created.
fn narrow_effect(
    action: &Action,
    effect: Option<serde_json::Value>,
) -> Option<serde_json::Value> {
    match action {
        Action::Respawn { .. } => effect
            .and_then(|payload| payload.get("boss_id").cloned())
            .map(|boss_id| json!({ "boss_id": boss_id })),
        _ => effect,
    }
}

fn is_alive(target: &ObjectSnapshot) -> bool {
    match target.field_bool("is_alive") {
        Some(alive) => alive,
        None => target.field_u64("hp").is_some_and(|hp| hp > 0),
    }
}

/// Attributes cloned from a dead entity.
struct RespawnTemplate {
    name: String,
    description: String,
    skill: String,
    difficulty: String,
    hp: String,
    attack_cost: String,
}

impl RespawnTemplate {
    fn from_object(dead: &ObjectSnapshot) -> Result<Self, ExecError> {
        let text = |field: &str| {
            dead.field_str(field).map(str::to_owned).ok_or_else(|| {
                ExecError::Failure(format!("object {} has no {field}", dead.id))
            })
        };
        let amount = |field: &str| {
            dead.field_u64(field).map(|v| v.to_string()).ok_or_else(|| {
                ExecError::Failure(format!("object {} has no numeric {field}", dead.id))
            })
        };
        Ok(Self {
            name: text("name")?,
            description: dead.field_str("description").unwrap_or_default().to_owned(),
            skill: dead.field_str("skill").unwrap_or_default().to_owned(),
            difficulty: text("difficulty")?,
            hp: amount("max_hp")?,
            attack_cost: amount("attack_cost")?,
        })
    }
}

fn already_registered(error: Option<&str>) -> bool {
    error.is_some_and(|e| e.contains(ALREADY_REGISTERED))
}

#[async_trait]
impl ActionExecutor for LedgerExecutor {
    async fn execute(&self, action: &Action) -> Result<ExecutionOutcome, ExecError> {
        let calls = self.plan(action).await?;
        tracing::debug!(action = %action, calls = calls.len(), signer = self.signer.address(), "submitting");

        let response = match self.ledger.submit_transaction(self.signer.as_ref(), &calls).await {
            Ok(response) => response,
            Err(LedgerError::Rejected(msg))
                if matches!(action, Action::Register { .. })
                    && already_registered(Some(msg.as_str())) =>
            {
                tracing::info!(action = %action, "already registered");
                return Ok(ExecutionOutcome::succeeded(None, None));
            }
            Err(LedgerError::Unconfirmed { digest, reason }) => {
                tracing::warn!(
                    action = %action,
                    digest = %digest,
                    reason = %reason,
                    "action sent, outcome unknown"
                );
                return Ok(ExecutionOutcome::pending(digest));
            }
            Err(err) => return Err(err.into()),
        };

        let mut outcome = normalize::outcome(&response, effect_type(action));
        outcome.effect = narrow_effect(action, outcome.effect.take());
        if outcome.status == OutcomeStatus::Failed
            && matches!(action, Action::Register { .. })
            && already_registered(outcome.error.as_deref())
        {
            outcome = ExecutionOutcome::succeeded(outcome.digest, None);
        }

        match outcome.status {
            OutcomeStatus::Succeeded => tracing::info!(
                action = %action,
                digest = outcome.digest.as_deref().unwrap_or_default(),
                effect = ?outcome.effect.as_ref().map(serde_json::Value::to_string),
                "action executed"
            ),
            OutcomeStatus::Failed => tracing::warn!(
                action = %action,
                digest = outcome.digest.as_deref().unwrap_or_default(),
                error = outcome.error.as_deref().unwrap_or_default(),
                "action failed"
            ),
            OutcomeStatus::Pending => tracing::info!(
                action = %action,
                digest = outcome.digest.as_deref().unwrap_or_default(),
                "action submitted, status unknown"
            ),
        }
        Ok(outcome)
    }

    async fn confirm(&self, digest: &str) -> Result<Confirmation, ExecError> {
        let response = self.ledger.transaction_status(digest).await?;
        Ok(normalize::confirmation(response.as_ref(), None))
    }
}
