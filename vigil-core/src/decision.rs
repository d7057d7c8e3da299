//! The pluggable decision function used by autonomous agents.

use crate::error::DecisionError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An entity that can currently be acted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Object id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Cost of one action against it, in coin units.
    pub cost: Decimal,
    /// Reward pool, in coin units.
    pub reward: Decimal,
    /// Remaining health.
    pub remaining: u64,
    /// Maximum health, when known.
    pub max_remaining: Option<u64>,
}

/// Everything a decision function sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    /// Open targets in a stable order.
    pub open_targets: Vec<Target>,
    /// Own balance in coin units.
    pub balance: Decimal,
}

/// The action tag a decision function may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    /// Act against `target_id`.
    Attack,
    /// Do nothing this cycle.
    Wait,
    /// Move funds out according to the withdrawal policy.
    Withdraw,
}

/// A decision with its reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Chosen action.
    pub action: DecisionAction,
    /// Target for [`DecisionAction::Attack`].
    #[serde(default, alias = "boss_id", skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Free-form reasoning.
    #[serde(default)]
    pub reason: String,
}

impl Decision {
    /// Attack `target_id`.
    pub fn attack(target_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Attack,
            target_id: Some(target_id.into()),
            reason: reason.into(),
        }
    }

    /// Wait.
    pub fn wait(reason: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Wait,
            target_id: None,
            reason: reason.into(),
        }
    }

    /// Withdraw.
    pub fn withdraw(reason: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Withdraw,
            target_id: None,
            reason: reason.into(),
        }
    }

    /// Check the decision against its input. An attack must name one of
    /// the open targets.
    pub fn validate(&self, input: &DecisionInput) -> Result<(), DecisionError> {
        if self.action != DecisionAction::Attack {
            return Ok(());
        }
        let Some(target) = self.target_id.as_deref() else {
            return Err(DecisionError::Malformed("ATTACK without a target id".into()));
        };
        if !input.open_targets.iter().any(|t| t.id == target) {
            return Err(DecisionError::Malformed(format!(
                "ATTACK names unknown target {target}"
            )));
        }
        Ok(())
    }
}

/// A pluggable decision function.
///
/// May be a language model behind HTTP, a rule engine, or a fixed
/// heuristic. Callers must tolerate any error by falling back to a
/// deterministic default.
#[async_trait]
pub trait DecisionFn: Send + Sync {
    /// Pick the next action.
    async fn decide(&self, input: &DecisionInput) -> Result<Decision, DecisionError>;
}
