//! Logical actions and the Action Executor protocol.

use crate::error::ExecError;
use crate::id::ObjectId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A state-changing operation against the ledger, described logically.
/// The executor decides how it maps onto concrete calls.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Re-create an entity with the attributes of a dead one.
    Respawn {
        /// The dead entity whose attributes are cloned.
        source_id: ObjectId,
    },
    /// Attack a target, paying its attack cost.
    Attack {
        /// The target entity.
        target_id: ObjectId,
    },
    /// Transfer funds out of the acting wallet.
    Withdraw {
        /// Receiving address.
        destination: String,
        /// Amount in base units.
        amount: u64,
    },
    /// Register the acting wallet as a participant.
    Register {
        /// Display name.
        name: String,
    },
}

impl Action {
    /// Short tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Respawn { .. } => "respawn",
            Action::Attack { .. } => "attack",
            Action::Withdraw { .. } => "withdraw",
            Action::Register { .. } => "register",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Respawn { source_id } => write!(f, "respawn({source_id})"),
            Action::Attack { target_id } => write!(f, "attack({target_id})"),
            Action::Withdraw {
                destination,
                amount,
            } => write!(f, "withdraw({amount} -> {destination})"),
            Action::Register { name } => write!(f, "register({name})"),
        }
    }
}

/// Normalized status of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Executed and committed.
    Succeeded,
    /// Executed and aborted, or refused.
    Failed,
    /// Accepted by the remote system but execution status is unknown.
    Pending,
}

/// The normalized result of executing an [`Action`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Normalized status.
    pub status: OutcomeStatus,
    /// Transaction digest, when one was assigned.
    pub digest: Option<String>,
    /// Structured effect (e.g. the emitted event payload of interest).
    pub effect: Option<serde_json::Value>,
    /// Remote error text when the transaction failed.
    pub error: Option<String>,
}

impl ExecutionOutcome {
    /// A successful outcome.
    pub fn succeeded(digest: Option<String>, effect: Option<serde_json::Value>) -> Self {
        Self {
            status: OutcomeStatus::Succeeded,
            digest,
            effect,
            error: None,
        }
    }

    /// A failed outcome.
    pub fn failed(digest: Option<String>, error: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            digest,
            effect: None,
            error: Some(error.into()),
        }
    }

    /// An accepted-but-unconfirmed outcome.
    pub fn pending(digest: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Pending,
            digest: Some(digest.into()),
            effect: None,
            error: None,
        }
    }

    /// Whether the action took effect.
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

/// Result of re-checking a pending submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    /// The transaction committed.
    Succeeded(Option<serde_json::Value>),
    /// The transaction aborted.
    Failed(String),
    /// Still unknown.
    Unknown,
}

/// Protocol: Action Executor.
///
/// Turns a logical [`Action`] into a signed remote transaction, submits
/// it, and normalizes the remote system's success/failure encodings.
///
/// An `Err` means nothing was accepted remotely, so retrying is safe.
/// An `Ok` with [`OutcomeStatus::Pending`] means the submission was
/// accepted but its effect is unknown; callers must [`confirm`] rather
/// than resubmit to avoid paying for the action twice.
///
/// [`confirm`]: ActionExecutor::confirm
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute one action.
    async fn execute(&self, action: &Action) -> Result<ExecutionOutcome, ExecError>;

    /// Check on a submission that previously came back pending.
    async fn confirm(&self, digest: &str) -> Result<Confirmation, ExecError>;
}
