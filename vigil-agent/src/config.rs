//! Agent configuration: one persona, one struct.

use crate::error::AgentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vigil_core::{DurationMs, ObjectId, to_base_units};

/// Default heartbeat between fallback cycles.
pub const DEFAULT_HEARTBEAT: DurationMs = DurationMs::from_secs(15);

/// Default limit on one decision function call.
pub const DEFAULT_DECISION_TIMEOUT: DurationMs = DurationMs::from_secs(30);

/// When and where to move winnings out of the agent wallet.
///
/// A withdrawal leaves `threshold` coins behind and is skipped when the
/// excess is not above `margin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WithdrawPolicy {
    /// Balance to keep, in coin units. Zero or less disables withdrawal.
    pub threshold: Decimal,
    /// Receiving address. `None` disables withdrawal.
    pub destination: Option<String>,
    /// Minimum excess worth a transaction, in coin units.
    pub margin: Decimal,
}

impl WithdrawPolicy {
    /// A policy that never withdraws.
    pub fn disabled() -> Self {
        Self {
            threshold: Decimal::ZERO,
            destination: None,
            margin: Decimal::new(1, 1),
        }
    }

    /// Keep `threshold` coins and send the rest to `destination`.
    pub fn new(threshold: Decimal, destination: impl Into<String>) -> Self {
        Self {
            threshold,
            destination: Some(destination.into()),
            ..Self::disabled()
        }
    }

    /// Override the minimum excess.
    #[must_use]
    pub fn with_margin(mut self, margin: Decimal) -> Self {
        self.margin = margin;
        self
    }

    /// Whether the policy can ever produce a withdrawal.
    pub fn is_enabled(&self) -> bool {
        self.threshold > Decimal::ZERO
            && self.destination.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    /// Base units to withdraw at `balance` coins, if any.
    pub fn amount_for(&self, balance: Decimal) -> Option<u64> {
        if !self.is_enabled() || balance < self.threshold {
            return None;
        }
        let excess = balance - self.threshold;
        if excess <= self.margin {
            return None;
        }
        Some(to_base_units(excess)).filter(|amount| *amount > 0)
    }
}

impl Default for WithdrawPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

fn default_heartbeat() -> DurationMs {
    DEFAULT_HEARTBEAT
}

fn default_decision_timeout() -> DurationMs {
    DEFAULT_DECISION_TIMEOUT
}

/// A parameterized agent persona.
///
/// Personas differ only in data. Build one with [`AgentConfig::new`] and
/// the builder methods, or deserialize it from the process configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name used in logs and for on-chain registration.
    pub name: String,
    /// Wallet address the agent acts from.
    pub address: String,
    /// Persona line for the decision function.
    #[serde(default)]
    pub identity: String,
    /// Code of conduct for the decision function.
    #[serde(default)]
    pub strategy_prompt: String,
    /// Interval between heartbeat cycles.
    #[serde(default = "default_heartbeat", rename = "heartbeat_ms")]
    pub heartbeat: DurationMs,
    /// Limit on one decision function call.
    #[serde(default = "default_decision_timeout", rename = "decision_timeout_ms")]
    pub decision_timeout: DurationMs,
    /// Withdrawal policy.
    #[serde(default)]
    pub withdraw: WithdrawPolicy,
    /// Targets known before any event arrives.
    #[serde(default)]
    pub targets: Vec<ObjectId>,
    /// Register the wallet in the arena before the first cycle.
    #[serde(default)]
    pub register: bool,
}

impl AgentConfig {
    /// A persona acting from `address`, with defaults for everything else.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            identity: String::new(),
            strategy_prompt: String::new(),
            heartbeat: DEFAULT_HEARTBEAT,
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
            withdraw: WithdrawPolicy::disabled(),
            targets: Vec::new(),
            register: false,
        }
    }

    /// Set the persona line.
    #[must_use]
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Set the code of conduct.
    #[must_use]
    pub fn strategy_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.strategy_prompt = prompt.into();
        self
    }

    /// Set the heartbeat interval.
    #[must_use]
    pub fn heartbeat(mut self, interval: DurationMs) -> Self {
        self.heartbeat = interval;
        self
    }

    /// Set the decision timeout.
    #[must_use]
    pub fn decision_timeout(mut self, timeout: DurationMs) -> Self {
        self.decision_timeout = timeout;
        self
    }

    /// Set the withdrawal policy.
    #[must_use]
    pub fn withdraw(mut self, policy: WithdrawPolicy) -> Self {
        self.withdraw = policy;
        self
    }

    /// Add a target known up front.
    #[must_use]
    pub fn target(mut self, id: impl Into<ObjectId>) -> Self {
        self.targets.push(id.into());
        self
    }

    /// Register on start.
    #[must_use]
    pub fn register_on_start(mut self, register: bool) -> Self {
        self.register = register;
        self
    }

    /// Reject configurations the loop cannot run with.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.name.trim().is_empty() {
            return Err(AgentError::FatalConfig("agent name is empty".into()));
        }
        if self.address.trim().is_empty() {
            return Err(AgentError::FatalConfig(format!(
                "agent {} has no address",
                self.name
            )));
        }
        if self.heartbeat.is_zero() {
            return Err(AgentError::FatalConfig(format!(
                "agent {} has a zero heartbeat",
                self.name
            )));
        }
        if self.decision_timeout.is_zero() {
            return Err(AgentError::FatalConfig(format!(
                "agent {} has a zero decision timeout",
                self.name
            )));
        }
        if self.withdraw.margin < Decimal::ZERO {
            return Err(AgentError::FatalConfig(format!(
                "agent {} has a negative withdrawal margin",
                self.name
            )));
        }
        Ok(())
    }
}
