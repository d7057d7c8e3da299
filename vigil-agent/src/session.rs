//! Per-agent runtime state.

use crate::config::WithdrawPolicy;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// State owned by one running agent for the life of the process.
#[derive(Debug)]
pub struct AgentSession {
    identity: String,
    address: String,
    busy: AtomicBool,
    last_event_ms: AtomicU64,
    withdraw: WithdrawPolicy,
}

impl AgentSession {
    /// A fresh, idle session.
    pub fn new(
        identity: impl Into<String>,
        address: impl Into<String>,
        withdraw: WithdrawPolicy,
    ) -> Self {
        Self {
            identity: identity.into(),
            address: address.into(),
            busy: AtomicBool::new(false),
            last_event_ms: AtomicU64::new(0),
            withdraw,
        }
    }

    /// Persona line.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Wallet address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Withdrawal policy.
    pub fn withdraw_policy(&self) -> &WithdrawPolicy {
        &self.withdraw
    }

    /// Whether a cycle is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Timestamp of the newest event that triggered this agent.
    pub fn last_event_ms(&self) -> u64 {
        self.last_event_ms.load(Ordering::SeqCst)
    }

    /// Record an event timestamp. The watermark never moves backwards.
    pub fn observe_event(&self, timestamp_ms: u64) {
        self.last_event_ms.fetch_max(timestamp_ms, Ordering::SeqCst);
    }

    /// Claim the session for one cycle. `None` if a cycle is running.
    pub(crate) fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: &self.busy })
    }
}

/// Clears the busy flag on drop, however the cycle ends.
pub(crate) struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
