//! The delayed action scheduler.

use crate::backoff::Backoff;
use crate::entry::ScheduledAction;
use crate::error::ScheduleError;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use vigil_core::state::{self, Scope, StateStore};
use vigil_core::{
    Action, ActionExecutor, ActionKey, Clock, Confirmation, OutcomeStatus, SystemClock,
};

/// Lookups of an unconfirmed submission before it is treated as lost and
/// the action executes again.
pub const DEFAULT_CONFIRM_LIMIT: u32 = 10;

/// Summary of one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Entries attempted this tick.
    pub attempted: usize,
    /// Entries completed and removed.
    pub succeeded: usize,
    /// Attempts that failed and were rescheduled.
    pub failed: usize,
    /// Submissions still awaiting confirmation.
    pub pending: usize,
    /// Due entries skipped because an execution for the key was in flight.
    pub in_flight: usize,
}

#[derive(Default)]
struct Table {
    entries: BTreeMap<ActionKey, ScheduledAction>,
    in_flight: HashSet<ActionKey>,
}

/// What one attempt came to.
enum Attempt {
    Done(Option<serde_json::Value>),
    Failed(String),
    /// A fresh submission came back pending.
    Submitted(String),
    /// A lookup of the awaited submission had no verdict.
    StillUnknown { digest: String, checks: u32 },
}

/// Persistent "do this no earlier than then" table.
///
/// Invariants:
/// - at most one entry per key (first writer wins),
/// - an entry leaves the table only on success or [`cancel`](Scheduler::cancel),
/// - at most one execution per key is in flight,
/// - a submission that never confirms is executed again after
///   [`confirm_limit`](Scheduler::with_confirm_limit) lookups.
pub struct Scheduler {
    executor: Arc<dyn ActionExecutor>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    backoff: Backoff,
    confirm_limit: u32,
    table: Mutex<Table>,
    persist: tokio::sync::Mutex<()>,
}

impl Scheduler {
    /// Validate `backoff` and restore pending entries from `store`.
    pub async fn open(
        executor: Arc<dyn ActionExecutor>,
        store: Arc<dyn StateStore>,
        backoff: Backoff,
    ) -> Result<Self, ScheduleError> {
        Self::open_with_clock(executor, store, backoff, Arc::new(SystemClock)).await
    }

    /// Like [`open`](Self::open) with an explicit clock.
    pub async fn open_with_clock(
        executor: Arc<dyn ActionExecutor>,
        store: Arc<dyn StateStore>,
        backoff: Backoff,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ScheduleError> {
        backoff.validate()?;
        let mut table = Table::default();
        for key in store.list(&Scope::Schedule, "").await? {
            match state::load::<ScheduledAction>(store.as_ref(), &Scope::Schedule, &key).await {
                Ok(Some(entry)) => {
                    table.entries.insert(entry.key.clone(), entry);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "skipping unreadable scheduled action");
                }
            }
        }
        if !table.entries.is_empty() {
            tracing::info!(restored = table.entries.len(), "scheduled actions restored");
        }
        Ok(Self {
            executor,
            store,
            clock,
            backoff,
            confirm_limit: DEFAULT_CONFIRM_LIMIT,
            table: Mutex::new(table),
            persist: tokio::sync::Mutex::new(()),
        })
    }

    /// Give up on an unconfirmed submission after `limit` lookups without
    /// a verdict and execute the action again. At least one lookup is made.
    #[must_use]
    pub fn with_confirm_limit(mut self, limit: u32) -> Self {
        self.confirm_limit = limit.max(1);
        self
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule `action` under `key` for no earlier than `not_before_ms`.
    ///
    /// Returns false, changing nothing, when `key` already has a pending
    /// entry. A failed write is logged and the entry is kept in memory;
    /// the next attempt persists it again.
    pub async fn enqueue(&self, key: ActionKey, not_before_ms: u64, action: Action) -> bool {
        let entry = {
            let mut table = self.table();
            if table.entries.contains_key(&key) {
                tracing::debug!(key = %key, "action already scheduled, ignoring");
                return false;
            }
            let entry = ScheduledAction::new(key.clone(), not_before_ms, action, self.clock.now_ms());
            table.entries.insert(key.clone(), entry.clone());
            entry
        };
        tracing::info!(
            key = %key,
            action = %entry.action,
            not_before_ms,
            "action scheduled"
        );
        self.persist(&key).await;
        true
    }

    /// Remove the entry for `key`. Returns whether one existed. An attempt
    /// already in flight finishes but its result is discarded.
    pub async fn cancel(&self, key: &ActionKey) -> Result<bool, ScheduleError> {
        let _persist = self.persist.lock().await;
        let existed = self.table().entries.remove(key).is_some();
        if existed {
            self.store.delete(&Scope::Schedule, key.as_str()).await?;
            tracing::info!(key = %key, "scheduled action cancelled");
        }
        Ok(existed)
    }

    /// Snapshot of one entry.
    pub fn get(&self, key: &ActionKey) -> Option<ScheduledAction> {
        self.table().entries.get(key).cloned()
    }

    /// Snapshot of all entries, ordered by key.
    pub fn pending(&self) -> Vec<ScheduledAction> {
        self.table().entries.values().cloned().collect()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.table().entries.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attempt every due entry once.
    pub async fn tick(&self) -> ScheduleReport {
        let now = self.clock.now_ms();
        let mut report = ScheduleReport::default();
        let due: Vec<ScheduledAction> = {
            let mut table = self.table();
            let Table { entries, in_flight } = &mut *table;
            let mut due = Vec::new();
            for entry in entries.values().filter(|e| e.is_due(now)) {
                if in_flight.insert(entry.key.clone()) {
                    due.push(entry.clone());
                } else {
                    report.in_flight += 1;
                }
            }
            due
        };

        for entry in due {
            let _flight = InFlight {
                scheduler: self,
                key: entry.key.clone(),
            };
            report.attempted += 1;
            match self.attempt(&entry).await {
                Attempt::Done(effect) => {
                    report.succeeded += 1;
                    self.complete(&entry, effect).await;
                }
                Attempt::Failed(error) => {
                    report.failed += 1;
                    self.reschedule(&entry, None, error).await;
                }
                Attempt::Submitted(digest) => {
                    report.pending += 1;
                    let awaiting = Some((digest, 0));
                    self.reschedule(&entry, awaiting, "awaiting confirmation".into())
                        .await;
                }
                Attempt::StillUnknown { digest, checks } => {
                    report.pending += 1;
                    let awaiting = Some((digest, checks));
                    self.reschedule(&entry, awaiting, "awaiting confirmation".into())
                        .await;
                }
            }
        }
        report
    }

    async fn attempt(&self, entry: &ScheduledAction) -> Attempt {
        if let Some(digest) = &entry.awaiting {
            match self.executor.confirm(digest).await {
                Ok(Confirmation::Succeeded(effect)) => return Attempt::Done(effect),
                Ok(Confirmation::Failed(error)) => return Attempt::Failed(error),
                Ok(Confirmation::Unknown) => {}
                Err(err) => {
                    tracing::warn!(key = %entry.key, digest = %digest, error = %err, "confirmation failed");
                }
            }
            let checks = entry.unconfirmed_checks.saturating_add(1);
            if checks < self.confirm_limit {
                return Attempt::StillUnknown {
                    digest: digest.clone(),
                    checks,
                };
            }
            tracing::warn!(
                key = %entry.key,
                action = %entry.action,
                digest = %digest,
                checks,
                "submission never confirmed, executing again"
            );
        }
        match self.executor.execute(&entry.action).await {
            Ok(outcome) => match outcome.status {
                OutcomeStatus::Succeeded => Attempt::Done(outcome.effect),
                OutcomeStatus::Failed => Attempt::Failed(
                    outcome
                        .error
                        .unwrap_or_else(|| "transaction failed without error text".into()),
                ),
                OutcomeStatus::Pending => match outcome.digest {
                    Some(digest) => Attempt::Submitted(digest),
                    None => Attempt::Failed("pending outcome without a digest".into()),
                },
            },
            Err(err) => Attempt::Failed(err.to_string()),
        }
    }

    async fn complete(&self, entry: &ScheduledAction, effect: Option<serde_json::Value>) {
        let _persist = self.persist.lock().await;
        if self.table().entries.remove(&entry.key).is_none() {
            return;
        }
        tracing::info!(
            key = %entry.key,
            action = %entry.action,
            attempts = entry.attempts + 1,
            effect = ?effect,
            "scheduled action completed"
        );
        if let Err(err) = self.store.delete(&Scope::Schedule, entry.key.as_str()).await {
            tracing::warn!(key = %entry.key, error = %err, "failed to delete completed action");
        }
    }

    /// Count a non-final attempt. `awaiting` carries the digest to look up
    /// next time and how many lookups of it found nothing.
    async fn reschedule(
        &self,
        entry: &ScheduledAction,
        awaiting: Option<(String, u32)>,
        error: String,
    ) {
        let now = self.clock.now_ms();
        {
            let mut table = self.table();
            let Some(current) = table.entries.get_mut(&entry.key) else {
                return;
            };
            current.attempts = current.attempts.saturating_add(1);
            let delay = self.backoff.delay(current.attempts);
            current.next_retry_at_ms = delay.after(now).max(current.next_retry_at_ms);
            let (awaiting, checks) = match awaiting {
                Some((digest, checks)) => (Some(digest), checks),
                None => (None, 0),
            };
            current.awaiting = awaiting;
            current.unconfirmed_checks = checks;
            current.last_error = Some(error.clone());
            if current.awaiting.is_some() {
                tracing::info!(
                    key = %entry.key,
                    attempts = current.attempts,
                    digest = current.awaiting.as_deref().unwrap_or_default(),
                    unconfirmed_checks = current.unconfirmed_checks,
                    next_retry_at_ms = current.next_retry_at_ms,
                    "submission accepted, awaiting confirmation"
                );
            } else {
                tracing::warn!(
                    key = %entry.key,
                    action = %current.action,
                    attempts = current.attempts,
                    retry_in = %delay,
                    error = %error,
                    "scheduled action failed, will retry"
                );
            }
        }
        self.persist(&entry.key).await;
    }

    /// Write the current in-memory entry for `key`, if it still exists.
    async fn persist(&self, key: &ActionKey) {
        let _persist = self.persist.lock().await;
        let Some(entry) = self.get(key) else {
            return;
        };
        if let Err(err) = state::save(self.store.as_ref(), &Scope::Schedule, key.as_str(), &entry).await
        {
            tracing::warn!(key = %key, error = %err, "failed to persist scheduled action");
        }
    }
}

/// Clears a key's in-flight mark when its attempt ends.
struct InFlight<'a> {
    scheduler: &'a Scheduler,
    key: ActionKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.scheduler.table().in_flight.remove(&self.key);
    }
}
