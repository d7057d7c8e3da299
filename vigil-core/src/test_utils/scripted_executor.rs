//! ScriptedExecutor: an ActionExecutor with canned outcomes.

use crate::action::{Action, ActionExecutor, Confirmation, ExecutionOutcome};
use crate::error::ExecError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Returns scripted outcomes in order; succeeds once the script is empty.
/// Records every executed action and tracks the peak number of
/// concurrent executions.
pub struct ScriptedExecutor {
    outcomes: Mutex<VecDeque<Result<ExecutionOutcome, ExecError>>>,
    confirmations: Mutex<VecDeque<Confirmation>>,
    executed: Mutex<Vec<Action>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedExecutor {
    /// Create an executor that always succeeds.
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            confirmations: Mutex::new(VecDeque::new()),
            executed: Mutex::new(Vec::new()),
            delay: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Sleep inside every execution.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue an outcome for the next execution.
    pub fn push(&self, outcome: Result<ExecutionOutcome, ExecError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Queue an answer for the next `confirm` call.
    pub fn push_confirmation(&self, confirmation: Confirmation) {
        self.confirmations.lock().unwrap().push_back(confirmation);
    }

    /// Actions executed so far.
    pub fn executed(&self) -> Vec<Action> {
        self.executed.lock().unwrap().clone()
    }

    /// Highest number of executions observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionExecutor for ScriptedExecutor {
    async fn execute(&self, action: &Action) -> Result<ExecutionOutcome, ExecError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.executed.lock().unwrap().push(action.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.outcomes.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        next.unwrap_or_else(|| Ok(ExecutionOutcome::succeeded(Some("digest".into()), None)))
    }

    async fn confirm(&self, _digest: &str) -> Result<Confirmation, ExecError> {
        Ok(self
            .confirmations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Confirmation::Unknown))
    }
}
