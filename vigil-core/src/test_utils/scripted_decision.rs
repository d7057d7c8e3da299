//! ScriptedDecision: a DecisionFn with canned answers.

use crate::decision::{Decision, DecisionFn, DecisionInput};
use crate::error::DecisionError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Answers with scripted results; waits once the script is empty.
pub struct ScriptedDecision {
    answers: Mutex<VecDeque<Result<Decision, DecisionError>>>,
    inputs: Mutex<Vec<DecisionInput>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedDecision {
    /// Create an empty script.
    pub fn new() -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            inputs: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue an answer.
    pub fn push(&self, answer: Result<Decision, DecisionError>) {
        self.answers.lock().unwrap().push_back(answer);
    }

    /// Number of `decide` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Inputs received, in call order.
    pub fn inputs(&self) -> Vec<DecisionInput> {
        self.inputs.lock().unwrap().clone()
    }
}

impl Default for ScriptedDecision {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionFn for ScriptedDecision {
    async fn decide(&self, input: &DecisionInput) -> Result<Decision, DecisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(input.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.answers.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Decision::wait("script exhausted")))
    }
}
