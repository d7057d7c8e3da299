//! The decision loop: one guarded cycle, two triggers.

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::heuristic::HeuristicDecision;
use crate::session::AgentSession;
use crate::view::LedgerView;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use vigil_core::{
    Action, ActionExecutor, Decision, DecisionAction, DecisionError, DecisionFn, DecisionInput,
    Event, EventHandler, ExecError, ExecutionOutcome, HandlerError, ObjectId, OutcomeStatus,
};

/// Event type that wakes an agent.
pub const COMBAT_EVENT: &str = "CombatEvent";

/// What one call to [`DecisionLoop::run_cycle`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Another cycle was running; nothing happened.
    pub skipped: bool,
    /// The decision that was acted on.
    pub decision: Option<Decision>,
    /// The decision came from the heuristic after the configured
    /// decision function failed.
    pub fell_back: bool,
    /// Actions accepted by the executor.
    pub submitted: Vec<Action>,
    /// Actions the executor reported as failed.
    pub failed: Vec<Action>,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Runs decision cycles for one agent.
///
/// A cycle reads the battlefield, asks the decision function, and maps
/// its answer onto the executor: `ATTACK` submits an attack and then
/// re-checks the withdrawal policy, `WITHDRAW` applies the policy, `WAIT`
/// does nothing. Decision function errors, timeouts and invalid answers
/// fall back to [`HeuristicDecision`].
///
/// At most one cycle runs at a time. A cycle requested while another is
/// in flight returns a skipped report immediately. The busy flag is
/// released however the cycle ends.
pub struct DecisionLoop {
    config: AgentConfig,
    session: AgentSession,
    view: Arc<LedgerView>,
    decision: Arc<dyn DecisionFn>,
    executor: Arc<dyn ActionExecutor>,
}

impl DecisionLoop {
    /// Assemble a loop.
    pub fn new(
        config: AgentConfig,
        view: Arc<LedgerView>,
        decision: Arc<dyn DecisionFn>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        let session = AgentSession::new(
            config.identity.clone(),
            config.address.clone(),
            config.withdraw.clone(),
        );
        Self {
            config,
            session,
            view,
            decision,
            executor,
        }
    }

    /// The persona this loop runs.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Runtime state.
    pub fn session(&self) -> &AgentSession {
        &self.session
    }

    /// The battlefield view.
    pub fn view(&self) -> &Arc<LedgerView> {
        &self.view
    }

    /// Register the wallet in the arena if the persona asks for it.
    pub async fn register(&self) -> Result<Option<ExecutionOutcome>, AgentError> {
        if !self.config.register {
            return Ok(None);
        }
        let action = Action::Register {
            name: self.config.name.clone(),
        };
        let outcome = self.executor.execute(&action).await?;
        match outcome.status {
            OutcomeStatus::Failed => tracing::warn!(
                agent = %self.config.name,
                error = outcome.error.as_deref().unwrap_or_default(),
                "registration failed"
            ),
            _ => tracing::info!(
                agent = %self.config.name,
                digest = outcome.digest.as_deref().unwrap_or_default(),
                "registered"
            ),
        }
        Ok(Some(outcome))
    }

    /// Run one guarded cycle.
    pub async fn run_cycle(&self, trigger: &str) -> Result<CycleReport, AgentError> {
        let Some(_busy) = self.session.try_begin() else {
            tracing::debug!(agent = %self.config.name, trigger, "cycle already running, dropped");
            return Ok(CycleReport::skipped());
        };

        let input = self.view.snapshot().await?;
        let (decision, fell_back) = self.decide(&input).await;
        tracing::info!(
            agent = %self.config.name,
            trigger,
            action = ?decision.action,
            target_id = decision.target_id.as_deref().unwrap_or_default(),
            fell_back,
            reason = %decision.reason,
            "decided"
        );

        let mut report = CycleReport {
            decision: Some(decision.clone()),
            fell_back,
            ..CycleReport::default()
        };

        match decision.action {
            DecisionAction::Attack => {
                let Some(target) = decision.target_id else {
                    return Ok(report);
                };
                let action = Action::Attack {
                    target_id: ObjectId::new(target),
                };
                if self.submit(action, &mut report).await? {
                    match self.view.balance().await {
                        Ok(balance) => self.withdraw_excess(balance, &mut report).await?,
                        Err(err) => tracing::warn!(
                            agent = %self.config.name,
                            error = %err,
                            "balance check after attack failed"
                        ),
                    }
                }
            }
            DecisionAction::Withdraw => self.withdraw_excess(input.balance, &mut report).await?,
            DecisionAction::Wait => {}
        }
        Ok(report)
    }

    async fn decide(&self, input: &DecisionInput) -> (Decision, bool) {
        let timeout = self.config.decision_timeout;
        let answer = match tokio::time::timeout(timeout.to_std(), self.decision.decide(input)).await
        {
            Ok(answer) => answer,
            Err(_) => Err(DecisionError::Timeout(timeout)),
        };
        let checked = answer.and_then(|d| d.validate(input).map(|()| d));
        match checked {
            Ok(decision) => (decision, false),
            Err(err) => {
                tracing::warn!(
                    agent = %self.config.name,
                    error = %err,
                    "decision function failed, using heuristic"
                );
                (HeuristicDecision::choose(input), true)
            }
        }
    }

    /// Execute `action`. Returns whether it is known to have succeeded.
    async fn submit(&self, action: Action, report: &mut CycleReport) -> Result<bool, AgentError> {
        match self.executor.execute(&action).await {
            Ok(outcome) => match outcome.status {
                OutcomeStatus::Succeeded => {
                    tracing::info!(
                        agent = %self.config.name,
                        action = %action,
                        digest = outcome.digest.as_deref().unwrap_or_default(),
                        "action succeeded"
                    );
                    report.submitted.push(action);
                    Ok(true)
                }
                OutcomeStatus::Pending => {
                    tracing::info!(
                        agent = %self.config.name,
                        action = %action,
                        digest = outcome.digest.as_deref().unwrap_or_default(),
                        "action accepted, status unknown"
                    );
                    report.submitted.push(action);
                    Ok(false)
                }
                OutcomeStatus::Failed => {
                    tracing::warn!(
                        agent = %self.config.name,
                        action = %action,
                        error = outcome.error.as_deref().unwrap_or_default(),
                        "action failed"
                    );
                    report.failed.push(action);
                    Ok(false)
                }
            },
            Err(err @ ExecError::FatalConfig(_)) => Err(err.into()),
            Err(err) => {
                tracing::warn!(
                    agent = %self.config.name,
                    action = %action,
                    error = %err,
                    "action failed"
                );
                report.failed.push(action);
                Ok(false)
            }
        }
    }

    async fn withdraw_excess(
        &self,
        balance: Decimal,
        report: &mut CycleReport,
    ) -> Result<(), AgentError> {
        let policy = self.session.withdraw_policy();
        let (Some(amount), Some(destination)) =
            (policy.amount_for(balance), policy.destination.clone())
        else {
            tracing::debug!(agent = %self.config.name, %balance, "no withdrawal due");
            return Ok(());
        };
        tracing::info!(
            agent = %self.config.name,
            %balance,
            threshold = %policy.threshold,
            "balance above threshold, withdrawing"
        );
        self.submit(
            Action::Withdraw {
                destination,
                amount,
            },
            report,
        )
        .await?;
        Ok(())
    }
}

/// Wakes a [`DecisionLoop`] on every combat event.
///
/// The cycle runs on its own task so the dispatcher is never held up by
/// a slow decision. Events arriving while a cycle runs are dropped by
/// the loop's busy guard.
pub struct CycleTrigger {
    agent: Arc<DecisionLoop>,
    types: Vec<String>,
}

impl CycleTrigger {
    /// Trigger cycles of `agent`.
    pub fn new(agent: Arc<DecisionLoop>) -> Self {
        Self {
            agent,
            types: vec![COMBAT_EVENT.to_owned()],
        }
    }
}

#[async_trait]
impl EventHandler for CycleTrigger {
    fn name(&self) -> &str {
        "cycle-trigger"
    }

    fn event_types(&self) -> &[String] {
        &self.types
    }

    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        self.agent.session().observe_event(event.timestamp_ms);
        if event.field_bool("is_kill").unwrap_or(false) {
            tracing::info!(
                agent = %self.agent.config().name,
                target_id = event.field_str("boss_id").unwrap_or_default(),
                attacker = event.field_str("attacker").unwrap_or_default(),
                "target defeated"
            );
        }
        let agent = Arc::clone(&self.agent);
        let trigger = format!("event {}", event.id);
        tokio::spawn(async move {
            if let Err(err) = agent.run_cycle(&trigger).await {
                tracing::warn!(
                    agent = %agent.config().name,
                    trigger = %trigger,
                    error = %err,
                    "event-triggered cycle failed"
                );
            }
        });
        Ok(())
    }
}
