use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use vigil_agent::{
    AgentConfig, CycleTrigger, DecisionLoop, LedgerView, TargetTracker, WithdrawPolicy,
};
use vigil_core::test_utils::{MockLedger, ScriptedDecision, ScriptedExecutor, event};
use vigil_core::{
    Action, Decision, DecisionAction, DecisionError, DurationMs, EventHandler, ExecError,
    ExecutionOutcome, ObjectId, BASE_UNITS_PER_COIN,
};

const AGENT: &str = "0xagent";

struct Harness {
    ledger: Arc<MockLedger>,
    decision: Arc<ScriptedDecision>,
    exec: Arc<ScriptedExecutor>,
    agent: Arc<DecisionLoop>,
}

fn coins(n: u64) -> u128 {
    u128::from(n) * u128::from(BASE_UNITS_PER_COIN)
}

fn boss(ledger: &MockLedger, id: &str, cost_coins: u64, hp: u64) {
    ledger.put_object(
        id,
        json!({
            "name": format!("boss-{id}"),
            "hp": hp.to_string(),
            "max_hp": "1000",
            "attack_cost": (cost_coins * BASE_UNITS_PER_COIN).to_string(),
            "pool": "0",
            "is_alive": hp > 0
        }),
    );
}

fn harness_with(config: AgentConfig, decision: ScriptedDecision) -> Harness {
    let ledger = Arc::new(MockLedger::new());
    let decision = Arc::new(decision);
    let exec = Arc::new(ScriptedExecutor::new());
    let view = Arc::new(LedgerView::new(
        ledger.clone(),
        AGENT,
        config.targets.clone(),
    ));
    let agent = Arc::new(DecisionLoop::new(
        config,
        view,
        decision.clone(),
        exec.clone(),
    ));
    Harness {
        ledger,
        decision,
        exec,
        agent,
    }
}

fn harness(config: AgentConfig) -> Harness {
    harness_with(config, ScriptedDecision::new())
}

fn config() -> AgentConfig {
    AgentConfig::new("warrior", AGENT).identity("Reckless and Brave Warrior")
}

fn attack(id: &str) -> Action {
    Action::Attack {
        target_id: ObjectId::new(id),
    }
}

// ━━━ Heuristic fallback ━━━

#[tokio::test]
async fn low_balance_under_threshold_waits_instead_of_withdrawing() {
    let h = harness(config().withdraw(WithdrawPolicy::new(Decimal::from(50), "0xvault")));
    h.ledger.set_balance(AGENT, coins(5));
    h.decision
        .push(Err(DecisionError::Unavailable("no api key".into())));

    let report = h.agent.run_cycle("heartbeat").await.unwrap();

    let decision = report.decision.unwrap();
    assert_eq!(decision.action, DecisionAction::Wait);
    assert!(report.fell_back);
    assert!(h.exec.executed().is_empty());
}

#[tokio::test]
async fn heuristic_attacks_first_affordable_target() {
    let h = harness(config().target("0xa").target("0xb"));
    boss(&h.ledger, "0xa", 1, 500);
    boss(&h.ledger, "0xb", 2, 500);
    h.ledger.set_balance(AGENT, coins(1));
    h.decision
        .push(Err(DecisionError::Transport("connection refused".into())));

    let report = h.agent.run_cycle("heartbeat").await.unwrap();

    assert!(report.fell_back);
    assert_eq!(h.exec.executed(), vec![attack("0xa")]);
    assert_eq!(report.submitted, vec![attack("0xa")]);
}

#[tokio::test]
async fn heuristic_waits_when_first_target_costs_too_much() {
    let h = harness(config().target("0xa").target("0xb"));
    boss(&h.ledger, "0xa", 2, 500);
    boss(&h.ledger, "0xb", 1, 500);
    h.ledger.set_balance(AGENT, coins(1));
    h.decision
        .push(Err(DecisionError::Malformed("not json".into())));

    let report = h.agent.run_cycle("heartbeat").await.unwrap();

    assert_eq!(report.decision.unwrap().action, DecisionAction::Wait);
    assert!(h.exec.executed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_decision_times_out_into_heuristic() {
    let h = harness_with(
        config()
            .target("0xa")
            .decision_timeout(DurationMs::from_secs(1)),
        ScriptedDecision::new().with_delay(Duration::from_secs(60)),
    );
    boss(&h.ledger, "0xa", 1, 500);
    h.ledger.set_balance(AGENT, coins(3));

    let report = h.agent.run_cycle("heartbeat").await.unwrap();

    assert!(report.fell_back);
    assert_eq!(h.exec.executed(), vec![attack("0xa")]);
}

#[tokio::test]
async fn attack_on_unknown_target_falls_back() {
    let h = harness(config().target("0xa"));
    boss(&h.ledger, "0xa", 1, 500);
    h.ledger.set_balance(AGENT, coins(3));
    h.decision
        .push(Ok(Decision::attack("0xghost", "it looks weak")));

    let report = h.agent.run_cycle("heartbeat").await.unwrap();

    assert!(report.fell_back);
    assert_eq!(h.exec.executed(), vec![attack("0xa")]);
}

// ━━━ Decision mapping ━━━

#[tokio::test]
async fn decision_function_choice_is_followed() {
    let h = harness(config().target("0xa").target("0xb"));
    boss(&h.ledger, "0xa", 1, 500);
    boss(&h.ledger, "0xb", 1, 50);
    h.ledger.set_balance(AGENT, coins(3));
    h.decision
        .push(Ok(Decision::attack("0xb", "low hp, go for the kill")));

    let report = h.agent.run_cycle("heartbeat").await.unwrap();

    assert!(!report.fell_back);
    assert_eq!(h.exec.executed(), vec![attack("0xb")]);
    let inputs = h.decision.inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].open_targets.len(), 2);
    assert_eq!(inputs[0].balance, Decimal::from(3));
}

#[tokio::test]
async fn dead_targets_are_not_offered() {
    let h = harness(config().target("0xa").target("0xb"));
    boss(&h.ledger, "0xa", 1, 0);
    boss(&h.ledger, "0xb", 1, 10);
    h.ledger.set_balance(AGENT, coins(3));

    h.agent.run_cycle("heartbeat").await.unwrap();

    let inputs = h.decision.inputs();
    let ids: Vec<&str> = inputs[0].open_targets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["0xb"]);
}

#[tokio::test]
async fn wait_does_nothing() {
    let h = harness(config().target("0xa"));
    boss(&h.ledger, "0xa", 1, 500);
    h.ledger.set_balance(AGENT, coins(3));
    h.decision.push(Ok(Decision::wait("hp too high")));

    let report = h.agent.run_cycle("heartbeat").await.unwrap();

    assert!(!report.fell_back);
    assert!(h.exec.executed().is_empty());
}

#[tokio::test]
async fn successful_attack_withdraws_excess() {
    let h = harness(
        config()
            .target("0xa")
            .withdraw(WithdrawPolicy::new(Decimal::from(50), "0xvault")),
    );
    boss(&h.ledger, "0xa", 1, 500);
    h.ledger.set_balance(AGENT, coins(62));
    h.decision.push(Ok(Decision::attack("0xa", "attack")));

    h.agent.run_cycle("heartbeat").await.unwrap();

    assert_eq!(
        h.exec.executed(),
        vec![
            attack("0xa"),
            Action::Withdraw {
                destination: "0xvault".into(),
                amount: 12 * BASE_UNITS_PER_COIN,
            },
        ]
    );
}

#[tokio::test]
async fn failed_attack_skips_withdrawal() {
    let h = harness(
        config()
            .target("0xa")
            .withdraw(WithdrawPolicy::new(Decimal::from(50), "0xvault")),
    );
    boss(&h.ledger, "0xa", 1, 500);
    h.ledger.set_balance(AGENT, coins(62));
    h.decision.push(Ok(Decision::attack("0xa", "attack")));
    h.exec
        .push(Ok(ExecutionOutcome::failed(Some("tx-1".into()), "BossDead")));

    let report = h.agent.run_cycle("heartbeat").await.unwrap();

    assert_eq!(report.failed, vec![attack("0xa")]);
    assert!(report.submitted.is_empty());
    assert_eq!(h.exec.executed().len(), 1);
}

#[tokio::test]
async fn withdraw_decision_below_threshold_is_a_no_op() {
    let h = harness(config().withdraw(WithdrawPolicy::new(Decimal::from(50), "0xvault")));
    h.ledger.set_balance(AGENT, coins(5));
    h.decision.push(Ok(Decision::withdraw("cash out")));

    let report = h.agent.run_cycle("heartbeat").await.unwrap();

    assert_eq!(report.decision.unwrap().action, DecisionAction::Withdraw);
    assert!(h.exec.executed().is_empty());
}

#[tokio::test]
async fn withdraw_decision_above_threshold_transfers_excess() {
    let h = harness(config().withdraw(WithdrawPolicy::new(Decimal::from(50), "0xvault")));
    h.ledger.set_balance(AGENT, coins(80));
    h.decision.push(Ok(Decision::withdraw("cash out")));

    h.agent.run_cycle("heartbeat").await.unwrap();

    assert_eq!(
        h.exec.executed(),
        vec![Action::Withdraw {
            destination: "0xvault".into(),
            amount: 30 * BASE_UNITS_PER_COIN,
        }]
    );
}

// ━━━ Busy guard ━━━

#[tokio::test(start_paused = true)]
async fn second_cycle_while_busy_is_dropped() {
    let h = harness_with(
        config().target("0xa"),
        ScriptedDecision::new().with_delay(Duration::from_secs(5)),
    );
    boss(&h.ledger, "0xa", 1, 500);
    h.ledger.set_balance(AGENT, coins(3));

    let agent = h.agent.clone();
    let first = tokio::spawn(async move { agent.run_cycle("heartbeat").await });
    for _ in 0..10 {
        if h.agent.session().is_busy() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(h.agent.session().is_busy());

    let second = h.agent.run_cycle("event").await.unwrap();
    assert!(second.skipped);
    assert!(second.decision.is_none());

    let first = first.await.unwrap().unwrap();
    assert!(!first.skipped);
    assert_eq!(h.decision.calls(), 1);
    assert!(!h.agent.session().is_busy());
}

#[tokio::test]
async fn busy_is_cleared_after_decision_error() {
    let h = harness(config());
    h.decision
        .push(Err(DecisionError::Transport("boom".into())));

    h.agent.run_cycle("heartbeat").await.unwrap();

    assert!(!h.agent.session().is_busy());
}

#[tokio::test]
async fn busy_is_cleared_after_fatal_execution_error() {
    let h = harness(config().target("0xa"));
    boss(&h.ledger, "0xa", 1, 500);
    h.ledger.set_balance(AGENT, coins(3));
    h.decision.push(Ok(Decision::attack("0xa", "attack")));
    h.exec
        .push(Err(ExecError::FatalConfig("arena id missing".into())));

    let err = h.agent.run_cycle("heartbeat").await.unwrap_err();

    assert!(err.is_fatal());
    assert!(!h.agent.session().is_busy());
    let next = h.agent.run_cycle("heartbeat").await.unwrap();
    assert!(!next.skipped);
}

// ━━━ Registration ━━━

#[tokio::test]
async fn registration_runs_only_when_configured() {
    let h = harness(config());
    assert!(h.agent.register().await.unwrap().is_none());
    assert!(h.exec.executed().is_empty());

    let h = harness(config().register_on_start(true));
    let outcome = h.agent.register().await.unwrap().unwrap();
    assert!(outcome.is_success());
    assert_eq!(
        h.exec.executed(),
        vec![Action::Register {
            name: "warrior".into()
        }]
    );
}

// ━━━ Event triggers ━━━

#[tokio::test]
async fn tracker_learns_targets_from_events() {
    let h = harness(config());
    boss(&h.ledger, "0xnew", 1, 500);
    h.ledger.set_balance(AGENT, coins(3));
    let tracker = TargetTracker::new(h.agent.view().clone());

    let created = event("tx1", 0, "BossCreated", 100, json!({"boss_id": "0xnew"}));
    assert!(tracker.accepts(&created));
    tracker.handle(&created).await.unwrap();
    tracker.handle(&created).await.unwrap();

    assert_eq!(h.agent.view().known(), vec![ObjectId::new("0xnew")]);
    let input = h.agent.view().snapshot().await.unwrap();
    assert_eq!(input.open_targets.len(), 1);
}

#[tokio::test]
async fn vanished_targets_are_forgotten() {
    let h = harness(config().target("0xgone").target("0xa"));
    boss(&h.ledger, "0xa", 1, 500);

    let input = h.agent.view().snapshot().await.unwrap();

    assert_eq!(input.open_targets.len(), 1);
    assert_eq!(h.agent.view().known(), vec![ObjectId::new("0xa")]);
}

#[tokio::test]
async fn combat_event_triggers_a_cycle() {
    let h = harness(config().target("0xa"));
    boss(&h.ledger, "0xa", 1, 500);
    h.ledger.set_balance(AGENT, coins(3));
    h.decision.push(Ok(Decision::attack("0xa", "join the fight")));
    let trigger = CycleTrigger::new(h.agent.clone());

    let hit = event(
        "tx9",
        0,
        "CombatEvent",
        4_200,
        json!({"boss_id": "0xa", "attacker": "0xother", "damage": "40", "is_kill": false}),
    );
    assert!(trigger.accepts(&hit));
    trigger.handle(&hit).await.unwrap();

    for _ in 0..50 {
        if !h.exec.executed().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.exec.executed(), vec![attack("0xa")]);
    assert_eq!(h.agent.session().last_event_ms(), 4_200);
}

#[tokio::test]
async fn reward_events_do_not_trigger_cycles() {
    let h = harness(config());
    let trigger = CycleTrigger::new(h.agent.clone());
    let reward = event("tx9", 1, "RewardEvent", 10, json!({"boss_id": "0xa"}));
    assert!(!trigger.accepts(&reward));
}
