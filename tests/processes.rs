//! Whole processes over an in-memory ledger.
//!
//! Each test starts a [`Runtime`] the way the `vigil` binary does, with
//! the ledger, store and clock swapped for test doubles, and lets the
//! tick loops run on paused tokio time.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use vigil::config::{LayoutSection, OracleSection};
use vigil::{LoopExit, Mode, Runtime, Services, StartFrom, VigilConfig};
use vigil_agent::AgentConfig;
use vigil_core::test_utils::{ManualClock, MockLedger, event};
use vigil_core::{Call, DurationMs};
use vigil_state_memory::MemoryStore;

fn config() -> VigilConfig {
    VigilConfig {
        package_id: "0xpkg".into(),
        start_from: StartFrom::Beginning,
        layout: LayoutSection {
            admin_cap_id: Some("0xcap".into()),
            arena_id: Some("0xarena".into()),
            ..LayoutSection::default()
        },
        oracle: OracleSection {
            signer_address: Some("0xadmin".into()),
        },
        ..VigilConfig::default()
    }
}

fn services(ledger: &Arc<MockLedger>, clock: &Arc<ManualClock>) -> Services {
    Services {
        ledger: ledger.clone(),
        store: Arc::new(MemoryStore::new()),
        clock: clock.clone(),
    }
}

fn targets(ledger: &MockLedger) -> Vec<String> {
    ledger
        .submissions()
        .iter()
        .flat_map(|s| s.calls.iter())
        .filter_map(|call| match call {
            Call::Move { target, .. } => Some(target.clone()),
            _ => None,
        })
        .collect()
}

fn assert_all_stopped(exits: Vec<(String, LoopExit)>) {
    for (name, exit) in exits {
        assert_eq!(exit, LoopExit::Stopped, "loop {name}");
    }
}

// ━━━ Oracle process ━━━

#[tokio::test(start_paused = true)]
async fn oracle_respawns_a_boss_killed_twice_exactly_once() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    ledger.put_object(
        "0xb",
        json!({
            "name": "Kraken",
            "difficulty": "Hard",
            "hp": "0",
            "max_hp": "1000",
            "attack_cost": "50000000",
            "is_alive": false
        }),
    );
    let kill = event(
        "D1",
        0,
        "CombatEvent",
        100,
        json!({"boss_id": "0xb", "damage": "1000", "remaining_hp": "0", "is_kill": true}),
    );
    ledger.emit(kill.clone());
    ledger.emit(kill);

    let runtime = Runtime::start_with(Mode::Oracle, &config(), &services(&ledger, &clock))
        .await
        .unwrap();
    assert_eq!(runtime.loop_names(), vec!["oracle", "scheduler"]);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(ledger.submissions().is_empty(), "respawn ran before its delay");

    clock.set(100 + 30_000);
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(targets(&ledger), vec!["0xpkg::boss_battle::create_boss"]);

    assert_all_stopped(runtime.shutdown().await);
}

// ━━━ Indexer process ━━━

#[tokio::test(start_paused = true)]
async fn indexer_runs_one_loop_and_stops_cleanly() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    ledger.emit(event(
        "D1",
        0,
        "RewardEvent",
        10,
        json!({"boss_id": "0xb", "winner": "0xa", "amount": "1000000000"}),
    ));

    let runtime = Runtime::start_with(Mode::Index, &config(), &services(&ledger, &clock))
        .await
        .unwrap();
    assert_eq!(runtime.loop_names(), vec!["indexer"]);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(ledger.submissions().is_empty());
    assert_all_stopped(runtime.shutdown().await);
}

// ━━━ Agent process ━━━

#[tokio::test(start_paused = true)]
async fn agent_registers_then_heartbeats() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    let mut config = config();
    config.agents = vec![
        AgentConfig::new("warrior", "0xwarrior")
            .heartbeat(DurationMs::from_secs(15))
            .register_on_start(true),
    ];

    let runtime = Runtime::start_with(Mode::Agent, &config, &services(&ledger, &clock))
        .await
        .unwrap();
    assert_eq!(targets(&ledger), vec!["0xpkg::boss_battle::register_agent"]);
    assert_eq!(
        runtime.loop_names(),
        vec!["agent:warrior", "heartbeat:warrior"]
    );

    // No targets and no balance: every heartbeat waits.
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(ledger.submissions().len(), 1);
    assert_all_stopped(runtime.shutdown().await);
}

#[tokio::test]
async fn agent_mode_without_agents_is_refused() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    let err = Runtime::start_with(Mode::Agent, &config(), &services(&ledger, &clock))
        .await
        .err()
        .unwrap();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn oracle_mode_needs_a_signer_address() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    let mut config = config();
    config.oracle.signer_address = None;
    let err = Runtime::start_with(Mode::Oracle, &config, &services(&ledger, &clock))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("signer_address"));
}
