use serde_json::json;
use std::sync::Arc;
use vigil::config::LayoutSection;
use vigil::runtime::{build_agent, build_indexer, build_oracle, open_store};
use vigil::{Services, StartFrom, VigilConfig, VigilError};
use vigil_agent::AgentConfig;
use vigil_core::test_utils::{ManualClock, MockLedger, ScriptedDecision, StaticSigner, event};
use vigil_core::{ActionKey, Call, DurationMs, LedgerError, ObjectId, TxResponse};
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

fn kill(digest: &str, ts: u64) -> vigil_core::Event {
    event(
        digest,
        0,
        "CombatEvent",
        ts,
        json!({"boss_id": "0xb", "attacker": "0xa", "damage": "40", "remaining_hp": "0", "is_kill": true}),
    )
}

fn dead_boss(ledger: &MockLedger) {
    ledger.put_object(
        "0xb",
        json!({
            "name": "Kraken",
            "description": "Deep one",
            "skill": "Ink",
            "difficulty": "Hard",
            "hp": "0",
            "max_hp": "1000",
            "attack_cost": "50000000",
            "is_alive": false
        }),
    );
}

// ━━━ Oracle ━━━

#[tokio::test]
async fn duplicate_kill_schedules_one_respawn_and_executes_once() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    dead_boss(&ledger);
    let kill_event = kill("D1", 100);
    ledger.emit(kill_event.clone());
    ledger.emit(kill_event);
    ledger.emit(kill("D2", 101));

    let oracle = build_oracle(
        &config(),
        &services(&ledger, &clock),
        Arc::new(StaticSigner::new("0xadmin")),
    )
    .await
    .unwrap();

    let report = oracle.dispatcher.tick().await.unwrap();
    assert_eq!(report.handler_failures, 0);
    assert_eq!(oracle.scheduler.pending().len(), 1);
    let entry = oracle.scheduler.get(&ActionKey::new("0xb")).unwrap();
    assert_eq!(entry.not_before_ms, 100 + 30_000);

    clock.set(30_099);
    assert_eq!(oracle.scheduler.tick().await.attempted, 0);

    clock.set(30_100);
    let report = oracle.scheduler.tick().await;
    assert_eq!(report.succeeded, 1);
    assert!(oracle.scheduler.is_empty());

    let submissions = ledger.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].signer, "0xadmin");
    match &submissions[0].calls[0] {
        Call::Move { target, .. } => assert_eq!(target, "0xpkg::boss_battle::create_boss"),
        other => panic!("expected a contract call, got {other:?}"),
    }

    oracle.dispatcher.tick().await.unwrap();
    assert!(oracle.scheduler.is_empty());
}

#[tokio::test]
async fn respawn_lost_in_flight_is_looked_up_not_sent_again() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    dead_boss(&ledger);
    ledger.emit(kill("D1", 100));
    ledger.push_response(Err(LedgerError::Unconfirmed {
        digest: "0xsent".into(),
        reason: LedgerError::Timeout(DurationMs::from_secs(15)).to_string(),
    }));

    let oracle = build_oracle(&config(), &services(&ledger, &clock), Arc::new(StaticSigner::new("0xadmin")))
        .await
        .unwrap();
    oracle.dispatcher.tick().await.unwrap();

    clock.set(30_100);
    assert_eq!(oracle.scheduler.tick().await.pending, 1);
    clock.set(30_100 + 11_000);
    assert_eq!(oracle.scheduler.tick().await.pending, 1);
    assert_eq!(ledger.submissions().len(), 1);

    ledger.set_status(
        "0xsent",
        TxResponse::new(json!({"digest": "0xsent", "effects": {"status": {"status": "success"}}})),
    );
    clock.set(30_100 + 60_000);
    assert_eq!(oracle.scheduler.tick().await.succeeded, 1);
    assert_eq!(ledger.submissions().len(), 1);
    assert!(oracle.scheduler.is_empty());
}

#[tokio::test]
async fn non_kill_combat_schedules_nothing() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    ledger.emit(event(
        "D1",
        0,
        "CombatEvent",
        100,
        json!({"boss_id": "0xb", "damage": "5", "remaining_hp": "95", "is_kill": false}),
    ));
    let oracle = build_oracle(&config(), &services(&ledger, &clock), Arc::new(StaticSigner::new("0xadmin")))
        .await
        .unwrap();

    oracle.dispatcher.tick().await.unwrap();
    assert!(oracle.scheduler.is_empty());
}

#[tokio::test]
async fn latest_start_ignores_history() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    ledger.emit(kill("OLD", 50));
    let config = VigilConfig {
        start_from: StartFrom::Latest,
        ..config()
    };

    let oracle = build_oracle(&config, &services(&ledger, &clock), Arc::new(StaticSigner::new("0xadmin")))
        .await
        .unwrap();
    oracle.dispatcher.tick().await.unwrap();
    assert!(oracle.scheduler.is_empty());

    ledger.emit(kill("NEW", 200));
    oracle.dispatcher.tick().await.unwrap();
    let entry = oracle.scheduler.get(&ActionKey::new("0xb")).unwrap();
    assert_eq!(entry.not_before_ms, 200 + 30_000);
}

#[tokio::test]
async fn restart_with_state_dir_neither_replays_nor_forgets() {
    let dir = tempfile::tempdir().unwrap();
    let config = VigilConfig {
        state_dir: Some(dir.path().to_path_buf()),
        ..config()
    };
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    ledger.emit(kill("D1", 100));

    {
        let services = Services {
            ledger: ledger.clone(),
            store: open_store(&config).await.unwrap(),
            clock: clock.clone(),
        };
        let oracle = build_oracle(&config, &services, Arc::new(StaticSigner::new("0xadmin")))
            .await
            .unwrap();
        assert_eq!(oracle.dispatcher.tick().await.unwrap().dispatched, 1);
    }

    let services = Services {
        ledger: ledger.clone(),
        store: open_store(&config).await.unwrap(),
        clock: clock.clone(),
    };
    let oracle = build_oracle(&config, &services, Arc::new(StaticSigner::new("0xadmin")))
        .await
        .unwrap();
    assert_eq!(oracle.scheduler.pending().len(), 1);
    assert_eq!(oracle.dispatcher.tick().await.unwrap().dispatched, 0);
}

#[tokio::test]
async fn resumed_stream_opens_while_the_node_is_unreachable() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    ledger.emit(kill("D1", 100));
    let config = VigilConfig {
        start_from: StartFrom::Latest,
        ..config()
    };
    let services = services(&ledger, &clock);

    let oracle = build_oracle(&config, &services, Arc::new(StaticSigner::new("0xadmin")))
        .await
        .unwrap();
    ledger.emit(kill("D2", 200));
    assert_eq!(oracle.dispatcher.tick().await.unwrap().dispatched, 1);
    let cursor = oracle.dispatcher.cursor().await;
    assert_eq!(cursor.watermark_ms, 200);
    drop(oracle);

    ledger.push_query_error(LedgerError::Transient("connection refused".into()));
    let oracle = build_oracle(&config, &services, Arc::new(StaticSigner::new("0xadmin")))
        .await
        .unwrap();
    assert_eq!(oracle.dispatcher.cursor().await, cursor);
}

#[tokio::test]
async fn fresh_stream_needs_the_node_to_find_the_latest_event() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    ledger.push_query_error(LedgerError::Transient("connection refused".into()));
    let config = VigilConfig {
        start_from: StartFrom::Latest,
        ..config()
    };

    let result = build_oracle(&config, &services(&ledger, &clock), Arc::new(StaticSigner::new("0xadmin"))).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn oracle_requires_admin_cap() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    let mut config = config();
    config.layout.admin_cap_id = None;

    let err = build_oracle(&config, &services(&ledger, &clock), Arc::new(StaticSigner::new("0xadmin")))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, VigilError::Config(_)));
}

// ━━━ Indexer ━━━

#[tokio::test]
async fn indexer_logs_every_module_event() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    ledger.emit(kill("D1", 100));
    ledger.emit(event(
        "D1",
        1,
        "RewardEvent",
        100,
        json!({"boss_id": "0xb", "winner": "0xa", "amount": "2500000000"}),
    ));
    ledger.emit(event("D2", 0, "BossCreated", 150, json!({"boss_id": "0xc"})));

    let dispatcher = build_indexer(&config(), &services(&ledger, &clock)).await.unwrap();
    let report = dispatcher.tick().await.unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.handler_failures, 0);
}

// ━━━ Agents ━━━

#[tokio::test]
async fn agent_learns_targets_from_its_stream() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    ledger.emit(event("D1", 0, "BossCreated", 100, json!({"boss_id": "0xc"})));
    let agent = AgentConfig::new("warrior", "0xwarrior").heartbeat(DurationMs::from_secs(15));

    let parts = build_agent(
        &config(),
        &agent,
        &services(&ledger, &clock),
        Arc::new(StaticSigner::new("0xwarrior")),
        Arc::new(ScriptedDecision::new()),
    )
    .await
    .unwrap();
    parts.dispatcher.tick().await.unwrap();

    assert_eq!(parts.decision_loop.view().known(), vec![ObjectId::new("0xc")]);
    assert_eq!(parts.dispatcher.stream().as_str(), "agent:warrior");
}

#[tokio::test]
async fn agents_require_an_arena() {
    let ledger = Arc::new(MockLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    let mut config = config();
    config.layout.arena_id = None;
    let agent = AgentConfig::new("warrior", "0xwarrior");

    let err = build_agent(
        &config,
        &agent,
        &services(&ledger, &clock),
        Arc::new(StaticSigner::new("0xwarrior")),
        Arc::new(ScriptedDecision::new()),
    )
    .await
    .err()
    .unwrap();
    assert!(err.is_fatal());
}

// ━━━ Config files ━━━

#[test]
fn config_file_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vigil.json");
    std::fs::write(
        &path,
        r#"{
            "package_id": "0xpkg",
            "poll_interval_ms": 1000,
            "layout": {"admin_cap_id": "0xcap"},
            "oracle": {"signer_address": "0xadmin"},
            "agents": [{"name": "warrior", "address": "0xw", "heartbeat_ms": 15000}]
        }"#,
    )
    .unwrap();

    let config = VigilConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(config.poll_interval, DurationMs::from_secs(1));
    assert_eq!(config.oracle.signer_address.as_deref(), Some("0xadmin"));
    assert_eq!(config.agents[0].heartbeat, DurationMs::from_secs(15));
}

#[test]
fn invalid_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vigil.json");
    std::fs::write(&path, r#"{"package_id": "0xpkg", "dedup_capacity": 0}"#).unwrap();
    assert!(matches!(
        VigilConfig::load(Some(path.as_path())),
        Err(VigilError::Config(_))
    ));

    let missing = dir.path().join("absent.json");
    assert!(VigilConfig::load(Some(missing.as_path())).is_err());
}
