use serde_json::json;
use std::sync::Arc;
use vigil_core::test_utils::{ManualClock, MockLedger, ScriptedExecutor, event};
use vigil_core::{Action, ActionKey, DurationMs, EventHandler, HandlerError, ObjectId};
use vigil_schedule::{Backoff, RespawnTrigger, Scheduler};
use vigil_state_memory::MemoryStore;

async fn scheduler() -> Arc<Scheduler> {
    Arc::new(
        Scheduler::open_with_clock(
            Arc::new(ScriptedExecutor::new()),
            Arc::new(MemoryStore::new()),
            Backoff::default(),
            Arc::new(ManualClock::new(0)),
        )
        .await
        .unwrap(),
    )
}

fn kill(digest: &str, boss: &str, ts: u64) -> vigil_core::Event {
    event(
        digest,
        0,
        "CombatEvent",
        ts,
        json!({"boss_id": boss, "attacker": "0xa", "damage": "10", "remaining_hp": "0", "is_kill": true}),
    )
}

#[tokio::test]
async fn kill_delivered_twice_schedules_one_respawn() {
    let scheduler = scheduler().await;
    let trigger = RespawnTrigger::new(scheduler.clone()).with_delay(DurationMs::from_secs(30));

    let ev = kill("tx1", "0xboss", 100);
    trigger.handle(&ev).await.unwrap();
    trigger.handle(&ev).await.unwrap();

    let pending = scheduler.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].key, ActionKey::new("0xboss"));
    assert_eq!(pending[0].not_before_ms, 100 + 30_000);
    assert_eq!(
        pending[0].action,
        Action::Respawn {
            source_id: ObjectId::new("0xboss")
        }
    );
}

#[tokio::test]
async fn non_kill_hits_are_ignored() {
    let scheduler = scheduler().await;
    let trigger = RespawnTrigger::new(scheduler.clone());
    let hit = event(
        "tx1",
        0,
        "CombatEvent",
        1,
        json!({"boss_id": "0xboss", "is_kill": false}),
    );
    trigger.handle(&hit).await.unwrap();
    assert!(scheduler.is_empty());
}

#[tokio::test]
async fn kill_without_boss_id_is_a_payload_error() {
    let trigger = RespawnTrigger::new(scheduler().await);
    let bad = event("tx1", 0, "CombatEvent", 1, json!({"is_kill": true}));
    let err = trigger.handle(&bad).await.unwrap_err();
    assert!(matches!(err, HandlerError::Payload(_)));
}

#[tokio::test]
async fn death_time_from_object_takes_precedence_over_event_time() {
    let ledger = Arc::new(MockLedger::new());
    ledger.put_object("0xboss", json!({"name": "Kraken", "death_time": "5000"}));
    let scheduler = scheduler().await;
    let trigger = RespawnTrigger::new(scheduler.clone())
        .with_delay(DurationMs::from_secs(30))
        .with_ledger(ledger);

    trigger.handle(&kill("tx1", "0xboss", 9_000)).await.unwrap();

    assert_eq!(scheduler.pending()[0].not_before_ms, 35_000);
}

#[tokio::test]
async fn missing_object_falls_back_to_event_time() {
    let scheduler = scheduler().await;
    let trigger = RespawnTrigger::new(scheduler.clone())
        .with_delay(DurationMs::from_millis(1))
        .with_ledger(Arc::new(MockLedger::new()));

    trigger.handle(&kill("tx1", "0xgone", 700)).await.unwrap();

    assert_eq!(scheduler.pending()[0].not_before_ms, 701);
}

#[tokio::test]
async fn subscribes_to_combat_events_only() {
    let trigger = RespawnTrigger::new(scheduler().await);
    assert!(trigger.accepts(&kill("tx1", "0xboss", 1)));
    assert!(!trigger.accepts(&event("tx2", 0, "RewardEvent", 1, json!({}))));
}
