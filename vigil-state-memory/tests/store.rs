use serde_json::json;
use std::sync::Arc;
use vigil_core::id::{AgentId, StreamId};
use vigil_core::state::{Scope, StateStore};
use vigil_state_memory::MemoryStore;

fn stream(name: &str) -> Scope {
    Scope::Stream(StreamId::new(name))
}

// --- Basic CRUD ---

#[tokio::test]
async fn write_then_read() {
    let store = MemoryStore::new();
    store
        .write(&stream("combat"), "cursor", json!({"watermark_ms": 5}))
        .await
        .unwrap();

    let val = store.read(&stream("combat"), "cursor").await.unwrap();
    assert_eq!(val, Some(json!({"watermark_ms": 5})));
}

#[tokio::test]
async fn read_missing_returns_none() {
    let store = MemoryStore::new();
    assert_eq!(store.read(&Scope::Schedule, "nope").await.unwrap(), None);
}

#[tokio::test]
async fn overwrite_replaces_value() {
    let store = MemoryStore::new();
    store.write(&Scope::Global, "k", json!(1)).await.unwrap();
    store.write(&Scope::Global, "k", json!(2)).await.unwrap();
    assert_eq!(store.read(&Scope::Global, "k").await.unwrap(), Some(json!(2)));
    assert_eq!(store.len(&Scope::Global).await, 1);
}

#[tokio::test]
async fn delete_removes_key_and_missing_is_noop() {
    let store = MemoryStore::new();
    store.write(&Scope::Schedule, "0xboss", json!({})).await.unwrap();
    store.delete(&Scope::Schedule, "0xboss").await.unwrap();
    store.delete(&Scope::Schedule, "0xboss").await.unwrap();
    assert_eq!(store.read(&Scope::Schedule, "0xboss").await.unwrap(), None);
    assert_eq!(store.len(&Scope::Schedule).await, 0);
}

// --- List ---

#[tokio::test]
async fn list_by_prefix_is_sorted() {
    let store = MemoryStore::new();
    for key in ["action:0xc", "action:0xa", "meta", "action:0xb"] {
        store.write(&Scope::Schedule, key, json!(null)).await.unwrap();
    }
    let keys = store.list(&Scope::Schedule, "action:").await.unwrap();
    assert_eq!(keys, vec!["action:0xa", "action:0xb", "action:0xc"]);

    let all = store.list(&Scope::Schedule, "").await.unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn list_unknown_scope_is_empty() {
    let store = MemoryStore::new();
    assert!(store.list(&stream("x"), "").await.unwrap().is_empty());
}

// --- Isolation ---

#[tokio::test]
async fn scopes_are_isolated() {
    let store = MemoryStore::new();
    let agent = Scope::Agent(AgentId::new("aggro"));
    store.write(&stream("combat"), "cursor", json!("a")).await.unwrap();
    store.write(&agent, "cursor", json!("b")).await.unwrap();

    assert_eq!(store.read(&stream("combat"), "cursor").await.unwrap(), Some(json!("a")));
    assert_eq!(store.read(&agent, "cursor").await.unwrap(), Some(json!("b")));
    assert_eq!(store.list(&stream("reward"), "").await.unwrap(), Vec::<String>::new());
}

// --- Concurrency ---

#[tokio::test]
async fn concurrent_writers_do_not_lose_keys() {
    let store = Arc::new(MemoryStore::new());
    let mut tasks = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store
                .write(&Scope::Global, &format!("k{i:02}"), json!(i))
                .await
                .unwrap();
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    assert_eq!(store.list(&Scope::Global, "k").await.unwrap().len(), 16);
}

#[test]
fn usable_as_trait_object() {
    let _store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
}
