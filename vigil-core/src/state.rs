//! The State protocol: how cursors, dedup sets, and schedules persist.

use crate::error::StateError;
use crate::id::{AgentId, StreamId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Where state lives.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Per event stream (cursor, dedup set).
    Stream(StreamId),
    /// The delayed action table.
    Schedule,
    /// Per agent session.
    Agent(AgentId),
    /// Shared across everything.
    Global,
    /// Future scopes.
    Custom(String),
}

/// Key-value persistence of JSON documents.
///
/// Implementations:
/// - MemoryStore: HashMap (testing, ephemeral)
/// - FsStore: one file per key (survives restarts)
///
/// The trait is deliberately minimal. Writers are single-owner by
/// construction (the dispatcher owns its stream scope, the scheduler owns
/// the schedule scope), so no compare-and-swap is offered.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a value by key within a scope.
    /// Returns None if the key doesn't exist.
    async fn read(&self, scope: &Scope, key: &str)
    -> Result<Option<serde_json::Value>, StateError>;

    /// Write a value. Creates or overwrites.
    async fn write(&self, scope: &Scope, key: &str, value: serde_json::Value)
    -> Result<(), StateError>;

    /// Delete a value. No-op if key doesn't exist.
    async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError>;

    /// List keys under a prefix within a scope.
    async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError>;
}

/// Read and deserialize a typed value.
pub async fn load<T: DeserializeOwned>(
    store: &dyn StateStore,
    scope: &Scope,
    key: &str,
) -> Result<Option<T>, StateError> {
    match store.read(scope, key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StateError::Serialization(format!("{key}: {e}"))),
        None => Ok(None),
    }
}

/// Serialize and write a typed value.
pub async fn save<T: Serialize>(
    store: &dyn StateStore,
    scope: &Scope,
    key: &str,
    value: &T,
) -> Result<(), StateError> {
    let value =
        serde_json::to_value(value).map_err(|e| StateError::Serialization(format!("{key}: {e}")))?;
    store.write(scope, key, value).await
}
