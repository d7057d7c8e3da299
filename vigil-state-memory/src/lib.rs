#![deny(missing_docs)]
//! In-memory implementation of vigil-core's StateStore trait.
//!
//! Each [`Scope`] owns its own ordered map, so scopes never see each
//! other's keys and `list` returns keys in lexicographic order. Nothing
//! survives the process.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use vigil_core::error::StateError;
use vigil_core::state::{Scope, StateStore};

type ScopeMap = BTreeMap<String, serde_json::Value>;

/// In-memory state store.
///
/// Suitable for tests and for the indexer, which can always replay
/// from its configured start.
pub struct MemoryStore {
    scopes: RwLock<HashMap<Scope, ScopeMap>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            scopes: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys stored under `scope`.
    pub async fn len(&self, scope: &Scope) -> usize {
        self.scopes.read().await.get(scope).map_or(0, BTreeMap::len)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read(
        &self,
        scope: &Scope,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StateError> {
        let scopes = self.scopes.read().await;
        Ok(scopes.get(scope).and_then(|m| m.get(key)).cloned())
    }

    async fn write(
        &self,
        scope: &Scope,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StateError> {
        let mut scopes = self.scopes.write().await;
        scopes
            .entry(scope.clone())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
        let mut scopes = self.scopes.write().await;
        if let Some(map) = scopes.get_mut(scope) {
            map.remove(key);
            if map.is_empty() {
                scopes.remove(scope);
            }
        }
        Ok(())
    }

    async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError> {
        let scopes = self.scopes.read().await;
        let Some(map) = scopes.get(scope) else {
            return Ok(Vec::new());
        };
        Ok(map
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
