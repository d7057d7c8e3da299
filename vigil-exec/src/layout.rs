//! Where the contract and its shared objects live.

use serde::{Deserialize, Serialize};
use vigil_core::{ExecError, ObjectId};

/// Addresses of the contract package and the shared objects its entry
/// functions take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractLayout {
    /// Package id.
    pub package_id: String,
    /// Module name within the package.
    pub module: String,
    /// Admin capability object, required for respawns.
    pub admin_cap_id: Option<String>,
    /// Shared arena object, required for attacks and registration.
    pub arena_id: Option<String>,
    /// System randomness object.
    pub random_id: String,
    /// System clock object.
    pub clock_id: String,
}

impl Default for ContractLayout {
    fn default() -> Self {
        Self {
            package_id: String::new(),
            module: "boss_battle".to_owned(),
            admin_cap_id: None,
            arena_id: None,
            random_id: "0x8".to_owned(),
            clock_id: "0x6".to_owned(),
        }
    }
}

impl ContractLayout {
    /// Layout for `package_id` with default module and system objects.
    pub fn new(package_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            ..Self::default()
        }
    }

    /// Set the admin capability.
    #[must_use]
    pub fn with_admin_cap(mut self, id: impl Into<String>) -> Self {
        self.admin_cap_id = Some(id.into());
        self
    }

    /// Set the arena.
    #[must_use]
    pub fn with_arena(mut self, id: impl Into<String>) -> Self {
        self.arena_id = Some(id.into());
        self
    }

    /// Fully qualified entry function name.
    pub fn function(&self, name: &str) -> String {
        format!("{}::{}::{name}", self.package_id, self.module)
    }

    pub(crate) fn admin_cap(&self) -> Result<ObjectId, ExecError> {
        required(&self.admin_cap_id, "admin_cap_id")
    }

    pub(crate) fn arena(&self) -> Result<ObjectId, ExecError> {
        required(&self.arena_id, "arena_id")
    }

    /// Reject layouts that cannot produce any valid call.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.package_id.trim().is_empty() {
            return Err(ExecError::FatalConfig("contract package id is empty".into()));
        }
        if self.module.trim().is_empty() {
            return Err(ExecError::FatalConfig("contract module is empty".into()));
        }
        Ok(())
    }
}

fn required(value: &Option<String>, name: &str) -> Result<ObjectId, ExecError> {
    match value.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Ok(ObjectId::new(id)),
        _ => Err(ExecError::FatalConfig(format!("contract layout has no {name}"))),
    }
}
