//! The `vigil.json` configuration file.

use crate::error::VigilError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vigil_agent::AgentConfig;
use vigil_core::DurationMs;
use vigil_exec::ContractLayout;

/// File read when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "vigil.json";

/// Where a stream with no persisted cursor begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartFrom {
    /// After the newest event that exists at startup.
    #[default]
    Latest,
    /// At the oldest event the ledger still serves.
    Beginning,
}

/// Shared objects of the deployed contract, plus the gas budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSection {
    /// Admin capability object, needed by the oracle.
    pub admin_cap_id: Option<String>,
    /// Shared arena object, needed by agents.
    pub arena_id: Option<String>,
    /// System randomness object.
    pub random_id: String,
    /// System clock object.
    pub clock_id: String,
    /// Gas budget per transaction, in base units.
    pub gas_budget: u64,
}

impl Default for LayoutSection {
    fn default() -> Self {
        let layout = ContractLayout::default();
        Self {
            admin_cap_id: None,
            arena_id: None,
            random_id: layout.random_id,
            clock_id: layout.clock_id,
            gas_budget: vigil_sui::DEFAULT_GAS_BUDGET,
        }
    }
}

/// Oracle identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    /// Address holding the admin capability.
    pub signer_address: Option<String>,
}

/// How transactions get signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeytoolSection {
    /// The `sui` binary.
    pub program: PathBuf,
    /// Keystore path, when not the CLI default.
    pub keystore: Option<PathBuf>,
    /// Per-signature deadline.
    #[serde(rename = "timeout_ms")]
    pub timeout: DurationMs,
}

impl Default for KeytoolSection {
    fn default() -> Self {
        Self {
            program: PathBuf::from("sui"),
            keystore: None,
            timeout: vigil_sui::keytool::DEFAULT_SIGN_TIMEOUT,
        }
    }
}

/// OpenAI-compatible chat completion endpoint for agent decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    /// Completion URL. Agents use the heuristic when unset.
    pub url: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            url: None,
            model: None,
            api_key_env: "VIGIL_CHAT_API_KEY".to_owned(),
        }
    }
}

impl ChatSection {
    /// The API key from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

/// Process configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    /// Full node JSON-RPC URL.
    pub rpc_url: String,
    /// Contract package id.
    pub package_id: String,
    /// Contract module.
    pub module: String,
    /// Dispatcher tick interval.
    #[serde(rename = "poll_interval_ms")]
    pub poll_interval: DurationMs,
    /// Scheduler tick interval.
    #[serde(rename = "scheduler_interval_ms")]
    pub scheduler_interval: DurationMs,
    /// First retry delay after a failed action.
    #[serde(rename = "retry_base_delay_ms")]
    pub retry_base_delay: DurationMs,
    /// Retry delay ceiling.
    #[serde(rename = "retry_max_delay_ms")]
    pub retry_max_delay: DurationMs,
    /// Remembered event ids per stream.
    pub dedup_capacity: usize,
    /// Status lookups of a sent but unconfirmed transaction before the
    /// action is executed again.
    pub confirm_limit: u32,
    /// Deadline for one ledger call.
    #[serde(rename = "call_timeout_ms")]
    pub call_timeout: DurationMs,
    /// Delay between a kill and its respawn.
    #[serde(rename = "respawn_delay_ms")]
    pub respawn_delay: DurationMs,
    /// How far behind the watermark an unseen event is still dispatched.
    #[serde(rename = "late_window_ms")]
    pub late_window: DurationMs,
    /// Start position of a stream with no persisted cursor.
    pub start_from: StartFrom,
    /// Events requested per page.
    pub page_limit: usize,
    /// Pages read per dispatcher tick.
    pub max_pages_per_tick: usize,
    /// Directory for persistent state. In-memory when unset.
    pub state_dir: Option<PathBuf>,
    /// Default log filter, overridden by `RUST_LOG`.
    pub log_level: String,
    /// Emit JSON log lines.
    pub log_json: bool,
    /// Contract objects.
    pub layout: LayoutSection,
    /// Oracle identity.
    pub oracle: OracleSection,
    /// Signing.
    pub keytool: KeytoolSection,
    /// Agents run by `vigil agent`.
    pub agents: Vec<AgentConfig>,
    /// Optional language model decisions.
    pub chat: ChatSection,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://fullnode.testnet.sui.io:443".to_owned(),
            package_id: String::new(),
            module: "boss_battle".to_owned(),
            poll_interval: DurationMs::from_millis(2_000),
            scheduler_interval: DurationMs::from_millis(5_000),
            retry_base_delay: DurationMs::from_millis(10_000),
            retry_max_delay: DurationMs::from_millis(300_000),
            dedup_capacity: vigil_dispatch::DEFAULT_DEDUP_CAPACITY,
            confirm_limit: vigil_schedule::DEFAULT_CONFIRM_LIMIT,
            call_timeout: vigil_sui::DEFAULT_CALL_TIMEOUT,
            respawn_delay: vigil_schedule::DEFAULT_RESPAWN_DELAY,
            late_window: vigil_dispatch::DEFAULT_LATE_WINDOW,
            start_from: StartFrom::Latest,
            page_limit: vigil_dispatch::DEFAULT_PAGE_LIMIT,
            max_pages_per_tick: vigil_dispatch::DEFAULT_MAX_PAGES,
            state_dir: None,
            log_level: "info".to_owned(),
            log_json: false,
            layout: LayoutSection::default(),
            oracle: OracleSection::default(),
            keytool: KeytoolSection::default(),
            agents: Vec::new(),
            chat: ChatSection::default(),
        }
    }
}

impl VigilConfig {
    /// Read and validate a config file.
    pub fn from_path(path: &Path) -> Result<Self, VigilError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| VigilError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| VigilError::Config(format!("invalid {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, else `vigil.json` when it exists, else defaults.
    ///
    /// Defaults carry no package id, so running without any file fails
    /// validation with a message naming the missing field.
    pub fn load(path: Option<&Path>) -> Result<Self, VigilError> {
        if let Some(path) = path {
            return Self::from_path(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::from_path(default_path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Reject values no process could run with.
    pub fn validate(&self) -> Result<(), VigilError> {
        if self.package_id.trim().is_empty() {
            return Err(VigilError::Config("package_id is empty".into()));
        }
        if self.module.trim().is_empty() {
            return Err(VigilError::Config("module is empty".into()));
        }
        if self.rpc_url.trim().is_empty() {
            return Err(VigilError::Config("rpc_url is empty".into()));
        }
        for (name, value) in [
            ("poll_interval_ms", self.poll_interval),
            ("scheduler_interval_ms", self.scheduler_interval),
            ("retry_base_delay_ms", self.retry_base_delay),
            ("retry_max_delay_ms", self.retry_max_delay),
            ("call_timeout_ms", self.call_timeout),
        ] {
            if value.is_zero() {
                return Err(VigilError::Config(format!("{name} must be positive")));
            }
        }
        if self.dedup_capacity == 0 {
            return Err(VigilError::Config("dedup_capacity must be positive".into()));
        }
        if self.confirm_limit == 0 {
            return Err(VigilError::Config("confirm_limit must be positive".into()));
        }
        if self.page_limit == 0 || self.max_pages_per_tick == 0 {
            return Err(VigilError::Config(
                "page_limit and max_pages_per_tick must be positive".into(),
            ));
        }
        if self.retry_max_delay < self.retry_base_delay {
            return Err(VigilError::Config(
                "retry_max_delay_ms is below retry_base_delay_ms".into(),
            ));
        }
        for agent in &self.agents {
            agent.validate()?;
        }
        Ok(())
    }

    /// The contract layout derived from the package and layout section.
    pub fn contract_layout(&self) -> ContractLayout {
        ContractLayout {
            package_id: self.package_id.clone(),
            module: self.module.clone(),
            admin_cap_id: self.layout.admin_cap_id.clone(),
            arena_id: self.layout.arena_id.clone(),
            random_id: self.layout.random_id.clone(),
            clock_id: self.layout.clock_id.clone(),
        }
    }
}
